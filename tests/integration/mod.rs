//! Integration Tests Module
//!
//! End-to-end tests for the Story Cascade engine through its public API:
//! lifecycle scenarios and graph properties, persistence round trips,
//! analysis over realistic backlogs, and concurrent sessions.

// Lifecycle scenarios and dependency graph properties
mod scenarios_test;

// JSON store and registry persistence
mod persistence_test;

// Metrics and analyzer reports
mod analysis_test;

// Per-feature sessions under concurrency
mod session_test;
