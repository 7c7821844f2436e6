//! Story Lifecycle
//!
//! Status state machine and completion propagation. All mutations validate the
//! dependency graph before touching the backlog.

mod machine;
mod propagation;

pub use machine::{
    is_legal, BlockReason, ReconcileReport, StatusMachine, TransitionOutcome, LEGAL_TRANSITIONS,
};
