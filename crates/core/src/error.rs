//! Core Error Types
//!
//! Defines the error type shared by every crate in the Story Cascade workspace.
//! Graph validation errors (`DanglingReference`, `SelfDependency`, `CycleError`)
//! are raised at the graph-construction boundary and block every mutation until
//! the caller repairs the backlog. Transition errors are local to one operation.

use thiserror::Error;

use crate::story::StoryStatus;

/// Core error type for the Story Cascade workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A story id that is not present in the backlog
    #[error("Not found: {0}")]
    NotFound(String),

    /// A create for an id that already exists
    #[error("Duplicate story id: {0}")]
    DuplicateIdConflict(String),

    /// A dependency pointing at a story that does not exist
    #[error("Story '{story}' depends on unknown story '{dependency}'")]
    DanglingReference { story: String, dependency: String },

    /// A story listing itself as a dependency
    #[error("Story '{id}' depends on itself")]
    SelfDependency { id: String },

    /// A dependency cycle, reported as the path returning to its start
    #[error("Circular dependency detected: {}", path.join(" -> "))]
    CycleError { path: Vec<String> },

    /// A lifecycle move the state machine does not allow
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: StoryStatus, to: StoryStatus },

    /// A move that requires every dependency to be complete
    #[error("Dependencies incomplete: {}", ids.join(", "))]
    DependenciesIncomplete { ids: Vec<String> },

    /// Malformed story or backlog input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid transition error
    pub fn invalid_transition(from: StoryStatus, to: StoryStatus) -> Self {
        Self::InvalidTransition { from, to }
    }

    /// Whether this error comes from dependency graph validation.
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            CoreError::DanglingReference { .. }
                | CoreError::SelfDependency { .. }
                | CoreError::CycleError { .. }
        )
    }

    /// Diagnostic cycle path. A self-dependency is the length-1 cycle `[id, id]`.
    pub fn cycle_path(&self) -> Option<Vec<String>> {
        match self {
            CoreError::CycleError { path } => Some(path.clone()),
            CoreError::SelfDependency { id } => Some(vec![id.clone(), id.clone()]),
            _ => None,
        }
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
