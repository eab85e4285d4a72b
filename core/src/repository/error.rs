use thiserror::Error;

use crate::model::ObjectId;

/// Failures reported by a repository client.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("An object named '{name}' already exists in folder {parent}")]
    NameConflict { name: String, parent: ObjectId },

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid query: {0}")]
    Query(String),
}

impl RepositoryError {
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        RepositoryError::ObjectNotFound(id.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::ObjectNotFound(_))
    }
}

impl From<std::io::Error> for RepositoryError {
    fn from(e: std::io::Error) -> Self {
        RepositoryError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(e: serde_json::Error) -> Self {
        RepositoryError::Transport(format!("malformed payload: {}", e))
    }
}
