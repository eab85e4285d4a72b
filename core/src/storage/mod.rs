//! Process-aware document storage on top of a [`RepositorySession`](crate::repository::RepositorySession).
//!
//! The entry point is [`DocumentManager`]. It hands out plain [`Folder`](crate::model::Folder)
//! and [`Document`](crate::model::Document) values and hides three pieces of machinery:
//!
//! *   **Path cache:** documents belonging to a process live below `/<definition>` or
//!     `/<definition>/<instance>` (relative to the configured root folder). The manager keeps an
//!     in-memory map from definition and instance ids to folder ids, creates missing folders on
//!     demand and re-resolves entries whose folder has disappeared.
//! *   **Query translation:** a [`SearchQuery`](crate::search::SearchQuery) is compiled into a
//!     single repository statement. Criteria on process folders that do not exist short-circuit
//!     to an empty [`SearchResult`](crate::search::SearchResult) without querying.
//! *   **Versioning:** new versions are always derived from the tip of the version series via
//!     check-out and check-in. A failure after check-out cancels the check-out before the error
//!     is returned.
//!
//! # Process context
//!
//! A document's process definition and instance are not stored anywhere. They are read back
//! from the path of the first folder the document is filed in, see
//! [`process_context_from_path`].
//!
//! # Errors
//!
//! All operations return [`Result<T>`]. [`Error::NotFound`] and [`Error::AlreadyExists`] are
//! expected conditions and are always reported as such; anything else that goes wrong while
//! creating something is an [`Error::CreationFailed`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use folio_core::model::{Content, DocumentTarget};
//! use folio_core::repository::MemoryRepository;
//! use folio_core::storage::{DocumentManager, ManagerConfig, StaticCredentials};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> folio_core::storage::Result<()> {
//! let manager = DocumentManager::new(
//!     Arc::new(MemoryRepository::new("local")),
//!     Arc::new(StaticCredentials::new("secret")),
//!     ManagerConfig::new("local"),
//! );
//!
//! let target = DocumentTarget::instance("invoice", "invoice--1");
//! let doc = manager
//!     .create_document("scan", target, Some(Content::new("hello").mime_type("text/plain")))
//!     .await?;
//! assert_eq!(doc.process_instance_id.as_ref().map(|i| i.as_str()), Some("invoice--1"));
//! # Ok(())
//! # }
//! ```

pub use self::config::{ManagerConfig, ServerClock};
pub use self::manager::DocumentManager;
pub use self::projection::process_context_from_path;
pub use self::session::{CredentialsProvider, DEFAULT_USER, StaticCredentials};

mod config;
mod document;
mod folder;
mod manager;
mod path_cache;
mod projection;
mod query;
mod session;
mod version;

use thiserror::Error;

use crate::model::ObjectId;
use crate::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("'{name}' already exists in folder {parent}")]
    AlreadyExists { name: String, parent: ObjectId },

    #[error("Creation failed: {reason}")]
    CreationFailed {
        reason: String,
        #[source]
        source: Option<RepositoryError>,
    },

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Repository error")]
    Repository(#[source] RepositoryError),
}

impl Error {
    pub(crate) fn creation_failed(reason: impl Into<String>) -> Self {
        Error::CreationFailed { reason: reason.into(), source: None }
    }

    /// Maps a repository failure that happened while creating something. Missing targets and
    /// name clashes keep their own variants.
    pub(crate) fn from_creation(reason: impl Into<String>, err: RepositoryError) -> Self {
        match err {
            RepositoryError::ObjectNotFound(_) | RepositoryError::NameConflict { .. } => err.into(),
            other => Error::CreationFailed { reason: reason.into(), source: Some(other) },
        }
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ObjectNotFound(id) => Error::NotFound(id),
            RepositoryError::NameConflict { name, parent } => Error::AlreadyExists { name, parent },
            other => Error::Repository(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
