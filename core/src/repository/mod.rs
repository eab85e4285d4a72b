//! Client-side view of a hierarchical, versioned content repository.
//!
//! The [`DocumentManager`](crate::storage::DocumentManager) never talks to a repository
//! directly. It goes through two object-safe traits:
//!
//! *   **[`RepositoryConnector`]:** opens a session for a set of [`SessionParameters`]. The
//!     connector owns authentication and whatever connection pooling the transport needs.
//! *   **[`RepositorySession`]:** the per-user capability to fetch, create and delete objects,
//!     run queries in the repository query language, drive check-out/check-in and move content
//!     bytes around.
//!
//! Every call is independently committed by the repository. Nothing here offers multi-object
//! transactions; callers compensate explicitly when a multi-step workflow fails halfway.
//!
//! The crate ships one implementation, [`MemoryRepository`], which keeps everything in process
//! memory and understands the query subset produced by [`crate::storage`]. Other backends
//! (see the `folio_extensions` crate) can persist its [`Store`] snapshot.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::model::ObjectId;

pub use self::error::RepositoryError;
pub use self::memory::{MemoryRepository, MemorySession, Store};
pub use self::object::{NativeDocument, NativeFolder, ParentRef, RepositoryObject};

mod error;
pub mod memory;
mod object;

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Media type used when content is supplied without one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            user: user.into(),
            password: SecretString::from(password.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionParameters {
    pub repository_id: String,
    pub credentials: Credentials,
}

/// Bytes of a document version, held fully in memory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentStream {
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ContentStream {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Properties committed together with a checked-in working copy.
#[derive(Debug, Clone, Default)]
pub struct CheckIn {
    pub major: bool,
    pub name: Option<String>,
    pub content: Option<ContentStream>,
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Match every version rather than only the latest of each series.
    pub search_all_versions: bool,
    pub skip: usize,
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRow {
    pub object_id: ObjectId,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct QueryResults {
    pub rows: Vec<QueryRow>,
    /// Total number of matches before paging, or a negative value when the repository does
    /// not know it.
    pub total_count: i64,
}

#[async_trait]
pub trait RepositoryConnector: Send + Sync + fmt::Debug {
    async fn connect(&self, parameters: &SessionParameters) -> Result<Arc<dyn RepositorySession>>;
}

#[async_trait]
pub trait RepositorySession: Send + Sync + fmt::Debug {
    fn repository_id(&self) -> &str;

    /// User the session was opened for. Recorded as author of everything it creates.
    fn user(&self) -> &str;

    async fn get_object(&self, id: &ObjectId) -> Result<RepositoryObject>;

    async fn get_object_by_path(&self, path: &str) -> Result<RepositoryObject>;

    /// Direct children of a folder, folders and latest document versions alike.
    async fn get_children(&self, folder_id: &ObjectId) -> Result<Vec<RepositoryObject>>;

    async fn create_folder(&self, parent_id: &ObjectId, name: &str) -> Result<NativeFolder>;

    async fn create_document(
        &self,
        parent_id: &ObjectId,
        name: &str,
        content: Option<ContentStream>,
    ) -> Result<NativeDocument>;

    async fn delete_object(&self, id: &ObjectId, all_versions: bool) -> Result<()>;

    /// Deletes a folder and everything below it.
    async fn delete_tree(&self, folder_id: &ObjectId) -> Result<()>;

    async fn query(&self, statement: &str, options: &QueryOptions) -> Result<QueryResults>;

    /// Returns the id of the private working copy.
    async fn check_out(&self, document_id: &ObjectId) -> Result<ObjectId>;

    /// Commits a working copy and returns the id of the new version.
    async fn check_in(&self, working_copy_id: &ObjectId, check_in: CheckIn) -> Result<ObjectId>;

    async fn cancel_check_out(&self, working_copy_id: &ObjectId) -> Result<()>;

    async fn get_content_stream(&self, document_id: &ObjectId) -> Result<Option<ContentStream>>;

    async fn set_content_stream(
        &self,
        document_id: &ObjectId,
        content: ContentStream,
        overwrite: bool,
    ) -> Result<()>;

    /// All versions of the document's series, newest first.
    async fn get_all_versions(&self, document_id: &ObjectId) -> Result<Vec<NativeDocument>>;

    async fn get_latest_version(&self, document_id: &ObjectId) -> Result<NativeDocument>;

    async fn add_object_to_folder(&self, object_id: &ObjectId, folder_id: &ObjectId) -> Result<()>;

    /// Drops any object state the session memoizes.
    fn invalidate(&self) {}
}
