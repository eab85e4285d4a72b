//! A repository that lives entirely in process memory.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::model::ObjectId;
use crate::repository::{
    CheckIn, ContentStream, NativeDocument, NativeFolder, QueryOptions, QueryResults, RepositoryConnector,
    RepositoryError, RepositoryObject, RepositorySession, Result, SessionParameters,
};

pub use self::query::ParseError;
pub use self::store::Store;

mod query;
mod store;

/// Connector for an in-memory [`Store`]. Clones share the same store.
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    repository_id: String,
    store: Arc<RwLock<Store>>,
}

impl MemoryRepository {
    pub fn new(repository_id: impl Into<String>) -> Self {
        Self::with_store(repository_id, Store::new())
    }

    /// Serves an existing store, typically one reloaded from disk.
    pub fn with_store(repository_id: impl Into<String>, store: Store) -> Self {
        MemoryRepository {
            repository_id: repository_id.into(),
            store: Arc::new(RwLock::new(store)),
        }
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    /// Copy of the current repository state.
    pub async fn snapshot(&self) -> Store {
        self.store.read().await.clone()
    }

    /// Replaces the repository state, e.g. to roll back to an earlier snapshot.
    pub async fn restore(&self, store: Store) {
        *self.store.write().await = store;
    }

    /// Opens a session without going through credential checks.
    pub fn session(&self, user: impl Into<String>) -> MemorySession {
        MemorySession {
            repository_id: self.repository_id.clone(),
            user: user.into(),
            store: self.store.clone(),
        }
    }
}

#[async_trait]
impl RepositoryConnector for MemoryRepository {
    #[instrument(skip(self, parameters), fields(user = %parameters.credentials.user))]
    async fn connect(&self, parameters: &SessionParameters) -> Result<Arc<dyn RepositorySession>> {
        if parameters.repository_id != self.repository_id {
            return Err(RepositoryError::InvalidArgument(format!(
                "unknown repository '{}'",
                parameters.repository_id
            )));
        }
        if parameters.credentials.user.is_empty() {
            return Err(RepositoryError::InvalidArgument("empty user name".into()));
        }
        debug!("Opening in-memory session");
        Ok(Arc::new(self.session(parameters.credentials.user.clone())))
    }
}

#[derive(Debug, Clone)]
pub struct MemorySession {
    repository_id: String,
    user: String,
    store: Arc<RwLock<Store>>,
}

#[async_trait]
impl RepositorySession for MemorySession {
    fn repository_id(&self) -> &str {
        &self.repository_id
    }

    fn user(&self) -> &str {
        &self.user
    }

    async fn get_object(&self, id: &ObjectId) -> Result<RepositoryObject> {
        self.store.read().await.get_object(id)
    }

    async fn get_object_by_path(&self, path: &str) -> Result<RepositoryObject> {
        self.store.read().await.get_object_by_path(path)
    }

    async fn get_children(&self, folder_id: &ObjectId) -> Result<Vec<RepositoryObject>> {
        self.store.read().await.children(folder_id)
    }

    #[instrument(skip(self))]
    async fn create_folder(&self, parent_id: &ObjectId, name: &str) -> Result<NativeFolder> {
        self.store.write().await.create_folder(parent_id, name, &self.user)
    }

    #[instrument(skip(self, content))]
    async fn create_document(
        &self,
        parent_id: &ObjectId,
        name: &str,
        content: Option<ContentStream>,
    ) -> Result<NativeDocument> {
        self.store.write().await.create_document(parent_id, name, content, &self.user)
    }

    #[instrument(skip(self))]
    async fn delete_object(&self, id: &ObjectId, all_versions: bool) -> Result<()> {
        self.store.write().await.delete_object(id, all_versions)
    }

    #[instrument(skip(self))]
    async fn delete_tree(&self, folder_id: &ObjectId) -> Result<()> {
        self.store.write().await.delete_tree(folder_id)
    }

    #[instrument(skip(self, options))]
    async fn query(&self, statement: &str, options: &QueryOptions) -> Result<QueryResults> {
        self.store.read().await.query(statement, options)
    }

    #[instrument(skip(self))]
    async fn check_out(&self, document_id: &ObjectId) -> Result<ObjectId> {
        self.store.write().await.check_out(document_id, &self.user)
    }

    #[instrument(skip(self, check_in), fields(major = check_in.major))]
    async fn check_in(&self, working_copy_id: &ObjectId, check_in: CheckIn) -> Result<ObjectId> {
        self.store.write().await.check_in(working_copy_id, check_in, &self.user)
    }

    #[instrument(skip(self))]
    async fn cancel_check_out(&self, working_copy_id: &ObjectId) -> Result<()> {
        self.store.write().await.cancel_check_out(working_copy_id)
    }

    async fn get_content_stream(&self, document_id: &ObjectId) -> Result<Option<ContentStream>> {
        self.store.read().await.content(document_id)
    }

    #[instrument(skip(self, content))]
    async fn set_content_stream(
        &self,
        document_id: &ObjectId,
        content: ContentStream,
        overwrite: bool,
    ) -> Result<()> {
        self.store.write().await.set_content(document_id, content, overwrite, &self.user)
    }

    async fn get_all_versions(&self, document_id: &ObjectId) -> Result<Vec<NativeDocument>> {
        self.store.read().await.all_versions(document_id)
    }

    async fn get_latest_version(&self, document_id: &ObjectId) -> Result<NativeDocument> {
        self.store.read().await.latest_version(document_id)
    }

    #[instrument(skip(self))]
    async fn add_object_to_folder(&self, object_id: &ObjectId, folder_id: &ObjectId) -> Result<()> {
        self.store.write().await.add_to_folder(object_id, folder_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Credentials;

    fn parameters(repository_id: &str, user: &str) -> SessionParameters {
        SessionParameters {
            repository_id: repository_id.into(),
            credentials: Credentials::new(user, "secret"),
        }
    }

    #[tokio::test]
    async fn sessions_share_the_store_and_record_their_user() {
        let repository = MemoryRepository::new("repo");
        let alice = repository.connect(&parameters("repo", "alice")).await.unwrap();
        let bob = repository.connect(&parameters("repo", "bob")).await.unwrap();

        let root = repository.snapshot().await.root_id().clone();
        let doc = alice.create_document(&root, "note", None).await.unwrap();
        assert_eq!(doc.created_by.as_deref(), Some("alice"));

        let seen = bob.get_object(&doc.id).await.unwrap().into_document().unwrap();
        assert_eq!(seen.name, "note");
        assert_eq!(bob.user(), "bob");
    }

    #[tokio::test]
    async fn restore_rolls_back_to_a_snapshot() {
        let repository = MemoryRepository::new("repo");
        let session = repository.session("alice");
        let snapshot = repository.snapshot().await;
        let root = snapshot.root_id().clone();

        let folder = session.create_folder(&root, "a").await.unwrap();
        repository.restore(snapshot).await;
        assert!(session.get_object(&folder.id).await.unwrap_err().is_not_found());
        session.create_folder(&root, "a").await.unwrap();
    }

    #[tokio::test]
    async fn connect_rejects_unknown_repository() {
        let repository = MemoryRepository::new("repo");
        let err = repository.connect(&parameters("other", "alice")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidArgument(_)));
    }
}
