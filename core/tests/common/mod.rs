use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use folio_core::model::ObjectId;
use folio_core::repository::{
    CheckIn, ContentStream, MemoryRepository, MemorySession, NativeDocument, NativeFolder, QueryOptions,
    QueryResults, RepositoryConnector, RepositoryError, RepositoryObject, RepositorySession, Result,
    SessionParameters,
};
use folio_core::storage::{DocumentManager, ManagerConfig, StaticCredentials};

pub const REPOSITORY_ID: &str = "test-repo";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn manager() -> DocumentManager {
    init_tracing();
    DocumentManager::new(
        Arc::new(MemoryRepository::new(REPOSITORY_ID)),
        Arc::new(StaticCredentials::new("secret")),
        ManagerConfig::new(REPOSITORY_ID),
    )
}

/// Connector whose sessions reject every check-in and count cancelled check-outs.
#[derive(Debug)]
pub struct FailingCheckIn {
    pub repository: MemoryRepository,
    pub cancelled: Arc<AtomicUsize>,
}

impl FailingCheckIn {
    pub fn new() -> Self {
        FailingCheckIn {
            repository: MemoryRepository::new(REPOSITORY_ID),
            cancelled: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct FailingSession {
    inner: MemorySession,
    cancelled: Arc<AtomicUsize>,
}

#[async_trait]
impl RepositoryConnector for FailingCheckIn {
    async fn connect(&self, parameters: &SessionParameters) -> Result<Arc<dyn RepositorySession>> {
        Ok(Arc::new(FailingSession {
            inner: self.repository.session(parameters.credentials.user.clone()),
            cancelled: self.cancelled.clone(),
        }))
    }
}

#[async_trait]
impl RepositorySession for FailingSession {
    fn repository_id(&self) -> &str {
        self.inner.repository_id()
    }

    fn user(&self) -> &str {
        self.inner.user()
    }

    async fn get_object(&self, id: &ObjectId) -> Result<RepositoryObject> {
        self.inner.get_object(id).await
    }

    async fn get_object_by_path(&self, path: &str) -> Result<RepositoryObject> {
        self.inner.get_object_by_path(path).await
    }

    async fn get_children(&self, folder_id: &ObjectId) -> Result<Vec<RepositoryObject>> {
        self.inner.get_children(folder_id).await
    }

    async fn create_folder(&self, parent_id: &ObjectId, name: &str) -> Result<NativeFolder> {
        self.inner.create_folder(parent_id, name).await
    }

    async fn create_document(
        &self,
        parent_id: &ObjectId,
        name: &str,
        content: Option<ContentStream>,
    ) -> Result<NativeDocument> {
        self.inner.create_document(parent_id, name, content).await
    }

    async fn delete_object(&self, id: &ObjectId, all_versions: bool) -> Result<()> {
        self.inner.delete_object(id, all_versions).await
    }

    async fn delete_tree(&self, folder_id: &ObjectId) -> Result<()> {
        self.inner.delete_tree(folder_id).await
    }

    async fn query(&self, statement: &str, options: &QueryOptions) -> Result<QueryResults> {
        self.inner.query(statement, options).await
    }

    async fn check_out(&self, document_id: &ObjectId) -> Result<ObjectId> {
        self.inner.check_out(document_id).await
    }

    async fn check_in(&self, _working_copy_id: &ObjectId, _check_in: CheckIn) -> Result<ObjectId> {
        Err(RepositoryError::Transport("connection reset".into()))
    }

    async fn cancel_check_out(&self, working_copy_id: &ObjectId) -> Result<()> {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
        self.inner.cancel_check_out(working_copy_id).await
    }

    async fn get_content_stream(&self, document_id: &ObjectId) -> Result<Option<ContentStream>> {
        self.inner.get_content_stream(document_id).await
    }

    async fn set_content_stream(&self, document_id: &ObjectId, content: ContentStream, overwrite: bool) -> Result<()> {
        self.inner.set_content_stream(document_id, content, overwrite).await
    }

    async fn get_all_versions(&self, document_id: &ObjectId) -> Result<Vec<NativeDocument>> {
        self.inner.get_all_versions(document_id).await
    }

    async fn get_latest_version(&self, document_id: &ObjectId) -> Result<NativeDocument> {
        self.inner.get_latest_version(document_id).await
    }

    async fn add_object_to_folder(&self, object_id: &ObjectId, folder_id: &ObjectId) -> Result<()> {
        self.inner.add_object_to_folder(object_id, folder_id).await
    }
}

/// Connector whose sessions leave folders named `hidden` out of folder listings, as if another
/// client created them right after the listing was taken.
#[derive(Debug)]
pub struct HiddenFolders {
    pub repository: MemoryRepository,
    pub hidden: String,
}

impl HiddenFolders {
    pub fn new(hidden: impl Into<String>) -> Self {
        HiddenFolders { repository: MemoryRepository::new(REPOSITORY_ID), hidden: hidden.into() }
    }
}

#[derive(Debug)]
struct HidingSession {
    inner: MemorySession,
    hidden: String,
}

#[async_trait]
impl RepositoryConnector for HiddenFolders {
    async fn connect(&self, parameters: &SessionParameters) -> Result<Arc<dyn RepositorySession>> {
        Ok(Arc::new(HidingSession {
            inner: self.repository.session(parameters.credentials.user.clone()),
            hidden: self.hidden.clone(),
        }))
    }
}

#[async_trait]
impl RepositorySession for HidingSession {
    fn repository_id(&self) -> &str {
        self.inner.repository_id()
    }

    fn user(&self) -> &str {
        self.inner.user()
    }

    async fn get_object(&self, id: &ObjectId) -> Result<RepositoryObject> {
        self.inner.get_object(id).await
    }

    async fn get_object_by_path(&self, path: &str) -> Result<RepositoryObject> {
        self.inner.get_object_by_path(path).await
    }

    async fn get_children(&self, folder_id: &ObjectId) -> Result<Vec<RepositoryObject>> {
        let children = self.inner.get_children(folder_id).await?;
        Ok(children
            .into_iter()
            .filter(|child| !matches!(child, RepositoryObject::Folder(f) if f.name == self.hidden))
            .collect())
    }

    async fn create_folder(&self, parent_id: &ObjectId, name: &str) -> Result<NativeFolder> {
        self.inner.create_folder(parent_id, name).await
    }

    async fn create_document(
        &self,
        parent_id: &ObjectId,
        name: &str,
        content: Option<ContentStream>,
    ) -> Result<NativeDocument> {
        self.inner.create_document(parent_id, name, content).await
    }

    async fn delete_object(&self, id: &ObjectId, all_versions: bool) -> Result<()> {
        self.inner.delete_object(id, all_versions).await
    }

    async fn delete_tree(&self, folder_id: &ObjectId) -> Result<()> {
        self.inner.delete_tree(folder_id).await
    }

    async fn query(&self, statement: &str, options: &QueryOptions) -> Result<QueryResults> {
        self.inner.query(statement, options).await
    }

    async fn check_out(&self, document_id: &ObjectId) -> Result<ObjectId> {
        self.inner.check_out(document_id).await
    }

    async fn check_in(&self, working_copy_id: &ObjectId, check_in: CheckIn) -> Result<ObjectId> {
        self.inner.check_in(working_copy_id, check_in).await
    }

    async fn cancel_check_out(&self, working_copy_id: &ObjectId) -> Result<()> {
        self.inner.cancel_check_out(working_copy_id).await
    }

    async fn get_content_stream(&self, document_id: &ObjectId) -> Result<Option<ContentStream>> {
        self.inner.get_content_stream(document_id).await
    }

    async fn set_content_stream(&self, document_id: &ObjectId, content: ContentStream, overwrite: bool) -> Result<()> {
        self.inner.set_content_stream(document_id, content, overwrite).await
    }

    async fn get_all_versions(&self, document_id: &ObjectId) -> Result<Vec<NativeDocument>> {
        self.inner.get_all_versions(document_id).await
    }

    async fn get_latest_version(&self, document_id: &ObjectId) -> Result<NativeDocument> {
        self.inner.get_latest_version(document_id).await
    }

    async fn add_object_to_folder(&self, object_id: &ObjectId, folder_id: &ObjectId) -> Result<()> {
        self.inner.add_object_to_folder(object_id, folder_id).await
    }
}
