use std::sync::Arc;

use async_trait::async_trait;
use folio_core::model::ObjectId;
use folio_core::repository::{
    CheckIn, ContentStream, NativeDocument, NativeFolder, QueryOptions, QueryResults, RepositoryObject,
    RepositorySession, Result,
};

use super::FileRepository;

/// Session on a [`FileRepository`]. Reads go straight to memory; writes are committed to disk
/// and rolled back when that fails.
#[derive(Debug)]
pub struct FileSession {
    inner: Arc<dyn RepositorySession>,
    repository: FileRepository,
}

impl FileSession {
    pub(crate) fn new(inner: Arc<dyn RepositorySession>, repository: FileRepository) -> Self {
        FileSession { inner, repository }
    }
}

#[async_trait]
impl RepositorySession for FileSession {
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
        self.repository.commit(self.inner.create_folder(parent_id, name)).await
    }

    async fn create_document(
        &self,
        parent_id: &ObjectId,
        name: &str,
        content: Option<ContentStream>,
    ) -> Result<NativeDocument> {
        self.repository.commit(self.inner.create_document(parent_id, name, content)).await
    }

    async fn delete_object(&self, id: &ObjectId, all_versions: bool) -> Result<()> {
        self.repository.commit(self.inner.delete_object(id, all_versions)).await
    }

    async fn delete_tree(&self, folder_id: &ObjectId) -> Result<()> {
        self.repository.commit(self.inner.delete_tree(folder_id)).await
    }

    async fn query(&self, statement: &str, options: &QueryOptions) -> Result<QueryResults> {
        self.inner.query(statement, options).await
    }

    async fn check_out(&self, document_id: &ObjectId) -> Result<ObjectId> {
        self.repository.commit(self.inner.check_out(document_id)).await
    }

    async fn check_in(&self, working_copy_id: &ObjectId, check_in: CheckIn) -> Result<ObjectId> {
        self.repository.commit(self.inner.check_in(working_copy_id, check_in)).await
    }

    async fn cancel_check_out(&self, working_copy_id: &ObjectId) -> Result<()> {
        self.repository.commit(self.inner.cancel_check_out(working_copy_id)).await
    }

    async fn get_content_stream(&self, document_id: &ObjectId) -> Result<Option<ContentStream>> {
        self.inner.get_content_stream(document_id).await
    }

    async fn set_content_stream(&self, document_id: &ObjectId, content: ContentStream, overwrite: bool) -> Result<()> {
        self.repository.commit(self.inner.set_content_stream(document_id, content, overwrite)).await
    }

    async fn get_all_versions(&self, document_id: &ObjectId) -> Result<Vec<NativeDocument>> {
        self.inner.get_all_versions(document_id).await
    }

    async fn get_latest_version(&self, document_id: &ObjectId) -> Result<NativeDocument> {
        self.inner.get_latest_version(document_id).await
    }

    async fn add_object_to_folder(&self, object_id: &ObjectId, folder_id: &ObjectId) -> Result<()> {
        self.repository.commit(self.inner.add_object_to_folder(object_id, folder_id)).await
    }

    fn invalidate(&self) {
        self.inner.invalidate()
    }
}
