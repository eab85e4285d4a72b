use tracing::{debug, instrument, warn};

use super::manager::DocumentManager;
use super::projection::document_from_native;
use super::version::{self, VersionRequest};
use super::{Error, Result};
use crate::model::{Content, Document, DocumentTarget, ObjectId, ProcessDefinitionId, ProcessInstanceId};
use crate::repository::{ContentStream, DEFAULT_MIME_TYPE, NativeDocument, RepositorySession};

fn validate_mime_type(mime_type: &str) -> Result<()> {
    mime_type
        .parse::<mime::Mime>()
        .map(|_| ())
        .map_err(|e| Error::creation_failed(format!("invalid mime type '{}': {}", mime_type, e)))
}

/// Converts caller content into a repository stream, defaulting the media type.
pub(crate) fn content_stream(content: Content) -> Result<ContentStream> {
    let mime_type = match content.mime_type {
        Some(mime_type) => {
            validate_mime_type(&mime_type)?;
            mime_type
        }
        None => DEFAULT_MIME_TYPE.to_string(),
    };
    Ok(ContentStream { file_name: content.file_name, mime_type: Some(mime_type), bytes: content.bytes })
}

async fn get_document(session: &dyn RepositorySession, document_id: &ObjectId) -> Result<NativeDocument> {
    session
        .get_object(document_id)
        .await?
        .into_document()
        .ok_or_else(|| Error::NotFound(document_id.to_string()))
}

impl DocumentManager {
    /// Creates a document in a folder or in the folder of a process context.
    ///
    /// Process folders are created on demand. Content with no bytes is treated as no content.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyExists`] if the target folder already holds an object with that name,
    /// [`Error::NotFound`] if a target folder given by id does not exist and
    /// [`Error::CreationFailed`] for an invalid mime type or any other rejection.
    pub async fn create_document(
        &self,
        name: &str,
        target: impl Into<DocumentTarget>,
        content: Option<Content>,
    ) -> Result<Document> {
        let session = self.session().await?;
        self.create_document_in(session.as_ref(), name, target.into(), content).await
    }

    /// Like [`create_document`](Self::create_document), acting as `author`.
    pub async fn create_document_as(
        &self,
        author: &str,
        name: &str,
        target: impl Into<DocumentTarget>,
        content: Option<Content>,
    ) -> Result<Document> {
        let session = self.session_for(author).await?;
        self.create_document_in(session.as_ref(), name, target.into(), content).await
    }

    #[instrument(skip(self, session, content), fields(user = session.user()))]
    async fn create_document_in(
        &self,
        session: &dyn RepositorySession,
        name: &str,
        target: DocumentTarget,
        content: Option<Content>,
    ) -> Result<Document> {
        let stream = match content {
            Some(content) if !content.is_empty() => Some(content_stream(content)?),
            Some(content) => {
                if let Some(mime_type) = &content.mime_type {
                    validate_mime_type(mime_type)?;
                }
                None
            }
            None => None,
        };

        let folder_id = match target {
            DocumentTarget::Folder(id) => id,
            DocumentTarget::Process { definition, instance } => {
                let root_id = self.root_id(session).await?;
                self.paths.resolve(session, &root_id, &definition, instance.as_ref()).await?
            }
        };

        let document = session
            .create_document(&folder_id, name, stream)
            .await
            .map_err(|e| Error::from_creation(format!("cannot create document '{}'", name), e))?;
        debug!(id = %document.id, %folder_id, "Document created");
        Ok(document_from_native(document))
    }

    #[instrument(skip(self))]
    pub async fn get_document(&self, document_id: &ObjectId) -> Result<Document> {
        let session = self.session().await?;
        Ok(document_from_native(get_document(session.as_ref(), document_id).await?))
    }

    /// Content bytes of a document version; empty when it has none.
    #[instrument(skip(self))]
    pub async fn get_content(&self, document_id: &ObjectId) -> Result<Vec<u8>> {
        let session = self.session().await?;
        let document = get_document(session.as_ref(), document_id).await?;
        if document.content_stream_length == 0 {
            return Ok(Vec::new());
        }
        let stream = session.get_content_stream(document_id).await?;
        Ok(stream.map(|s| s.bytes).unwrap_or_default())
    }

    /// Replaces the content of a version in place, without creating a new version.
    #[instrument(skip(self, content))]
    pub async fn update_content(&self, document_id: &ObjectId, content: Content) -> Result<()> {
        let session = self.session().await?;
        get_document(session.as_ref(), document_id).await?;
        let stream = content_stream(content)?;
        session.set_content_stream(document_id, stream, true).await?;
        Ok(())
    }

    /// Creates a new version from the tip of the document's version series.
    ///
    /// Without content the new version has an empty stream of type `application/octet-stream`
    /// and no file name. The name of the document is carried over.
    pub async fn create_version(&self, document_id: &ObjectId, major: bool, content: Option<Content>) -> Result<Document> {
        let session = self.session().await?;
        let version = version::create_version(session.as_ref(), document_id, VersionRequest { major, content }).await?;
        Ok(document_from_native(version))
    }

    /// Like [`create_version`](Self::create_version), acting as `author`.
    pub async fn create_version_as(
        &self,
        author: &str,
        document_id: &ObjectId,
        major: bool,
        content: Option<Content>,
    ) -> Result<Document> {
        let session = self.session_for(author).await?;
        let version = version::create_version(session.as_ref(), document_id, VersionRequest { major, content }).await?;
        Ok(document_from_native(version))
    }

    /// All versions of the document's series, newest first.
    #[instrument(skip(self))]
    pub async fn get_versions(&self, document_id: &ObjectId) -> Result<Vec<Document>> {
        let session = self.session().await?;
        let versions = session.get_all_versions(document_id).await?;
        Ok(versions.into_iter().map(document_from_native).collect())
    }

    /// Files an existing document in the folder of another process context as well. The
    /// document keeps its first parent, so its derived process context does not change.
    ///
    /// # Errors
    ///
    /// Every failure is reported as [`Error::NotFound`] for the document.
    #[instrument(skip(self))]
    pub async fn attach_document_to(
        &self,
        definition: &ProcessDefinitionId,
        instance: Option<&ProcessInstanceId>,
        document_id: &ObjectId,
    ) -> Result<()> {
        let session = self.session().await?;
        let attach = async {
            let root_id = self.root_id(session.as_ref()).await?;
            let folder_id = self.paths.resolve(session.as_ref(), &root_id, definition, instance).await?;
            session.add_object_to_folder(document_id, &folder_id).await?;
            Ok::<_, Error>(())
        };
        attach.await.map_err(|e| {
            warn!(error = %e, "Attaching document failed");
            Error::NotFound(document_id.to_string())
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_document(&self, document_id: &ObjectId, all_versions: bool) -> Result<()> {
        let session = self.session().await?;
        get_document(session.as_ref(), document_id).await?;
        session.delete_object(document_id, all_versions).await?;
        Ok(())
    }

    /// Path of the document through its first parent folder, e.g. `/definition/instance/name`.
    #[instrument(skip(self))]
    pub async fn document_path(&self, document_id: &ObjectId) -> Result<String> {
        let session = self.session().await?;
        let document = get_document(session.as_ref(), document_id).await?;
        let parent = document
            .first_parent()
            .ok_or_else(|| Error::NotFound(format!("parent folder of {}", document_id)))?;
        Ok(format!("{}/{}", parent.path.trim_end_matches('/'), document.name))
    }
}
