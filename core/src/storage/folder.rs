use tracing::{debug, instrument, warn};

use super::manager::DocumentManager;
use super::projection::{document_from_native, folder_from_native};
use super::query::string_literal;
use super::{Error, Result};
use crate::model::{Document, Folder, ObjectId};
use crate::repository::{NativeFolder, QueryOptions, RepositoryError, RepositoryObject, RepositorySession};

/// Every folder named `name`, wherever it lives. Folders that disappear between the query and
/// the fetch are skipped.
pub(crate) async fn find_folders(session: &dyn RepositorySession, name: &str) -> Result<Vec<NativeFolder>> {
    let statement = format!("SELECT * FROM cmis:folder WHERE cmis:name = {}", string_literal(name));
    let results = session.query(&statement, &QueryOptions::default()).await?;
    let mut folders = Vec::with_capacity(results.rows.len());
    for row in results.rows {
        match session.get_object(&row.object_id).await {
            Ok(RepositoryObject::Folder(folder)) => folders.push(folder),
            Ok(RepositoryObject::Document(_)) => debug!(object_id = %row.object_id, "Not a folder, skipping"),
            Err(RepositoryError::ObjectNotFound(_)) => {
                debug!(object_id = %row.object_id, "Folder vanished, skipping")
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(folders)
}

async fn get_folder(session: &dyn RepositorySession, folder_id: &ObjectId) -> Result<NativeFolder> {
    session
        .get_object(folder_id)
        .await?
        .into_folder()
        .ok_or_else(|| Error::NotFound(folder_id.to_string()))
}

impl DocumentManager {
    /// Creates a folder under `parent`, or under the root folder when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyExists`] if the parent already has a child with that name,
    /// [`Error::NotFound`] if the parent does not exist.
    #[instrument(skip(self))]
    pub async fn create_folder(&self, name: &str, parent: Option<&ObjectId>) -> Result<Folder> {
        let session = self.session().await?;
        let parent_id = match parent {
            Some(id) => get_folder(session.as_ref(), id).await?.id,
            None => self.root_id(session.as_ref()).await?,
        };
        let folder = session
            .create_folder(&parent_id, name)
            .await
            .map_err(|e| Error::from_creation(format!("cannot create folder '{}'", name), e))?;
        debug!(id = %folder.id, "Folder created");
        Ok(folder_from_native(folder))
    }

    #[instrument(skip(self))]
    pub async fn root_folder(&self) -> Result<Folder> {
        let session = self.session().await?;
        let root_id = self.root_id(session.as_ref()).await?;
        Ok(folder_from_native(get_folder(session.as_ref(), &root_id).await?))
    }

    #[instrument(skip(self))]
    pub async fn get_folder(&self, folder_id: &ObjectId) -> Result<Folder> {
        let session = self.session().await?;
        Ok(folder_from_native(get_folder(session.as_ref(), folder_id).await?))
    }

    /// Subfolders of a folder, in creation order.
    #[instrument(skip(self))]
    pub async fn child_folders(&self, folder_id: &ObjectId) -> Result<Vec<Folder>> {
        let session = self.session().await?;
        let children = session.get_children(folder_id).await?;
        Ok(children
            .into_iter()
            .filter_map(RepositoryObject::into_folder)
            .map(folder_from_native)
            .collect())
    }

    /// Latest versions of the documents filed in a folder, in creation order.
    #[instrument(skip(self))]
    pub async fn child_documents(&self, folder_id: &ObjectId) -> Result<Vec<Document>> {
        let session = self.session().await?;
        let children = session.get_children(folder_id).await?;
        Ok(children
            .into_iter()
            .filter_map(RepositoryObject::into_document)
            .map(document_from_native)
            .collect())
    }

    /// All folders with the given name, anywhere in the repository.
    #[instrument(skip(self))]
    pub async fn get_folders(&self, name: &str) -> Result<Vec<Folder>> {
        let session = self.session().await?;
        let folders = find_folders(session.as_ref(), name).await?;
        Ok(folders.into_iter().map(folder_from_native).collect())
    }

    /// Deletes a folder with everything below it and forgets any process context cached for it.
    #[instrument(skip(self))]
    pub async fn delete_folder(&self, folder_id: &ObjectId) -> Result<()> {
        let session = self.session().await?;
        get_folder(session.as_ref(), folder_id).await?;
        session.delete_tree(folder_id).await?;
        self.paths.evict_folder(folder_id).await;
        Ok(())
    }

    /// Deletes the contents of a folder, keeping the folder itself.
    #[instrument(skip(self))]
    pub async fn clear_folder(&self, folder_id: &ObjectId) -> Result<()> {
        let session = self.session().await?;
        clear_contents(self, session.as_ref(), folder_id).await
    }

    /// Deletes everything below the root folder and resets the manager: cached process folders
    /// are forgotten and all sessions are closed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let session = self.session().await?;
        let root_id = self.root_id(session.as_ref()).await?;
        clear_contents(self, session.as_ref(), &root_id).await?;
        self.paths.clear().await;
        self.sessions.clear().await;
        debug!("Repository cleared");
        Ok(())
    }
}

async fn clear_contents(manager: &DocumentManager, session: &dyn RepositorySession, folder_id: &ObjectId) -> Result<()> {
    let children = session.get_children(folder_id).await?;
    for child in children {
        match child {
            RepositoryObject::Folder(folder) => {
                session.delete_tree(&folder.id).await?;
                manager.paths.evict_folder(&folder.id).await;
            }
            RepositoryObject::Document(document) => match session.delete_object(&document.id, true).await {
                Ok(()) => {}
                // Multi-filed documents may already be gone with an earlier subtree.
                Err(RepositoryError::ObjectNotFound(_)) => {
                    warn!(document_id = %document.id, "Document already deleted")
                }
                Err(e) => return Err(e.into()),
            },
        }
    }
    Ok(())
}
