use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{Error, Result};
use crate::model::{ObjectId, ProcessDefinitionId, ProcessInstanceId};
use crate::repository::{RepositoryError, RepositoryObject, RepositorySession};

/// Maps process definitions and instances to the folders holding their documents.
///
/// Entries are validated with a fetch before use and evicted when the folder is gone. The
/// maps are locked per access only: two callers resolving the same uncached id may both try to
/// create the folder, and the loser gets [`Error::CreationFailed`].
#[derive(Debug, Default)]
pub(crate) struct PathCache {
    definitions: RwLock<HashMap<ProcessDefinitionId, ObjectId>>,
    instances: RwLock<HashMap<ProcessInstanceId, ObjectId>>,
}

enum Lookup {
    Found(ObjectId),
    /// A non-folder object already uses the name.
    Occupied,
    Missing,
}

async fn cached<K: Eq + Hash>(map: &RwLock<HashMap<K, ObjectId>>, key: &K) -> Option<ObjectId> {
    map.read().await.get(key).cloned()
}

/// Returns the cached folder id if it still resolves to a folder (filed under `parent`, when
/// given), evicting it otherwise.
async fn validate<K: Eq + Hash>(
    session: &dyn RepositorySession,
    map: &RwLock<HashMap<K, ObjectId>>,
    key: &K,
    parent: Option<&ObjectId>,
) -> Result<Option<ObjectId>> {
    let Some(folder_id) = cached(map, key).await else {
        return Ok(None);
    };
    match session.get_object(&folder_id).await {
        Ok(RepositoryObject::Folder(folder)) => match parent {
            Some(parent) if folder.parent_ids.first() != Some(parent) => {
                debug!(%folder_id, %parent, "Cached folder belongs to another parent, evicting");
                map.write().await.remove(key);
                Ok(None)
            }
            _ => Ok(Some(folder_id)),
        },
        Ok(RepositoryObject::Document(_)) => {
            warn!(%folder_id, "Cached folder id now refers to a document, evicting");
            map.write().await.remove(key);
            Ok(None)
        }
        Err(RepositoryError::ObjectNotFound(_)) => {
            warn!(%folder_id, "Cached folder no longer exists, evicting");
            map.write().await.remove(key);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

async fn find_child(session: &dyn RepositorySession, parent_id: &ObjectId, name: &str) -> Result<Lookup> {
    let children = session.get_children(parent_id).await?;
    Ok(match children.into_iter().find(|child| child.name() == name) {
        Some(RepositoryObject::Folder(folder)) => Lookup::Found(folder.id),
        Some(RepositoryObject::Document(_)) => Lookup::Occupied,
        None => Lookup::Missing,
    })
}

async fn find_or_create(session: &dyn RepositorySession, parent_id: &ObjectId, name: &str) -> Result<ObjectId> {
    match find_child(session, parent_id, name).await? {
        Lookup::Found(id) => {
            debug!(%id, "Adopting existing folder");
            Ok(id)
        }
        Lookup::Occupied => Err(Error::InvariantViolation(format!(
            "cannot resolve folder '{}' in {}: the name is taken by a document",
            name, parent_id
        ))),
        Lookup::Missing => match session.create_folder(parent_id, name).await {
            Ok(folder) => {
                debug!(id = %folder.id, "Created folder");
                Ok(folder.id)
            }
            Err(e @ RepositoryError::NameConflict { .. }) => Err(Error::CreationFailed {
                reason: format!("folder '{}' was created concurrently", name),
                source: Some(e),
            }),
            Err(e) => Err(Error::from_creation(format!("cannot create folder '{}'", name), e)),
        },
    }
}

impl PathCache {
    #[cfg(test)]
    pub(crate) async fn definition(&self, definition: &ProcessDefinitionId) -> Option<ObjectId> {
        cached(&self.definitions, definition).await
    }

    #[cfg(test)]
    pub(crate) async fn instance(&self, instance: &ProcessInstanceId) -> Option<ObjectId> {
        cached(&self.instances, instance).await
    }

    /// Cached instance folder, if it still exists. The folder may belong to any definition.
    pub(crate) async fn validated_instance(
        &self,
        session: &dyn RepositorySession,
        instance: &ProcessInstanceId,
    ) -> Result<Option<ObjectId>> {
        validate(session, &self.instances, instance, None).await
    }

    /// Returns the folder for a process context, creating the missing levels.
    #[instrument(skip(self, session, root_id))]
    pub(crate) async fn resolve(
        &self,
        session: &dyn RepositorySession,
        root_id: &ObjectId,
        definition: &ProcessDefinitionId,
        instance: Option<&ProcessInstanceId>,
    ) -> Result<ObjectId> {
        let definition_folder = match validate(session, &self.definitions, definition, Some(root_id)).await? {
            Some(id) => id,
            None => {
                let id = find_or_create(session, root_id, definition.as_str()).await?;
                self.definitions.write().await.insert(definition.clone(), id.clone());
                id
            }
        };

        let Some(instance) = instance else {
            return Ok(definition_folder);
        };

        match validate(session, &self.instances, instance, Some(&definition_folder)).await? {
            Some(id) => Ok(id),
            None => {
                let id = find_or_create(session, &definition_folder, instance.as_str()).await?;
                self.instances.write().await.insert(instance.clone(), id.clone());
                Ok(id)
            }
        }
    }

    /// Looks up a definition folder without creating it.
    #[instrument(skip(self, session, root_id))]
    pub(crate) async fn lookup_definition(
        &self,
        session: &dyn RepositorySession,
        root_id: &ObjectId,
        definition: &ProcessDefinitionId,
    ) -> Result<Option<ObjectId>> {
        if let Some(id) = validate(session, &self.definitions, definition, Some(root_id)).await? {
            return Ok(Some(id));
        }
        match find_child(session, root_id, definition.as_str()).await? {
            Lookup::Found(id) => {
                self.definitions.write().await.insert(definition.clone(), id.clone());
                Ok(Some(id))
            }
            Lookup::Occupied | Lookup::Missing => Ok(None),
        }
    }

    /// Records an instance folder found by other means.
    pub(crate) async fn remember_instance(&self, instance: &ProcessInstanceId, folder_id: &ObjectId) {
        self.instances.write().await.insert(instance.clone(), folder_id.clone());
    }

    /// Drops every entry pointing at `folder_id`. Returns how many were removed.
    pub(crate) async fn evict_folder(&self, folder_id: &ObjectId) -> usize {
        let mut removed = 0;
        {
            let mut definitions = self.definitions.write().await;
            let before = definitions.len();
            definitions.retain(|_, id| id != folder_id);
            removed += before - definitions.len();
        }
        {
            let mut instances = self.instances.write().await;
            let before = instances.len();
            instances.retain(|_, id| id != folder_id);
            removed += before - instances.len();
        }
        if removed > 0 {
            debug!(%folder_id, removed, "Evicted path cache entries");
        }
        removed
    }

    pub(crate) async fn clear(&self) {
        self.definitions.write().await.clear();
        self.instances.write().await.clear();
    }
}
