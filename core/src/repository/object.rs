use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ObjectId;

/// A parent folder as reported alongside a filed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub id: ObjectId,
    /// Absolute path of the parent folder, `/` for the root.
    pub path: String,
}

/// Folder as returned by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeFolder {
    pub id: ObjectId,
    pub name: String,
    pub path: String,
    /// In repository order. Empty for the root folder.
    pub parent_ids: Vec<ObjectId>,
}

/// One document version (or private working copy) as returned by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeDocument {
    pub id: ObjectId,
    pub name: String,
    /// In repository order; documents can be filed in several folders.
    pub parents: Vec<ParentRef>,
    pub created_by: Option<String>,
    pub last_modified_by: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub last_modification_date: Option<DateTime<Utc>>,
    pub is_latest_version: bool,
    pub is_major_version: bool,
    pub is_private_working_copy: bool,
    pub version_label: Option<String>,
    pub version_series_id: Option<String>,
    pub content_stream_file_name: Option<String>,
    pub content_stream_mime_type: Option<String>,
    pub content_stream_length: u64,
}

impl NativeDocument {
    pub fn first_parent(&self) -> Option<&ParentRef> {
        self.parents.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepositoryObject {
    Folder(NativeFolder),
    Document(NativeDocument),
}

impl RepositoryObject {
    pub fn id(&self) -> &ObjectId {
        match self {
            RepositoryObject::Folder(f) => &f.id,
            RepositoryObject::Document(d) => &d.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RepositoryObject::Folder(f) => &f.name,
            RepositoryObject::Document(d) => &d.name,
        }
    }

    pub fn into_folder(self) -> Option<NativeFolder> {
        match self {
            RepositoryObject::Folder(f) => Some(f),
            RepositoryObject::Document(_) => None,
        }
    }

    pub fn into_document(self) -> Option<NativeDocument> {
        match self {
            RepositoryObject::Document(d) => Some(d),
            RepositoryObject::Folder(_) => None,
        }
    }
}
