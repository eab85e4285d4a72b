//! Domain value objects handed out by the [`DocumentManager`](crate::storage::DocumentManager).
//!
//! These types never reference the repository client: they are plain data produced by the
//! projection layer and are safe to clone, compare and serialize.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod content;

pub use content::Content;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifier assigned by the repository to a folder, a document version or a working copy.
    ObjectId
}

string_id! {
    /// Identifies a process definition. Documents of a definition live under a root-level folder
    /// carrying this value as its name.
    ProcessDefinitionId
}

string_id! {
    /// Identifies a process instance. Its folder is a direct child of the definition folder.
    ProcessInstanceId
}

impl ProcessInstanceId {
    /// Builds the conventional `<definition>--<number>` identifier of the n-th instance of a
    /// process definition.
    pub fn numbered(definition: &ProcessDefinitionId, number: u64) -> Self {
        ProcessInstanceId(format!("{}--{}", definition, number))
    }
}

/// A folder in the repository hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: ObjectId,
    pub name: String,
    /// First parent listed by the repository, `None` for the root folder.
    pub parent_id: Option<ObjectId>,
}

/// One version of a document.
///
/// `id` changes with every version while `version_series_id` stays stable across the whole
/// history of the logical document. The process identifiers are derived from the folder the
/// document is filed in (see [`crate::storage::process_context_from_path`]) and are not stored
/// in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: ObjectId,
    pub name: String,
    /// First parent listed by the repository. Stays the same when the document is later
    /// attached to additional folders.
    pub parent_folder_id: Option<ObjectId>,
    pub author: Option<String>,
    pub last_modified_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_modified_at: Option<DateTime<Utc>>,
    pub is_latest_version: bool,
    pub is_major_version: bool,
    pub version_label: Option<String>,
    pub version_series_id: Option<String>,
    pub content_file_name: Option<String>,
    pub content_mime_type: Option<String>,
    pub content_length: u64,
    pub process_definition_id: Option<ProcessDefinitionId>,
    pub process_instance_id: Option<ProcessInstanceId>,
}

impl Document {
    /// Returns true if the version carries no content bytes.
    pub fn is_empty(&self) -> bool {
        self.content_length == 0
    }
}

/// Where a new document is filed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentTarget {
    /// An existing folder, addressed by id.
    Folder(ObjectId),
    /// The folder of a process definition, or of one of its instances. Missing folders are
    /// created on demand.
    Process {
        definition: ProcessDefinitionId,
        instance: Option<ProcessInstanceId>,
    },
}

impl DocumentTarget {
    pub fn definition(definition: impl Into<ProcessDefinitionId>) -> Self {
        DocumentTarget::Process { definition: definition.into(), instance: None }
    }

    pub fn instance(definition: impl Into<ProcessDefinitionId>, instance: impl Into<ProcessInstanceId>) -> Self {
        DocumentTarget::Process {
            definition: definition.into(),
            instance: Some(instance.into()),
        }
    }
}

impl From<ObjectId> for DocumentTarget {
    fn from(folder_id: ObjectId) -> Self {
        DocumentTarget::Folder(folder_id)
    }
}

impl From<&Folder> for DocumentTarget {
    fn from(folder: &Folder) -> Self {
        DocumentTarget::Folder(folder.id.clone())
    }
}
