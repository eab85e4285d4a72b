use crate::model::{Document, Folder, ProcessDefinitionId, ProcessInstanceId};
use crate::repository::{NativeDocument, NativeFolder};

/// Derives the process definition and instance a document belongs to from the path of the
/// folder it is filed in.
///
/// The second-to-last path segment is the definition and the last one the instance. Paths
/// with fewer than two segments yield neither, which includes documents filed directly in a
/// definition folder. Deeper paths are read the same way, so a document filed below an
/// instance folder reports that subfolder as its instance.
pub fn process_context_from_path(path: &str) -> (Option<ProcessDefinitionId>, Option<ProcessInstanceId>) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let segments: Vec<&str> = trimmed.split('/').collect();
    match segments.as_slice() {
        [.., definition, instance] => (
            Some(ProcessDefinitionId::new(*definition)),
            Some(ProcessInstanceId::new(*instance)),
        ),
        _ => (None, None),
    }
}

pub(crate) fn folder_from_native(folder: NativeFolder) -> Folder {
    Folder {
        id: folder.id,
        name: folder.name,
        parent_id: folder.parent_ids.into_iter().next(),
    }
}

pub(crate) fn document_from_native(document: NativeDocument) -> Document {
    let first_parent = document.parents.into_iter().next();
    let (process_definition_id, process_instance_id) = first_parent
        .as_ref()
        .map(|parent| process_context_from_path(&parent.path))
        .unwrap_or((None, None));

    Document {
        id: document.id,
        name: document.name,
        parent_folder_id: first_parent.map(|parent| parent.id),
        author: document.created_by,
        last_modified_by: document.last_modified_by,
        created_at: document.creation_date,
        last_modified_at: document.last_modification_date,
        is_latest_version: document.is_latest_version,
        is_major_version: document.is_major_version,
        version_label: document.version_label,
        version_series_id: document.version_series_id,
        content_file_name: document.content_stream_file_name,
        content_mime_type: document.content_stream_mime_type,
        content_length: document.content_stream_length,
        process_definition_id,
        process_instance_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectId;
    use crate::repository::ParentRef;

    fn context(path: &str) -> (Option<String>, Option<String>) {
        let (definition, instance) = process_context_from_path(path);
        (definition.map(|d| d.to_string()), instance.map(|i| i.to_string()))
    }

    #[test]
    fn two_segments_give_definition_and_instance() {
        assert_eq!(context("/def/inst"), (Some("def".into()), Some("inst".into())));
    }

    #[test]
    fn deeper_paths_use_the_last_two_segments() {
        assert_eq!(context("/a/b/c"), (Some("b".into()), Some("c".into())));
    }

    #[test]
    fn shallow_paths_give_nothing() {
        assert_eq!(context("/def"), (None, None));
        assert_eq!(context("/"), (None, None));
        assert_eq!(context(""), (None, None));
    }

    #[test]
    fn document_takes_first_parent() {
        let native = NativeDocument {
            id: ObjectId::new("d1"),
            name: "doc".into(),
            parents: vec![
                ParentRef { id: ObjectId::new("f1"), path: "/def/inst".into() },
                ParentRef { id: ObjectId::new("f2"), path: "/other".into() },
            ],
            created_by: Some("john".into()),
            last_modified_by: None,
            creation_date: None,
            last_modification_date: None,
            is_latest_version: true,
            is_major_version: true,
            is_private_working_copy: false,
            version_label: Some("1.0".into()),
            version_series_id: Some("s1".into()),
            content_stream_file_name: None,
            content_stream_mime_type: None,
            content_stream_length: 0,
        };
        let document = document_from_native(native);
        assert_eq!(document.parent_folder_id, Some(ObjectId::new("f1")));
        assert_eq!(document.author.as_deref(), Some("john"));
        assert_eq!(document.process_definition_id, Some(ProcessDefinitionId::new("def")));
        assert_eq!(document.process_instance_id, Some(ProcessInstanceId::new("inst")));
        assert!(document.is_empty());
    }

    #[test]
    fn folder_without_parents_is_root() {
        let folder = folder_from_native(NativeFolder {
            id: ObjectId::new("root"),
            name: String::new(),
            path: "/".into(),
            parent_ids: vec![],
        });
        assert_eq!(folder.parent_id, None);
    }
}
