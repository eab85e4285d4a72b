mod common;

use std::sync::Arc;

use folio_core::model::{Content, DocumentTarget, ObjectId, ProcessDefinitionId, ProcessInstanceId};
use folio_core::repository::{MemoryRepository, RepositorySession};
use folio_core::storage::{DocumentManager, Error, ManagerConfig, StaticCredentials};

use common::{FailingCheckIn, HiddenFolders, REPOSITORY_ID, manager};

fn text(body: &str) -> Content {
    Content::new(body).file_name("testFile.txt").mime_type("text/plain")
}

#[tokio::test]
async fn duplicate_folder_is_rejected_and_original_survives() {
    let manager = manager();
    let first = manager.create_folder("theFolder", None).await.unwrap();

    let err = manager.create_folder("theFolder", None).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { ref name, .. } if name == "theFolder"));

    let fetched = manager.get_folder(&first.id).await.unwrap();
    assert_eq!(fetched, first);
    assert_eq!(manager.child_folders(&manager.root_folder().await.unwrap().id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn subfolders_and_missing_parents() {
    let manager = manager();
    let parent = manager.create_folder("parent", None).await.unwrap();
    let child = manager.create_folder("child", Some(&parent.id)).await.unwrap();
    assert_eq!(child.parent_id, Some(parent.id.clone()));

    let err = manager.create_folder("orphan", Some(&ObjectId::new("nope"))).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn root_folder_has_no_parent() {
    let manager = manager();
    let root = manager.root_folder().await.unwrap();
    assert_eq!(root.parent_id, None);
}

#[tokio::test]
async fn process_context_is_derived_from_folder_path() {
    let manager = manager();
    let definition = ProcessDefinitionId::new("plop1");
    let instance = ProcessInstanceId::numbered(&definition, 1);

    let doc = manager
        .create_document("theDoc", DocumentTarget::instance(definition.clone(), instance.clone()), Some(text("hello")))
        .await
        .unwrap();
    assert_eq!(doc.process_definition_id, Some(definition.clone()));
    assert_eq!(doc.process_instance_id, Some(instance.clone()));
    assert_eq!(manager.document_path(&doc.id).await.unwrap(), "/plop1/plop1--1/theDoc");

    let reread = manager.get_document(&doc.id).await.unwrap();
    assert_eq!(reread.process_instance_id, Some(instance));
    assert_eq!(reread.content_file_name.as_deref(), Some("testFile.txt"));
    assert_eq!(reread.content_mime_type.as_deref(), Some("text/plain"));
    assert_eq!(reread.content_length, 5);

    // Filed directly under the definition folder: too shallow for a context.
    let shallow = manager.create_document("other", DocumentTarget::definition(definition), None).await.unwrap();
    assert_eq!(shallow.process_definition_id, None);
    assert_eq!(shallow.process_instance_id, None);
}

#[tokio::test]
async fn documents_in_folder_and_duplicates() {
    let manager = manager();
    let folder = manager.create_folder("docs", None).await.unwrap();
    let doc = manager.create_document("theDoc", &folder, Some(text("a"))).await.unwrap();
    assert_eq!(doc.parent_folder_id, Some(folder.id.clone()));
    assert!(doc.is_latest_version);
    assert!(doc.is_major_version);
    assert_eq!(doc.author.as_deref(), Some("SYSTEM"));

    let err = manager.create_document("theDoc", &folder, None).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));

    let err = manager.create_document("x", ObjectId::new("missing"), None).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let listed = manager.child_documents(&folder.id).await.unwrap();
    assert_eq!(listed, vec![doc]);
}

#[tokio::test]
async fn invalid_mime_type_fails_creation() {
    let manager = manager();
    let folder = manager.create_folder("docs", None).await.unwrap();
    let err = manager
        .create_document("bad", &folder, Some(Content::new("x").mime_type("nonsense")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CreationFailed { .. }));
    assert!(manager.child_documents(&folder.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_content_means_no_content() {
    let manager = manager();
    let folder = manager.create_folder("docs", None).await.unwrap();
    let doc = manager.create_document("empty", &folder, Some(Content::new(Vec::new()))).await.unwrap();
    assert!(doc.is_empty());
    assert_eq!(doc.content_file_name, None);
    assert!(manager.get_content(&doc.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_content_replaces_bytes_in_place() {
    let manager = manager();
    let folder = manager.create_folder("docs", None).await.unwrap();
    let doc = manager.create_document("doc", &folder, Some(text("before"))).await.unwrap();

    manager
        .update_content(&doc.id, Content::new("after").file_name("new.txt").mime_type("text/plain"))
        .await
        .unwrap();
    assert_eq!(manager.get_content(&doc.id).await.unwrap(), b"after");
    let updated = manager.get_document(&doc.id).await.unwrap();
    assert_eq!(updated.content_file_name.as_deref(), Some("new.txt"));
    assert_eq!(updated.version_label, doc.version_label);

    let err = manager.update_content(&ObjectId::new("missing"), Content::new("x")).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn new_version_keeps_series_and_name() {
    let manager = manager();
    let folder = manager.create_folder("versions", None).await.unwrap();
    let doc = manager.create_document("theDoc", &folder, Some(text("V1"))).await.unwrap();

    let v2 = manager.create_version(&doc.id, true, Some(text("V2"))).await.unwrap();
    assert_ne!(v2.id, doc.id);
    assert_eq!(v2.name, doc.name);
    assert_eq!(v2.version_series_id, doc.version_series_id);
    assert!(v2.is_latest_version);
    assert_eq!(v2.version_label.as_deref(), Some("2.0"));
    assert_eq!(manager.get_content(&v2.id).await.unwrap(), b"V2");
    assert_eq!(manager.get_content(&doc.id).await.unwrap(), b"V1");

    let versions = manager.get_versions(&doc.id).await.unwrap();
    let ids: Vec<_> = versions.iter().map(|v| v.id.clone()).collect();
    assert_eq!(ids, [v2.id.clone(), doc.id.clone()]);
    assert!(!versions[1].is_latest_version);
}

#[tokio::test]
async fn version_without_content_is_empty() {
    let manager = manager();
    let folder = manager.create_folder("versions", None).await.unwrap();
    let doc = manager.create_document("theDoc", &folder, Some(text("V1"))).await.unwrap();

    let v2 = manager.create_version(&doc.id, false, None).await.unwrap();
    assert_eq!(v2.content_file_name, None);
    assert_eq!(v2.content_mime_type.as_deref(), Some("application/octet-stream"));
    assert!(manager.get_content(&v2.id).await.unwrap().is_empty());
    assert_eq!(v2.version_label.as_deref(), Some("1.1"));
    assert!(!v2.is_major_version);
}

#[tokio::test]
async fn version_of_old_id_derives_from_tip() {
    let manager = manager();
    let folder = manager.create_folder("versions", None).await.unwrap();
    let v1 = manager.create_document("theDoc", &folder, Some(text("V1"))).await.unwrap();
    let v2 = manager.create_version(&v1.id, false, Some(text("V2"))).await.unwrap();
    let v3 = manager.create_version(&v1.id, false, None).await.unwrap();

    let versions = manager.get_versions(&v3.id).await.unwrap();
    assert_eq!(versions.len(), 3);
    assert_eq!(versions[0].id, v3.id);
    assert_eq!(versions[1].id, v2.id);
}

#[tokio::test]
async fn failed_check_in_cancels_check_out() {
    common::init_tracing();
    let connector = Arc::new(FailingCheckIn::new());
    let manager = DocumentManager::new(
        connector.clone(),
        Arc::new(StaticCredentials::new("secret")),
        ManagerConfig::new(REPOSITORY_ID),
    );
    let folder = manager.create_folder("versions", None).await.unwrap();
    let doc = manager.create_document("theDoc", &folder, Some(text("V1"))).await.unwrap();

    let err = manager.create_version(&doc.id, true, Some(text("V2"))).await.unwrap_err();
    assert!(matches!(err, Error::CreationFailed { .. }));
    assert_eq!(connector.cancelled(), 1);

    // Nothing is left checked out and the tip is unchanged.
    let versions = manager.get_versions(&doc.id).await.unwrap();
    assert_eq!(versions.len(), 1);
    let err = manager.create_version(&doc.id, true, None).await.unwrap_err();
    assert!(matches!(err, Error::CreationFailed { .. }));
    assert_eq!(connector.cancelled(), 2);
}

#[tokio::test]
async fn deleted_process_folder_is_recreated() {
    let manager = manager();
    let target = DocumentTarget::instance("def", "def--1");
    let first = manager.create_document("doc1", target.clone(), None).await.unwrap();
    let instance_folder = first.parent_folder_id.clone().unwrap();

    manager.delete_folder(&instance_folder).await.unwrap();
    assert!(matches!(manager.get_document(&first.id).await, Err(Error::NotFound(_))));

    let second = manager.create_document("doc2", target, None).await.unwrap();
    assert_ne!(second.parent_folder_id, Some(instance_folder));
    assert_eq!(second.process_instance_id, Some(ProcessInstanceId::new("def--1")));
}

#[tokio::test]
async fn folders_deleted_out_of_band_are_recreated() {
    common::init_tracing();
    let repository = Arc::new(MemoryRepository::new(REPOSITORY_ID));
    let manager = DocumentManager::new(
        repository.clone(),
        Arc::new(StaticCredentials::new("secret")),
        ManagerConfig::new(REPOSITORY_ID),
    );
    let target = DocumentTarget::instance("def", "def--1");
    manager.create_document("doc1", target.clone(), None).await.unwrap();

    let root = manager.root_folder().await.unwrap();
    let definition_folder = manager.child_folders(&root.id).await.unwrap().remove(0);
    repository.session("intruder").delete_tree(&definition_folder.id).await.unwrap();

    let doc = manager.create_document("doc2", target, None).await.unwrap();
    assert_eq!(doc.process_definition_id, Some(ProcessDefinitionId::new("def")));
    assert_eq!(doc.process_instance_id, Some(ProcessInstanceId::new("def--1")));
    let recreated = manager.child_folders(&root.id).await.unwrap();
    assert_eq!(recreated.len(), 1);
    assert_ne!(recreated[0].id, definition_folder.id);
}

#[tokio::test]
async fn same_instance_id_under_two_definitions() {
    let manager = manager();
    let first = manager
        .create_document("d1", DocumentTarget::instance("defA", "inst"), None)
        .await
        .unwrap();
    let second = manager
        .create_document("d2", DocumentTarget::instance("defB", "inst"), None)
        .await
        .unwrap();

    assert_eq!(first.process_definition_id, Some(ProcessDefinitionId::new("defA")));
    assert_eq!(second.process_definition_id, Some(ProcessDefinitionId::new("defB")));
    assert_eq!(second.process_instance_id, Some(ProcessInstanceId::new("inst")));
    assert_ne!(first.parent_folder_id, second.parent_folder_id);
    assert_eq!(manager.document_path(&second.id).await.unwrap(), "/defB/inst/d2");

    // Going back to the first definition must not reuse the second one's folder.
    let third = manager
        .create_document("d3", DocumentTarget::instance("defA", "inst"), None)
        .await
        .unwrap();
    assert_eq!(third.parent_folder_id, first.parent_folder_id);
}

#[tokio::test]
async fn folder_created_concurrently_is_a_creation_failure() {
    common::init_tracing();
    let connector = Arc::new(HiddenFolders::new("def"));
    let root = connector.repository.snapshot().await.root_id().clone();
    connector.repository.session("other").create_folder(&root, "def").await.unwrap();
    let manager = DocumentManager::new(
        connector.clone(),
        Arc::new(StaticCredentials::new("secret")),
        ManagerConfig::new(REPOSITORY_ID),
    );

    let err = manager
        .create_document("doc", DocumentTarget::definition("def"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CreationFailed { .. }), "unexpected error: {:?}", err);
}

#[tokio::test]
async fn attach_keeps_first_parent() {
    let manager = manager();
    let doc = manager.create_document("doc", DocumentTarget::instance("a", "a--1"), None).await.unwrap();
    let definition = ProcessDefinitionId::new("b");
    let instance = ProcessInstanceId::new("b--1");
    manager.attach_document_to(&definition, Some(&instance), &doc.id).await.unwrap();

    let reread = manager.get_document(&doc.id).await.unwrap();
    assert_eq!(reread.parent_folder_id, doc.parent_folder_id);
    assert_eq!(reread.process_instance_id, Some(ProcessInstanceId::new("a--1")));

    let b_folders = manager.get_folders("b--1").await.unwrap();
    assert_eq!(b_folders.len(), 1);
    let filed = manager.child_documents(&b_folders[0].id).await.unwrap();
    assert_eq!(filed.len(), 1);
    assert_eq!(filed[0].id, doc.id);

    let err = manager.attach_document_to(&definition, None, &ObjectId::new("missing")).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn delete_document_versions() {
    let manager = manager();
    let folder = manager.create_folder("docs", None).await.unwrap();
    let v1 = manager.create_document("doc", &folder, Some(text("V1"))).await.unwrap();
    let v2 = manager.create_version(&v1.id, true, Some(text("V2"))).await.unwrap();

    manager.delete_document(&v2.id, false).await.unwrap();
    let tip = manager.get_document(&v1.id).await.unwrap();
    assert!(tip.is_latest_version);

    let v3 = manager.create_version(&v1.id, true, None).await.unwrap();
    manager.delete_document(&v3.id, true).await.unwrap();
    assert!(matches!(manager.get_document(&v1.id).await, Err(Error::NotFound(_))));
    assert!(matches!(manager.delete_document(&v1.id, true).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn authors_get_their_own_sessions() {
    let manager = manager();
    let target = DocumentTarget::instance("def", "def--1");
    let doc = manager.create_document_as("john", "doc", target, Some(text("V1"))).await.unwrap();
    assert_eq!(doc.author.as_deref(), Some("john"));

    let v2 = manager.create_version_as("jane", &doc.id, false, None).await.unwrap();
    assert_eq!(v2.author.as_deref(), Some("jane"));
    assert_eq!(manager.open_sessions().await, 2);
}

#[tokio::test]
async fn clear_resets_everything() {
    let manager = manager();
    manager.create_folder("f1", None).await.unwrap();
    manager.create_document("doc", DocumentTarget::instance("def", "def--1"), None).await.unwrap();
    assert!(manager.open_sessions().await > 0);

    manager.clear().await.unwrap();
    assert_eq!(manager.open_sessions().await, 0);
    let root = manager.root_folder().await.unwrap();
    assert!(manager.child_folders(&root.id).await.unwrap().is_empty());
    assert!(manager.child_documents(&root.id).await.unwrap().is_empty());

    // Process folders are created afresh after clearing.
    let doc = manager.create_document("doc", DocumentTarget::instance("def", "def--1"), None).await.unwrap();
    assert_eq!(doc.process_instance_id, Some(ProcessInstanceId::new("def--1")));
}

#[tokio::test]
async fn get_folders_finds_by_name_anywhere() {
    let manager = manager();
    let a = manager.create_folder("a", None).await.unwrap();
    let b = manager.create_folder("b", None).await.unwrap();
    manager.create_folder("shared", Some(&a.id)).await.unwrap();
    manager.create_folder("shared", Some(&b.id)).await.unwrap();

    assert_eq!(manager.get_folders("shared").await.unwrap().len(), 2);
    assert!(manager.get_folders("nothing").await.unwrap().is_empty());
}

#[tokio::test]
async fn custom_root_path() {
    common::init_tracing();
    let repository = Arc::new(MemoryRepository::new(REPOSITORY_ID));
    let bootstrap = DocumentManager::new(
        repository.clone(),
        Arc::new(StaticCredentials::new("secret")),
        ManagerConfig::new(REPOSITORY_ID),
    );
    bootstrap.create_folder("bonita", None).await.unwrap();

    let manager = DocumentManager::new(
        repository,
        Arc::new(StaticCredentials::new("secret")),
        ManagerConfig::new(REPOSITORY_ID).root_path("/bonita"),
    );
    let doc = manager.create_document("doc", DocumentTarget::instance("def", "def--1"), None).await.unwrap();
    assert_eq!(manager.document_path(&doc.id).await.unwrap(), "/bonita/def/def--1/doc");
    assert_eq!(doc.process_definition_id, Some(ProcessDefinitionId::new("def")));
    assert_eq!(manager.root_folder().await.unwrap().name, "bonita");
}
