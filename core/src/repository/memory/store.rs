use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::query::{Row, Statement, Target, Value};
use crate::model::ObjectId;
use crate::repository::{
    CheckIn, ContentStream, NativeDocument, NativeFolder, ParentRef, QueryOptions, QueryResults,
    QueryRow, RepositoryError, RepositoryObject, Result,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FolderRecord {
    id: ObjectId,
    name: String,
    parent_id: Option<ObjectId>,
    seq: u64,
    created_by: Option<String>,
    creation_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentRecord {
    id: ObjectId,
    name: String,
    series_id: String,
    version_label: String,
    is_major: bool,
    is_private_working_copy: bool,
    seq: u64,
    created_by: Option<String>,
    last_modified_by: Option<String>,
    creation_date: DateTime<Utc>,
    last_modification_date: DateTime<Utc>,
    content: Option<ContentStream>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeriesRecord {
    seq: u64,
    /// Folders the series is filed in, in filing order.
    parents: Vec<ObjectId>,
    /// Oldest first; the last entry is the latest version.
    versions: Vec<ObjectId>,
    checked_out: Option<ObjectId>,
}

/// Complete state of an in-memory repository.
///
/// A `Store` is plain data: it serializes with `serde` so that other backends can persist and
/// reload it. All mutation goes through the owning [`MemorySession`](super::MemorySession).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    root_id: ObjectId,
    next_seq: u64,
    folders: BTreeMap<ObjectId, FolderRecord>,
    documents: BTreeMap<ObjectId, DocumentRecord>,
    series: BTreeMap<String, SeriesRecord>,
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

/// Current time at the millisecond resolution the query language compares at.
fn now() -> DateTime<Utc> {
    let instant = Utc::now();
    instant.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(instant)
}

fn new_id() -> ObjectId {
    ObjectId::new(uuid::Uuid::new_v4().to_string())
}

fn next_label(previous: &str, major: bool) -> String {
    let (maj, min) = previous
        .split_once('.')
        .and_then(|(a, b)| Some((a.parse::<u32>().ok()?, b.parse::<u32>().ok()?)))
        .unwrap_or((1, 0));
    if major { format!("{}.0", maj + 1) } else { format!("{}.{}", maj, min + 1) }
}

fn validate_content(content: &ContentStream) -> Result<()> {
    if let Some(mime_type) = &content.mime_type {
        mime_type
            .parse::<mime::Mime>()
            .map_err(|e| RepositoryError::Constraint(format!("invalid content type '{}': {}", mime_type, e)))?;
    }
    Ok(())
}

impl Store {
    pub fn new() -> Self {
        let root_id = new_id();
        let root = FolderRecord {
            id: root_id.clone(),
            name: String::new(),
            parent_id: None,
            seq: 0,
            created_by: None,
            creation_date: now(),
        };
        Store {
            root_id: root_id.clone(),
            next_seq: 1,
            folders: BTreeMap::from([(root_id, root)]),
            documents: BTreeMap::new(),
            series: BTreeMap::new(),
        }
    }

    pub fn root_id(&self) -> &ObjectId {
        &self.root_id
    }

    fn seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn folder(&self, id: &ObjectId) -> Result<&FolderRecord> {
        self.folders.get(id).ok_or_else(|| RepositoryError::not_found(id))
    }

    fn document(&self, id: &ObjectId) -> Result<&DocumentRecord> {
        self.documents.get(id).ok_or_else(|| RepositoryError::not_found(id))
    }

    fn series_of(&self, document: &DocumentRecord) -> Result<&SeriesRecord> {
        self.series
            .get(&document.series_id)
            .ok_or_else(|| RepositoryError::not_found(&document.series_id))
    }

    fn latest_id(&self, series: &SeriesRecord) -> Option<ObjectId> {
        series.versions.last().cloned()
    }

    fn folder_path(&self, id: &ObjectId) -> String {
        let mut segments = Vec::new();
        let mut current = self.folders.get(id);
        while let Some(folder) = current {
            match &folder.parent_id {
                Some(parent) => {
                    segments.push(folder.name.as_str());
                    current = self.folders.get(parent);
                }
                None => break,
            }
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    fn is_in_tree(&self, folder_id: &ObjectId, ancestor: &str) -> bool {
        let mut current = Some(folder_id);
        while let Some(id) = current {
            if id.as_str() == ancestor {
                return true;
            }
            current = self.folders.get(id).and_then(|f| f.parent_id.as_ref());
        }
        false
    }

    fn native_folder(&self, folder: &FolderRecord) -> NativeFolder {
        NativeFolder {
            id: folder.id.clone(),
            name: folder.name.clone(),
            path: self.folder_path(&folder.id),
            parent_ids: folder.parent_id.iter().cloned().collect(),
        }
    }

    fn native_document(&self, document: &DocumentRecord) -> NativeDocument {
        let series = self.series.get(&document.series_id);
        let parents = series
            .map(|s| {
                s.parents
                    .iter()
                    .map(|id| ParentRef { id: id.clone(), path: self.folder_path(id) })
                    .collect()
            })
            .unwrap_or_default();
        let is_latest_version = !document.is_private_working_copy
            && series.and_then(|s| s.versions.last()) == Some(&document.id);
        NativeDocument {
            id: document.id.clone(),
            name: document.name.clone(),
            parents,
            created_by: document.created_by.clone(),
            last_modified_by: document.last_modified_by.clone(),
            creation_date: Some(document.creation_date),
            last_modification_date: Some(document.last_modification_date),
            is_latest_version,
            is_major_version: document.is_major,
            is_private_working_copy: document.is_private_working_copy,
            version_label: Some(document.version_label.clone()),
            version_series_id: Some(document.series_id.clone()),
            content_stream_file_name: document.content.as_ref().and_then(|c| c.file_name.clone()),
            content_stream_mime_type: document.content.as_ref().and_then(|c| c.mime_type.clone()),
            content_stream_length: document.content.as_ref().map(|c| c.len()).unwrap_or(0),
        }
    }

    pub fn get_object(&self, id: &ObjectId) -> Result<RepositoryObject> {
        if let Some(folder) = self.folders.get(id) {
            return Ok(RepositoryObject::Folder(self.native_folder(folder)));
        }
        Ok(RepositoryObject::Document(self.native_document(self.document(id)?)))
    }

    pub fn get_object_by_path(&self, path: &str) -> Result<RepositoryObject> {
        let mut current = self.root_id.clone();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        for (i, segment) in segments.iter().enumerate() {
            let children = self.children(&current)?;
            let child = children
                .into_iter()
                .find(|c| c.name() == *segment)
                .ok_or_else(|| RepositoryError::not_found(path))?;
            match child {
                RepositoryObject::Folder(f) => current = f.id,
                document if i + 1 == segments.len() => return Ok(document),
                _ => return Err(RepositoryError::not_found(path)),
            }
        }
        self.get_object(&current)
    }

    /// Latest versions of the series filed in `folder_id`, in creation order.
    fn documents_in(&self, folder_id: &ObjectId) -> Vec<&DocumentRecord> {
        let mut series: Vec<&SeriesRecord> =
            self.series.values().filter(|s| s.parents.contains(folder_id)).collect();
        series.sort_by_key(|s| s.seq);
        series
            .into_iter()
            .filter_map(|s| s.versions.last())
            .filter_map(|id| self.documents.get(id))
            .collect()
    }

    pub fn children(&self, folder_id: &ObjectId) -> Result<Vec<RepositoryObject>> {
        self.folder(folder_id)?;
        let mut folders: Vec<&FolderRecord> =
            self.folders.values().filter(|f| f.parent_id.as_ref() == Some(folder_id)).collect();
        folders.sort_by_key(|f| f.seq);
        let mut children: Vec<RepositoryObject> =
            folders.into_iter().map(|f| RepositoryObject::Folder(self.native_folder(f))).collect();
        children.extend(
            self.documents_in(folder_id)
                .into_iter()
                .map(|d| RepositoryObject::Document(self.native_document(d))),
        );
        Ok(children)
    }

    fn ensure_name_free(&self, parent_id: &ObjectId, name: &str) -> Result<()> {
        let taken = self
            .folders
            .values()
            .any(|f| f.parent_id.as_ref() == Some(parent_id) && f.name == name)
            || self.documents_in(parent_id).iter().any(|d| d.name == name);
        if taken {
            return Err(RepositoryError::NameConflict { name: name.to_string(), parent: parent_id.clone() });
        }
        Ok(())
    }

    pub fn create_folder(&mut self, parent_id: &ObjectId, name: &str, user: &str) -> Result<NativeFolder> {
        if name.is_empty() || name.contains('/') {
            return Err(RepositoryError::InvalidArgument(format!("invalid folder name '{}'", name)));
        }
        self.folder(parent_id)?;
        self.ensure_name_free(parent_id, name)?;
        let record = FolderRecord {
            id: new_id(),
            name: name.to_string(),
            parent_id: Some(parent_id.clone()),
            seq: self.seq(),
            created_by: Some(user.to_string()),
            creation_date: now(),
        };
        let id = record.id.clone();
        self.folders.insert(id.clone(), record);
        Ok(self.native_folder(&self.folders[&id]))
    }

    pub fn create_document(
        &mut self,
        parent_id: &ObjectId,
        name: &str,
        content: Option<ContentStream>,
        user: &str,
    ) -> Result<NativeDocument> {
        if name.is_empty() || name.contains('/') {
            return Err(RepositoryError::InvalidArgument(format!("invalid document name '{}'", name)));
        }
        self.folder(parent_id)?;
        self.ensure_name_free(parent_id, name)?;
        if let Some(content) = &content {
            validate_content(content)?;
        }

        let now = now();
        let id = new_id();
        let series_id = uuid::Uuid::new_v4().to_string();
        let seq = self.seq();
        self.series.insert(
            series_id.clone(),
            SeriesRecord { seq, parents: vec![parent_id.clone()], versions: vec![id.clone()], checked_out: None },
        );
        self.documents.insert(
            id.clone(),
            DocumentRecord {
                id: id.clone(),
                name: name.to_string(),
                series_id,
                version_label: "1.0".to_string(),
                is_major: true,
                is_private_working_copy: false,
                seq,
                created_by: Some(user.to_string()),
                last_modified_by: Some(user.to_string()),
                creation_date: now,
                last_modification_date: now,
                content,
            },
        );
        Ok(self.native_document(&self.documents[&id]))
    }

    fn remove_series(&mut self, series_id: &str) {
        if let Some(series) = self.series.remove(series_id) {
            for id in series.versions.iter().chain(series.checked_out.iter()) {
                self.documents.remove(id);
            }
        }
    }

    pub fn delete_object(&mut self, id: &ObjectId, all_versions: bool) -> Result<()> {
        if let Some(folder) = self.folders.get(id) {
            if folder.parent_id.is_none() {
                return Err(RepositoryError::Constraint("the root folder cannot be deleted".into()));
            }
            if !self.children(id)?.is_empty() {
                return Err(RepositoryError::Constraint(format!("folder {} is not empty", id)));
            }
            self.folders.remove(id);
            return Ok(());
        }

        let document = self.document(id)?.clone();
        if document.is_private_working_copy {
            return self.cancel_check_out(id);
        }
        if all_versions {
            self.remove_series(&document.series_id);
            return Ok(());
        }
        let series = self
            .series
            .get_mut(&document.series_id)
            .ok_or_else(|| RepositoryError::not_found(&document.series_id))?;
        series.versions.retain(|v| v != id);
        let emptied = series.versions.is_empty();
        self.documents.remove(id);
        if emptied {
            self.remove_series(&document.series_id);
        }
        Ok(())
    }

    pub fn delete_tree(&mut self, folder_id: &ObjectId) -> Result<()> {
        self.folder(folder_id)?;
        let tree: BTreeSet<ObjectId> = self
            .folders
            .keys()
            .filter(|id| self.is_in_tree(id, folder_id.as_str()))
            .cloned()
            .collect();

        let mut doomed = Vec::new();
        for (series_id, series) in self.series.iter_mut() {
            series.parents.retain(|p| !tree.contains(p));
            if series.parents.is_empty() {
                doomed.push(series_id.clone());
            }
        }
        for series_id in doomed {
            self.remove_series(&series_id);
        }

        let keep_root = self.folders.get(folder_id).is_some_and(|f| f.parent_id.is_none());
        for id in tree {
            if keep_root && &id == folder_id {
                continue;
            }
            self.folders.remove(&id);
        }
        Ok(())
    }

    pub fn check_out(&mut self, document_id: &ObjectId, user: &str) -> Result<ObjectId> {
        let document = self.document(document_id)?;
        let series = self.series_of(document)?;
        if series.checked_out.is_some() {
            return Err(RepositoryError::Constraint(format!(
                "version series {} is already checked out",
                document.series_id
            )));
        }
        let latest_id = self.latest_id(series).ok_or_else(|| RepositoryError::not_found(document_id))?;
        let latest = self.document(&latest_id)?.clone();

        let now = now();
        let working_copy = DocumentRecord {
            id: new_id(),
            is_private_working_copy: true,
            seq: self.seq(),
            last_modified_by: Some(user.to_string()),
            creation_date: now,
            last_modification_date: now,
            ..latest
        };
        let working_copy_id = working_copy.id.clone();
        if let Some(series) = self.series.get_mut(&working_copy.series_id) {
            series.checked_out = Some(working_copy_id.clone());
        }
        self.documents.insert(working_copy_id.clone(), working_copy);
        Ok(working_copy_id)
    }

    fn working_copy(&self, working_copy_id: &ObjectId) -> Result<&DocumentRecord> {
        let working_copy = self.document(working_copy_id)?;
        if !working_copy.is_private_working_copy {
            return Err(RepositoryError::Constraint(format!("{} is not a private working copy", working_copy_id)));
        }
        Ok(working_copy)
    }

    pub fn check_in(&mut self, working_copy_id: &ObjectId, check_in: CheckIn, user: &str) -> Result<ObjectId> {
        let working_copy = self.working_copy(working_copy_id)?;
        if let Some(content) = &check_in.content {
            validate_content(content)?;
        }
        let series = self.series_of(working_copy)?;
        let previous = self
            .latest_id(series)
            .and_then(|id| self.documents.get(&id))
            .map(|d| d.version_label.clone())
            .unwrap_or_else(|| "0.0".to_string());

        let mut version = working_copy.clone();
        let now = now();
        version.id = new_id();
        version.is_private_working_copy = false;
        version.is_major = check_in.major;
        version.version_label = next_label(&previous, check_in.major);
        version.seq = self.seq();
        version.created_by = Some(user.to_string());
        version.last_modified_by = Some(user.to_string());
        version.creation_date = now;
        version.last_modification_date = now;
        if let Some(name) = check_in.name {
            version.name = name;
        }
        if let Some(content) = check_in.content {
            version.content = Some(content);
        }

        let version_id = version.id.clone();
        let series = self
            .series
            .get_mut(&version.series_id)
            .ok_or_else(|| RepositoryError::not_found(&version.series_id))?;
        series.versions.push(version_id.clone());
        series.checked_out = None;
        self.documents.remove(working_copy_id);
        self.documents.insert(version_id.clone(), version);
        Ok(version_id)
    }

    pub fn cancel_check_out(&mut self, working_copy_id: &ObjectId) -> Result<()> {
        let series_id = self.working_copy(working_copy_id)?.series_id.clone();
        if let Some(series) = self.series.get_mut(&series_id) {
            series.checked_out = None;
        }
        self.documents.remove(working_copy_id);
        Ok(())
    }

    pub fn content(&self, document_id: &ObjectId) -> Result<Option<ContentStream>> {
        Ok(self.document(document_id)?.content.clone())
    }

    pub fn set_content(
        &mut self,
        document_id: &ObjectId,
        content: ContentStream,
        overwrite: bool,
        user: &str,
    ) -> Result<()> {
        validate_content(&content)?;
        let document = self
            .documents
            .get_mut(document_id)
            .ok_or_else(|| RepositoryError::not_found(document_id))?;
        if document.content.is_some() && !overwrite {
            return Err(RepositoryError::Constraint(format!("document {} already has content", document_id)));
        }
        document.content = Some(content);
        document.last_modified_by = Some(user.to_string());
        document.last_modification_date = now();
        Ok(())
    }

    pub fn all_versions(&self, document_id: &ObjectId) -> Result<Vec<NativeDocument>> {
        let series = self.series_of(self.document(document_id)?)?;
        Ok(series
            .versions
            .iter()
            .rev()
            .filter_map(|id| self.documents.get(id))
            .map(|d| self.native_document(d))
            .collect())
    }

    pub fn latest_version(&self, document_id: &ObjectId) -> Result<NativeDocument> {
        let series = self.series_of(self.document(document_id)?)?;
        let latest_id = self.latest_id(series).ok_or_else(|| RepositoryError::not_found(document_id))?;
        Ok(self.native_document(self.document(&latest_id)?))
    }

    pub fn add_to_folder(&mut self, object_id: &ObjectId, folder_id: &ObjectId) -> Result<()> {
        self.folder(folder_id)?;
        let document = self.document(object_id)?;
        let name = document.name.clone();
        let series_id = document.series_id.clone();
        if self.series_of(document)?.parents.contains(folder_id) {
            return Ok(());
        }
        self.ensure_name_free(folder_id, &name)?;
        if let Some(series) = self.series.get_mut(&series_id) {
            series.parents.push(folder_id.clone());
        }
        Ok(())
    }

    pub fn query(&self, statement: &str, options: &QueryOptions) -> Result<QueryResults> {
        let statement = Statement::parse(statement).map_err(|e| RepositoryError::Query(e.to_string()))?;
        let mut matches: Vec<(u64, QueryRow)> = match statement.target {
            Target::Folder => self
                .folders
                .values()
                .filter(|f| f.parent_id.is_some())
                .filter(|f| statement.matches(&FolderRow { store: self, folder: f }))
                .map(|f| (f.seq, QueryRow { object_id: f.id.clone(), name: f.name.clone() }))
                .collect(),
            Target::Document => self
                .documents
                .values()
                .filter(|d| !d.is_private_working_copy)
                .filter_map(|d| {
                    let series = self.series.get(&d.series_id)?;
                    let latest = series.versions.last() == Some(&d.id);
                    (options.search_all_versions || latest).then_some((d, series, latest))
                })
                .filter(|(d, series, latest)| {
                    statement.matches(&DocumentRow { store: self, document: d, series, latest: *latest })
                })
                .map(|(d, _, _)| (d.seq, QueryRow { object_id: d.id.clone(), name: d.name.clone() }))
                .collect(),
        };
        matches.sort_by_key(|(seq, _)| *seq);

        let total_count = matches.len() as i64;
        let rows = matches
            .into_iter()
            .skip(options.skip)
            .take(options.max_items.unwrap_or(usize::MAX))
            .map(|(_, row)| row)
            .collect();
        Ok(QueryResults { rows, total_count })
    }
}

struct FolderRow<'a> {
    store: &'a Store,
    folder: &'a FolderRecord,
}

impl Row for FolderRow<'_> {
    fn property(&self, name: &str) -> Value {
        match name {
            "cmis:objectId" => Value::Str(self.folder.id.to_string()),
            "cmis:name" => Value::Str(self.folder.name.clone()),
            "cmis:createdBy" => self.folder.created_by.clone().map(Value::Str).unwrap_or(Value::Null),
            "cmis:creationDate" => Value::Time(self.folder.creation_date),
            "cmis:parentId" => self.folder.parent_id.as_ref().map(|p| Value::Str(p.to_string())).unwrap_or(Value::Null),
            "cmis:path" => Value::Str(self.store.folder_path(&self.folder.id)),
            _ => Value::Null,
        }
    }

    fn in_folder(&self, folder_id: &str) -> bool {
        self.folder.parent_id.as_ref().is_some_and(|p| p.as_str() == folder_id)
    }

    fn in_tree(&self, folder_id: &str) -> bool {
        self.folder.parent_id.as_ref().is_some_and(|p| self.store.is_in_tree(p, folder_id))
    }
}

struct DocumentRow<'a> {
    store: &'a Store,
    document: &'a DocumentRecord,
    series: &'a SeriesRecord,
    latest: bool,
}

impl Row for DocumentRow<'_> {
    fn property(&self, name: &str) -> Value {
        let d = self.document;
        let optional = |v: Option<&String>| v.cloned().map(Value::Str).unwrap_or(Value::Null);
        match name {
            "cmis:objectId" => Value::Str(d.id.to_string()),
            "cmis:name" => Value::Str(d.name.clone()),
            "cmis:createdBy" => optional(d.created_by.as_ref()),
            "cmis:lastModifiedBy" => optional(d.last_modified_by.as_ref()),
            "cmis:creationDate" => Value::Time(d.creation_date),
            "cmis:lastModificationDate" => Value::Time(d.last_modification_date),
            "cmis:isLatestVersion" => Value::Bool(self.latest),
            "cmis:isMajorVersion" => Value::Bool(d.is_major),
            "cmis:versionLabel" => Value::Str(d.version_label.clone()),
            "cmis:versionSeriesId" => Value::Str(d.series_id.clone()),
            "cmis:contentStreamFileName" => optional(d.content.as_ref().and_then(|c| c.file_name.as_ref())),
            "cmis:contentStreamMimeType" => optional(d.content.as_ref().and_then(|c| c.mime_type.as_ref())),
            "cmis:contentStreamLength" => Value::Int(d.content.as_ref().map(|c| c.len() as i64).unwrap_or(0)),
            _ => Value::Null,
        }
    }

    fn in_folder(&self, folder_id: &str) -> bool {
        self.series.parents.iter().any(|p| p.as_str() == folder_id)
    }

    fn in_tree(&self, folder_id: &str) -> bool {
        self.series.parents.iter().any(|p| self.store.is_in_tree(p, folder_id))
    }
}
