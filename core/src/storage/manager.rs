use std::fmt;
use std::sync::Arc;

use async_once_cell::OnceCell;
use tracing::{debug, instrument, warn};

use super::config::ManagerConfig;
use super::path_cache::PathCache;
use super::projection::document_from_native;
use super::query::{CompiledQuery, QueryTranslator};
use super::session::{CredentialsProvider, SessionTable};
use super::{Error, Result};
use crate::model::ObjectId;
use crate::repository::{QueryOptions, RepositoryConnector, RepositoryObject, RepositorySession};
use crate::search::{SearchQuery, SearchResult};

/// Facade over a content repository that files documents by process definition and instance.
///
/// A manager owns its sessions and its path cache; neither is shared with other managers.
/// All methods take `&self` and the manager can be shared across tasks behind an [`Arc`].
pub struct DocumentManager {
    connector: Arc<dyn RepositoryConnector>,
    credentials: Arc<dyn CredentialsProvider>,
    config: ManagerConfig,
    pub(super) sessions: SessionTable,
    root_folder_id: OnceCell<ObjectId>,
    pub(super) paths: PathCache,
}

impl fmt::Debug for DocumentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentManager")
            .field("connector", &self.connector)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DocumentManager {
    pub fn new(
        connector: Arc<dyn RepositoryConnector>,
        credentials: Arc<dyn CredentialsProvider>,
        config: ManagerConfig,
    ) -> Self {
        DocumentManager {
            connector,
            credentials,
            config,
            sessions: SessionTable::default(),
            root_folder_id: OnceCell::new(),
            paths: PathCache::default(),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Number of repository sessions currently open.
    pub async fn open_sessions(&self) -> usize {
        self.sessions.len().await
    }

    /// Session of the configured default user.
    pub(super) async fn session(&self) -> Result<Arc<dyn RepositorySession>> {
        self.session_for(&self.config.default_user).await
    }

    pub(super) async fn session_for(&self, user: &str) -> Result<Arc<dyn RepositorySession>> {
        self.sessions
            .get_or_connect(
                self.connector.as_ref(),
                self.credentials.as_ref(),
                &self.config.repository_id,
                user,
            )
            .await
    }

    /// Id of the folder under which process folders live, resolved once from the configured
    /// root path.
    pub(super) async fn root_id(&self, session: &dyn RepositorySession) -> Result<ObjectId> {
        self.root_folder_id
            .get_or_try_init(async {
                let root_path = &self.config.root_path;
                debug!(%root_path, "Resolving root folder");
                let root: Result<ObjectId> = match session.get_object_by_path(root_path).await {
                    Ok(RepositoryObject::Folder(folder)) => Ok(folder.id),
                    Ok(RepositoryObject::Document(_)) => {
                        Err(Error::InvariantViolation(format!("root path {} is not a folder", root_path)))
                    }
                    Err(e) => Err(e.into()),
                };
                root
            })
            .await
            .cloned()
    }

    /// Runs a search and returns one page of hits.
    ///
    /// `total_count` is the number of matches across all pages. A query that names a process
    /// definition or instance whose folder does not exist returns an empty result without
    /// querying the repository.
    #[instrument(skip(self, query))]
    pub async fn search(&self, query: &SearchQuery, offset: usize, limit: usize) -> Result<SearchResult> {
        let session = self.session().await?;
        let root_id = self.root_id(session.as_ref()).await?;
        let translator = QueryTranslator {
            session: session.as_ref(),
            cache: &self.paths,
            root_id: &root_id,
            clock: self.config.server_clock,
        };
        let (statement, all_versions) = match translator.compile(query).await? {
            CompiledQuery::Statement { statement, all_versions } => (statement, all_versions),
            CompiledQuery::Empty => return Ok(SearchResult::empty()),
        };

        let options = QueryOptions { search_all_versions: all_versions, skip: offset, max_items: Some(limit) };
        let results = session.query(&statement, &options).await?;

        let mut documents = Vec::with_capacity(results.rows.len());
        for row in results.rows {
            match session.get_object(&row.object_id).await {
                Ok(RepositoryObject::Document(document)) => documents.push(document_from_native(document)),
                Ok(RepositoryObject::Folder(_)) => warn!(object_id = %row.object_id, "Query returned a folder, skipping"),
                Err(e) if e.is_not_found() => {
                    warn!(object_id = %row.object_id, "Document vanished after matching, skipping")
                }
                Err(e) => return Err(e.into()),
            }
        }
        let total_count = u64::try_from(results.total_count).unwrap_or(0);
        debug!(returned = documents.len(), total_count, "Search complete");
        Ok(SearchResult { documents, total_count })
    }
}
