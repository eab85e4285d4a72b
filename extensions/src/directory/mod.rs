//! A repository persisted in a local directory.
//!
//! The whole repository state lives in `<dir>/.folio/store.json`. It is loaded once when the
//! repository is opened and rewritten after every successful mutating call, so a process can
//! stop at any point between calls without losing committed changes. A call whose snapshot
//! cannot be written fails and is undone in memory as well. Only one process should
//! open a directory at a time; concurrent writers overwrite each other's snapshots.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use folio_core::repository::{
    MemoryRepository, RepositoryConnector, RepositoryError, RepositorySession, SessionParameters, Store,
};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};

pub use self::session::FileSession;

mod session;

pub const INTERNAL_DIR_NAME: &str = ".folio";
pub const STORE_FILE_NAME: &str = "store.json";

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Store file is unreadable or malformed: {0}")]
    InvalidStore(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Connector for a directory-backed repository. Clones share state and the store file.
#[derive(Debug, Clone)]
pub struct FileRepository {
    path: PathBuf,
    store_path: PathBuf,
    memory: MemoryRepository,
    write_lock: Arc<Mutex<()>>,
}

impl FileRepository {
    /// Opens the repository stored in `path`, creating the directory and an empty repository
    /// if needed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>, repository_id: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        match fs::metadata(&path).await {
            Ok(meta) if !meta.is_dir() => return Err(Error::NotADirectory(path)),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Creating repository directory");
                fs::create_dir_all(&path).await?;
            }
            Err(e) => return Err(Error::Io(e)),
        }

        let internal_dir = path.join(INTERNAL_DIR_NAME);
        fs::create_dir_all(&internal_dir).await?;
        let store_path = internal_dir.join(STORE_FILE_NAME);

        let (store, fresh) = match fs::read(&store_path).await {
            Ok(bytes) => {
                let store: Store = serde_json::from_slice(&bytes).map_err(|e| {
                    warn!("Failed to parse store file '{}': {}", store_path.display(), e);
                    Error::InvalidStore(store_path.clone())
                })?;
                debug!("Loaded existing store");
                (store, false)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (Store::new(), true),
            Err(e) => return Err(Error::Io(e)),
        };
        if fresh {
            write_store(&store_path, &store).await?;
            debug!("Initialized empty store");
        }

        Ok(FileRepository {
            path,
            store_path,
            memory: MemoryRepository::with_store(repository_id, store),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Directory holding the repository.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repository_id(&self) -> &str {
        self.memory.repository_id()
    }

    /// Runs a mutating repository call and writes the resulting state to disk. When the write
    /// fails, the in-memory state is rolled back so memory and disk stay in step.
    pub(crate) async fn commit<T>(
        &self,
        operation: impl Future<Output = folio_core::repository::Result<T>>,
    ) -> folio_core::repository::Result<T> {
        let _guard = self.write_lock.lock().await;
        let before = self.memory.snapshot().await;
        let value = operation.await?;
        let after = self.memory.snapshot().await;
        if let Err(e) = write_store(&self.store_path, &after).await {
            error!(path = %self.store_path.display(), error = %e, "Failed to persist store, rolling back");
            self.memory.restore(before).await;
            return Err(RepositoryError::Transport(format!("cannot persist store: {}", e)));
        }
        Ok(value)
    }
}

/// Serializes the store next to its destination and renames it into place.
async fn write_store(store_path: &Path, store: &Store) -> Result<()> {
    let content = serde_json::to_vec_pretty(store)?;
    let temp_path = store_path.with_extension("json.tmp");
    fs::write(&temp_path, content).await?;
    fs::rename(&temp_path, store_path).await?;
    debug!("Store written to {}", store_path.display());
    Ok(())
}

#[async_trait]
impl RepositoryConnector for FileRepository {
    async fn connect(
        &self,
        parameters: &SessionParameters,
    ) -> folio_core::repository::Result<Arc<dyn RepositorySession>> {
        let inner = self.memory.connect(parameters).await?;
        Ok(Arc::new(FileSession::new(inner, self.clone())))
    }
}
