use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_once_cell::OnceCell;
use folio_core::storage::{DocumentManager, ManagerConfig, StaticCredentials};
use folio_extensions::FileRepository;

pub mod cli;
pub mod commands;
pub mod output;

pub use output::Output;

/// Repository id of directory stores opened by the CLI.
pub const REPOSITORY_ID: &str = "local";

pub struct AppContext {
    pub store: PathBuf,
    pub user: Option<String>,
    pub output: Output,
    password: String,
    manager: OnceCell<DocumentManager>,
}

impl AppContext {
    pub fn new(store: PathBuf, user: Option<String>, password: String, output: Output) -> Self {
        AppContext { store, user, output, password, manager: OnceCell::new() }
    }

    /// Opens the store on first use.
    pub async fn manager(&self) -> Result<&DocumentManager> {
        self.manager
            .get_or_try_init(async {
                let repository = FileRepository::open(&self.store, REPOSITORY_ID)
                    .await
                    .with_context(|| format!("Failed to open store at {}", self.store.display()))?;
                let mut config = ManagerConfig::new(REPOSITORY_ID);
                if let Some(user) = &self.user {
                    config = config.default_user(user.as_str());
                }
                Ok::<_, anyhow::Error>(DocumentManager::new(
                    Arc::new(repository),
                    Arc::new(StaticCredentials::new(self.password.as_str())),
                    config,
                ))
            })
            .await
    }
}
