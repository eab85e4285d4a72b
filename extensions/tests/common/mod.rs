use std::path::Path;
use std::sync::Arc;

use folio_core::storage::{DocumentManager, ManagerConfig, StaticCredentials};
use folio_extensions::FileRepository;

pub const REPOSITORY_ID: &str = "local";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// Each call opens the directory afresh, as a new process would.
pub async fn open_manager(path: &Path) -> DocumentManager {
    init_tracing();
    let repository = FileRepository::open(path, REPOSITORY_ID)
        .await
        .expect("Failed to open file repository");
    DocumentManager::new(
        Arc::new(repository),
        Arc::new(StaticCredentials::new("secret")),
        ManagerConfig::new(REPOSITORY_ID),
    )
}
