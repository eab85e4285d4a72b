use anyhow::Result;
use tracing::info;

use crate::AppContext;

mod doc;
mod folder;
mod search;

pub use doc::handle_doc;
pub use folder::handle_folder;
pub use search::{build_query, handle_search};

pub async fn handle_clear(cx: &AppContext) -> Result<()> {
    let manager = cx.manager().await?;
    manager.clear().await?;
    info!(store = %cx.store.display(), "Store cleared");
    cx.output.done("Cleared");
    Ok(())
}
