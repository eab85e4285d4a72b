use anyhow::Result;
use folio_core::model::ObjectId;

use crate::AppContext;
use crate::cli::{FolderArgs, FolderCommands};

pub async fn handle_folder(args: FolderArgs, cx: &AppContext) -> Result<()> {
    let manager = cx.manager().await?;
    match args.command {
        FolderCommands::Create { name, parent } => {
            let parent = parent.map(ObjectId::new);
            let folder = manager.create_folder(&name, parent.as_ref()).await?;
            cx.output.folder(&folder)
        }
        FolderCommands::List { folder: _, name: Some(name) } => {
            let folders = manager.get_folders(&name).await?;
            cx.output.folders(&folders)
        }
        FolderCommands::List { folder, name: None } => {
            let folder_id = match folder {
                Some(id) => ObjectId::new(id),
                None => manager.root_folder().await?.id,
            };
            let folders = manager.child_folders(&folder_id).await?;
            let documents = manager.child_documents(&folder_id).await?;
            cx.output.listing(&folders, &documents)
        }
        FolderCommands::Delete { folder } => {
            manager.delete_folder(&ObjectId::new(folder)).await?;
            cx.output.done("Folder deleted");
            Ok(())
        }
    }
}
