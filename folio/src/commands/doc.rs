use anyhow::{Context, Result};
use folio_core::model::{Content, DocumentTarget, ObjectId, ProcessDefinitionId, ProcessInstanceId};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::AppContext;
use crate::cli::{ContentArgs, DocArgs, DocCommands, TargetArgs};

pub async fn handle_doc(args: DocArgs, cx: &AppContext) -> Result<()> {
    let manager = cx.manager().await?;
    match args.command {
        DocCommands::Create { name, target, content } => {
            let target = document_target(target)?;
            let content = read_content(content).await?;
            let document = manager.create_document(&name, target, content).await?;
            cx.output.document(&document)
        }
        DocCommands::Show { document } => {
            let document = manager.get_document(&ObjectId::new(document)).await?;
            cx.output.document(&document)
        }
        DocCommands::Content { document, output } => {
            let bytes = manager.get_content(&ObjectId::new(document)).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &bytes)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    debug!(path = %path.display(), bytes = bytes.len(), "Content written");
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&bytes).await?;
                    stdout.flush().await?;
                }
            }
            Ok(())
        }
        DocCommands::Update { document, content } => {
            let id = ObjectId::new(document);
            let content = read_content(content).await?.context("--file is required")?;
            manager.update_content(&id, content).await?;
            cx.output.document(&manager.get_document(&id).await?)
        }
        DocCommands::Versions { document } => {
            let versions = manager.get_versions(&ObjectId::new(document)).await?;
            cx.output.documents(&versions)
        }
        DocCommands::Version { document, major, content } => {
            let content = read_content(content).await?;
            let version = manager.create_version(&ObjectId::new(document), major, content).await?;
            cx.output.document(&version)
        }
        DocCommands::Attach { document, process, instance } => {
            let definition = ProcessDefinitionId::new(process);
            let instance = instance.map(ProcessInstanceId::new);
            manager
                .attach_document_to(&definition, instance.as_ref(), &ObjectId::new(document))
                .await?;
            cx.output.done("Document attached");
            Ok(())
        }
        DocCommands::Delete { document, all_versions } => {
            manager.delete_document(&ObjectId::new(document), all_versions).await?;
            cx.output.done("Document deleted");
            Ok(())
        }
        DocCommands::Path { document } => {
            let path = manager.document_path(&ObjectId::new(document)).await?;
            cx.output.path(&path)
        }
    }
}

fn document_target(args: TargetArgs) -> Result<DocumentTarget> {
    match (args.folder, args.process, args.instance) {
        (Some(folder), None, None) => Ok(DocumentTarget::Folder(ObjectId::new(folder))),
        (None, Some(definition), None) => Ok(DocumentTarget::definition(definition)),
        (None, Some(definition), Some(instance)) => Ok(DocumentTarget::instance(definition, instance)),
        _ => anyhow::bail!("Specify either --folder or --process (with an optional --instance)"),
    }
}

async fn read_content(args: ContentArgs) -> Result<Option<Content>> {
    let Some(path) = args.file else {
        return Ok(None);
    };
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = args
        .file_name
        .or_else(|| path.file_name().map(|name| name.to_string_lossy().into_owned()));

    let mut content = Content::new(bytes);
    if let Some(file_name) = file_name {
        content = content.file_name(file_name);
    }
    if let Some(mime_type) = args.mime_type {
        content = content.mime_type(mime_type);
    }
    Ok(Some(content))
}
