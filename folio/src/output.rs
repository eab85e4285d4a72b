use anyhow::Result;
use folio_core::model::{Document, Folder};
use folio_core::search::SearchResult;
use serde_json::json;

/// Prints command results as text or JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
}

impl Output {
    pub fn folder(&self, folder: &Folder) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(folder)?);
        } else {
            println!("{}", folder_line(folder));
        }
        Ok(())
    }

    pub fn folders(&self, folders: &[Folder]) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(folders)?);
        } else {
            for folder in folders {
                println!("{}", folder_line(folder));
            }
        }
        Ok(())
    }

    pub fn listing(&self, folders: &[Folder], documents: &[Document]) -> Result<()> {
        if self.json {
            let value = json!({ "folders": folders, "documents": documents });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            for folder in folders {
                println!("{}", folder_line(folder));
            }
            for document in documents {
                println!("{}", document_line(document));
            }
        }
        Ok(())
    }

    pub fn document(&self, document: &Document) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(document)?);
            return Ok(());
        }
        println!("ID:             {}", document.id);
        println!("Name:           {}", document.name);
        println!("Version:        {}", document.version_label.as_deref().unwrap_or("-"));
        println!("Latest:         {}", document.is_latest_version);
        println!("Author:         {}", document.author.as_deref().unwrap_or("-"));
        if let Some(created_at) = document.created_at {
            println!("Created:        {}", created_at.to_rfc3339());
        }
        if let Some(modified_at) = document.last_modified_at {
            println!("Modified:       {}", modified_at.to_rfc3339());
        }
        if let Some(parent) = &document.parent_folder_id {
            println!("Folder:         {}", parent);
        }
        if let Some(definition) = &document.process_definition_id {
            println!("Process:        {}", definition);
        }
        if let Some(instance) = &document.process_instance_id {
            println!("Instance:       {}", instance);
        }
        if document.content_length > 0 {
            println!(
                "Content:        {} ({}, {} bytes)",
                document.content_file_name.as_deref().unwrap_or("-"),
                document.content_mime_type.as_deref().unwrap_or("-"),
                document.content_length
            );
        } else {
            println!("Content:        none");
        }
        Ok(())
    }

    pub fn documents(&self, documents: &[Document]) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(documents)?);
        } else {
            for document in documents {
                println!("{}", document_line(document));
            }
        }
        Ok(())
    }

    pub fn search_result(&self, result: &SearchResult, offset: usize) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(result)?);
            return Ok(());
        }
        for document in &result.documents {
            println!("{}", document_line(document));
        }
        let shown = result.documents.len();
        if shown == 0 {
            println!("No matches ({} total)", result.total_count);
        } else {
            println!("Showing {}-{} of {}", offset + 1, offset + shown, result.total_count);
        }
        Ok(())
    }

    pub fn path(&self, path: &str) -> Result<()> {
        if self.json {
            println!("{}", json!({ "path": path }));
        } else {
            println!("{}", path);
        }
        Ok(())
    }

    /// Confirmation for commands that return nothing.
    pub fn done(&self, message: &str) {
        if self.json {
            println!("{}", json!({ "status": "ok", "message": message }));
        } else {
            println!("{}", message);
        }
    }
}

fn folder_line(folder: &Folder) -> String {
    format!("{}  {}/", folder.id, folder.name)
}

fn document_line(document: &Document) -> String {
    format!(
        "{}  {}  v{}{}",
        document.id,
        document.name,
        document.version_label.as_deref().unwrap_or("?"),
        if document.is_latest_version { "" } else { " (old)" }
    )
}
