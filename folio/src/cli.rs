use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

/// Folio: file documents by business process and search them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the document store.
    #[arg(long, global = true, env = "FOLIO_STORE", default_value = "./folio-store")]
    pub store: PathBuf,

    /// User to act as.
    #[arg(long, global = true, env = "FOLIO_USER")]
    pub user: Option<String>,

    /// Repository password.
    #[arg(long, global = true, env = "FOLIO_PASSWORD", hide_env_values = true, default_value = "")]
    pub password: String,

    /// Increase verbosity (use multiple times for more).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage folders.
    Folder(FolderArgs),
    /// Manage documents and their versions.
    Doc(DocArgs),
    /// Search documents.
    Search(SearchArgs),
    /// Delete everything below the root folder.
    Clear,
}

#[derive(Args, Debug)]
pub struct FolderArgs {
    #[command(subcommand)]
    pub command: FolderCommands,
}

#[derive(Subcommand, Debug)]
pub enum FolderCommands {
    /// Create a folder.
    Create {
        name: String,
        /// Parent folder id. Defaults to the root folder.
        #[arg(long)]
        parent: Option<String>,
    },
    /// List the contents of a folder, or every folder with a given name.
    List {
        /// Folder id. Defaults to the root folder.
        folder: Option<String>,
        /// List all folders with this name instead.
        #[arg(long, conflicts_with = "folder")]
        name: Option<String>,
    },
    /// Delete a folder and everything below it.
    Delete { folder: String },
}

/// Where a new document is filed.
#[derive(Args, Debug)]
#[group(required = true, multiple = true)]
pub struct TargetArgs {
    /// Folder id.
    #[arg(long, conflicts_with = "process")]
    pub folder: Option<String>,
    /// Process definition id.
    #[arg(long)]
    pub process: Option<String>,
    /// Process instance id. Requires --process.
    #[arg(long, requires = "process")]
    pub instance: Option<String>,
}

/// Content read from a local file.
#[derive(Args, Debug)]
pub struct ContentArgs {
    /// File to read the content from.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Mime type of the content. Defaults to application/octet-stream.
    #[arg(long, requires = "file")]
    pub mime_type: Option<String>,
    /// File name stored with the content. Defaults to the name of --file.
    #[arg(long, requires = "file")]
    pub file_name: Option<String>,
}

#[derive(Args, Debug)]
pub struct DocArgs {
    #[command(subcommand)]
    pub command: DocCommands,
}

#[derive(Subcommand, Debug)]
pub enum DocCommands {
    /// Create a document in a folder or a process folder.
    Create {
        name: String,
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Show document properties.
    Show { document: String },
    /// Write the content of a document version to stdout or a file.
    Content {
        document: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace the content of a document version in place.
    Update {
        document: String,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// List all versions of a document, newest first.
    Versions { document: String },
    /// Create a new version of a document.
    Version {
        document: String,
        /// Create a major version instead of a minor one.
        #[arg(long)]
        major: bool,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// File an existing document in a process folder as well.
    Attach {
        document: String,
        #[arg(long)]
        process: String,
        #[arg(long)]
        instance: Option<String>,
    },
    /// Delete a document version, or the whole document.
    Delete {
        document: String,
        #[arg(long)]
        all_versions: bool,
    },
    /// Print the repository path of a document.
    Path { document: String },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Document name. Repeat to match any of several names.
    #[arg(long)]
    pub name: Vec<String>,

    /// Content file name.
    #[arg(long)]
    pub file_name: Option<String>,

    /// Author (creating user).
    #[arg(long)]
    pub author: Option<String>,

    /// Document id. Repeat to match any of several ids.
    #[arg(long)]
    pub id: Vec<String>,

    /// Process definition, including its instance folders.
    #[arg(long, conflicts_with = "without_instances")]
    pub process: Option<String>,

    /// Process definition, excluding its instance folders.
    #[arg(long)]
    pub without_instances: Option<String>,

    /// Process instance.
    #[arg(long)]
    pub instance: Option<String>,

    /// Only documents without content.
    #[arg(long, conflicts_with = "not_empty")]
    pub empty: bool,

    /// Only documents with content.
    #[arg(long)]
    pub not_empty: bool,

    /// Created at or after this instant (RFC 3339).
    #[arg(long, requires = "created_to")]
    pub created_from: Option<DateTime<Utc>>,

    /// Created at or before this instant (RFC 3339).
    #[arg(long, requires = "created_from")]
    pub created_to: Option<DateTime<Utc>>,

    /// Number of hits to skip.
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Maximum number of hits to return.
    #[arg(long, short, default_value_t = 20)]
    pub limit: usize,

    /// Search every version, not only the latest.
    #[arg(long, conflicts_with = "latest")]
    pub all_versions: bool,

    /// Require matches to be the latest version of their document.
    #[arg(long)]
    pub latest: bool,
}
