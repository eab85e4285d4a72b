use anyhow::Result;
use clap::Parser;
use folio::cli::{Cli, Commands};
use folio::{AppContext, Output, commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let cx = AppContext::new(cli.store, cli.user, cli.password, Output { json: cli.json });

    match cli.command {
        Commands::Folder(args) => commands::handle_folder(args, &cx).await?,
        Commands::Doc(args) => commands::handle_doc(args, &cx).await?,
        Commands::Search(args) => commands::handle_search(args, &cx).await?,
        Commands::Clear => commands::handle_clear(&cx).await?,
    }

    Ok(())
}

/// Flags take precedence over `RUST_LOG`; without either only warnings are shown.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Some("error"),
        (false, 0) => None,
        (false, 1) => Some("info"),
        (false, 2) => Some("debug"),
        (false, _) => Some("trace"),
    };
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
