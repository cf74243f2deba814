use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use refdrop::config::load_config;
use refdrop::mcp::McpServer;
use refdrop::save::SaveOrchestrator;

/// refdrop - save preprints from open repositories into a local Zotero library
#[derive(Parser, Debug)]
#[command(name = "refdrop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server that captures preprints into a local Zotero library", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (stdio by default)
    Serve {
        /// Serve over HTTP at this address instead of stdio (e.g. 127.0.0.1:8715)
        #[arg(long)]
        http: Option<String>,
    },

    /// Check that the local Zotero instance is reachable
    Status,

    /// List the Zotero collection tree
    Collections,

    /// Extract metadata from a preprint URL without saving
    Extract {
        /// Abstract or PDF page URL
        url: String,
    },

    /// Save a preprint to the Zotero library
    Save {
        /// Abstract or PDF page URL
        url: String,

        /// Target collection: key (e.g. 'C42'), name, or 'Parent/Child' path
        #[arg(long, short)]
        collection: Option<String>,
    },
}

fn init_logging(verbose: u8, stdio_server: bool) {
    let default = match verbose {
        0 => "refdrop=info",
        1 => "refdrop=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // In stdio mode stdout belongs to the MCP transport.
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if stdio_server {
        builder.with_writer(std::io::stderr).init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve { http: None });

    let stdio_server = matches!(command, Commands::Serve { http: None });
    init_logging(cli.verbose, stdio_server);

    let config = load_config(cli.config.as_ref())?;
    let orchestrator = Arc::new(SaveOrchestrator::new(config)?);

    match command {
        Commands::Serve { http } => {
            let server = McpServer::new(orchestrator).map_err(|e| anyhow::anyhow!("{}", e))?;
            match http {
                Some(addr) => {
                    let (bound, handle) = server
                        .run_http(&addr)
                        .await
                        .map_err(|e| anyhow::anyhow!("{}", e))?;
                    tracing::info!(%bound, "MCP server listening");
                    handle.await?;
                }
                None => {
                    server.run().await.map_err(|e| anyhow::anyhow!("{}", e))?;
                }
            }
        }
        Commands::Status => {
            let report = orchestrator.check_status().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Collections => {
            for line in orchestrator.list_collections()? {
                println!("{}", line);
            }
        }
        Commands::Extract { url } => {
            let record = orchestrator.resolve_metadata(&url).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Save { url, collection } => {
            let outcome = orchestrator.save_paper(&url, collection.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
