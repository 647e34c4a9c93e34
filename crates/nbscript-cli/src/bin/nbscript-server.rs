//! nbscript-server - HTTP endpoint for batch notebook runs.

use std::path::PathBuf;

use clap::Parser;
use nbscript_server::{BatchConfig, CommandTemplate};

#[derive(Parser)]
#[command(name = "nbscript-server")]
#[command(about = "Serve /nbscript/batch for launching notebook runs over HTTP")]
#[command(version)]
struct Cli {
    /// Directory that request paths are relative to
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Host address to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Token required in the Authorization header
    #[arg(long)]
    token: Option<String>,

    /// Return immediately instead of waiting for each run
    #[arg(long = "async")]
    asynchronous: bool,

    /// Command to run: a JSON list or a command line; `{path}` is replaced
    /// by the notebook path, which is appended if absent
    #[arg(long)]
    command: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    nbscript_cli::init_logging(cli.verbose);

    let defaults = BatchConfig::default();
    let config = BatchConfig {
        root: cli.root,
        host: cli.host.unwrap_or(defaults.host),
        port: cli.port.unwrap_or(defaults.port),
        token: cli.token,
        asynchronous: cli.asynchronous,
        command: cli
            .command
            .as_deref()
            .map(CommandTemplate::parse)
            .unwrap_or(defaults.command),
    };

    nbscript_server::serve(config).await?;
    Ok(())
}
