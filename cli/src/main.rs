mod commands;
mod display;
mod setup;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "byoc")]
#[command(about = "CVE lookup service with OSV fix enrichment", long_about = None)]
struct Cli {
    #[arg(short, long, global = true, help = "Extra configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    #[command(about = "Run the HTTP API")]
    Serve(commands::Serve),

    #[command(about = "Look up CVEs for a keyword")]
    Lookup(commands::Lookup),

    #[command(about = "List ecosystems accepted as the package-query default")]
    Ecosystems(commands::Ecosystems),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(cmd) => {
            cmd.run(cli.config.as_deref()).await?;
        }
        Commands::Lookup(cmd) => {
            cmd.run(cli.config.as_deref()).await?;
        }
        Commands::Ecosystems(cmd) => {
            cmd.run();
        }
    }

    Ok(())
}
