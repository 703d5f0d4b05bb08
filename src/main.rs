mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    intentbox::observability::init_tracing();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config)?;

    match cli.command {
        Commands::Open(args) => commands::open(config, args).await?,
        Commands::Routes => commands::routes(config)?,
    }

    Ok(())
}
