use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use pastebin::commands;
use pastebin::{App, Config};

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve,
    /// Delete every expired paste and exit.
    PurgeExpired,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).await?;
    let app = App::connect(config)
        .await
        .context("failed to connect to database")?;

    match args.command {
        Command::Serve => commands::serve::run(app).await,
        Command::PurgeExpired => commands::purge_expired::run(app).await,
    }
}
