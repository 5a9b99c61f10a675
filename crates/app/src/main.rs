use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use extrato_email::{EmlDirectoryMailbox, MessageFilter};
use extrato_insights::OllamaClient;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod store;

use config::Config;
use store::Store;

#[derive(Parser, Debug)]
#[command(name = "extrato", version, about = "Bank statement intake into a tabular store")]
struct Cli {
    /// Config file (default: platform config dir / config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import every pending statement message from the mailbox
    Sync {
        /// Generate insights afterwards
        #[arg(long)]
        insights: bool,
    },

    /// Import one statement CSV
    Import {
        /// Path to the statement export
        csv: PathBuf,
    },

    /// Summarize stored transactions with the language model
    Insights,

    /// Write a default config file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Command::InitConfig = cli.command {
        let path = match cli.config {
            Some(p) => p,
            None => config::default_config_path()?,
        };
        if config::init_config(&path)? {
            println!("Wrote {}", path.display());
        } else {
            println!("Config already exists: {}", path.display());
        }
        return Ok(());
    }

    let cfg = Config::load(cli.config.as_deref())?;
    let rules = commands::rules(&cfg)?;
    let store = Store::open(&cfg).await?;

    match cli.command {
        Command::Sync { insights } => {
            let inbox = cfg.inbox_path()?;
            std::fs::create_dir_all(&inbox)
                .with_context(|| format!("create {}", inbox.display()))?;
            let mailbox = EmlDirectoryMailbox::new(
                inbox,
                MessageFilter::new(&cfg.mailbox.sender, &cfg.mailbox.subject),
            );

            let run = commands::sync_mailbox(&store, &mailbox, &rules, &cfg).await?;
            println!(
                "Messages: {} processed, {} failed | rows: {} appended, {} already present",
                run.processed, run.failed, run.appended, run.skipped
            );

            if insights || cfg.insights.enabled {
                insights_command(&store, &cfg).await?;
            }
        }

        Command::Import { csv } => {
            let report = commands::import_file(&store, &csv, &rules, &cfg).await?;
            println!(
                "Imported {}: {} appended, {} already present, {} negative amounts highlighted",
                csv.display(),
                report.appended,
                report.skipped,
                report.highlighted
            );
        }

        Command::Insights => {
            insights_command(&store, &cfg).await?;
        }

        Command::InitConfig => {}
    }

    Ok(())
}

async fn insights_command(store: &Store, cfg: &Config) -> Result<()> {
    let client = OllamaClient::new(&cfg.insights.base_url, &cfg.insights.model);
    let now = chrono::Local::now().naive_local();
    let text = commands::run_insights(store, &client, cfg, now).await?;
    println!("{text}");
    Ok(())
}
