use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod auth;
pub mod run;

#[derive(Subcommand)]
enum Command {
    /// Scan today's calendar and send flagged notifications
    Run {
        /// Report what would be sent without contacting any service
        #[arg(long, action, default_value = "false")]
        dry_run: bool,
    },
    /// Perform OAuth authentication and store the credential
    Auth {},
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    match args.command {
        Some(Command::Run { dry_run }) => {
            run::run(dry_run).await?;
        }
        Some(Command::Auth {}) => {
            auth::run().await?;
        }
        None => {}
    }

    Ok(())
}
