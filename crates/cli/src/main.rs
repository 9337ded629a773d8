//! Contacts CLI - database migrations and index maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! contacts-cli migrate
//!
//! # Build missing declared indexes (warn on conflicting data)
//! contacts-cli indexes sync
//!
//! # Same, but fail if existing rows block a unique index
//! contacts-cli indexes sync --strict
//!
//! # Report index state and duplicate rows without changing anything
//! contacts-cli indexes check
//! ```
//!
//! # Environment Variables
//!
//! - `CONTACTS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "contacts-cli")]
#[command(author, version, about = "Contacts API operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect or build the declared indexes
    Indexes {
        #[command(subcommand)]
        action: IndexAction,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Build any declared index that does not exist yet
    Sync {
        /// Fail instead of warning when existing rows block a unique index
        #[arg(long)]
        strict: bool,
    },
    /// Report which indexes exist and which rows would block them
    Check,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Indexes { action } => match action {
            IndexAction::Sync { strict } => commands::indexes::sync(strict).await?,
            IndexAction::Check => commands::indexes::check().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_strict_sync() {
        let cli = Cli::try_parse_from(["contacts-cli", "indexes", "sync", "--strict"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Indexes {
                action: IndexAction::Sync { strict: true }
            })
        ));
    }
}
