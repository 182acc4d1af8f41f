//! Bazaar CLI - Database migrations and store management.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! bazaar-cli migrate
//!
//! # Create a store (and its owner, if the phone is new)
//! bazaar-cli store create --phone 01711000000 --subdomain shop1 --name "Shop One"
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage stores
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Create a new store
    Create {
        /// Owner phone number; the owner is created if absent
        #[arg(short, long)]
        phone: String,

        /// Subdomain to claim (3-50 of `a-z`, `0-9`, `-`)
        #[arg(short, long)]
        subdomain: String,

        /// Store display name
        #[arg(short, long)]
        name: String,
    },
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
        Commands::Store { action } => match action {
            StoreAction::Create {
                phone,
                subdomain,
                name,
            } => {
                let id = commands::store::create(&phone, &subdomain, &name).await?;
                tracing::info!("Store {id} is live at {subdomain}.<base domain>");
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_store_create() {
        let cli = Cli::try_parse_from([
            "bazaar-cli",
            "store",
            "create",
            "--phone",
            "01711000000",
            "--subdomain",
            "shop1",
            "--name",
            "Shop One",
        ]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Store {
                action: StoreAction::Create { .. }
            })
        ));
    }
}
