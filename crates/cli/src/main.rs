//! Chocolatier CLI - Catalog seeding, admin accounts and session migrations.
//!
//! # Usage
//!
//! ```bash
//! # Load the demo catalog into the configured backend
//! chocolatier-cli seed
//!
//! # Create an admin account
//! chocolatier-cli admin create -e owner@example.com -p '...' -n "Head Chocolatier"
//!
//! # Promote an existing customer
//! chocolatier-cli admin promote -e staff@example.com
//!
//! # Create the PostgreSQL session table
//! chocolatier-cli migrate sessions
//!
//! # Verify the backend configuration
//! chocolatier-cli check
//! ```
//!
//! The backend is selected the same way as for the web binaries
//! (`CHOCOLATIER_BACKEND`, `BACKEND_URL`, ...). Against the in-memory backend
//! every change is lost when the command exits.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "chocolatier-cli")]
#[command(author, version, about = "Chocolatier CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the demo catalog (seasons, products, an open purchase cycle)
    Seed {
        /// Seed even if the store already has seasons
        #[arg(long)]
        force: bool,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Load configuration and ping the backend
    Check,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Sign up a new account with the admin role
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Initial password
        #[arg(short, long, env = "CHOCOLATIER_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Give an existing profile the admin role
    Promote {
        /// Email of the existing profile
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Create the session table in `SESSION_DATABASE_URL`
    Sessions,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chocolatier_cli=info,chocolatier_backend=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Seed { force } => commands::seed::demo_catalog(force).await,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                password,
                name,
            } => commands::admin::create(&email, password.into(), name).await,
            AdminAction::Promote { email } => commands::admin::promote(&email).await,
        },
        Commands::Migrate { target } => match target {
            MigrateTarget::Sessions => commands::migrate::sessions().await,
        },
        Commands::Check => commands::check().await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_admin_create() {
        let cli = Cli::try_parse_from([
            "chocolatier-cli",
            "admin",
            "create",
            "--email",
            "owner@example.com",
            "--password",
            "tempered-77",
            "--name",
            "Head Chocolatier",
        ])
        .unwrap();
        let Commands::Admin {
            action: AdminAction::Create { email, name, .. },
        } = cli.command
        else {
            panic!("expected admin create");
        };
        assert_eq!(email, "owner@example.com");
        assert_eq!(name.as_deref(), Some("Head Chocolatier"));
    }

    #[test]
    fn test_parses_seed_force() {
        let cli = Cli::try_parse_from(["chocolatier-cli", "seed", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Seed { force: true }));
    }

    #[test]
    fn test_rejects_unknown_migrate_target() {
        assert!(Cli::try_parse_from(["chocolatier-cli", "migrate", "storefront"]).is_err());
    }
}
