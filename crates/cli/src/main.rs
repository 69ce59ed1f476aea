//! KashPages CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! kp-cli migrate
//!
//! # Grant admin access to a Firebase user
//! kp-cli admin grant --subject 8fKq2x... --profile '{"name": "Burhan"}'
//!
//! # Revoke it again (effective on the user's next request)
//! kp-cli admin revoke --subject 8fKq2x...
//!
//! # List admins
//! kp-cli admin list
//!
//! # Show the latest audit entries
//! kp-cli audit recent --limit 50
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin` - Manage the administrators allow-list
//! - `audit` - Inspect the audit log

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "kp-cli")]
#[command(author, version, about = "KashPages CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the administrators allow-list
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Inspect the audit log
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant admin access to a Firebase user
    Grant {
        /// Firebase user id (`uid`)
        #[arg(short, long)]
        subject: String,

        /// Profile data stored with the grant, as a JSON object
        #[arg(short, long, default_value = "{}")]
        profile: String,
    },
    /// Revoke admin access
    Revoke {
        /// Firebase user id (`uid`)
        #[arg(short, long)]
        subject: String,
    },
    /// List admins
    List,
}

#[derive(Subcommand)]
enum AuditAction {
    /// Show the most recent entries, newest first
    Recent {
        /// Number of entries to show
        #[arg(short, long, default_value_t = 20, value_parser = clap::value_parser!(i64).range(1..=1000))]
        limit: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { subject, profile } => {
                commands::admin::grant(&subject, &profile).await?;
            }
            AdminAction::Revoke { subject } => commands::admin::revoke(&subject).await?,
            AdminAction::List => commands::admin::list().await?,
        },
        Commands::Audit { action } => match action {
            AuditAction::Recent { limit } => commands::audit::recent(limit).await?,
        },
    }
    Ok(())
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
    fn test_grant_profile_defaults_to_empty_object() {
        let cli = Cli::try_parse_from(["kp-cli", "admin", "grant", "--subject", "uid_7"]).unwrap();
        let Commands::Admin {
            action: AdminAction::Grant { subject, profile },
        } = cli.command
        else {
            panic!("expected admin grant");
        };
        assert_eq!(subject, "uid_7");
        assert_eq!(profile, "{}");
    }

    #[test]
    fn test_audit_limit_is_bounded() {
        let cli = Cli::try_parse_from(["kp-cli", "audit", "recent"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Audit {
                action: AuditAction::Recent { limit: 20 }
            }
        ));
        assert!(Cli::try_parse_from(["kp-cli", "audit", "recent", "--limit", "0"]).is_err());
        assert!(Cli::try_parse_from(["kp-cli", "audit", "recent", "--limit", "5000"]).is_err());
    }
}
