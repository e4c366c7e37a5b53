//! SneakPeak CLI - database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront database migrations
//! sp-cli migrate
//!
//! # Create a user (password from SNEAKPEAK_USER_PASSWORD, else stdin)
//! sp-cli user create -e owner@sneakpeak.shop -n "Shop Owner" -r admin
//!
//! # Change a user's role
//! sp-cli user set-role -e staff@sneakpeak.shop -r seller
//!
//! # Grant a single permission on top of the role defaults
//! sp-cli user grant -e staff@sneakpeak.shop -p users:update
//!
//! # Drop expired entries from the refresh token denylist
//! sp-cli tokens purge
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use sneakpeak_core::{Permission, Role};

mod commands;

#[derive(Parser)]
#[command(name = "sp-cli")]
#[command(author, version, about = "SneakPeak CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage storefront users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Maintain the refresh token denylist
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`customer`, `seller`, `admin`)
        #[arg(short, long, default_value = "customer")]
        role: Role,
    },
    /// Change an existing user's role
    SetRole {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// New role (`customer`, `seller`, `admin`)
        #[arg(short, long)]
        role: Role,
    },
    /// Grant an explicit permission to a user
    Grant {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Permission in `resource:action` form, e.g. `users:update`
        #[arg(short, long)]
        permission: Permission,
    },
}

#[derive(Subcommand)]
enum TokensAction {
    /// Delete revoked refresh tokens that have expired anyway
    Purge,
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sp_cli=info,sneakpeak_storefront=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::User { action } => match action {
            UserAction::Create { email, name, role } => {
                let password = commands::user::read_password(
                    std::env::var(commands::user::PASSWORD_ENV).ok(),
                    std::io::stdin().lock(),
                )?;
                commands::user::create(&email, &name, role, &password).await?;
            }
            UserAction::SetRole { email, role } => {
                commands::user::set_role(&email, role).await?;
            }
            UserAction::Grant { email, permission } => {
                commands::user::grant(&email, permission).await?;
            }
        },
        Commands::Tokens { action } => match action {
            TokensAction::Purge => commands::tokens::purge().await?,
        },
    }
    Ok(())
}
