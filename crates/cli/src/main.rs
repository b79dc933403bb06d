//! Tillpoint CLI - schema migrations and account provisioning.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migration units
//! tillpoint migrate run
//!
//! # List units and whether they are applied
//! tillpoint migrate status
//!
//! # Run a hand-written upgrade script, skipping already-applied statements
//! tillpoint migrate script upgrade.sql
//!
//! # Create a dashboard account
//! tillpoint user create -u owner -n "Store Owner" -r admin
//! ```
//!
//! # Commands
//!
//! - `migrate run` / `migrate status` - Versioned migrations tracked in `schema_migrations`
//! - `migrate script` - Statement-by-statement script runner
//! - `user create` - Create admin or cashier accounts

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::migrate::{self, DEFAULT_MIGRATIONS_DIR, UnitState};

#[derive(Parser)]
#[command(name = "tillpoint")]
#[command(author, version, about = "Tillpoint CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Manage dashboard accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply pending migration units
    Run {
        /// Directory containing `NNNN_name.sql` units
        #[arg(short, long, default_value = DEFAULT_MIGRATIONS_DIR)]
        dir: PathBuf,
    },
    /// Show applied and pending migration units
    Status {
        /// Directory containing `NNNN_name.sql` units
        #[arg(short, long, default_value = DEFAULT_MIGRATIONS_DIR)]
        dir: PathBuf,
    },
    /// Run a SQL script statement by statement
    Script {
        /// Path to the script
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`admin`, `cashier`)
        #[arg(short, long, default_value = "cashier")]
        role: String,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { action } => match action {
            MigrateAction::Run { dir } => {
                migrate::run(&dir).await?;
            }
            MigrateAction::Status { dir } => print_status(&migrate::status(&dir).await?),
            MigrateAction::Script { file } => {
                migrate::script(&file).await?;
            }
        },
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                name,
                role,
            } => {
                commands::user::create_user(&username, &name, &role).await?;
            }
        },
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_status(units: &[migrate::UnitStatus]) {
    if units.is_empty() {
        println!("No migration units found");
        return;
    }
    for unit in units {
        let state = match &unit.state {
            UnitState::Pending => "pending".to_owned(),
            UnitState::Applied { at } => format!("applied {}", at.format("%Y-%m-%d %H:%M:%S")),
            UnitState::Modified { at } => {
                format!("MODIFIED (applied {})", at.format("%Y-%m-%d %H:%M:%S"))
            }
        };
        println!("{:04}  {:<32} {state}", unit.version, unit.name);
    }
}
