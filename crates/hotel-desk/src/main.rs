//! Hotel Desk - staff login and account administration
//!
//! Credentials live in `<data-dir>/credentials.json`; policy and roles in
//! the JSON config next to it.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hotel_auth::{
    accounts::UNKNOWN_ROLE_NAME, auth::LockoutPolicy, AccountStatus, AuthConfig, AuthError,
    AuthService, Identity, JsonFileCredentialStore,
};

/// Credential file name inside the data directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Config file name used when `--config` is not given
const CONFIG_FILE: &str = "auth.json";

/// Hotel Desk - staff authentication for the front desk
#[derive(Parser)]
#[command(name = "hotel-desk")]
#[command(about = "Staff login, lockout and permissions for the hotel front desk")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the credential store
    #[arg(long, default_value = "./hotel_desk_data")]
    data_dir: PathBuf,

    /// Authentication config (defaults to <data-dir>/auth.json)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Credentials of the administrator performing an action
#[derive(Args)]
struct Actor {
    /// Administrator username
    #[arg(long)]
    as_user: String,

    /// Administrator password
    #[arg(long)]
    as_password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config if missing and create the first administrator
    Init {
        #[arg(long)]
        admin_user: String,

        #[arg(long)]
        admin_password: String,
    },

    /// Verify a username and password
    Login {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,
    },

    /// Change a password (own account, or any account as administrator)
    Passwd {
        /// Account whose password changes
        #[arg(long)]
        username: String,

        /// Current password of that account
        #[arg(long)]
        current: String,

        #[arg(long)]
        new_password: String,

        #[arg(long)]
        confirm: String,

        /// Log in as someone else to perform the change
        #[arg(long)]
        as_user: Option<String>,

        #[arg(long, requires = "as_user")]
        as_password: Option<String>,
    },

    /// Check a candidate password against the complexity policy
    CheckPassword {
        #[arg(long)]
        password: String,
    },

    /// Check whether a role holds a permission
    Can {
        #[arg(long)]
        role: i64,

        #[arg(long)]
        permission: String,
    },

    /// Create a staff account
    AddUser {
        #[command(flatten)]
        actor: Actor,

        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        confirm: String,

        /// Role id from the config
        #[arg(long)]
        role: i64,
    },

    /// Block an account for the administrative lock period
    Lock {
        #[command(flatten)]
        actor: Actor,

        #[arg(long)]
        username: String,
    },

    /// Lift a lock and reset the failure counter
    Unlock {
        #[command(flatten)]
        actor: Actor,

        #[arg(long)]
        username: String,
    },

    /// Move an account to another role
    SetRole {
        #[command(flatten)]
        actor: Actor,

        #[arg(long)]
        username: String,

        #[arg(long)]
        role: i64,
    },

    /// List staff accounts
    Users {
        #[command(flatten)]
        actor: Actor,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotel_desk=info,hotel_auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn open_service(cli: &Cli) -> Result<AuthService> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.data_dir.join(CONFIG_FILE));
    let config = AuthConfig::load_or_init(&config_path)
        .with_context(|| format!("loading config from {:?}", config_path))?;

    let store = JsonFileCredentialStore::open(cli.data_dir.join(CREDENTIALS_FILE))
        .with_context(|| format!("opening credential store in {:?}", cli.data_dir))?;

    Ok(AuthService::new(config, Arc::new(store))?)
}

fn login(service: &AuthService, username: &str, password: &str) -> Result<Identity> {
    service.authenticate(username, password).map_err(|e| {
        if let AuthError::AccountLocked {
            remaining_secs: Some(secs),
        } = &e
        {
            return anyhow::anyhow!("{} ({})", e, LockoutPolicy::describe_remaining(*secs));
        }
        anyhow::Error::new(e)
    })
}

fn run(cli: Cli) -> Result<()> {
    let service = open_service(&cli)?;

    match cli.command {
        Commands::Init {
            admin_user,
            admin_password,
        } => {
            let identity = service
                .accounts()
                .bootstrap_admin(&admin_user, &admin_password)?;
            info!("Data directory initialized at {:?}", cli.data_dir);
            println!(
                "Administrator '{}' created (user id {})",
                admin_user.trim(),
                identity.user_id()
            );
        }

        Commands::Login { username, password } => {
            let identity = login(&service, &username, &password)?;
            let role = service
                .role_name(identity.role_id())
                .unwrap_or(UNKNOWN_ROLE_NAME);

            println!("\n=== Welcome, {} ===\n", username);
            println!("User ID: {}", identity.user_id());
            println!("Role:    {} ({})", role, identity.role_id());
            let features: Vec<String> = service
                .visible_features(identity.role_id())
                .iter()
                .map(|f| f.to_string())
                .collect();
            if features.is_empty() {
                println!("Screens: none");
            } else {
                println!("Screens: {}", features.join(", "));
            }
        }

        Commands::Passwd {
            username,
            current,
            new_password,
            confirm,
            as_user,
            as_password,
        } => {
            let actor = match (as_user, as_password) {
                (Some(user), Some(pass)) => login(&service, &user, &pass)?,
                (Some(_), None) => anyhow::bail!("--as-password is required with --as-user"),
                _ => login(&service, &username, &current)?,
            };
            service
                .accounts()
                .change_password(&actor, &username, &current, &new_password, &confirm)?;
            println!("Password changed for '{}'", username);
        }

        Commands::CheckPassword { password } => {
            let check = service.validate_password(&password);
            if check.ok {
                println!("✓ Password meets the policy");
            } else {
                println!("✗ Password does not meet the policy:");
                for message in check.messages() {
                    println!("  - {}", message);
                }
                anyhow::bail!("password rejected");
            }
        }

        Commands::Can { role, permission } => {
            let allowed = service.can(role, &permission);
            let name = service.role_name(role).unwrap_or(UNKNOWN_ROLE_NAME);
            println!(
                "{} ({}) {} '{}'",
                name,
                role,
                if allowed { "may use" } else { "may NOT use" },
                permission
            );
            if !allowed {
                anyhow::bail!("permission denied");
            }
        }

        Commands::AddUser {
            actor,
            username,
            password,
            confirm,
            role,
        } => {
            let admin = login(&service, &actor.as_user, &actor.as_password)?;
            let summary = service
                .accounts()
                .create_account(&admin, &username, &password, &confirm, role)?;
            println!(
                "Created '{}' (user id {}, role {})",
                summary.username, summary.user_id, summary.role_name
            );
        }

        Commands::Lock { actor, username } => {
            let admin = login(&service, &actor.as_user, &actor.as_password)?;
            let until = service.accounts().lock_account(&admin, &username)?;
            println!(
                "'{}' blocked until {}",
                username,
                until.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }

        Commands::Unlock { actor, username } => {
            let admin = login(&service, &actor.as_user, &actor.as_password)?;
            service.accounts().unlock_account(&admin, &username)?;
            println!("'{}' unblocked", username);
        }

        Commands::SetRole {
            actor,
            username,
            role,
        } => {
            let admin = login(&service, &actor.as_user, &actor.as_password)?;
            service.accounts().set_role(&admin, &username, role)?;
            println!(
                "'{}' is now {}",
                username,
                service.role_name(role).unwrap_or(UNKNOWN_ROLE_NAME)
            );
        }

        Commands::Users { actor, json } => {
            let admin = login(&service, &actor.as_user, &actor.as_password)?;
            let accounts = service.accounts().list_accounts(&admin)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&accounts)?);
                return Ok(());
            }

            println!("\n=== Staff Accounts ===\n");
            println!(
                "{:<6} {:<20} {:<14} {:<8} {:<8} Locked until",
                "ID", "Username", "Role", "Status", "Failed"
            );
            println!("{}", "-".repeat(80));
            for account in &accounts {
                let status = match account.status {
                    AccountStatus::Active => "active",
                    AccountStatus::Locked => "locked",
                };
                let until = account
                    .locked_until
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<6} {:<20} {:<14} {:<8} {:<8} {}",
                    account.user_id,
                    account.username,
                    account.role_name,
                    status,
                    account.failed_attempts,
                    until
                );
            }
            println!("\nTotal: {}", accounts.len());
        }
    }

    Ok(())
}
