//! gymdesk - terminal front end for a gym-management backend.
//!
//! The backend owns all records and rules; this binary is the
//! administration surface: sign in, browse and edit the member list,
//! register attendances and payments, and maintain the reference catalogs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use gymdesk_client::{ClientConfig, FileSessionStore, GymClient, SessionExpiredHandler};
use gymdesk_common::SortOrder;

mod commands;
mod config;
mod display;
mod form;

use config::CliConfig;
use form::FormPolicy;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Backend base URL (overrides the config file and GYMDESK_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        /// Password (or set GYMDESK_PASSWORD; prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        /// Password (or set GYMDESK_PASSWORD; prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Drop the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Member administration
    Clients {
        #[command(subcommand)]
        command: ClientsCommand,
    },
    /// Reference-data maintenance
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ClientsCommand {
    /// List members, one server-driven page at a time
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Rows per page (server default when omitted)
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(long)]
        sort_by: Option<String>,
        /// ASC or DESC
        #[arg(long)]
        sort_order: Option<SortOrder>,
        /// Free-text filter
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one member in full
    Show { id: i64 },
    /// Create a member through the interactive form
    Add,
    /// Edit a member through the interactive form
    Edit { id: i64 },
    /// Delete a member
    Remove {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Register an attendance by document number
    Attendance { document_number: String },
    /// Register a fee payment
    Charge {
        id: i64,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        membership: Option<i64>,
        /// YYYY-MM-DD, defaults to today on the backend
        #[arg(long)]
        date: Option<String>,
    },
    /// Show a member's active subscription
    Subscription { id: i64 },
    /// Open a subscription
    Subscribe {
        id: i64,
        #[arg(long)]
        membership: i64,
        /// YYYY-MM-DD, defaults to today on the backend
        #[arg(long)]
        start: Option<String>,
    },
    /// Close the active subscription
    Unsubscribe { id: i64 },
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// List gender options
    Genders,
    /// List blood-type options
    BloodTypes,
    /// List states/provinces
    States,
    /// List training goals
    Goals,
    /// List membership plans
    Memberships,
    /// Add a gender option
    AddGender { name: String },
    /// Add a blood-type option
    AddBloodType { name: String },
    /// Add a state/province
    AddState { name: String },
    /// Add a membership plan
    AddMembership {
        name: String,
        #[arg(long)]
        price: f64,
        /// Duration in days
        #[arg(long)]
        duration: u32,
        #[arg(long)]
        description: Option<String>,
    },
    /// Replace a membership plan
    EditMembership {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: f64,
        /// Duration in days
        #[arg(long)]
        duration: u32,
        #[arg(long)]
        description: Option<String>,
    },
    /// Remove a membership plan
    RemoveMembership { id: i64 },
}

/// Steers the user back to the login entry point when the transport gives
/// up on a session. Quiet during login/register, where a 401 already means
/// "wrong credentials" and the hint would be noise.
struct PrintSessionExpired {
    quiet: bool,
    fired: AtomicBool,
}

impl SessionExpiredHandler for PrintSessionExpired {
    fn session_expired(&self) {
        if !self.quiet && !self.fired.swap(true, Ordering::SeqCst) {
            eprintln!(
                "{} Session expired. Run {} to sign in again.",
                "!".red().bold(),
                "gymdesk login".cyan()
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = CliConfig::load()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
        config.validate()?;
    }

    let policy = FormPolicy {
        minimum_birth_year: config.form.minimum_birth_year,
        require_observation: config.form.require_observation,
    };

    let handler = Arc::new(PrintSessionExpired {
        quiet: matches!(cli.command, Command::Login { .. } | Command::Register { .. }),
        fired: AtomicBool::new(false),
    });
    let gym = GymClient::with_store(
        ClientConfig::new(config.base_url).with_timeout_seconds(config.timeout_seconds),
        Arc::new(FileSessionStore::new()?),
        handler,
    )?;

    match cli.command {
        Command::Login { email, password } => commands::login(&gym, email, password).await,
        Command::Register { email, password } => commands::register(&gym, email, password).await,
        Command::Logout => {
            commands::logout(&gym);
            Ok(())
        }
        Command::Whoami => commands::whoami(&gym).await,
        Command::Clients { command } => {
            commands::require_session(&gym)?;
            match command {
                ClientsCommand::List {
                    page,
                    quantity,
                    sort_by,
                    sort_order,
                    search,
                } => {
                    commands::clients_list(&gym, page, quantity, sort_by, sort_order, search).await
                }
                ClientsCommand::Show { id } => commands::clients_show(&gym, id).await,
                ClientsCommand::Add => commands::clients_add(&gym, policy).await,
                ClientsCommand::Edit { id } => commands::clients_edit(&gym, policy, id).await,
                ClientsCommand::Remove { id, yes } => commands::clients_remove(&gym, id, yes).await,
                ClientsCommand::Attendance { document_number } => {
                    commands::attendance(&gym, document_number).await
                }
                ClientsCommand::Charge {
                    id,
                    amount,
                    membership,
                    date,
                } => commands::charge(&gym, id, amount, membership, date).await,
                ClientsCommand::Subscription { id } => commands::subscription_show(&gym, id).await,
                ClientsCommand::Subscribe {
                    id,
                    membership,
                    start,
                } => commands::subscribe(&gym, id, membership, start).await,
                ClientsCommand::Unsubscribe { id } => commands::unsubscribe(&gym, id).await,
            }
        }
        Command::Catalog { command } => {
            commands::require_session(&gym)?;
            match command {
                CatalogCommand::Genders => commands::catalog_genders(&gym).await,
                CatalogCommand::BloodTypes => commands::catalog_blood_types(&gym).await,
                CatalogCommand::States => commands::catalog_states(&gym).await,
                CatalogCommand::Goals => commands::catalog_goals(&gym).await,
                CatalogCommand::Memberships => commands::catalog_memberships(&gym).await,
                CatalogCommand::AddGender { name } => commands::catalog_add_gender(&gym, name).await,
                CatalogCommand::AddBloodType { name } => {
                    commands::catalog_add_blood_type(&gym, name).await
                }
                CatalogCommand::AddState { name } => commands::catalog_add_state(&gym, name).await,
                CatalogCommand::AddMembership {
                    name,
                    price,
                    duration,
                    description,
                } => commands::catalog_add_membership(&gym, name, price, duration, description).await,
                CatalogCommand::EditMembership {
                    id,
                    name,
                    price,
                    duration,
                    description,
                } => {
                    commands::catalog_edit_membership(&gym, id, name, price, duration, description)
                        .await
                }
                CatalogCommand::RemoveMembership { id } => {
                    commands::catalog_remove_membership(&gym, id).await
                }
            }
        }
    }
}
