use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use leave_client::api::ApiClient;
use leave_client::cache::session::{Session, SessionBuilder};
use leave_client::config::settings::ServiceConfig;
use leave_client::leaves::allowances::Allowances;
use leave_client::leaves::report::{self, parse_choice, ReportFilter};
use leave_client::leaves::types::{parse_day, Leave, LeaveStatus, LeaveType};
use leave_client::leaves::validate::LeaveForm;
use leave_client::leaves::LeaveService;
use leave_client::observability::metrics::get_metrics;
use leave_client::store::{FileStore, KeyValueStore, MemoryStore};
use leave_client::utils::constants::{DEFAULT_CONFIG_PATH, DEFAULT_STORE_DIR, DEFAULT_STORE_FILE};
use leave_client::utils::logging::LogLevel;
use leave_client::utils::{config_loader, logging};
use leave_client::ApiError;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// keep the credential in memory only
    #[arg(long)]
    no_store: bool,
    /// print Prometheus metrics to stderr on exit
    #[arg(long)]
    print_metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scope {
    Me,
    Org,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current user and where the credential came from
    Whoami,
    /// Store a credential for later calls
    Login {
        #[arg(long, env = "LEAVE_TOKEN")]
        token: String,
    },
    /// Forget the stored credential
    Logout,
    /// List own leave requests
    List {
        /// defaults to the credential's email
        #[arg(long)]
        user: Option<String>,
    },
    /// Submit a new leave request
    Submit {
        #[arg(long = "type")]
        leave_type: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        reason: String,
    },
    /// Edit an existing leave request
    Update {
        leave_id: String,
        #[arg(long = "type")]
        leave_type: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        reason: String,
    },
    /// Delete a leave request
    Delete { leave_id: String },
    /// Pending requests awaiting an admin decision
    Pending,
    Approve { leave_id: String },
    Reject { leave_id: String },
    /// Filtered rows with totals and remaining allowance
    Report {
        #[arg(long, value_enum, default_value = "me")]
        scope: Scope,
        #[arg(long, default_value = "approved")]
        status: String,
        #[arg(long = "type", default_value = "all")]
        leave_type: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// org scope only
        #[arg(long)]
        employee: Option<String>,
        /// group org rows per employee
        #[arg(long)]
        summary: bool,
    },
    /// Show or change local day allowances
    Allowance {
        #[arg(long)]
        annual: Option<u32>,
        #[arg(long)]
        sick: Option<u32>,
        #[arg(long)]
        casual: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let service_config = match config_loader::run(&args.config).await {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::run(&service_config, args.log_level) {
        eprintln!("error: {:#}", e);
        return ExitCode::FAILURE;
    }

    // -------------------------------
    // 2. Run the command, one notification line on failure
    // -------------------------------

    let print_metrics = args.print_metrics || service_config.settings.metrics.is_enabled;
    let outcome = run(args, &service_config).await;
    if print_metrics {
        eprint!("{}", get_metrics().await.render());
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ApiError>() {
                Some(ApiError::Validation(errors)) => {
                    eprintln!("error: {}", ApiError::Validation(errors.clone()).user_message());
                    for (field, message) in errors.fields() {
                        eprintln!("  {}: {}", field, message);
                    }
                }
                Some(api_error) => eprintln!("error: {}", api_error.user_message()),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, service_config: &ServiceConfig) -> Result<()> {
    let store = build_store(&args, service_config)?;
    let session = SessionBuilder::from_auth_config(&service_config.auth)
        .store(store.clone())
        .build();
    let client = ApiClient::from_settings(&service_config.settings, service_config.auth.header_style)?;
    let service = LeaveService::new(session.clone(), client);
    info!(command = command_name(&args.command), "leave client starting...");

    match args.command {
        Command::Whoami => whoami(&service).await?,
        Command::Login { token } => {
            let credential = session.set(&token).await.map_err(ApiError::from)?;
            print_json(&json!({ "email": credential.email(), "stored_in": store.name() }))?;
        }
        Command::Logout => {
            session.clear().await;
            println!("logged out");
        }
        Command::List { user } => print_json(&service.my_leaves(user.as_deref()).await?)?,
        Command::Submit { leave_type, start, end, reason } => {
            let form = LeaveForm { leave_type, start_date: start, end_date: end, reason };
            print_json(&service.submit(&form).await?)?;
        }
        Command::Update { leave_id, leave_type, start, end, reason } => {
            let form = LeaveForm { leave_type, start_date: start, end_date: end, reason };
            print_json(&service.update(&leave_id, &form).await?)?;
        }
        Command::Delete { leave_id } => print_json(&service.delete(&leave_id).await?)?,
        Command::Pending => print_json(&service.pending().await?)?,
        Command::Approve { leave_id } => print_json(&service.approve(&leave_id).await?)?,
        Command::Reject { leave_id } => print_json(&service.reject(&leave_id).await?)?,
        Command::Report { scope, status, leave_type, start, end, employee, summary } => {
            let filter = ReportFilter {
                status: parse_choice::<LeaveStatus>(&status)?,
                leave_type: parse_choice::<LeaveType>(&leave_type)?,
                start: start.as_deref().map(parse_date).transpose()?,
                end: end.as_deref().map(parse_date).transpose()?,
                employee: match scope {
                    Scope::Org => employee,
                    Scope::Me => None,
                },
            };
            let rows: Vec<Leave> = match scope {
                Scope::Org => service.org_leaves(&filter).await?,
                Scope::Me => service.own_leaves().await?,
            };
            let kept = filter.apply(&rows);
            let allowances = Allowances::load(&store).await;
            if summary && matches!(scope, Scope::Org) {
                print_json(&report::employee_summary(&kept))?;
            } else {
                print_json(&json!({
                    "rows": kept,
                    "totals": report::totals(&kept, &allowances),
                    "allowances": allowances,
                }))?;
            }
        }
        Command::Allowance { annual, sick, casual } => {
            let mut allowances = Allowances::load(&store).await;
            let changes = [(LeaveType::Annual, annual), (LeaveType::Sick, sick), (LeaveType::Casual, casual)];
            if changes.iter().any(|(_, days)| days.is_some()) {
                for (kind, days) in changes {
                    if let Some(days) = days {
                        allowances.set(kind, days);
                    }
                }
                allowances.save(&store).await?;
            }
            print_json(&allowances)?;
        }
    }
    Ok(())
}

async fn whoami(service: &LeaveService) -> Result<()> {
    let session: &Session = service.session();
    let user = service.current_user().await?;
    print_json(&json!({
        "email": user.email,
        "is_admin": user.is_admin,
        "in_host": session.in_host(),
        "sources": session.chain().kinds().iter().map(|k| k.as_str()).collect::<Vec<_>>(),
    }))
}

fn build_store(args: &Args, service_config: &ServiceConfig) -> Result<Arc<dyn KeyValueStore>> {
    if args.no_store {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path = match &service_config.auth.store_path {
        Some(path) => PathBuf::from(path),
        None => {
            let home = std::env::var_os("HOME").context("HOME is not set, configure auth.store_path")?;
            PathBuf::from(home).join(DEFAULT_STORE_DIR).join(DEFAULT_STORE_FILE)
        }
    };
    debug!(path = %path.display(), "using file store");
    Ok(Arc::new(FileStore::new(path)))
}

fn parse_date(value: &str) -> Result<chrono::NaiveDate> {
    parse_day(value).with_context(|| format!("'{}' is not a YYYY-MM-DD date", value))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Whoami => "whoami",
        Command::Login { .. } => "login",
        Command::Logout => "logout",
        Command::List { .. } => "list",
        Command::Submit { .. } => "submit",
        Command::Update { .. } => "update",
        Command::Delete { .. } => "delete",
        Command::Pending => "pending",
        Command::Approve { .. } => "approve",
        Command::Reject { .. } => "reject",
        Command::Report { .. } => "report",
        Command::Allowance { .. } => "allowance",
    }
}
