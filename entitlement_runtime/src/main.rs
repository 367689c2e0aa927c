use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{value_parser, Args, Parser, Subcommand};

use entitlement_kernel::access::{EntitlementStatus, Severity};
use entitlement_kernel::clock::SystemClock;
use entitlement_kernel::domain::{
    AccountId, BAG_OPENED, DEFAULT_EXTENSION_DAYS, DEFAULT_HASH_ITERATIONS, DEFAULT_WARNING_DAYS,
};
use entitlement_kernel::event_log::counter_series;
use entitlement_kernel::registry::{DEFAULT_OPERATOR_EMAIL, DEFAULT_OPERATOR_PASSWORD};
use entitlement_kernel::Ledger;
use entitlement_runtime::config::{LedgerConfig, DEFAULT_DATA_DIR};
use entitlement_runtime::file_store::FileStore;
use entitlement_runtime::session::{Session, SharedLedger};
use entitlement_runtime::telemetry;

#[derive(Parser)]
#[command(name = "cafe-ledger")]
#[command(about = "Coffee subscription ledger: entitlements, accounts and supply events", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct GlobalOpts {
    /// Directory holding accounts.json and events.log
    #[arg(long, env = "CAFE_LEDGER_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Days granted per extension
    #[arg(long, env = "CAFE_LEDGER_EXTENSION_DAYS", default_value_t = DEFAULT_EXTENSION_DAYS)]
    extension_days: i64,

    /// Remaining days at or below which a subscription is flagged
    #[arg(long, env = "CAFE_LEDGER_WARNING_DAYS", default_value_t = DEFAULT_WARNING_DAYS)]
    warning_days: i64,

    /// PBKDF2 rounds applied to new and changed passwords
    #[arg(long, env = "CAFE_LEDGER_HASH_ITERATIONS", default_value_t = DEFAULT_HASH_ITERATIONS)]
    hash_iterations: u32,

    /// Email of the operator account created on first start
    #[arg(long, env = "CAFE_LEDGER_OPERATOR_EMAIL", default_value = DEFAULT_OPERATOR_EMAIL)]
    operator_email: String,

    /// Initial password of the bootstrap operator
    #[arg(long, env = "CAFE_LEDGER_OPERATOR_PASSWORD", hide_env_values = true,
          default_value = DEFAULT_OPERATOR_PASSWORD)]
    operator_password: String,

    /// Email to log in with
    #[arg(short, long, env = "CAFE_LEDGER_EMAIL")]
    email: Option<String>,

    /// Password to log in with
    #[arg(short, long, env = "CAFE_LEDGER_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and the bootstrap operator
    Init,
    /// Show the logged-in account's subscription
    Status,
    /// Change the logged-in account's password
    Passwd {
        new_password: String,
        confirmation: String,
    },
    /// List member accounts (operator)
    Members,
    /// Subscription state of every member (operator)
    Overview,
    /// Create a member account (operator)
    Create { email: String, password: String },
    /// Delete an account (operator)
    Delete { id: i64 },
    /// Grant one extension to an account (operator)
    Extend { id: i64 },
    /// Record that a new bag was opened (operator)
    BagOpened,
    /// Record a machine counter reading (operator)
    Counter {
        #[arg(value_parser = value_parser!(i64).range(0..))]
        value: i64,
    },
    /// Supply statistics (operator)
    Report {
        /// Event type to group by week
        #[arg(long, default_value = BAG_OPENED)]
        event_type: String,
        /// Also print every raw event
        #[arg(long)]
        raw: bool,
    },
}

impl GlobalOpts {
    fn config(&self) -> LedgerConfig {
        LedgerConfig {
            data_dir: self.data_dir.clone(),
            extension_days: self.extension_days,
            warning_days: self.warning_days,
            hash_iterations: self.hash_iterations,
            operator_email: self.operator_email.clone(),
            operator_password: self.operator_password.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    telemetry::init_logging();
    let cli = Cli::parse();

    let cfg = cli.global.config();
    cfg.validate().context("invalid configuration")?;

    let store = FileStore::open(&cfg.data_dir)
        .with_context(|| format!("failed to open ledger at {}", cfg.data_dir.display()))?;
    let mut ledger = Ledger::with_clock(store, SystemClock, cfg.policy());
    let created = ledger
        .bootstrap_operator(&cfg.operator_email, &cfg.operator_password)
        .context("failed to bootstrap operator account")?;
    let ledger = SharedLedger::new(ledger);

    if let Commands::Init = cli.command {
        if created {
            println!(
                "Operator {} created. Change its password now.",
                cfg.operator_email
            );
        } else {
            println!("Ledger already initialized at {}", cfg.data_dir.display());
        }
        return Ok(());
    }

    let session = login(&ledger, &cli.global)?;
    let warning_days = cfg.warning_days;

    match cli.command {
        Commands::Init => {}
        Commands::Status => match ledger.status(&session)? {
            Some(status) => print_status(session.email(), &status),
            None => bail!("account no longer exists"),
        },
        Commands::Passwd {
            new_password,
            confirmation,
        } => {
            ledger.change_password(&session, &new_password, &confirmation)?;
            println!("Password updated.");
        }
        Commands::Members => {
            for m in ledger.list_members(&session)? {
                println!(
                    "{:>5}  {:<32}  {}",
                    m.id.0,
                    m.email,
                    m.entitlement_expiry.as_deref().unwrap_or("none")
                );
            }
        }
        Commands::Overview => {
            for row in ledger.member_overview(&session)? {
                println!(
                    "{:<8}  {:<32}  {:<10}  {:>3} days",
                    severity_label(row.severity),
                    row.member.email,
                    row.member.entitlement_expiry.as_deref().unwrap_or("never"),
                    row.days_remaining
                );
            }
            println!(
                "ok: > {} days | warning: <= {} days | critical: expired",
                warning_days, warning_days
            );
        }
        Commands::Create { email, password } => {
            let id = ledger.create_member(&session, &email, &password)?;
            println!("Created {} with id {}", email, id);
        }
        Commands::Delete { id } => {
            ledger.delete_member(&session, AccountId(id))?;
            println!("Account {} deleted.", id);
        }
        Commands::Extend { id } => {
            let until = ledger.extend(&session, AccountId(id))?;
            println!("Subscription of account {} extended until {}", id, until);
        }
        Commands::BagOpened => {
            let id = ledger.record_bag_opened(&session)?;
            println!("Bag opening recorded (event {}).", id);
        }
        Commands::Counter { value } => {
            let id = ledger.record_counter_reading(&session, value)?;
            println!("Counter reading {} recorded (event {}).", value, id);
        }
        Commands::Report { event_type, raw } => {
            let report = ledger.stock_report(&session, &event_type)?;
            if report.weekly.is_empty() {
                println!("No {} events recorded yet.", event_type);
            }
            for week in &report.weekly {
                println!("{}/{}  {}", week.week_start, week.week_end, week.count);
            }
            if let Some((at, value)) = counter_series(&report.events).last() {
                println!("Last counter reading: {} at {}", value, at.format("%Y-%m-%d %H:%M"));
            }
            if raw {
                for e in &report.events {
                    println!(
                        "{:>5}  {}  {:<16}  {}",
                        e.id.0,
                        e.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        e.event_type,
                        e.counter_value.map(|v| v.to_string()).unwrap_or_default()
                    );
                }
            }
        }
    }

    Ok(())
}

fn login(ledger: &SharedLedger<FileStore, SystemClock>, opts: &GlobalOpts) -> anyhow::Result<Session> {
    let (Some(email), Some(password)) = (opts.email.as_deref(), opts.password.as_deref()) else {
        bail!("--email and --password (or CAFE_LEDGER_EMAIL / CAFE_LEDGER_PASSWORD) are required");
    };
    match ledger.login(email, password)? {
        Some(session) => Ok(session),
        None => bail!("wrong email or password"),
    }
}

fn print_status(email: &str, status: &EntitlementStatus) {
    println!("Hello {}", email);
    match status {
        EntitlementStatus::Valid(days) => {
            println!("Subscription valid, {} day(s) left.", days);
        }
        EntitlementStatus::Expired(days) => {
            println!("Subscription expired {} day(s) ago.", days);
        }
        EntitlementStatus::NeverSubscribed => println!("No active subscription."),
        EntitlementStatus::MalformedData(raw) => {
            println!("Stored expiry {:?} is not a valid date. Ask an operator.", raw);
        }
    }
    if status.may_consume() {
        println!("You may take a coffee.");
    } else {
        println!("No coffee for now. Please see an operator.");
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Nominal => "ok",
        Severity::Warning => "warning",
        Severity::Critical => "critical",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use entitlement_kernel::domain::LedgerPolicy;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_library_config() {
        let cli = Cli::try_parse_from(["cafe-ledger", "status"]).unwrap();
        let cfg = cli.global.config();
        let defaults = LedgerConfig::default();
        assert_eq!(cfg.data_dir, defaults.data_dir);
        assert_eq!(cfg.policy(), LedgerPolicy::default());
        assert_eq!(cfg.operator_email, defaults.operator_email);
        assert_eq!(cfg.operator_password, defaults.operator_password);
    }

    #[test]
    fn hash_iterations_flag_reaches_policy() {
        let cli =
            Cli::try_parse_from(["cafe-ledger", "--hash-iterations", "7", "members"]).unwrap();
        assert_eq!(cli.global.config().policy().hash_iterations, 7);
    }
}
