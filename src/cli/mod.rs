pub mod backup;
pub mod capital;
pub mod clear;
pub mod demo;
pub mod export;
pub mod init;
pub mod recurring;
pub mod report;
pub mod status;
pub mod transactions;

use std::path::PathBuf;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};

use crate::db::DB_FILE;
use crate::error::{FintrackError, Result};
use crate::fmt::money;
use crate::models::{parse_date, Category, TransactionKind};
use crate::recurrence::RecurrenceProcessor;
use crate::reports::Filter;
use crate::repository::SqliteRepository;
use crate::settings::{load_settings, Settings};

/// Split `YYYY-MM` into year and month.
pub(crate) fn parse_month_opt(month: &Option<String>) -> Result<(Option<i32>, Option<u32>)> {
    let Some(m) = month else {
        return Ok((None, None));
    };
    let parsed = m.split_once('-').and_then(|(y, mm)| {
        let year: i32 = y.parse().ok()?;
        let month: u32 = mm.parse().ok()?;
        (1..=12).contains(&month).then_some((year, month))
    });
    match parsed {
        Some((y, mm)) => Ok((Some(y), Some(mm))),
        None => Err(FintrackError::Other(format!(
            "Invalid month: {m} (expected YYYY-MM)"
        ))),
    }
}

pub(crate) fn parse_date_opt(raw: &Option<String>) -> Result<Option<NaiveDate>> {
    raw.as_deref().map(parse_date).transpose()
}

/// Per-invocation state: settings and the instant treated as "now".
pub struct Context {
    pub settings: Settings,
    pub now: NaiveDateTime,
}

impl Context {
    pub fn new(today: Option<&str>) -> Result<Self> {
        let local = Local::now().naive_local();
        let now = match today {
            Some(raw) => parse_date(raw)?.and_time(local.time()),
            None => local,
        };
        Ok(Self {
            settings: load_settings(),
            now,
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// The requested year, defaulting to the current one.
    pub fn year(&self, year: Option<i32>) -> i32 {
        year.unwrap_or_else(|| self.today().year())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.settings.data_dir)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join(DB_FILE)
    }

    /// Open the ledger database, creating the data directory on first use.
    pub fn open_repo(&self) -> Result<SqliteRepository> {
        std::fs::create_dir_all(self.data_dir())?;
        SqliteRepository::open(&self.db_path())
    }

    pub fn processor(&self) -> RecurrenceProcessor {
        RecurrenceProcessor::new(self.settings.enforce_recurring_bounds)
    }

    pub fn money(&self, val: f64) -> String {
        money(val, &self.settings.currency_symbol)
    }
}

#[derive(Parser)]
#[command(
    name = "fintrack",
    version,
    about = "Track income and expenses by year, with monthly recurring transactions."
)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Treat this date as today: YYYY-MM-DD
    #[arg(long, global = true, hide = true)]
    pub today: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up fintrack: choose a data directory and initialize the database.
    Init {
        /// Path for fintrack data (default: ~/Documents/fintrack)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Currency symbol used when printing amounts
        #[arg(long)]
        currency: Option<String>,
        /// Only generate recurring transactions between their start and end dates
        #[arg(long = "enforce-bounds")]
        enforce_bounds: Option<bool>,
    },
    /// Record a new transaction dated today.
    Add {
        /// What the money was for
        description: String,
        /// Non-negative amount
        amount: f64,
        /// income or expense
        #[arg(long = "type")]
        kind: String,
        /// Category tag, e.g. food, rent, salary
        #[arg(long)]
        category: String,
        /// Repeat monthly on this day of the month (1-31)
        #[arg(long = "recurring-day")]
        recurring_day: Option<u32>,
        /// First date the recurrence applies: YYYY-MM-DD
        #[arg(long, requires = "recurring_day")]
        start: Option<String>,
        /// Last date the recurrence applies: YYYY-MM-DD
        #[arg(long, requires = "recurring_day")]
        end: Option<String>,
    },
    /// Change fields of an existing transaction.
    Edit {
        /// Transaction ID (shown in `fintrack list`)
        id: u64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        /// income or expense
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Effective date: YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "recurring-day")]
        recurring_day: Option<u32>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Stop the transaction from recurring
        #[arg(long = "no-recurring", conflicts_with_all = ["recurring_day", "start", "end"])]
        no_recurring: bool,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Delete a transaction (and its recurring template, if any).
    Delete {
        id: u64,
        #[arg(long)]
        year: Option<i32>,
    },
    /// List transactions.
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show the running balance for a year.
    Balance {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Set the starting balance for a year.
    Capital {
        #[arg(allow_negative_numbers = true)]
        amount: f64,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Income, expenses and net per month.
    Summary {
        #[arg(long)]
        year: Option<i32>,
        /// Single month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
    /// Expense totals per category.
    Breakdown {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Export transactions to CSV.
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file (default: <data_dir>/exports/transactions-<year>-<date>.csv)
        #[arg(long)]
        output: Option<String>,
    },
    /// Manage recurring transactions.
    Recurring {
        #[command(subcommand)]
        command: RecurringCommands,
    },
    /// Roll the balance into the initial capital and delete the year's transactions.
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Load sample transactions and recurring templates for the current year.
    Demo,
    /// Back up the database.
    Backup {
        /// Output path (default: <data_dir>/backups/fintrack-YYYYMMDD-HHMMSS.db)
        #[arg(long)]
        output: Option<String>,
    },
    /// Show current database and summary statistics.
    Status,
}

impl Commands {
    /// Commands that read the ledger get the daily recurrence pass first.
    pub fn processes_recurring(&self) -> bool {
        !matches!(
            self,
            Commands::Init { .. }
                | Commands::Backup { .. }
                | Commands::Status
                | Commands::Recurring {
                    command: RecurringCommands::Run
                }
        )
    }
}

#[derive(Subcommand)]
pub enum RecurringCommands {
    /// List recurring templates.
    List {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Generate today's recurring transactions if not already done.
    Run,
}

#[derive(clap::Args, Debug, Default)]
pub struct FilterArgs {
    /// Year: YYYY (default: current year)
    #[arg(long)]
    pub year: Option<i32>,
    /// Month: YYYY-MM
    #[arg(long)]
    pub month: Option<String>,
    /// Start date: YYYY-MM-DD
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// End date: YYYY-MM-DD
    #[arg(long = "to")]
    pub to_date: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    /// income or expense
    #[arg(long = "type")]
    pub kind: Option<String>,
}

impl FilterArgs {
    /// Resolve to the ledger year and a report filter.
    pub fn resolve(&self, ctx: &Context) -> Result<(i32, Filter)> {
        let (month_year, month) = parse_month_opt(&self.month)?;
        let year = ctx.year(self.year.or(month_year));
        let filter = Filter {
            from: parse_date_opt(&self.from_date)?,
            to: parse_date_opt(&self.to_date)?,
            month,
            category: self.category.as_deref().map(str::parse::<Category>).transpose()?,
            kind: self.kind.as_deref().map(str::parse::<TransactionKind>).transpose()?,
        };
        Ok((year, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(today: &str) -> Context {
        Context::new(Some(today)).unwrap()
    }

    #[test]
    fn test_parse_month_opt() {
        assert_eq!(parse_month_opt(&None).unwrap(), (None, None));
        assert_eq!(
            parse_month_opt(&Some("2024-03".to_string())).unwrap(),
            (Some(2024), Some(3))
        );
        assert!(parse_month_opt(&Some("2024-13".to_string())).is_err());
        assert!(parse_month_opt(&Some("March".to_string())).is_err());
    }

    #[test]
    fn test_context_today_override() {
        let c = ctx("2024-03-15");
        assert_eq!(c.today(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(c.year(None), 2024);
        assert_eq!(c.year(Some(2022)), 2022);
        assert!(Context::new(Some("15/03/2024")).is_err());
    }

    #[test]
    fn test_filter_args_resolve() {
        let args = FilterArgs {
            month: Some("2023-07".to_string()),
            category: Some("food".to_string()),
            kind: Some("expense".to_string()),
            ..Default::default()
        };
        let (year, filter) = args.resolve(&ctx("2024-03-15")).unwrap();
        assert_eq!(year, 2023);
        assert_eq!(filter.month, Some(7));
        assert_eq!(filter.category, Some(Category::Food));
        assert_eq!(filter.kind, Some(TransactionKind::Expense));
    }

    #[test]
    fn test_filter_args_rejects_unknown_category() {
        let args = FilterArgs {
            category: Some("yachts".to_string()),
            ..Default::default()
        };
        assert!(args.resolve(&ctx("2024-03-15")).is_err());
    }

    #[test]
    fn test_recurring_run_skips_startup_pass() {
        assert!(!Commands::Recurring { command: RecurringCommands::Run }.processes_recurring());
        assert!(Commands::Balance { year: None }.processes_recurring());
        assert!(!Commands::Status.processes_recurring());
    }

    #[test]
    fn test_cli_parses_add() {
        let cli = Cli::try_parse_from([
            "fintrack", "add", "Gym", "30", "--type", "expense", "--category", "health",
            "--recurring-day", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Add { description, amount, recurring_day, .. } => {
                assert_eq!(description, "Gym");
                assert_eq!(amount, 30.0);
                assert_eq!(recurring_day, Some(5));
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_cli_start_requires_recurring_day() {
        assert!(Cli::try_parse_from([
            "fintrack", "add", "Gym", "30", "--type", "expense", "--category", "health",
            "--start", "2024-01-01",
        ])
        .is_err());
    }
}
