use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use tracker_core::Priority;

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Track the products you are testing, synced across devices")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to the shared record database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional directory for identity and cache files
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tests
    #[command(alias = "ls")]
    List {
        /// Only completed tests
        #[arg(long, conflicts_with = "pending")]
        completed: bool,
        /// Only tests still to do
        #[arg(long)]
        pending: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a product to test
    #[command(alias = "new")]
    Add {
        /// Product name
        name: String,
        /// Brand
        #[arg(short, long)]
        brand: String,
        /// Category
        #[arg(short, long)]
        category: String,
        /// Priority
        #[arg(short, long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", value_parser = parse_due_date)]
        due: Option<NaiveDate>,
    },
    /// Mark a test completed, or pending again
    Toggle {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Edit an existing test
    #[command(group(ArgGroup::new("due_change").args(["due", "clear_due"])))]
    Edit {
        /// Record ID or unique ID prefix
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
        #[arg(long)]
        notes: Option<String>,
        /// New due date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE", value_parser = parse_due_date)]
        due: Option<NaiveDate>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },
    /// Delete a test
    #[command(alias = "rm")]
    Delete {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Show the most urgent pending test
    Urgent,
    /// Show identity and sync status
    Status,
    /// Sign in with an account id, or as a guest
    #[command(group(ArgGroup::new("who").args(["uid", "anonymous"]).required(true)))]
    Login {
        /// Account id
        uid: Option<String>,
        /// Sign in as a fresh guest
        #[arg(long)]
        anonymous: bool,
    },
    /// Sign out and drop local data
    Logout,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
    Urgent,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
            PriorityArg::Urgent => Self::Urgent,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

pub fn parse_due_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("expected a date like 2025-03-10, got '{value}'"))
}
