use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "taskdesk", about = "Personal task list with priorities and due dates")]
pub struct Cli {
    /// Path to the SQLite database [default: ~/.taskdesk/tasks.db]
    #[arg(long, env = "TASKDESK_DB", global = true)]
    pub db: Option<String>,

    /// Config file [default: ~/.taskdesk/config.toml]
    #[arg(long, env = "TASKDESK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Default)]
pub struct FilterArgs {
    /// Filter by status (active, completed)
    #[arg(long)]
    pub status: Option<String>,
    /// Filter by priority (low, medium, high)
    #[arg(long)]
    pub priority: Option<String>,
    /// Case-insensitive text search in title and description
    #[arg(long)]
    pub search: Option<String>,
    /// Due date window (all, today, week, overdue)
    #[arg(long)]
    pub date: Option<String>,
    /// Earliest due date, YYYY-MM-DD
    #[arg(long)]
    pub due_from: Option<String>,
    /// Latest due date, YYYY-MM-DD
    #[arg(long)]
    pub due_to: Option<String>,
    /// Only archived tasks
    #[arg(long, conflicts_with = "all")]
    pub archived: bool,
    /// Include archived tasks
    #[arg(long)]
    pub all: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create database and tables (idempotent)
    Init,

    /// Add a task
    Add {
        /// Task title
        title: String,
        /// Task description
        #[arg(short, long, default_value = "")]
        desc: String,
        /// Priority (low, medium, high)
        #[arg(short, long, default_value = "medium")]
        priority: String,
        /// Due date, YYYY-MM-DD
        #[arg(long, default_value = "")]
        due: String,
    },

    /// Edit a task
    Edit {
        /// Task id
        id: i64,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New description
        #[arg(short, long)]
        desc: Option<String>,
        /// New priority (low, medium, high)
        #[arg(short, long)]
        priority: Option<String>,
        /// New due date, YYYY-MM-DD (empty string clears it)
        #[arg(long)]
        due: Option<String>,
    },

    /// Remove a task
    Rm {
        /// Task id
        id: i64,
    },

    /// Show task details
    Show {
        /// Task id
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tasks
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Sort field (created_at, updated_at, priority, due_date, title, status)
        #[arg(long, default_value = "created_at")]
        sort: String,
        /// Sort order (asc, desc)
        #[arg(long, default_value = "desc")]
        order: String,
        /// Page number, starting at 1
        #[arg(long)]
        page: Option<i64>,
        /// Tasks per page [default: from config, else 20]
        #[arg(long)]
        page_size: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Toggle a task between active and completed
    Toggle {
        /// Task id
        id: i64,
    },

    /// Archive a completed task
    Archive {
        /// Task id
        id: i64,
    },

    /// List archived tasks
    Archived {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show task counts
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show counts, breakdowns, recent and upcoming tasks
    Dashboard {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Completion rate of tasks due in a period
    Completion {
        /// Period (week, month, year; anything else means 30 days)
        #[arg(long, default_value = "")]
        period: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List overdue tasks
    Overdue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List active high-priority tasks
    High {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Group active tasks by priority
    ByPriority {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export tasks as CSV, JSON or HTML
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output format (csv, json, html)
        #[arg(short, long, default_value = "csv")]
        format: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that the database is reachable
    Health,
}
