//! Command-line arguments for the `levelup` binary.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// LevelUp command-line client
#[derive(Debug, Parser)]
#[command(name = "levelup")]
#[command(about = "LevelUp - turn tasks into experience", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login { email: String, password: String },

    /// Drop the stored session
    Logout,

    /// Show level, experience and today's progress
    Status,

    /// List tasks due on a day (default: today)
    Tasks {
        /// Day as YYYY-MM-DD
        date: Option<NaiveDate>,
    },

    /// Show days with tasks and whether anything on them is done
    Calendar,

    /// Mark a task as completed
    Complete { id: i64 },
}
