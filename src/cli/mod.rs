pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gradewatch")]
#[command(about = "Watches the university results site and notifies on new grades", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/gradewatch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep everything in memory instead of the SQLite database
    #[arg(long, global = true)]
    pub in_memory: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage watched users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage a user's classes
    Class {
        #[command(subcommand)]
        action: ClassAction,
    },
    /// List users and their stored results
    List,
    /// Check one user's results now and wait for the run to finish
    Refresh {
        /// Id of the user to refresh
        user_id: String,
    },
    /// Background daemon running the scheduler
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Add a user with their results-site credentials
    Add {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        first: String,
        #[arg(long, default_value = "")]
        last: String,
        /// Permanent code
        #[arg(long)]
        code: String,
        /// Personal identification number
        #[arg(long)]
        nip: String,
        /// Address to notify of new results (none = no notifications)
        #[arg(long)]
        notify: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ClassAction {
    /// Watch a class for a user
    Add {
        user_id: String,
        /// Class code, e.g. INF1120
        name: String,
        group: String,
        /// Session, e.g. 20143
        year: String,
    },
}

#[derive(Subcommand)]
pub enum DaemonAction {
    /// Start the background daemon
    Start {
        /// Skip the refresh of due users on start
        #[arg(long)]
        no_initial_refresh: bool,

        /// Run in foreground (don't detach)
        #[arg(short, long)]
        foreground: bool,
    },
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
}
