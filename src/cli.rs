use crate::projector::View;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "epoch", version, about = "Day, week, month and year goals in the terminal")]
pub struct Cli {
    /// Config file (defaults to the per-user config.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project goal store (.epoch/) in the current directory
    Init,
    /// Print goals for a day, or for every day a view covers
    List {
        /// Day to list (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// List the days of a whole view around --date instead
        #[arg(long, value_enum)]
        view: Option<View>,
    },
    /// Add a goal
    Add {
        /// Title of the goal
        title: String,
        /// Day to add it to (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Mark the goal as recurring every day
        #[arg(long, conflicts_with = "weekly")]
        daily: bool,
        /// Mark the goal as recurring on these weekdays (e.g. mon,wed,fri)
        #[arg(long, value_delimiter = ',')]
        weekly: Vec<String>,
    },
    /// Flip a goal between pending and done
    Toggle {
        goal_id: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Rename a goal (an empty title deletes it)
    Edit {
        goal_id: String,
        title: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete a goal
    Rm {
        goal_id: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Move a goal to another day
    Mv {
        goal_id: String,
        /// Day the goal is on (YYYY-MM-DD)
        from: String,
        /// Destination day (YYYY-MM-DD)
        to: String,
    },
    /// Write every goal to a JSON file
    Export {
        /// File or directory (defaults to ./epoch-goals-<today>.json)
        path: Option<PathBuf>,
    },
    /// Merge goals from an exported JSON file
    Import { file: PathBuf },
    /// Manage the custom background image
    Background {
        #[command(subcommand)]
        action: BackgroundAction,
    },
    /// Launch the interactive TUI
    Tui,
}

#[derive(Subcommand, Debug)]
pub enum BackgroundAction {
    /// Use an image file as the background
    Set { path: PathBuf },
    /// Go back to the default background
    Clear,
}
