mod app;
mod cli;
mod commands;
mod config;
mod dates;
mod focus;
mod logging;
mod model;
mod projector;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;
use cli::{BackgroundAction, Command};

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let config = config::Config::load(args.config.as_deref())?;
    start_logging(&config);

    let command = args.command.unwrap_or(Command::Tui);
    tracing::debug!(?command, "dispatching");
    let result = match command {
        Command::Init => commands::init(),
        Command::List { date, view } => commands::list(&config, date, view),
        Command::Add {
            title,
            date,
            daily,
            weekly,
        } => commands::add(&config, title, date, daily, weekly),
        Command::Toggle { goal_id, date } => commands::toggle(&config, goal_id, date),
        Command::Edit {
            goal_id,
            title,
            date,
        } => commands::edit(&config, goal_id, title, date),
        Command::Rm { goal_id, date } => commands::remove(&config, goal_id, date),
        Command::Mv { goal_id, from, to } => commands::move_goal(&config, goal_id, from, to),
        Command::Export { path } => commands::export(&config, path),
        Command::Import { file } => commands::import(&config, file),
        Command::Background { action } => match action {
            BackgroundAction::Set { path } => commands::set_background(&config, &path),
            BackgroundAction::Clear => commands::clear_background(&config),
        },
        Command::Tui => commands::tui(&config),
    };
    if let Err(err) = &result {
        tracing::error!(error = %format!("{:#}", err), "command failed");
    }
    result
}

fn start_logging(config: &config::Config) {
    let dir = match commands::open_store(config) {
        Ok(storage) => storage.dir,
        Err(err) => {
            eprintln!("warning: logging disabled: {:#}", err);
            return;
        }
    };
    if let Err(err) = logging::init(&dir, config.log_level.as_deref()) {
        eprintln!("warning: logging disabled: {:#}", err);
    }
}
