use std::error::Error;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

mod config;
mod dispatch;
mod format;
mod menu;
mod models;
mod prefetch;
mod selection;
mod toggl;

#[cfg(test)]
mod testing;

use config::{Cli, Command, Settings};
use format::{format_elapsed, running_line};
use models::most_recent;
use prefetch::Prefetch;
use toggl::{TogglClient, TogglError, TrackingApi};

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    config::init_logging(cli.verbose);

    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            error!("{err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let client = TogglClient::new(&settings.token, settings.api_url.clone())?;

    let succeeded = match cli.command.unwrap_or(Command::Menu) {
        Command::Menu => run_menu(&client, &settings),
        Command::Status => print_status(&client, &mut io::stdout())?,
        Command::Rename { description } => {
            rename_current(&client, &description, &mut io::stdout())?
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_menu(client: &TogglClient, settings: &Settings) -> bool {
    let prefetch = Prefetch::start(client);
    let menu = settings.menu();
    let result = dispatch::run(client, &menu, prefetch);
    if let Err(err) = &result {
        error!("{err}");
    }
    dispatch::report(&menu, &result);
    result.is_ok()
}

fn print_status<A: TrackingApi>(api: &A, out: &mut impl Write) -> io::Result<bool> {
    match api.fetch_current_entry() {
        Ok(entry) => {
            writeln!(out, "{}", running_line(&entry))?;
            return Ok(true);
        }
        Err(TogglError::NoRunningEntry) => {}
        Err(err) => {
            error!("Failed to fetch current entry: {err}");
            return Ok(false);
        }
    }

    match api.fetch_recent_entries() {
        Ok(entries) => {
            match most_recent(&entries) {
                Some(entry) => {
                    let elapsed = format_elapsed(entry.duration());
                    writeln!(out, "Last: {entry} ({elapsed})")?
                }
                None => writeln!(out, "No time entries in the last 9 days")?,
            }
            Ok(true)
        }
        Err(err) => {
            error!("Failed to fetch recent entries: {err}");
            Ok(false)
        }
    }
}

fn rename_current<A: TrackingApi>(
    api: &A,
    description: &str,
    out: &mut impl Write,
) -> io::Result<bool> {
    match api.update_current_entry(description) {
        Ok(entry) => {
            writeln!(out, "Renamed: {entry}")?;
            Ok(true)
        }
        Err(TogglError::NoRunningEntry) => {
            writeln!(out, "No currently running time entry")?;
            Ok(false)
        }
        Err(err) => {
            error!("Failed to rename: {err}");
            Ok(false)
        }
    }
}
