use std::env;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::menu::{DEFAULT_TIMEOUT, Rofi};
use crate::toggl::DEFAULT_BASE_URL;

pub const TOKEN_VAR: &str = "TOGGL_API_TOKEN";

#[derive(Debug, Parser)]
#[command(name = "rofi-toggl", version)]
#[command(about = "Start and stop Toggl Track time entries from rofi")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Menu program to run in dmenu mode
    #[arg(long, default_value = "rofi", global = true)]
    pub menu: String,

    /// Extra argument for the menu program, placed before the mode flag
    #[arg(long = "menu-arg", value_name = "ARG", allow_hyphen_values = true, global = true)]
    pub menu_args: Vec<String>,

    /// Seconds to wait for each menu before giving up
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT.as_secs(), global = true)]
    pub menu_timeout: u64,

    /// Toggl API root
    #[arg(long, default_value = DEFAULT_BASE_URL, global = true)]
    pub api_url: String,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Pick an action from the menu (default)
    Menu,
    /// Print the running or most recent time entry
    Status,
    /// Rename the running time entry
    Rename { description: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no api token provided, env TOGGL_API_TOKEN not set")]
    MissingToken,
}

/// Everything a run needs, resolved from the command line and environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub token: String,
    pub api_url: String,
    pub menu_program: String,
    pub menu_args: Vec<String>,
    pub menu_timeout: Duration,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        Self::with_token(cli, env::var(TOKEN_VAR).ok())
    }

    fn with_token(cli: &Cli, token: Option<String>) -> Result<Self, ConfigError> {
        let token = token
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        Ok(Self {
            token,
            api_url: cli.api_url.clone(),
            menu_program: cli.menu.clone(),
            menu_args: cli.menu_args.clone(),
            menu_timeout: Duration::from_secs(cli.menu_timeout),
        })
    }

    pub fn menu(&self) -> Rofi {
        Rofi::new(
            self.menu_program.clone(),
            self.menu_args.clone(),
            self.menu_timeout,
        )
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("rofi-toggl").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_to_rofi_and_menu_flow() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        let settings = Settings::with_token(&cli, Some("abc".to_string())).unwrap();
        assert_eq!(settings.menu_program, "rofi");
        assert_eq!(settings.menu_timeout, DEFAULT_TIMEOUT);
        assert_eq!(settings.api_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn missing_or_blank_token_is_fatal() {
        let cli = parse(&[]);
        assert!(matches!(
            Settings::with_token(&cli, None),
            Err(ConfigError::MissingToken)
        ));
        assert!(matches!(
            Settings::with_token(&cli, Some("  \n".to_string())),
            Err(ConfigError::MissingToken)
        ));
    }

    #[test]
    fn token_is_trimmed() {
        let cli = parse(&[]);
        let settings = Settings::with_token(&cli, Some(" abc\n".to_string())).unwrap();
        assert_eq!(settings.token, "abc");
    }

    #[test]
    fn parses_menu_options_and_subcommands() {
        let cli = parse(&[
            "--menu",
            "wofi",
            "--menu-arg",
            "-theme",
            "--menu-arg",
            "solarized",
            "--menu-timeout",
            "30",
            "rename",
            "Code review",
        ]);
        assert_eq!(cli.menu, "wofi");
        assert_eq!(cli.menu_args, ["-theme", "solarized"]);
        assert_eq!(cli.menu_timeout, 30);
        let Some(Command::Rename { description }) = &cli.command else {
            panic!("expected rename, got {:?}", cli.command);
        };
        assert_eq!(description, "Code review");
    }

    #[test]
    fn counts_verbosity() {
        assert_eq!(parse(&["-vv", "status"]).verbose, 2);
    }
}
