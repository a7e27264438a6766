use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

const BUILD_VERSION: &str = env!("SERVICEDECK_BUILD_VERSION");
const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
USAGE:
  {usage}

COMMANDS:
{subcommands}

OPTIONS:
{options}
{after-help}
";
const HELP_AFTER: &str = "\
Quick Command Map
  Runtime:
    ui, list/ls, status
  Lifecycle:
    start, stop, restart/rs
  Settings:
    settings, set
  Offline:
    inspect

Environment
  SERVICEDECK_DAEMON_ADDR         supervisor address (default 127.0.0.1:5476)
  SERVICEDECK_REFRESH_MS          dashboard refresh interval
  SERVICEDECK_REQUEST_TIMEOUT_MS  per-request timeout

Examples
  servicedeck ui
  servicedeck rs api
  servicedeck set api workers 8
  servicedeck inspect --snapshot status.json
";

#[derive(Debug, Parser)]
#[command(
    name = "servicedeck",
    version = BUILD_VERSION,
    about = "Operator console for a process supervisor",
    help_template = HELP_TEMPLATE,
    after_help = HELP_AFTER
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive dashboard with status, actions and settings
    Ui {
        #[arg(long = "interval-ms")]
        interval_ms: Option<u64>,
    },
    /// List services with their lifecycle phase
    #[command(visible_alias = "ls")]
    List,
    /// Show every status facet of a service
    Status { service: String },
    Start { service: String },
    Stop { service: String },
    #[command(visible_alias = "rs")]
    Restart { service: String },
    /// Show a service's settings and how each one is edited
    Settings { service: String },
    /// Change one setting of a service
    Set {
        service: String,
        field: String,
        value: String,
    },
    /// Classify status or settings JSON files without contacting the supervisor
    #[command(group(
        ArgGroup::new("input")
            .required(true)
            .multiple(true)
            .args(["snapshot", "settings"])
    ))]
    Inspect {
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Commands};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn restart_alias_parses() {
        let cli = Cli::try_parse_from(["servicedeck", "rs", "api"]).expect("expected rs to parse");
        assert!(matches!(cli.command, Commands::Restart { service } if service == "api"));
    }

    #[test]
    fn inspect_requires_an_input() {
        assert!(Cli::try_parse_from(["servicedeck", "inspect"]).is_err());
        let cli = Cli::try_parse_from(["servicedeck", "inspect", "--settings", "s.json"])
            .expect("expected inspect to parse");
        assert!(matches!(
            cli.command,
            Commands::Inspect {
                snapshot: None,
                settings: Some(_)
            }
        ));
    }
}
