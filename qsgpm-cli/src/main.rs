//! qsgpm - reconcile QuickSight groups and custom permissions from a YAML rule set

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use log::{error, info, LevelFilter};
use qsgpm_reconcile::{App, Config, RunOption, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Notice,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::Debug,
            // env_logger has no notice level
            LogLevel::Info | LogLevel::Notice => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

/// QuickSight group and custom permission manager
#[derive(Parser, Debug)]
#[command(name = "qsgpm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML rule configuration (falls back to $QSGPM_CONFIG)
    #[arg(short, long, env = "CONFIG")]
    config: Option<PathBuf>,

    /// Minimum level of log output
    #[arg(short, long, value_enum, default_value = "info", env = "QSGPM_LOG_LEVEL")]
    log_level: LogLevel,

    /// Log the requests that would be sent instead of changing anything
    #[arg(
        long,
        env = "QSGPM_DRY_RUN",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    dry_run: bool,

    /// Print the run report as JSON to stdout
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .or_else(|| std::env::var_os("QSGPM_CONFIG").map(PathBuf::from))
            .unwrap_or_default()
    }
}

fn init_logging(level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(level.into())
        .format_target(false)
        .init();
}

/// Resolves when the process is asked to stop.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = unix_signal(tokio::signal::unix::SignalKind::terminate(), "SIGTERM");
    #[cfg(unix)]
    let hangup = unix_signal(tokio::signal::unix::SignalKind::hangup(), "SIGHUP");
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    #[cfg(not(unix))]
    let hangup = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
        () = hangup => {},
    }
}

#[cfg(unix)]
async fn unix_signal(kind: tokio::signal::unix::SignalKind, name: &str) {
    match tokio::signal::unix::signal(kind) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            log::warn!("failed to listen for {}: {}", name, e);
            std::future::pending::<()>().await;
        }
    }
}

async fn run(cli: &Cli) -> Result<RunReport> {
    let config = Config::load(cli.config_path())?;
    config.validate_version(env!("CARGO_PKG_VERSION"))?;

    let app = App::new(config).await?;
    let option = RunOption {
        dry_run: cli.dry_run,
    };
    if option.dry_run {
        info!("dry run enabled, no changes will be applied");
    }

    tokio::select! {
        report = app.run(option) => Ok(report?),
        () = shutdown_signal() => bail!("interrupted"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match run(&cli).await {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        error!("failed to serialize run report: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_notice_maps_to_info() {
        assert_eq!(LevelFilter::from(LogLevel::Notice), LevelFilter::Info);
        assert_eq!(LevelFilter::from(LogLevel::Debug), LevelFilter::Debug);
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from(["qsgpm", "-c", "rules.yaml", "-l", "warn", "--dry-run"])
            .expect("flags should parse");
        assert_eq!(cli.config, Some(PathBuf::from("rules.yaml")));
        assert_eq!(cli.log_level, LogLevel::Warn);
        assert!(cli.dry_run);
        assert!(!cli.json);
    }

    // Each env-mutating test owns the variables it sets.
    #[test]
    fn test_dry_run_env_accepts_boolish_values() {
        for (value, expected) in [
            ("1", true),
            ("true", true),
            ("yes", true),
            ("TRUE", true),
            ("0", false),
            ("false", false),
            ("no", false),
        ] {
            std::env::set_var("QSGPM_DRY_RUN", value);
            let cli = Cli::try_parse_from(["qsgpm"]).expect("dry-run env should parse");
            assert_eq!(cli.dry_run, expected, "QSGPM_DRY_RUN={}", value);
        }
        std::env::remove_var("QSGPM_DRY_RUN");
    }

    #[test]
    fn test_config_env_takes_precedence_over_qsgpm_config() {
        std::env::set_var("CONFIG", "from_config.yaml");
        std::env::set_var("QSGPM_CONFIG", "from_qsgpm.yaml");
        let cli = Cli::try_parse_from(["qsgpm"]).expect("should parse");
        assert_eq!(cli.config_path(), PathBuf::from("from_config.yaml"));

        std::env::remove_var("CONFIG");
        let cli = Cli::try_parse_from(["qsgpm"]).expect("should parse");
        assert_eq!(cli.config_path(), PathBuf::from("from_qsgpm.yaml"));
        std::env::remove_var("QSGPM_CONFIG");
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        assert!(Cli::try_parse_from(["qsgpm", "--log-level", "trace"]).is_err());
    }
}
