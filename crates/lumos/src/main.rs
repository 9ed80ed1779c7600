mod cli;
mod error;
mod protocol;
mod server;
mod tools;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use lumos_config::Config;
use lumos_core::HubService;

use crate::cli::Cli;
use crate::error::CliError;
use crate::server::Server;

const DEFAULT_LOG_FILE: &str = "lumos.log";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = lumos_config::config_path(cli.config.as_deref());
    let config =
        lumos_config::load_from(&config_path).map_err(|e| CliError::from_config(e, &config_path))?;

    let _guard = setup_tracing(cli.verbose, &log_path(&cli, &config));
    info!(config = %config_path.display(), "starting lumos");

    let hub_config = config
        .to_hub_config()
        .map_err(|e| CliError::from_config(e, &config_path))?;
    info!(
        url = %hub_config.url,
        whitelist = ?hub_config.whitelist,
        blacklist = ?hub_config.blacklist,
        "configuration loaded"
    );

    let service = HubService::from_config(&hub_config)?;
    info!("serving 4 tools on stdio");
    Server::new(service)
        .serve(tokio::io::stdin(), tokio::io::stdout())
        .await?;

    info!("lumos stopped");
    Ok(())
}

/// `--log-file`, then the config's `log_file`, then `lumos.log`; relative
/// paths resolve against the executable directory.
fn log_path(cli: &Cli, config: &Config) -> PathBuf {
    let file = cli
        .log_file
        .as_deref()
        .or(config.log_file.as_deref())
        .unwrap_or(Path::new(DEFAULT_LOG_FILE));
    lumos_config::resolve_against(&lumos_config::exe_dir(), file)
}

/// Log to `log_file` (append, never rotated). Falls back to stderr when
/// the file cannot be opened; stdout carries the protocol.
fn setup_tracing(verbose: u8, log_file: &Path) -> WorkerGuard {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "lumos={log_level},lumos_core={log_level},\
             lumos_api={log_level},lumos_config={log_level}"
        ))
    });

    let log_dir = log_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let log_filename = log_file
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or(DEFAULT_LOG_FILE);

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(log_filename)
        .build(log_dir);

    let (non_blocking, guard) = match appender {
        Ok(file) => tracing_appender::non_blocking(file),
        Err(e) => {
            eprintln!(
                "lumos: cannot open log file {}: {e}; logging to stderr",
                log_file.display()
            );
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}
