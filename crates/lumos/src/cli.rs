//! Clap derive structures for the `lumos` binary.

use std::path::PathBuf;

use clap::Parser;

/// lumos -- light and switch control for a home-automation hub
#[derive(Debug, Parser)]
#[command(
    name = "lumos",
    version,
    about = "Serve hub light and switch tools over stdio JSON-RPC",
    long_about = "Reads line-delimited JSON-RPC 2.0 requests on stdin and answers on stdout.\n\n\
        Hub URL and token come from the config file or HA_URL / HA_TOKEN.\n\
        Logs never go to stdout."
)]
pub struct Cli {
    /// Config file (JSON, or TOML by extension); relative to the executable
    #[arg(long, short = 'c', env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Log file; defaults to lumos.log next to the executable
    #[arg(long, env = "LUMOS_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_counts_repeats() {
        let cli = Cli::parse_from(["lumos", "-vv", "--config", "hub.toml"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("hub.toml")));
        assert!(cli.log_file.is_none());
    }
}
