//! Startup errors with miette diagnostics.
//!
//! Tool-level failures never reach here; they are encoded as tool results.

use miette::Diagnostic;
use thiserror::Error;

use lumos_config::ConfigError;
use lumos_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const IO: i32 = 3;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Missing {field}")]
    #[diagnostic(
        code(lumos::config_missing),
        help(
            "{hint}.\n\
             Please set HA_TOKEN and HA_URL environment variables or create a config.json file."
        )
    )]
    ConfigMissing {
        field: &'static str,
        hint: &'static str,
    },

    #[error("Invalid configuration value for {field}: {reason}")]
    #[diagnostic(code(lumos::config_invalid))]
    ConfigInvalid { field: &'static str, reason: String },

    #[error("Could not load configuration from {path}")]
    #[diagnostic(
        code(lumos::config_load),
        help("Check that the file is valid JSON (or TOML for .toml files).")
    )]
    ConfigLoad {
        path: String,
        #[source]
        source: ConfigError,
    },

    #[error("Could not start hub client: {0}")]
    #[diagnostic(code(lumos::hub_setup))]
    HubSetup(#[from] CoreError),

    #[error("stdio transport failed")]
    #[diagnostic(code(lumos::io))]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigMissing { .. } | Self::ConfigInvalid { .. } | Self::ConfigLoad { .. } => {
                exit_code::CONFIG
            }
            Self::HubSetup(_) => exit_code::GENERAL,
            Self::Io(_) => exit_code::IO,
        }
    }

    /// Map a config error; `path` is reported when the file itself failed.
    pub fn from_config(err: ConfigError, path: &std::path::Path) -> Self {
        match err {
            ConfigError::Missing { field, hint } => Self::ConfigMissing { field, hint },
            ConfigError::Validation { field, reason } => Self::ConfigInvalid { field, reason },
            source @ ConfigError::Figment(_) => Self::ConfigLoad {
                path: path.display().to_string(),
                source,
            },
        }
    }
}
