pub mod config;
pub mod dashboard;
pub mod operations;
pub mod report;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::analysis::Params;
use crate::error::{Result, ScopeError};
use crate::models::Operation;
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "ledgerscope",
    version,
    about = "Descriptive statistics and charts for banking transaction CSVs."
)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a transactions CSV and print every panel as text or JSON.
    Analyze {
        /// Path to the transactions CSV
        file: String,
        #[command(flatten)]
        params: ParamArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write the report to this file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
    /// Open the interactive dashboard for a transactions CSV.
    Dashboard {
        /// Path to the transactions CSV
        file: String,
        #[command(flatten)]
        params: ParamArgs,
    },
    /// List the operation types that can be selected.
    Operations,
    /// Show or change saved defaults.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print a shell completion script.
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the current settings and where they are stored.
    Show,
    /// Set one setting: account_id, operation, bins, iqr_multiplier, preview_rows, log_level.
    Set {
        key: String,
        value: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Pipeline parameters given on the command line; unset ones fall back to settings.
#[derive(Args, Debug, Default, Clone)]
pub struct ParamArgs {
    /// Account ID for the balance time series
    #[arg(long = "account")]
    pub account: Option<i64>,
    /// Operation type, by label ("CREDIT IN CASH") or key (credit-in-cash)
    #[arg(long)]
    pub operation: Option<String>,
    /// Histogram bin count
    #[arg(long)]
    pub bins: Option<usize>,
    /// Tukey fence multiplier
    #[arg(long = "iqr-multiplier")]
    pub iqr_multiplier: Option<f64>,
    /// Rows shown in the raw table panel
    #[arg(long = "preview-rows")]
    pub preview_rows: Option<usize>,
}

impl ParamArgs {
    pub fn resolve(&self, settings: &Settings) -> Result<Params> {
        let mut params = settings.params();
        if let Some(id) = self.account {
            params.account_id = id;
        }
        if let Some(op) = &self.operation {
            params.operation = op.parse::<Operation>()?;
        }
        if let Some(bins) = self.bins {
            if bins == 0 {
                return Err(ScopeError::Other("--bins must be at least 1".into()));
            }
            params.bins = bins;
        }
        if let Some(k) = self.iqr_multiplier {
            if !k.is_finite() || k < 0.0 {
                return Err(ScopeError::Other(
                    "--iqr-multiplier must be a non-negative number".into(),
                ));
            }
            params.iqr_multiplier = k;
        }
        if let Some(rows) = self.preview_rows {
            params.preview_rows = rows;
        }
        Ok(params)
    }
}
