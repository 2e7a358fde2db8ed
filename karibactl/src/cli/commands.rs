//! CLI command and subcommand definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lake Kariba Wind Analysis CLI
#[derive(Parser, Debug)]
#[command(name = "karibactl")]
#[command(version, about = "Lake Kariba wind analysis project tooling", long_about = None)]
pub struct Cli {
    /// Configuration file (default: KARIBA_CONFIG, then config/kariba_config.json under the project root)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root (default: KARIBA_PROJECT_ROOT, then ~/deployed/charara)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty table output
    Table,
    /// JSON output
    Json,
}

impl From<&OutputFormat> for crate::format::OutputFormat {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Table => crate::format::OutputFormat::Table,
            OutputFormat::Json => crate::format::OutputFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show or manage the project configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Create the project directory layout and default configuration
    Init,

    /// Report on the interpreter, virtual environment and analysis script
    Doctor,

    /// Run the wind analysis with the virtual environment interpreter
    Run {
        /// Collect the analysis output and print it after it exits
        #[arg(long)]
        capture: bool,

        /// Answer yes to every prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Git and GitHub repository automation
    Git {
        #[command(subcommand)]
        command: GitCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show a configuration summary
    Show,

    /// Look up a value by dotted key (e.g. analysis_period.start_year)
    Get {
        /// Dotted configuration key
        key: String,
    },

    /// Show the absolute path for a logical name (e.g. output.maps)
    Path {
        /// Logical path name, relative to `paths`
        name: String,
    },

    /// List every resolved path
    Paths,

    /// Set a value by dotted key and save
    Set {
        /// Dotted configuration key
        key: String,
        /// Value, parsed as JSON when possible, otherwise taken as a string
        value: String,
    },

    /// Change the analysis period and save
    Period {
        /// First year
        start_year: i64,
        /// Last year (inclusive)
        end_year: i64,
    },

    /// Save a copy of the configuration
    Backup {
        /// Destination (default: <output>/config_backup.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reset configuration to defaults
    Reset,

    /// Check required fields and paths; exits 1 when any check fails
    Validate,
}

#[derive(Subcommand, Debug)]
pub enum GitCommands {
    /// Show repository, remote and identity status
    Status,

    /// Initialise the repository, commit and push to GitHub
    Setup {
        /// Repository name (default: detected from origin, then prompted)
        #[arg(long)]
        repo: Option<String>,

        /// GitHub username (default: github.username from the configuration)
        #[arg(long)]
        username: Option<String>,

        /// Use the SSH remote URL instead of HTTPS
        #[arg(long)]
        ssh: bool,

        /// Also add a GitHub Actions workflow
        #[arg(long)]
        workflow: bool,

        /// Answer yes to every prompt and take every default
        #[arg(short, long)]
        yes: bool,
    },
}
