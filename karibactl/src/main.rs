//! Kariba CLI
//!
//! Command-line interface for the Lake Kariba wind analysis project.

use anyhow::Result;
use clap::Parser;
use kariba_core::config::{config_file_from_env, default_project_root};
use kariba_core::{ConfigResolver, ResolverOptions};
use karibactl::cli::{
    generate_completion, handle_config, handle_doctor, handle_git, handle_init, handle_run, Cli,
    Commands,
};
use karibactl::logging;
use tracing::{info, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completion { shell } = cli.command {
        generate_completion(shell);
        return Ok(());
    }

    // Project root and config file: CLI flag → environment → default
    let root = cli.root.clone().unwrap_or_else(default_project_root);
    let mut options = ResolverOptions::new(root);
    if let Some(file) = cli.config.clone().or_else(config_file_from_env) {
        options = options.with_config_file(file);
    }

    // The log directory comes from the configuration, so loading logs to
    // stderr only.
    let mut config = tracing::subscriber::with_default(
        logging::bootstrap_subscriber(cli.verbose),
        || ConfigResolver::load(options),
    );

    // Analysis runs also record a session log under paths.logs
    let session = match cli.command {
        Commands::Run { .. } => Some(logging::open_session_log(&config)),
        _ => None,
    };
    match session {
        Some(Ok(log)) => {
            let path = log.path.clone();
            logging::init(cli.verbose, Some(log));
            info!("Logging initialized. Log file: {}", path.display());
        }
        Some(Err(e)) => {
            logging::init(cli.verbose, None);
            warn!("Session log disabled: {:#}", e);
        }
        None => logging::init(cli.verbose, None),
    }

    let format = cli.format;
    let result = match cli.command {
        Commands::Config { command } => handle_config(command, &mut config, &format),
        Commands::Init => handle_init(&config, &format),
        Commands::Doctor => handle_doctor(&config, &format),
        Commands::Run { capture, yes } => handle_run(&config, capture, yes),
        Commands::Git { command } => handle_git(command, &config, &format),
        Commands::Completion { .. } => Ok(0),
    };

    match result {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if cli.verbose {
                eprintln!("Error details: {:?}", e);
            }
            std::process::exit(1);
        }
    }
}
