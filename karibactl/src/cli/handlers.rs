//! Command execution handlers
//!
//! Each handler returns the process exit code on success; errors are reported
//! by `main` and exit with status 1.

use anyhow::{Context, Result};
use kariba_core::{ConfigResolver, LoadOutcome};
use serde_json::{json, Value};

use crate::format::{
    format_banner, format_error, format_paths, format_success, format_summary, format_value,
    format_warning,
};
use crate::git::{self, Git, SetupOptions};
use crate::launcher::{self, LaunchPlan, OutputMode, FAILURE};
use crate::prompt::Prompter;
use crate::scaffold;

use super::commands::*;

/// Parse a command-line value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Handle config commands
pub fn handle_config(
    command: ConfigCommands,
    config: &mut ConfigResolver,
    format: &OutputFormat,
) -> Result<i32> {
    match command {
        ConfigCommands::Show => {
            println!("{}", format_summary(config, &format.into())?);
        }
        ConfigCommands::Get { key } => {
            let value = config
                .get(&key)
                .ok_or_else(|| anyhow::anyhow!("Key not found: {}", key))?;
            println!("{}", format_value(value, &format.into())?);
        }
        ConfigCommands::Path { name } => {
            let path = config
                .get_path(&name)
                .ok_or_else(|| anyhow::anyhow!("Path not configured: {}", name))?;
            match format {
                OutputFormat::Json => println!("{}", json!({ "name": name, "path": path })),
                OutputFormat::Table => println!("{}", path.display()),
            }
        }
        ConfigCommands::Paths => {
            println!("{}", format_paths(config.resolved_paths(), &format.into())?);
        }
        ConfigCommands::Set { key, value } => {
            let parsed = parse_value(&value);
            config
                .set(&key, parsed.clone())
                .with_context(|| format!("Failed to set {}", key))?;
            println!(
                "{}",
                format_success(&format!("Set {} = {}", key, crate::format::display_value(&parsed)))
            );
        }
        ConfigCommands::Period {
            start_year,
            end_year,
        } => {
            config
                .update_analysis_period(start_year, end_year)
                .context("Failed to update analysis period")?;
            println!(
                "{}",
                format_success(&format!(
                    "Analysis period set to {}-{}",
                    start_year, end_year
                ))
            );
        }
        ConfigCommands::Backup { output } => {
            let path = config
                .save_copy(output.as_deref())
                .context("Failed to save configuration backup")?;
            println!(
                "{}",
                format_success(&format!("Configuration backup saved to: {}", path.display()))
            );
        }
        ConfigCommands::Reset => {
            config
                .reset_to_defaults()
                .context("Failed to reset configuration")?;
            println!("{}", format_success("Configuration reset to defaults"));
        }
        ConfigCommands::Validate => {
            let errors = config.validate();
            match format {
                OutputFormat::Json => {
                    let report = json!({ "valid": errors.is_empty(), "errors": errors });
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                OutputFormat::Table if errors.is_empty() => {
                    println!("{}", format_success("Configuration validation passed"));
                }
                OutputFormat::Table => {
                    println!("{}", format_error("Configuration validation failed:"));
                    for message in &errors {
                        println!("  - {}", message);
                    }
                }
            }
            if !errors.is_empty() {
                return Ok(FAILURE);
            }
        }
    }

    Ok(0)
}

/// Handle init command
pub fn handle_init(config: &ConfigResolver, format: &OutputFormat) -> Result<i32> {
    let report = scaffold::scaffold(config)?;

    match format {
        OutputFormat::Json => {
            let summary = json!({
                "project_root": config.project_root(),
                "config_file": config.config_file(),
                "config": outcome_label(config.outcome()),
                "created": report.created,
                "existing": report.existing,
                "requirements": report.requirements,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Table => {
            println!("{}", format_banner("PROJECT INITIALIZATION"));
            println!("Project root: {}", config.project_root().display());
            for dir in &report.created {
                println!("{}", format_success(&format!("Created {}", dir.display())));
            }
            for dir in &report.existing {
                println!("{}", format_success(&format!("Exists  {}", dir.display())));
            }
            if let Some(path) = &report.requirements {
                println!("{}", format_success(&format!("Wrote {}", path.display())));
            }
            println!(
                "\nConfiguration: {} ({})",
                config.config_file().display(),
                outcome_label(config.outcome())
            );
            if config.outcome() == LoadOutcome::FellBack {
                println!(
                    "{}",
                    format_warning("Configuration file could not be parsed; it was left unchanged")
                );
            }
        }
    }

    Ok(0)
}

fn outcome_label(outcome: LoadOutcome) -> &'static str {
    match outcome {
        LoadOutcome::Loaded => "loaded",
        LoadOutcome::CreatedDefault => "created with defaults",
        LoadOutcome::EmptyReplaced => "empty file replaced with defaults",
        LoadOutcome::FellBack => "unreadable, using defaults",
    }
}

/// Handle doctor command
pub fn handle_doctor(config: &ConfigResolver, format: &OutputFormat) -> Result<i32> {
    let plan = LaunchPlan::from_config(config);
    let preflight = plan.preflight();

    let smoke = "import sys; print(sys.version.split()[0]); print(sys.executable)";
    let system = launcher::probe(std::path::Path::new(&plan.base_python), smoke);
    let venv = preflight
        .interpreter_exists
        .then(|| launcher::probe(&plan.interpreter, smoke));
    let imports = preflight.interpreter_exists.then(|| {
        launcher::probe(
            &plan.interpreter,
            &launcher::import_probe_code(&plan.packages),
        )
    });

    match format {
        OutputFormat::Json => {
            let probe = |p: &launcher::ProbeResult| {
                json!({
                    "interpreter": p.interpreter,
                    "success": p.success,
                    "output": p.output,
                })
            };
            let report = json!({
                "project_root": config.project_root(),
                "base_directory": config.base_directory(),
                "config_file": config.config_file(),
                "venv_directory": plan.venv_dir,
                "venv_exists": preflight.venv_exists,
                "interpreter": plan.interpreter,
                "interpreter_exists": preflight.interpreter_exists,
                "analysis_script": plan.analysis_script,
                "script_exists": preflight.script_exists,
                "system_python": probe(&system),
                "venv_python": venv.as_ref().map(probe),
                "packages": imports.as_ref().map(probe),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("{}", format_banner("ENVIRONMENT DIAGNOSTICS"));
            println!("Project root: {}", config.project_root().display());
            println!("Base directory: {}", config.base_directory().display());
            println!("Config file: {}", config.config_file().display());

            let check = |ok: bool, label: String| {
                if ok {
                    format_success(&label)
                } else {
                    format_error(&label)
                }
            };
            println!();
            println!(
                "{}",
                check(
                    preflight.venv_exists,
                    format!("Virtual environment: {}", plan.venv_dir.display())
                )
            );
            println!(
                "{}",
                check(
                    preflight.interpreter_exists,
                    format!("Interpreter: {}", plan.interpreter.display())
                )
            );
            println!(
                "{}",
                check(
                    preflight.script_exists,
                    format!("Analysis script: {}", plan.analysis_script.display())
                )
            );

            println!("\nSystem Python ({}):", plan.base_python);
            println!("{}", indent(&system));
            match &venv {
                Some(result) => {
                    println!("\nVirtual environment Python:");
                    println!("{}", indent(result));
                }
                None => println!(
                    "\n{}",
                    format_warning("Virtual environment interpreter not found; run `karibactl run` to create it")
                ),
            }
            if let Some(result) = &imports {
                println!("\nPackages:");
                println!("{}", indent(result));
            }
        }
    }

    Ok(0)
}

fn indent(result: &launcher::ProbeResult) -> String {
    let body = if result.output.is_empty() {
        "(no output)"
    } else {
        result.output.as_str()
    };
    let marker = if result.success { "" } else { "FAILED: " };
    body.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("  {}{}", marker, line)
            } else {
                format!("  {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Handle run command
pub fn handle_run(config: &ConfigResolver, capture: bool, yes: bool) -> Result<i32> {
    let plan = LaunchPlan::from_config(config);
    let mode = if capture {
        OutputMode::Capture
    } else {
        OutputMode::Stream
    };
    let mut prompter = Prompter::stdio(yes);

    match launcher::launch(&plan, mode, &mut prompter) {
        Ok(code) => Ok(code),
        Err(e) => {
            println!("{}", format_error(&format!("Launcher failed: {:#}", e)));
            Ok(FAILURE)
        }
    }
}

/// Handle git commands
pub fn handle_git(
    command: GitCommands,
    config: &ConfigResolver,
    format: &OutputFormat,
) -> Result<i32> {
    let repo = Git::new(config.project_root());

    match command {
        GitCommands::Status => {
            let report = git::status_report(&repo, config);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Table => print_git_status(&report),
            }
            Ok(if report.is_repository { 0 } else { FAILURE })
        }
        GitCommands::Setup {
            repo: name,
            username,
            ssh,
            workflow,
            yes,
        } => {
            let options = SetupOptions {
                repo: name,
                username,
                ssh,
                workflow,
            };
            let mut prompter = Prompter::stdio(yes);
            let outcome = git::setup(&repo, config, &options, &mut prompter)?;
            Ok(if outcome.pushed { 0 } else { FAILURE })
        }
    }
}

fn print_git_status(report: &git::GitStatusReport) {
    let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "Not set".to_string());

    println!("{}", format_banner("GIT STATUS"));
    println!("Project directory: {}", report.project_dir.display());
    match &report.git_version {
        Some(version) => println!("{}", format_success(version)),
        None => println!("{}", format_error("Git is not installed")),
    }

    if !report.is_repository {
        println!("{}", format_error("Not a git repository"));
        println!("Run `karibactl git setup` to initialise it");
    } else {
        println!("{}", format_success("Git repository"));
        println!("\nRemotes:");
        println!("  {}", na(&report.remotes).replace('\n', "\n  "));
        println!("\nCurrent branch: {}", na(&report.branch));
        match &report.status {
            Some(status) => {
                println!("\nChanges:");
                println!("  {}", status.replace('\n', "\n  "));
            }
            None => println!("\nWorking tree clean"),
        }
    }

    println!("\nGit identity:");
    println!("  user.name:  {}", na(&report.user_name));
    println!("  user.email: {}", na(&report.user_email));
    if let Some(user) = &report.github_user {
        println!("  GitHub user (from origin): {}", user);
    }
    if report.identity_mismatch() {
        println!(
            "\n{}",
            format_warning(&format!(
                "Identity does not match the configured GitHub user '{}'",
                report.expected_github_user
            ))
        );
    }
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use kariba_core::ResolverOptions;
    use tempfile::TempDir;

    #[test]
    fn test_parse_value_json_then_string() {
        assert_eq!(parse_value("2018"), json!(2018));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("[1, 2]"), json!([1, 2]));
        assert_eq!(parse_value("output/maps"), json!("output/maps"));
        assert_eq!(parse_value("\"quoted\""), json!("quoted"));
    }

    #[test]
    fn test_config_get_missing_key_errors() {
        let dir = TempDir::new().unwrap();
        let mut config = ConfigResolver::load(ResolverOptions::new(dir.path()));

        let err = handle_config(
            ConfigCommands::Get {
                key: "nope.missing".to_string(),
            },
            &mut config,
            &OutputFormat::Table,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Key not found"));
    }

    #[test]
    fn test_config_set_persists_parsed_value() {
        let dir = TempDir::new().unwrap();
        let mut config = ConfigResolver::load(ResolverOptions::new(dir.path()));

        let code = handle_config(
            ConfigCommands::Set {
                key: "analysis_parameters.highlight_radius".to_string(),
                value: "0.5".to_string(),
            },
            &mut config,
            &OutputFormat::Table,
        )
        .unwrap();
        assert_eq!(code, 0);

        let reloaded = ConfigResolver::load(ResolverOptions::new(dir.path()));
        assert_eq!(
            reloaded.get_f64("analysis_parameters.highlight_radius"),
            Some(0.5)
        );
    }

    #[test]
    fn test_config_validate_exit_codes() {
        let dir = TempDir::new().unwrap();
        let mut config = ConfigResolver::load(ResolverOptions::new(dir.path()));
        let code = handle_config(ConfigCommands::Validate, &mut config, &OutputFormat::Json);
        assert_eq!(code.unwrap(), 0);

        config.set("paths", Value::Null).unwrap();
        let code = handle_config(ConfigCommands::Validate, &mut config, &OutputFormat::Table);
        assert_eq!(code.unwrap(), FAILURE);
    }

    #[test]
    fn test_config_period_rejects_reversed_years() {
        let dir = TempDir::new().unwrap();
        let mut config = ConfigResolver::load(ResolverOptions::new(dir.path()));

        let result = handle_config(
            ConfigCommands::Period {
                start_year: 2020,
                end_year: 2015,
            },
            &mut config,
            &OutputFormat::Table,
        );
        assert!(result.is_err());
        assert_eq!(config.start_year(), Some(2015));
    }
}
