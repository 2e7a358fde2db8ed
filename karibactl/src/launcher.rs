//! Analysis launcher
//!
//! Locates the virtual environment interpreter and the analysis script from the
//! configuration, optionally creates the environment, and runs the script as a
//! child process whose exit code becomes the launcher's own.

use anyhow::{Context, Result};
use kariba_core::config::{default_venv_dir, VENV_ENV};
use kariba_core::ConfigResolver;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use crate::format::{format_banner, format_error, format_success, format_warning};
use crate::prompt::Prompter;

/// Exit code reported for every launcher-side failure.
pub const FAILURE: i32 = 1;

/// How the child's output reaches the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Forward stdout line by line while the child runs
    Stream,
    /// Collect stdout and stderr, print them once the child exits
    Capture,
}

/// Everything needed to start the analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub venv_dir: PathBuf,
    pub interpreter: PathBuf,
    pub analysis_script: PathBuf,
    pub working_dir: PathBuf,
    /// `paths.output.base`, where the analysis writes its results
    pub output_dir: PathBuf,
    /// Interpreter used to create the virtual environment
    pub base_python: String,
    pub packages: Vec<String>,
}

impl LaunchPlan {
    /// Build the plan from `launcher.*`; `KARIBA_VENV` overrides the venv.
    pub fn from_config(config: &ConfigResolver) -> Self {
        let venv_dir = match std::env::var(VENV_ENV) {
            Ok(dir) if !dir.trim().is_empty() => config.resolve_path(dir),
            _ => config
                .get_str("launcher.venv_directory")
                .filter(|d| !d.is_empty())
                .map(|d| config.resolve_path(d))
                .unwrap_or_else(default_venv_dir),
        };

        let analysis_script = config.resolve_path(
            config
                .get_str("launcher.analysis_script")
                .unwrap_or("scripts/enhanced_wind_analysis.py"),
        );

        let packages = config
            .get("launcher.packages")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|p| p.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            interpreter: venv_interpreter(&venv_dir),
            venv_dir,
            analysis_script,
            working_dir: config.base_directory(),
            output_dir: config
                .get_path("output.base")
                .unwrap_or_else(|| config.base_directory().join("output")),
            base_python: config
                .get_str("launcher.python")
                .unwrap_or("python3")
                .to_string(),
            packages,
        }
    }

    /// `<venv>/bin/pip` (or `Scripts\pip.exe`).
    pub fn pip(&self) -> PathBuf {
        venv_bin_dir(&self.venv_dir).join(if cfg!(windows) { "pip.exe" } else { "pip" })
    }

    pub fn preflight(&self) -> Preflight {
        Preflight {
            venv_exists: self.venv_dir.is_dir(),
            interpreter_exists: self.interpreter.is_file(),
            script_exists: self.analysis_script.is_file(),
        }
    }
}

/// Existence checks performed before launching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preflight {
    pub venv_exists: bool,
    pub interpreter_exists: bool,
    pub script_exists: bool,
}

fn venv_bin_dir(venv_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts")
    } else {
        venv_dir.join("bin")
    }
}

/// Interpreter inside a virtual environment.
pub fn venv_interpreter(venv_dir: &Path) -> PathBuf {
    venv_bin_dir(venv_dir).join(if cfg!(windows) { "python.exe" } else { "python3" })
}

/// Full launcher flow: check, optionally create the environment, run.
///
/// Returns the process exit code: the child's own code when it ran, otherwise
/// [`FAILURE`].
pub fn launch<R: BufRead, W: Write>(
    plan: &LaunchPlan,
    mode: OutputMode,
    prompter: &mut Prompter<R, W>,
) -> Result<i32> {
    println!("{}", format_banner("LAKE KARIBA WIND ANALYSIS LAUNCHER"));

    let preflight = plan.preflight();
    if !preflight.interpreter_exists {
        println!(
            "{}",
            format_error(&format!(
                "Virtual environment Python not found: {}",
                plan.interpreter.display()
            ))
        );
        println!("\nTo create it:");
        println!("  {} -m venv {}", plan.base_python, plan.venv_dir.display());
        println!("  {} install {}", plan.pip().display(), plan.packages.join(" "));

        if !prompter.confirm("\nCreate virtual environment now?")? {
            println!("\nCannot proceed without virtual environment.");
            return Ok(FAILURE);
        }
        if let Err(e) = create_venv(plan) {
            println!("{}", format_error(&format!("Failed: {:#}", e)));
            return Ok(FAILURE);
        }
    }

    if !plan.analysis_script.is_file() {
        println!(
            "{}",
            format_error(&format!(
                "Analysis script not found: {}",
                plan.analysis_script.display()
            ))
        );
        if let Some(dir) = plan.analysis_script.parent() {
            list_directory(dir);
        }
        return Ok(FAILURE);
    }

    println!(
        "{}",
        format_success(&format!("Virtual environment: {}", plan.interpreter.display()))
    );
    println!(
        "{}",
        format_success(&format!("Analysis script: {}", plan.analysis_script.display()))
    );
    println!("{}", format_banner("STARTING ANALYSIS..."));

    let code = run_analysis(plan, mode)?;
    info!(
        "Analysis {} exited with code {}",
        plan.analysis_script.display(),
        code
    );

    if code == 0 {
        println!("{}", format_success("ANALYSIS COMPLETED SUCCESSFULLY!"));
        println!("\nOutputs are in: {}", plan.output_dir.display());
    } else {
        println!(
            "{}",
            format_error(&format!("ANALYSIS FAILED WITH EXIT CODE: {}", code))
        );
    }
    Ok(code)
}

/// Create the virtual environment and install every configured package.
pub fn create_venv(plan: &LaunchPlan) -> Result<()> {
    info!("Creating virtual environment at {}", plan.venv_dir.display());
    let status = Command::new(&plan.base_python)
        .arg("-m")
        .arg("venv")
        .arg(&plan.venv_dir)
        .status()
        .with_context(|| format!("Failed to start {}", plan.base_python))?;
    if !status.success() {
        anyhow::bail!("`{} -m venv` exited with {}", plan.base_python, status);
    }
    println!("{}", format_success(&format!("Created: {}", plan.venv_dir.display())));

    let pip = plan.pip();
    for package in &plan.packages {
        let status = Command::new(&pip)
            .arg("install")
            .arg(package)
            .status()
            .with_context(|| format!("Failed to start {}", pip.display()))?;
        if !status.success() {
            anyhow::bail!("pip install {} exited with {}", package, status);
        }
        println!("{}", format_success(&format!("Installed: {}", package)));
    }

    Ok(())
}

/// Run the analysis script with the venv interpreter from the base directory.
///
/// Returns the child's exit code; termination by signal maps to [`FAILURE`].
pub fn run_analysis(plan: &LaunchPlan, mode: OutputMode) -> Result<i32> {
    let mut command = Command::new(&plan.interpreter);
    command
        .arg(&plan.analysis_script)
        .current_dir(&plan.working_dir)
        .env("MPLBACKEND", "Agg");
    debug!("Spawning {:?}", command);

    let status = match mode {
        OutputMode::Stream => {
            let mut child = command
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .spawn()
                .with_context(|| format!("Failed to start {}", plan.interpreter.display()))?;

            if let Some(stdout) = child.stdout.take() {
                forward_lines(BufReader::new(stdout), &mut std::io::stdout());
            }
            child.wait().context("Failed to wait for analysis process")?
        }
        OutputMode::Capture => {
            let output = command
                .output()
                .with_context(|| format!("Failed to start {}", plan.interpreter.display()))?;
            print!("{}", String::from_utf8_lossy(&output.stdout));
            if !output.stderr.is_empty() {
                eprint!("{}", String::from_utf8_lossy(&output.stderr));
            }
            output.status
        }
    };

    debug!("Analysis process exited with {}", status);
    Ok(status.code().unwrap_or(FAILURE))
}

/// Copy `reader` to `out` line by line, decoding each line lossily.
///
/// The reader is always drained to EOF so the child never sees a closed pipe.
fn forward_lines<R: BufRead, W: Write>(mut reader: R, out: &mut W) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if let Err(e) = out
                    .write_all(String::from_utf8_lossy(&buf).as_bytes())
                    .and_then(|()| out.flush())
                {
                    debug!("Dropping analysis output: {}", e);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Stopped reading analysis output: {}", e);
                let _ = std::io::copy(&mut reader, &mut std::io::sink());
                break;
            }
        }
    }
}

/// Result of running a trivial probe through an interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub interpreter: PathBuf,
    pub success: bool,
    pub output: String,
}

/// Run `<interpreter> -c <code>` and capture what it prints.
pub fn probe(interpreter: &Path, code: &str) -> ProbeResult {
    match Command::new(interpreter).arg("-c").arg(code).output() {
        Ok(out) => {
            let mut output = String::from_utf8_lossy(&out.stdout).trim().to_string();
            let stderr = String::from_utf8_lossy(&out.stderr);
            if !stderr.trim().is_empty() {
                if !output.is_empty() {
                    output.push('\n');
                }
                output.push_str(stderr.trim());
            }
            ProbeResult {
                interpreter: interpreter.to_path_buf(),
                success: out.status.success(),
                output,
            }
        }
        Err(e) => ProbeResult {
            interpreter: interpreter.to_path_buf(),
            success: false,
            output: e.to_string(),
        },
    }
}

/// Python snippet printing the version of each package, or the import error.
pub fn import_probe_code(packages: &[String]) -> String {
    let names = packages
        .iter()
        .map(|p| format!("'{}'", p.replace('\'', "")))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "import importlib\n\
         for name in [{}]:\n    \
         try:\n        \
         m = importlib.import_module(name)\n        \
         print(name + ': ' + str(getattr(m, '__version__', 'unknown')))\n    \
         except ImportError as e:\n        \
         print(name + ': MISSING (' + str(e) + ')')",
        names
    )
}

fn list_directory(dir: &Path) {
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            println!("\nFiles in {}:", dir.display());
            let mut names: Vec<String> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect();
            names.sort();
            for name in names {
                println!("  - {}", name);
            }
        }
        Err(_) => println!(
            "{}",
            format_warning(&format!("Directory does not exist: {}", dir.display()))
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kariba_core::ResolverOptions;
    use serial_test::serial;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn resolver(root: &Path) -> ConfigResolver {
        ConfigResolver::load(ResolverOptions::new(root).with_config_file("config/test.json"))
    }

    #[test]
    #[serial]
    fn test_plan_from_config() {
        std::env::remove_var(VENV_ENV);
        let root = TempDir::new().unwrap();
        let mut config = resolver(root.path());
        config
            .set("launcher.venv_directory", serde_json::json!("env"))
            .unwrap();

        let plan = LaunchPlan::from_config(&config);
        assert_eq!(plan.venv_dir, root.path().join("env"));
        assert_eq!(plan.interpreter, venv_interpreter(&root.path().join("env")));
        assert_eq!(
            plan.analysis_script,
            root.path().join("scripts/enhanced_wind_analysis.py")
        );
        assert_eq!(plan.working_dir, root.path());
        assert_eq!(plan.output_dir, root.path().join("output"));
        assert_eq!(plan.base_python, "python3");
        assert_eq!(plan.packages, vec!["numpy", "xarray", "pandas", "matplotlib"]);
    }

    #[test]
    #[serial]
    fn test_venv_env_var_overrides_config() {
        let root = TempDir::new().unwrap();
        let config = resolver(root.path());

        std::env::set_var(VENV_ENV, "/opt/kariba-env");
        let plan = LaunchPlan::from_config(&config);
        std::env::remove_var(VENV_ENV);

        assert_eq!(plan.venv_dir, PathBuf::from("/opt/kariba-env"));
    }

    #[test]
    #[serial]
    fn test_declined_setup_returns_failure() {
        std::env::remove_var(VENV_ENV);
        let root = TempDir::new().unwrap();
        let mut config = resolver(root.path());
        config
            .set("launcher.venv_directory", serde_json::json!("missing-env"))
            .unwrap();
        let plan = LaunchPlan::from_config(&config);

        let mut prompter = Prompter::new(Cursor::new(b"n\n".to_vec()), Vec::new(), false);
        let code = launch(&plan, OutputMode::Capture, &mut prompter).unwrap();
        assert_eq!(code, FAILURE);
    }

    #[test]
    fn test_import_probe_code_lists_packages() {
        let code = import_probe_code(&["numpy".to_string(), "xarray".to_string()]);
        assert!(code.contains("['numpy', 'xarray']"));
        assert!(code.starts_with("import importlib"));
    }

    #[test]
    fn test_probe_reports_missing_interpreter() {
        let result = probe(Path::new("/nonexistent/bin/python3"), "print(1)");
        assert!(!result.success);
        assert!(!result.output.is_empty());
    }

    #[cfg(unix)]
    fn fake_interpreter(venv: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let interpreter = venv_interpreter(venv);
        std::fs::create_dir_all(interpreter.parent().unwrap()).unwrap();
        std::fs::write(&interpreter, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&interpreter, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_child_exit_code_is_propagated() {
        std::env::remove_var(VENV_ENV);
        let root = TempDir::new().unwrap();
        let mut config = resolver(root.path());
        config
            .set("launcher.venv_directory", serde_json::json!("env"))
            .unwrap();
        fake_interpreter(&root.path().join("env"), "echo \"backend=$MPLBACKEND\"; exit 3");
        std::fs::write(root.path().join("scripts/enhanced_wind_analysis.py"), "").unwrap();

        let plan = LaunchPlan::from_config(&config);
        assert_eq!(run_analysis(&plan, OutputMode::Capture).unwrap(), 3);
        assert_eq!(run_analysis(&plan, OutputMode::Stream).unwrap(), 3);

        let mut prompter = Prompter::new(Cursor::new(Vec::new()), Vec::new(), false);
        assert_eq!(launch(&plan, OutputMode::Stream, &mut prompter).unwrap(), 3);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_missing_script_fails_before_spawning() {
        std::env::remove_var(VENV_ENV);
        let root = TempDir::new().unwrap();
        let mut config = resolver(root.path());
        config
            .set("launcher.venv_directory", serde_json::json!("env"))
            .unwrap();
        fake_interpreter(&root.path().join("env"), "exit 0");

        let plan = LaunchPlan::from_config(&config);
        assert!(!plan.preflight().script_exists);

        let mut prompter = Prompter::new(Cursor::new(Vec::new()), Vec::new(), false);
        assert_eq!(launch(&plan, OutputMode::Capture, &mut prompter).unwrap(), FAILURE);
    }

    #[test]
    fn test_forward_lines_survives_invalid_utf8() {
        let input = b"Temp: 25\xb0C\nsecond line\nno newline".to_vec();
        let mut out = Vec::new();
        forward_lines(Cursor::new(input), &mut out);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Temp: 25\u{FFFD}C\nsecond line\nno newline");
    }

    #[test]
    #[serial]
    fn test_output_dir_follows_configured_base() {
        std::env::remove_var(VENV_ENV);
        let root = TempDir::new().unwrap();
        let mut config = resolver(root.path());
        config
            .set("paths.output.base", serde_json::json!("results"))
            .unwrap();

        let plan = LaunchPlan::from_config(&config);
        assert_eq!(plan.output_dir, root.path().join("results"));
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_stream_mode_keeps_exit_code_after_invalid_utf8() {
        std::env::remove_var(VENV_ENV);
        let root = TempDir::new().unwrap();
        let mut config = resolver(root.path());
        config
            .set("launcher.venv_directory", serde_json::json!("env"))
            .unwrap();
        fake_interpreter(
            &root.path().join("env"),
            "printf 'Temp: 25\\260C\\n'\ni=0\nwhile [ $i -lt 2000 ]; do echo line $i; i=$((i+1)); done\nexit 0",
        );
        std::fs::write(root.path().join("scripts/enhanced_wind_analysis.py"), "").unwrap();

        let plan = LaunchPlan::from_config(&config);
        assert_eq!(run_analysis(&plan, OutputMode::Stream).unwrap(), 0);
        assert_eq!(run_analysis(&plan, OutputMode::Capture).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_probe_captures_output() {
        let root = TempDir::new().unwrap();
        fake_interpreter(root.path(), "echo probe-ok");
        let result = probe(&venv_interpreter(root.path()), "ignored");
        assert!(result.success);
        assert_eq!(result.output, "probe-ok");
    }
}
