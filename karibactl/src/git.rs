//! Git and GitHub repository automation
//!
//! Every operation shells out to `git` in the project directory. Success is
//! decided by the exit status; output is only inspected with substring checks.

use anyhow::{Context, Result};
use kariba_core::config::{DEFAULT_GITHUB_USER, DEFAULT_REPOSITORY};
use kariba_core::ConfigResolver;
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use crate::format::{format_banner, format_error, format_success, format_warning};
use crate::prompt::Prompter;

/// Captured result of one `git` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// Trimmed stdout when the command succeeded and printed something.
    pub fn value(&self) -> Option<String> {
        let trimmed = self.stdout.trim();
        if self.success && !trimmed.is_empty() {
            Some(trimmed.to_string())
        } else {
            None
        }
    }
}

/// `git` bound to a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    repo_dir: PathBuf,
}

impl Git {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Run `git <args>`; errors only when git cannot be started at all.
    pub fn run(&self, args: &[&str]) -> Result<GitOutput> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .context("Failed to run git (is it installed?)")?;

        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run a step, printing ✓/✗ with the description.
    fn step(&self, description: &str, args: &[&str]) -> Result<GitOutput> {
        let output = self.run(args)?;
        if output.success {
            println!("{}", format_success(description));
        } else {
            println!("{}", format_error(description));
            let stderr = output.stderr.trim();
            if !stderr.is_empty() {
                println!("  Error: {}", stderr);
            }
        }
        Ok(output)
    }

    pub fn version(&self) -> Option<String> {
        self.run(&["--version"]).ok()?.value()
    }

    pub fn is_work_tree(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .ok()
            .and_then(|o| o.value())
            .is_some_and(|v| v == "true")
    }

    pub fn remote_url(&self, remote: &str) -> Option<String> {
        self.run(&["remote", "get-url", remote]).ok()?.value()
    }

    pub fn remotes(&self) -> Option<String> {
        self.run(&["remote", "-v"]).ok()?.value()
    }

    pub fn current_branch(&self) -> Option<String> {
        self.run(&["branch", "--show-current"]).ok()?.value()
    }

    pub fn config_value(&self, key: &str) -> Option<String> {
        self.run(&["config", key]).ok()?.value()
    }

    pub fn short_status(&self) -> Option<String> {
        self.run(&["status", "--short"]).ok()?.value()
    }

    pub fn has_changes(&self) -> Result<bool> {
        Ok(self.run(&["status", "--porcelain"])?.value().is_some())
    }
}

/// GitHub username embedded in a remote URL.
///
/// Understands `git@github.com:<user>/<repo>.git` and
/// `https://github.com/<user>/<repo>.git`.
pub fn github_user_from_url(url: &str) -> Option<String> {
    let rest = url
        .trim()
        .strip_prefix("git@github.com:")
        .or_else(|| url.trim().strip_prefix("https://github.com/"))
        .or_else(|| url.trim().strip_prefix("ssh://git@github.com/"))?;
    let user = rest.split('/').next()?;
    if user.is_empty() {
        None
    } else {
        Some(user.to_string())
    }
}

/// Repository name: last path component without `.git`.
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    let last = url.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Lowercase, spaces to `-`, then only `[a-z0-9._-]` is accepted.
pub fn normalize_repo_name(input: &str) -> Result<String> {
    let name = input.trim().to_lowercase().replace(' ', "-");
    if name.is_empty() {
        anyhow::bail!("Repository name cannot be empty");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        anyhow::bail!(
            "Invalid repository name '{}'. Use only letters, numbers, hyphens, underscores, and dots.",
            input.trim()
        );
    }
    Ok(name)
}

/// Remote URL for `<user>/<repo>`.
pub fn github_remote_url(user: &str, repo: &str, ssh: bool) -> String {
    if ssh {
        format!("git@github.com:{}/{}.git", user, repo)
    } else {
        format!("https://github.com/{}/{}.git", user, repo)
    }
}

pub const GITIGNORE: &str = "# Python
__pycache__/
*.py[cod]
*$py.class

# Virtual environments
env/
venv/

# Data files
data/era5_downloads/*.nc
data/era5_downloads/*.nc4
output/
logs/

# IDE
.vscode/
.idea/
*.swp

# OS
.DS_Store
";

pub const WORKFLOW: &str = "name: Python CI

on:
  push:
    branches: [ main ]
  pull_request:
    branches: [ main ]

jobs:
  test:
    runs-on: ubuntu-latest
    steps:
    - uses: actions/checkout@v3
    - name: Set up Python
      uses: actions/setup-python@v4
      with:
        python-version: '3.10'
    - name: Install dependencies
      run: |
        pip install -r scripts/requirements.txt
";

pub fn readme(user: &str, repo: &str) -> String {
    format!(
        "# Lake Kariba Wind Analysis

Wind analysis for floating solar panels at Charara area, Lake Kariba.

## Features
- Seasonal wind pattern analysis
- Time series visualization
- Statistical analysis and reporting

## Quick Start
```bash
karibactl init
karibactl run
```

## Repository
https://github.com/{}/{}

## License
MIT License
",
        user, repo
    )
}

/// Initial commit message describing the project and period.
pub fn commit_message(config: &ConfigResolver, user: &str, repo: &str) -> String {
    let year = |v: Option<i64>| v.map(|y| y.to_string()).unwrap_or_else(|| "N/A".to_string());
    format!(
        "Initial commit: Lake Kariba Wind Analysis

Project: {}
Location: {}
Analysis Period: {}-{}
Repository: https://github.com/{}/{}

Generated: {}
",
        config.get_str("project.name").unwrap_or("Wind analysis"),
        config.get_str("location.site_name").unwrap_or("N/A"),
        year(config.start_year()),
        year(config.end_year()),
        user,
        repo,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

/// Snapshot of the repository state reported by `git status`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct GitStatusReport {
    pub project_dir: PathBuf,
    pub git_version: Option<String>,
    pub is_repository: bool,
    pub remotes: Option<String>,
    pub branch: Option<String>,
    pub status: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub origin_url: Option<String>,
    pub github_user: Option<String>,
    pub expected_github_user: String,
}

impl GitStatusReport {
    /// `true` when the identity (remote user, else `user.name`) differs from the configured account.
    pub fn identity_mismatch(&self) -> bool {
        match self.github_user.as_ref().or(self.user_name.as_ref()) {
            Some(found) => !found.eq_ignore_ascii_case(&self.expected_github_user),
            None => false,
        }
    }
}

pub fn status_report(git: &Git, config: &ConfigResolver) -> GitStatusReport {
    let expected_github_user = config
        .get_str("github.username")
        .unwrap_or(DEFAULT_GITHUB_USER)
        .to_string();
    let git_version = git.version();

    if git_version.is_none() || !git.is_work_tree() {
        return GitStatusReport {
            project_dir: git.repo_dir().to_path_buf(),
            git_version,
            user_name: git.config_value("user.name"),
            user_email: git.config_value("user.email"),
            expected_github_user,
            ..Default::default()
        };
    }

    let origin_url = git.remote_url("origin");
    GitStatusReport {
        project_dir: git.repo_dir().to_path_buf(),
        git_version,
        is_repository: true,
        remotes: git.remotes(),
        branch: git.current_branch(),
        status: git.short_status(),
        user_name: git.config_value("user.name"),
        user_email: git.config_value("user.email"),
        github_user: origin_url.as_deref().and_then(github_user_from_url),
        origin_url,
        expected_github_user,
    }
}

/// Inputs for [`setup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOptions {
    pub repo: Option<String>,
    pub username: Option<String>,
    pub ssh: bool,
    pub workflow: bool,
}

/// What [`setup`] achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOutcome {
    pub repository: String,
    pub remote_url: String,
    pub committed: bool,
    pub pushed: bool,
}

fn write_if_absent(path: &Path, contents: &str) -> Result<bool> {
    if path.exists() {
        println!("{}", format_success(&format!("{} already exists", display_name(path))));
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{}", format_success(&format!("Created {}", display_name(path))));
    Ok(true)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Pick the repository name: explicit option, then `origin`, then a prompt.
pub fn choose_repository<R: BufRead, W: Write>(
    git: &Git,
    requested: Option<&str>,
    default: &str,
    prompter: &mut Prompter<R, W>,
) -> Result<String> {
    if let Some(name) = requested {
        return normalize_repo_name(name);
    }
    if git.repo_dir().join(".git").exists() {
        if let Some(name) = git.remote_url("origin").as_deref().and_then(repo_name_from_url) {
            println!("{}", format_success(&format!("Detected repository from remote: {}", name)));
            return Ok(name);
        }
    }

    // An empty answer or end of input yields the default, so an invalid
    // default can never be corrected by asking again.
    loop {
        let answer = prompter.ask("GitHub repository name", default)?;
        match normalize_repo_name(&answer) {
            Ok(name) => return Ok(name),
            Err(e) if prompter.assume_yes() || answer == default => {
                return Err(e.context("Configured github.repository is not a valid name"))
            }
            Err(e) => println!("{}", format_warning(&e.to_string())),
        }
    }
}

/// Initialise, commit and push the project to GitHub.
pub fn setup<R: BufRead, W: Write>(
    git: &Git,
    config: &ConfigResolver,
    options: &SetupOptions,
    prompter: &mut Prompter<R, W>,
) -> Result<SetupOutcome> {
    let user = options
        .username
        .clone()
        .or_else(|| config.get_str("github.username").map(str::to_string))
        .unwrap_or_else(|| DEFAULT_GITHUB_USER.to_string());
    let default_repo = config
        .get_str("github.repository")
        .unwrap_or(DEFAULT_REPOSITORY)
        .to_string();

    println!("{}", format_banner(&format!("GITHUB SETUP FOR USER: {}", user)));
    println!("Project directory: {}", git.repo_dir().display());

    let repository = choose_repository(git, options.repo.as_deref(), &default_repo, prompter)?;
    let remote_url = github_remote_url(&user, &repository, options.ssh);
    println!("\nRepository will be: https://github.com/{}/{}", user, repository);

    // Step 1: git itself and the local repository
    println!("{}", format_banner("STEP 1: INITIALIZING GIT"));
    if !git.step("Checking Git installation", &["--version"])?.success {
        anyhow::bail!("Git is not available");
    }
    if git.repo_dir().join(".git").exists() {
        println!("{}", format_success("Git already initialized"));
    } else if !git.step("Initializing Git repository", &["init"])?.success {
        anyhow::bail!("git init failed in {}", git.repo_dir().display());
    }

    git.step("Setting Git username", &["config", "user.name", &user])?;
    if git.config_value("user.email").is_none() {
        let email = format!("{}@users.noreply.github.com", user);
        git.step("Setting Git email", &["config", "user.email", &email])?;
    }

    // Step 2: project files
    println!("{}", format_banner("STEP 2: CREATING FILES"));
    write_if_absent(&git.repo_dir().join(".gitignore"), GITIGNORE)?;
    write_if_absent(&git.repo_dir().join("README.md"), &readme(&user, &repository))?;

    // Step 3: commit
    println!("{}", format_banner("STEP 3: COMMITTING FILES"));
    let committed = if git.has_changes()? {
        git.step("Staging files", &["add", "."])?;
        let message = commit_message(config, &user, &repository);
        git.step("Creating commit", &["commit", "-m", &message])?.success
    } else {
        println!("No changes to commit");
        false
    };

    // Step 4: remote
    println!("{}", format_banner("STEP 4: CONFIGURING REMOTE"));
    match git.remote_url("origin") {
        Some(current) if current == remote_url => {
            println!("{}", format_success(&format!("Remote 'origin' already set: {}", current)));
        }
        Some(current) => {
            println!("Remote 'origin' currently points to: {}", current);
            if prompter.confirm("Change it to the new repository?")? {
                git.step(
                    &format!("Updated remote to {}", remote_url),
                    &["remote", "set-url", "origin", &remote_url],
                )?;
            }
        }
        None => {
            git.step(
                &format!("Added remote 'origin': {}", remote_url),
                &["remote", "add", "origin", &remote_url],
            )?;
        }
    }

    // Step 5: push
    println!("{}", format_banner("STEP 5: PUSHING TO GITHUB"));
    println!("If it does not exist yet, create the repository first:");
    println!("  1. Go to: https://github.com/new");
    println!("  2. Repository name: {}", repository);
    println!("  3. DO NOT initialize with README, .gitignore, or license");
    prompter.pause("\nPress Enter once the repository exists on GitHub...")?;

    git.step("Renamed branch to 'main'", &["branch", "-M", "main"])?;
    let push = git.step("git push -u origin main", &["push", "-u", "origin", "main"])?;
    let pushed = push.success;

    if pushed {
        info!("Pushed {} to {}", git.repo_dir().display(), remote_url);
        println!("{}", format_success("SUCCESS!"));
        println!("Your code is now on GitHub: https://github.com/{}/{}", user, repository);
    } else {
        warn!("Push to {} failed", remote_url);
        println!("{}", format_warning("Push failed. Common issues:"));
        println!("  1. Repository not created yet");
        println!("  2. Need a GitHub token or SSH key for authentication");
        if push.stderr.contains("Permission denied") {
            println!("\nSSH Permission denied. Try:");
            println!(
                "  1. Use HTTPS instead: git remote set-url origin {}",
                github_remote_url(&user, &repository, false)
            );
            println!("  2. Setup SSH keys: https://docs.github.com/en/authentication/connecting-to-github-with-ssh");
        }
        println!("\nYou can push later with: git push -u origin main");
    }

    // Step 6: optional workflow
    if options.workflow {
        println!("{}", format_banner("STEP 6: GITHUB ACTIONS"));
        let workflow = git.repo_dir().join(".github").join("workflows").join("ci.yml");
        if write_if_absent(&workflow, WORKFLOW)? {
            git.step("Staging workflow", &["add", ".github/"])?;
            git.step("Committing workflow", &["commit", "-m", "Add GitHub Actions workflow"])?;
            if pushed {
                git.step("Pushing workflow", &["push"])?;
            }
        }
    }

    write_summary(git.repo_dir(), &user, &repository, options.workflow)?;

    Ok(SetupOutcome {
        repository,
        remote_url,
        committed,
        pushed,
    })
}

fn write_summary(dir: &Path, user: &str, repository: &str, workflow: bool) -> Result<()> {
    let summary = format!(
        "GitHub Setup Summary
Repository: https://github.com/{}/{}
Created: {}

Files created:
- .gitignore
- README.md{}

Local commands:
git add .
git commit -m \"Message\"
git push
git pull origin main
",
        user,
        repository,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        if workflow {
            "\n- .github/workflows/ci.yml"
        } else {
            ""
        }
    );

    let path = dir.join("GITHUB_SETUP_SUMMARY.txt");
    std::fs::write(&path, summary).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("\n{}", format_success(&format!("Summary saved to: {}", path.display())));
    Ok(())
}
