//! Cross-platform process execution for module actions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use plexus_core::{CoreError, Result};
use tokio::process::Command as TokioCommand;

/// Executes shell commands and programs on behalf of module actions.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Shell used for `run` actions.
    shell: Shell,

    /// Extra environment variables.
    env: HashMap<String, String>,
}

/// Shell configuration.
#[derive(Debug, Clone)]
pub enum Shell {
    /// Unix shell (sh, bash, zsh, etc.)
    #[cfg(unix)]
    Unix { path: PathBuf },

    /// Windows PowerShell
    #[cfg(windows)]
    PowerShell,

    /// Windows cmd.exe
    #[cfg(windows)]
    Cmd,
}

/// Captured result of a process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl ProcessRunner {
    /// Creates a runner using the platform's default shell.
    pub fn new() -> Self {
        Self {
            shell: Self::default_shell(),
            env: HashMap::new(),
        }
    }

    fn default_shell() -> Shell {
        #[cfg(unix)]
        {
            let shells = ["/bin/bash", "/bin/sh", "/usr/bin/bash", "/usr/bin/sh"];

            for shell_path in shells {
                if Path::new(shell_path).exists() {
                    return Shell::Unix {
                        path: PathBuf::from(shell_path),
                    };
                }
            }

            Shell::Unix {
                path: PathBuf::from("/bin/sh"),
            }
        }

        #[cfg(windows)]
        {
            Shell::PowerShell
        }
    }

    pub fn with_shell(mut self, shell: Shell) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Runs `command` through the shell.
    pub async fn run_shell(&self, command: &str, working_dir: &Path) -> Result<ProcessOutput> {
        let (program, args) = self.shell_args(command);
        self.spawn(command, &program, &args, working_dir).await
    }

    /// Runs `program` directly. Bare names are resolved on `PATH`.
    pub async fn run_program(
        &self,
        program: &str,
        args: &[String],
        working_dir: &Path,
    ) -> Result<ProcessOutput> {
        let resolved = resolve_program(program, working_dir)?;
        self.spawn(program, &resolved.to_string_lossy(), args, working_dir)
            .await
    }

    async fn spawn(
        &self,
        label: &str,
        program: &str,
        args: &[String],
        working_dir: &Path,
    ) -> Result<ProcessOutput> {
        let output = TokioCommand::new(program)
            .args(args)
            .current_dir(working_dir)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| CoreError::ActionFailed {
                command: label.to_string(),
                exit_code: None,
                reason: e.to_string(),
            })?;

        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn shell_args(&self, command: &str) -> (String, Vec<String>) {
        match &self.shell {
            #[cfg(unix)]
            Shell::Unix { path } => (
                path.to_string_lossy().to_string(),
                vec!["-c".to_string(), command.to_string()],
            ),

            #[cfg(windows)]
            Shell::PowerShell => (
                "powershell.exe".to_string(),
                vec![
                    "-NoProfile".to_string(),
                    "-NonInteractive".to_string(),
                    "-Command".to_string(),
                    command.to_string(),
                ],
            ),

            #[cfg(windows)]
            Shell::Cmd => (
                "cmd.exe".to_string(),
                vec!["/C".to_string(), command.to_string()],
            ),
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves a program name. Paths are taken relative to `working_dir`.
fn resolve_program(program: &str, working_dir: &Path) -> Result<PathBuf> {
    let not_found = |reason: String| CoreError::ActionFailed {
        command: program.to_string(),
        exit_code: None,
        reason,
    };

    if program.contains('/') || program.contains('\\') {
        let path = working_dir.join(program);
        return if path.exists() {
            Ok(path)
        } else {
            Err(not_found(format!("{} does not exist", path.display())))
        };
    }

    which::which(program).map_err(|e| not_found(format!("program not found: {}", e)))
}
