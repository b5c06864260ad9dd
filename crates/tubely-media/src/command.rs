//! External tool command builder and runner.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Builder for an external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Short name of the program, used in logs and errors.
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Arguments as lossy strings.
    pub fn build_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    success: bool,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Runs a [`ToolCommand`] to completion, capturing its output.
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    timeout_secs: Option<u64>,
}

impl ToolRunner {
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Set timeout. The child is killed when it expires.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_optional_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Run a command and wait for it to exit.
    ///
    /// A non-zero exit is not an error here; callers map it to their own
    /// typed failure using [`ToolOutput::success`].
    pub async fn run(&self, cmd: &ToolCommand) -> MediaResult<ToolOutput> {
        let tool = cmd.tool_name();
        check_tool(cmd.program())?;

        debug!("Running {}: {}", tool, cmd.build_args().join(" "));

        let child = Command::new(cmd.program())
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output())
                    .await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        // Dropping the future drops the child, which kills it.
                        warn!("{} timed out after {} seconds, killing process", tool, secs);
                        return Err(MediaError::Timeout { tool, secs });
                    }
                }
            }
            None => child.wait_with_output().await?,
        };

        Ok(ToolOutput {
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Resolve a tool binary, either a bare name on `PATH` or an explicit path.
pub fn check_tool(program: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let program = program.as_ref();
    which::which(program).map_err(|_| MediaError::ToolNotFound(program.display().to_string()))
}
