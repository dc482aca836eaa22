use std::time::Duration;

use tracing::{debug, warn};

use crate::app::adb::locator::validate_adb_program;
use crate::app::adb::runner::{run_command_with_timeout, CommandOutput};
use crate::app::error::AppError;
use crate::app::models::AdbInfo;

/// Everything the pull and kill batches need from a device.
///
/// Implementations never fail: a broken call degrades to an empty listing or a status string
/// so a batch can report it and move on to the next item. `run_shell_status` is the one call
/// that surfaces the failure reason instead of swallowing it.
pub trait DeviceBridge: Send + Sync {
    /// `shell ls <path>`, one entry per line. Empty on any failure.
    fn list_directory(&self, path: &str) -> Vec<String>;

    /// `pull <remote> <local>`. Returns whatever adb printed, or a description of the failure.
    fn pull(&self, remote_path: &str, local_dir: &str) -> String;

    /// `shell <command>`. Empty on any failure.
    fn run_shell(&self, command: &str) -> String;

    /// `shell <command>` for callers that must report a failed command, such as a force-stop
    /// that adb rejected. `Err` carries the reason adb gave.
    fn run_shell_status(&self, command: &str) -> Result<String, String> {
        Ok(self.run_shell(command))
    }
}

#[derive(Debug, Clone)]
pub struct AdbBridge {
    program: String,
    serial: Option<String>,
    command_timeout: Duration,
    pull_timeout: Duration,
    trace_id: String,
}

impl AdbBridge {
    pub fn new(program: impl Into<String>, serial: Option<String>, trace_id: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            serial,
            command_timeout: Duration::from_secs(30),
            pull_timeout: Duration::from_secs(600),
            trace_id: trace_id.into(),
        }
    }

    pub fn with_timeouts(mut self, command_timeout: Duration, pull_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self.pull_timeout = pull_timeout;
        self
    }

    fn build_args<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut full = Vec::new();
        if let Some(serial) = &self.serial {
            full.push("-s".to_string());
            full.push(serial.clone());
        }
        full.extend(args.into_iter().map(str::to_string));
        full
    }

    fn invoke(&self, args: Vec<String>, timeout: Duration) -> Result<CommandOutput, AppError> {
        debug!(trace_id = %self.trace_id, program = %self.program, args = ?args, "adb invoke");
        let output = run_command_with_timeout(&self.program, &args, timeout, &self.trace_id)?;
        if !output.success() {
            return Err(AppError::dependency(output.failure_reason(), &self.trace_id));
        }
        Ok(output)
    }

    /// Runs `adb version`. The error text is what a user needs to fix the setup.
    pub fn probe(&self) -> AdbInfo {
        let unavailable = |error: String| AdbInfo {
            available: false,
            version_output: String::new(),
            command_path: self.program.clone(),
            error: Some(error),
        };

        if let Err(message) = validate_adb_program(&self.program) {
            warn!(trace_id = %self.trace_id, error = %message, "adb validation failed");
            return unavailable(message);
        }

        let args = vec!["version".to_string()];
        match self.invoke(args, Duration::from_secs(5)) {
            Ok(output) => AdbInfo {
                available: true,
                version_output: output.stdout.trim().to_string(),
                command_path: self.program.clone(),
                error: None,
            },
            Err(err) => {
                warn!(trace_id = %self.trace_id, error = %err.error, "adb check failed");
                unavailable(err.error)
            }
        }
    }
}

impl DeviceBridge for AdbBridge {
    fn list_directory(&self, path: &str) -> Vec<String> {
        let args = self.build_args(["shell", "ls", path]);
        match self.invoke(args, self.command_timeout) {
            Ok(output) => split_listing(&output.stdout),
            Err(err) => {
                warn!(trace_id = %self.trace_id, path, error = %err.error, "adb ls failed");
                Vec::new()
            }
        }
    }

    fn pull(&self, remote_path: &str, local_dir: &str) -> String {
        let args = self.build_args(["pull", remote_path, local_dir]);
        match self.invoke(args, self.pull_timeout) {
            Ok(output) => output.stdout.trim().to_string(),
            Err(err) => {
                warn!(trace_id = %self.trace_id, remote_path, error = %err.error, "adb pull failed");
                format!("Pull failed for {remote_path}: {}", err.error)
            }
        }
    }

    fn run_shell(&self, command: &str) -> String {
        self.run_shell_status(command).unwrap_or_default()
    }

    fn run_shell_status(&self, command: &str) -> Result<String, String> {
        let args = self.build_args(["shell", command]);
        match self.invoke(args, self.command_timeout) {
            Ok(output) => Ok(output.stdout.trim().to_string()),
            Err(err) => {
                warn!(trace_id = %self.trace_id, command, error = %err.error, "adb shell failed");
                Err(err.error)
            }
        }
    }
}

pub fn split_listing(stdout: &str) -> Vec<String> {
    stdout
        .trim()
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
