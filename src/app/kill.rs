use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::app::adb::bridge::DeviceBridge;
use crate::app::error::AppError;
use crate::app::models::{KillReport, KillRequest};
use crate::app::worker::ProgressSink;

const MAX_REMAINING_REPORTED: usize = 100;

/// First-seen order, duplicates and blanks dropped.
pub fn dedupe_packages(packages: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    packages
        .iter()
        .map(|pkg| pkg.trim())
        .filter(|pkg| !pkg.is_empty())
        .filter(|pkg| seen.insert(*pkg))
        .map(str::to_string)
        .collect()
}

pub fn delete_pdlog_command(log_dir: &str) -> String {
    format!(r#"find {log_dir} -type f -name "*pdlog*" -exec rm {{}} \;"#)
}

pub fn list_log_dir_command(log_dir: &str) -> String {
    format!("ls -l {log_dir} 2>/dev/null")
}

pub fn remaining_pdlog_lines(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter(|line| line.contains("pdlog") || line.contains("PDLOG"))
        .map(str::to_string)
        .collect()
}

/// Optionally wipes `*pdlog*` files, then force-stops every package one at a time.
pub struct KillJob {
    bridge: Arc<dyn DeviceBridge>,
    log_dir: String,
    request: KillRequest,
    trace_id: String,
}

impl KillJob {
    pub fn new(
        bridge: Arc<dyn DeviceBridge>,
        log_dir: impl Into<String>,
        request: KillRequest,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            bridge,
            log_dir: log_dir.into(),
            request,
            trace_id: trace_id.into(),
        }
    }

    pub fn run(&self, sink: &ProgressSink) -> Result<KillReport, AppError> {
        let mut report = KillReport::default();

        if self.request.delete_pdlog_first {
            match self.guarded(|| self.delete_pdlog(sink)) {
                Ok(remaining) => report.remaining_pdlog = remaining,
                Err(message) => sink.emit(format!("Delete pdlog failed: {message}")),
            }
        }

        for package in dedupe_packages(&self.request.packages) {
            sink.emit(format!("force-stop {package}"));
            report.attempted.push(package.clone());
            let command = format!("am force-stop {package}");
            let status = self
                .guarded(|| self.bridge.run_shell_status(&command))
                .and_then(|status| status);
            if let Err(message) = status {
                warn!(trace_id = %self.trace_id, package = %package, error = %message, "force-stop failed");
                sink.emit(format!("force-stop failed for {package}: {message}"));
                report.failed.push(package);
            }
        }

        Ok(report)
    }

    fn delete_pdlog(&self, sink: &ProgressSink) -> Vec<String> {
        let command = delete_pdlog_command(&self.log_dir);
        sink.emit(format!("Run: {command}"));
        self.bridge.run_shell(&command);

        let listing = self.bridge.run_shell(&list_log_dir_command(&self.log_dir));
        let remaining = remaining_pdlog_lines(&listing);
        if remaining.is_empty() {
            sink.emit("All pdlog files removed.");
        } else {
            sink.emit("Remain pdlog files:");
            for line in remaining.iter().take(MAX_REMAINING_REPORTED) {
                sink.emit(line.clone());
            }
        }
        remaining
    }

    /// A single step blowing up must not abort the rest of the batch.
    fn guarded<T>(&self, step: impl FnOnce() -> T) -> Result<T, String> {
        panic::catch_unwind(AssertUnwindSafe(step)).map_err(|payload| {
            payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unexpected failure".to_string())
        })
    }
}
