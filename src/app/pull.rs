use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::info;

use crate::app::adb::bridge::DeviceBridge;
use crate::app::adb::paths::{batch_dir, join_device_path};
use crate::app::config::DeviceSettings;
use crate::app::error::AppError;
use crate::app::models::{ExtraKind, PullOutcome, PullRequest, PulledItem};
use crate::app::selection::select_logs;
use crate::app::worker::ProgressSink;

/// One pull batch: list, select, pull each file in turn, then the optional folders.
pub struct PullJob {
    bridge: Arc<dyn DeviceBridge>,
    device: DeviceSettings,
    local_root: PathBuf,
    request: PullRequest,
    trace_id: String,
}

impl PullJob {
    pub fn new(
        bridge: Arc<dyn DeviceBridge>,
        device: DeviceSettings,
        local_root: impl Into<PathBuf>,
        request: PullRequest,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            bridge,
            device,
            local_root: local_root.into(),
            request,
            trace_id: trace_id.into(),
        }
    }

    pub fn run(&self, sink: &ProgressSink) -> Result<PullOutcome, AppError> {
        self.run_at(sink, Local::now())
    }

    pub fn run_at(&self, sink: &ProgressSink, now: DateTime<Local>) -> Result<PullOutcome, AppError> {
        let log_dir = self.device.log_dir.as_str();
        sink.emit(format!("Listing device logs: {log_dir}"));
        let filenames = self.bridge.list_directory(log_dir);
        if filenames.is_empty() {
            return Err(AppError::not_found(
                format!("No logs found in {log_dir}"),
                &self.trace_id,
            ));
        }

        let target_dir = batch_dir(&self.local_root, &now);
        fs::create_dir_all(&target_dir).map_err(|err| {
            AppError::system(
                format!("Failed to create output dir {}: {err}", target_dir.display()),
                &self.trace_id,
            )
        })?;
        let target = target_dir.to_string_lossy().to_string();

        let selected = if self.request.selected_files.is_empty() {
            select_logs(&filenames, &self.request.services, self.request.count)
        } else {
            self.request.selected_files.clone()
        };
        info!(
            trace_id = %self.trace_id,
            listed = filenames.len(),
            selected = selected.len(),
            target = %target,
            "pull batch selected"
        );

        let mut pulled = Vec::with_capacity(selected.len());
        if selected.is_empty() {
            sink.emit("No matching logs by selection; continue with options if any.");
        } else {
            for name in &selected {
                let remote = join_device_path(log_dir, name);
                pulled.push(self.pull_one(sink, &remote, &target));
            }
        }

        let mut extras = Vec::new();
        if self.request.need_kernel {
            pulled.push(self.pull_one(sink, &self.device.kernel_dir, &target));
            extras.push(ExtraKind::Kernel);
        }
        if self.request.need_anr {
            sink.emit(format!("Pull {} ...", self.device.anr_dir));
            pulled.push(self.pull_one(sink, &self.device.anr_dir, &target));
            extras.push(ExtraKind::Anr);
        }
        if self.request.need_logcat {
            sink.emit(format!("Pull logcat folder: {}", self.device.logcat_dir));
            pulled.push(self.pull_one(sink, &self.device.logcat_dir, &target));
            extras.push(ExtraKind::Logcat);
        }

        Ok(PullOutcome {
            target_dir: target,
            pulled,
            extras,
        })
    }

    fn pull_one(&self, sink: &ProgressSink, remote_path: &str, local_dir: &str) -> PulledItem {
        sink.emit(format!("Pull: {remote_path}"));
        let status = self.bridge.pull(remote_path, local_dir);
        sink.emit(status.clone());
        PulledItem {
            remote_path: remote_path.to_string(),
            status,
        }
    }
}
