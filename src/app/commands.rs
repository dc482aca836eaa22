use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::app::adb::bridge::{AdbBridge, DeviceBridge};
use crate::app::adb::locator::{resolve_adb_program, resolve_serial};
use crate::app::adb::paths::validate_device_path;
use crate::app::config::{save_config, AppConfig};
use crate::app::error::{AppError, ErrorCode};
use crate::app::kill::KillJob;
use crate::app::models::{
    AdbInfo, BrowseListing, CommandResponse, KillReport, KillRequest, PullOutcome, PullRequest,
};
use crate::app::pull::PullJob;
use crate::app::selection::{LogSelector, ServiceChoice};
use crate::app::state::AppState;

pub fn resolve_trace_id(input: Option<String>) -> String {
    input
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Per-invocation inputs shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: AppConfig,
    pub trace_id: String,
    pub adb_override: Option<String>,
    pub serial_override: Option<String>,
}

impl CommandContext {
    pub fn adb_bridge(&self) -> AdbBridge {
        let program = resolve_adb_program(self.adb_override.as_deref(), &self.config.adb.command_path);
        let serial = resolve_serial(self.serial_override.as_deref(), &self.config.adb.serial);
        AdbBridge::new(program, serial, &self.trace_id).with_timeouts(
            Duration::from_secs(self.config.adb.command_timeout_secs),
            Duration::from_secs(self.config.adb.pull_timeout_secs),
        )
    }

    pub fn selector(&self) -> LogSelector {
        LogSelector::new(self.config.selection.services.clone())
    }

    fn respond<T>(&self, data: T) -> CommandResponse<T> {
        CommandResponse {
            trace_id: self.trace_id.clone(),
            data,
        }
    }
}

fn ensure_device_path(path: &str, field: &str, trace_id: &str) -> Result<(), AppError> {
    validate_device_path(path)
        .map_err(|message| AppError::validation(format!("{field}: {message}"), trace_id))
}

/// Surfaces a missing or broken adb as a progress line; the batch still runs and degrades.
fn report_bridge_health(bridge: &AdbBridge, on_progress: &mut dyn FnMut(&str)) {
    let info = bridge.probe();
    if let Some(error) = info.error.as_deref().filter(|_| !info.available) {
        on_progress(&format!("adb unavailable ({}): {error}", info.command_path));
    }
}

pub fn check_adb(ctx: &CommandContext) -> CommandResponse<AdbInfo> {
    info!(trace_id = %ctx.trace_id, "check_adb");
    ctx.respond(ctx.adb_bridge().probe())
}

pub fn list_services(ctx: &CommandContext) -> CommandResponse<Vec<String>> {
    ctx.respond(ctx.selector().known_services().to_vec())
}

pub fn browse_logs(
    ctx: &CommandContext,
    choice: &ServiceChoice,
) -> Result<CommandResponse<BrowseListing>, AppError> {
    browse_logs_inner(ctx, &ctx.adb_bridge(), choice).map(|listing| ctx.respond(listing))
}

fn browse_logs_inner(
    ctx: &CommandContext,
    bridge: &dyn DeviceBridge,
    choice: &ServiceChoice,
) -> Result<BrowseListing, AppError> {
    let log_dir = &ctx.config.device.log_dir;
    ensure_device_path(log_dir, "device.log_dir", &ctx.trace_id)?;

    let files = bridge.list_directory(log_dir);
    if files.is_empty() {
        return Err(AppError::not_found(
            format!("No logs found in {log_dir}"),
            &ctx.trace_id,
        ));
    }
    let selector = ctx.selector();
    let listing = BrowseListing {
        services: selector.resolve_services(choice),
        files: selector.browse(&files, choice),
    };
    info!(trace_id = %ctx.trace_id, count = listing.files.len(), "browse_logs");
    Ok(listing)
}

pub fn pull_logs(
    state: &AppState,
    ctx: &CommandContext,
    request: PullRequest,
    mut on_progress: impl FnMut(&str),
) -> Result<CommandResponse<PullOutcome>, AppError> {
    let bridge = ctx.adb_bridge();
    report_bridge_health(&bridge, &mut on_progress);
    pull_logs_inner(state, ctx, Arc::new(bridge), request, on_progress).map(|o| ctx.respond(o))
}

pub(crate) fn pull_logs_inner(
    state: &AppState,
    ctx: &CommandContext,
    bridge: Arc<dyn DeviceBridge>,
    request: PullRequest,
    mut on_progress: impl FnMut(&str),
) -> Result<PullOutcome, AppError> {
    let device = ctx.config.device.clone();
    ensure_device_path(&device.log_dir, "device.log_dir", &ctx.trace_id)?;
    if ctx.config.output.local_root.trim().is_empty() {
        return Err(AppError::validation("output.local_root is required", &ctx.trace_id));
    }

    on_progress(&format!(
        "Start pull: services={:?}, count={}, logcat={}, kernel={}, anr={}",
        request.services, request.count, request.need_logcat, request.need_kernel, request.need_anr
    ));
    if !request.selected_files.is_empty() {
        on_progress(&format!("Manual list: files={:?}", request.selected_files));
    }

    let job = PullJob::new(
        bridge,
        device,
        ctx.config.output.local_root.clone(),
        request,
        ctx.trace_id.clone(),
    );
    let handle = state
        .pull_worker
        .start(&ctx.trace_id, move |sink| job.run(sink))?;
    let outcome = handle.wait(|line| on_progress(line));
    match &outcome {
        Ok(done) => info!(trace_id = %ctx.trace_id, target = %done.target_dir, "pull finished"),
        Err(err) if err.is(ErrorCode::NotFound) => {
            info!(trace_id = %ctx.trace_id, error = %err.error, "nothing to pull")
        }
        Err(err) => warn!(trace_id = %ctx.trace_id, error = %err.error, "pull failed"),
    }
    outcome
}

pub fn kill_apps(
    state: &AppState,
    ctx: &CommandContext,
    request: KillRequest,
    mut on_progress: impl FnMut(&str),
) -> Result<CommandResponse<KillReport>, AppError> {
    let bridge = ctx.adb_bridge();
    report_bridge_health(&bridge, &mut on_progress);
    kill_apps_inner(state, ctx, Arc::new(bridge), request, on_progress).map(|r| ctx.respond(r))
}

pub(crate) fn kill_apps_inner(
    state: &AppState,
    ctx: &CommandContext,
    bridge: Arc<dyn DeviceBridge>,
    request: KillRequest,
    mut on_progress: impl FnMut(&str),
) -> Result<KillReport, AppError> {
    let log_dir = ctx.config.device.log_dir.clone();
    ensure_device_path(&log_dir, "device.log_dir", &ctx.trace_id)?;
    on_progress(&format!("Start kill. delete_pdlog={}", request.delete_pdlog_first));

    let job = KillJob::new(bridge, log_dir, request, ctx.trace_id.clone());
    let handle = state
        .kill_worker
        .start(&ctx.trace_id, move |sink| job.run(sink))?;
    let report = handle.wait(|line| on_progress(line));
    if let Ok(report) = &report {
        info!(
            trace_id = %ctx.trace_id,
            attempted = report.attempted.len(),
            failed = report.failed.len(),
            "kill finished"
        );
    }
    report
}

pub fn get_config(ctx: &CommandContext) -> CommandResponse<AppConfig> {
    ctx.respond(ctx.config.clone())
}

pub fn reset_config(ctx: &CommandContext) -> Result<CommandResponse<AppConfig>, AppError> {
    let config = AppConfig::default();
    save_config(&config, &ctx.trace_id)?;
    info!(trace_id = %ctx.trace_id, "config reset");
    Ok(ctx.respond(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::adb::testing::ScriptedBridge;

    fn context(local_root: &std::path::Path) -> CommandContext {
        let mut config = AppConfig::default();
        config.output.local_root = local_root.to_string_lossy().to_string();
        config.selection.services = vec!["svcA".to_string(), "svcB".to_string()];
        CommandContext {
            config,
            trace_id: "trace-cmd".to_string(),
            adb_override: None,
            serial_override: None,
        }
    }

    #[test]
    fn resolve_trace_id_generates_when_blank() {
        assert_eq!(resolve_trace_id(Some("abc".to_string())), "abc");
        let generated = resolve_trace_id(Some("  ".to_string()));
        assert!(Uuid::parse_str(&generated).is_ok());
    }

    #[test]
    fn browse_lists_pdlog_files_for_choice() {
        let root = tempfile::tempdir().expect("tempdir");
        let ctx = context(root.path());
        let bridge = ScriptedBridge::default().with_listing(
            "sdcard/pudu/log",
            &["svcB.x.y.2.pdlog", "svcA.x.y.1.pdlog", "svcA.x.y.1.txt", "other.pdlog"],
        );

        let listing = browse_logs_inner(&ctx, &bridge, &ServiceChoice::Single("SVCA".to_string()))
            .expect("browse");
        assert_eq!(listing.services, vec!["SVCA"]);
        assert_eq!(listing.files, vec!["svcA.x.y.1.pdlog"]);

        let listing = browse_logs_inner(&ctx, &bridge, &ServiceChoice::All).expect("browse all");
        assert_eq!(listing.files, vec!["other.pdlog", "svcA.x.y.1.pdlog", "svcB.x.y.2.pdlog"]);
    }

    #[test]
    fn browse_empty_device_is_not_found() {
        let root = tempfile::tempdir().expect("tempdir");
        let ctx = context(root.path());
        let err = browse_logs_inner(&ctx, &ScriptedBridge::default(), &ServiceChoice::All)
            .expect_err("empty");
        assert_eq!(err.code, "ERR_NOT_FOUND");
        assert_eq!(err.trace_id, "trace-cmd");
    }

    #[test]
    fn pull_streams_progress_and_releases_slot() {
        let root = tempfile::tempdir().expect("tempdir");
        let ctx = context(root.path());
        let state = AppState::new();
        let bridge = Arc::new(
            ScriptedBridge::default()
                .with_listing("sdcard/pudu/log", &["svcA.1.2.10.log", "svcA.1.2.20.log"]),
        );
        let request = PullRequest {
            services: vec!["svcA".to_string()],
            count: 5,
            ..PullRequest::default()
        };

        let mut lines = Vec::new();
        let outcome = pull_logs_inner(&state, &ctx, bridge, request, |line| {
            lines.push(line.to_string())
        })
        .expect("pull");

        assert_eq!(outcome.pulled.len(), 1);
        assert!(lines[0].starts_with("Start pull: services=[\"svcA\"]"));
        assert!(lines.contains(&"Pull: sdcard/pudu/log/svcA.1.2.20.log".to_string()));
        assert!(!state.pull_worker.is_busy());
    }

    #[test]
    fn pull_rejected_while_another_pull_runs() {
        let root = tempfile::tempdir().expect("tempdir");
        let ctx = context(root.path());
        let state = AppState::new();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let blocker = state
            .pull_worker
            .start("trace-busy", move |_sink| {
                let _ = release_rx.recv_timeout(Duration::from_secs(5));
                Ok(())
            })
            .expect("blocker");

        let err = pull_logs_inner(
            &state,
            &ctx,
            Arc::new(ScriptedBridge::default()),
            PullRequest::default(),
            |_| {},
        )
        .expect_err("busy");
        assert_eq!(err.code, "ERR_VALIDATION");
        assert!(err.error.contains("already running"));

        // A kill may still run alongside the pull.
        let report = kill_apps_inner(
            &state,
            &ctx,
            Arc::new(ScriptedBridge::default()),
            KillRequest {
                packages: vec!["com.a".to_string()],
                delete_pdlog_first: false,
            },
            |_| {},
        )
        .expect("kill");
        assert_eq!(report.attempted, vec!["com.a"]);

        release_tx.send(()).expect("release");
        blocker.wait(|_| {}).expect("blocker done");
    }

    #[test]
    fn rejects_invalid_log_dir() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut ctx = context(root.path());
        ctx.config.device.log_dir = "/sdcard/../etc".to_string();
        let err = kill_apps_inner(
            &AppState::new(),
            &ctx,
            Arc::new(ScriptedBridge::default()),
            KillRequest {
                packages: Vec::new(),
                delete_pdlog_first: true,
            },
            |_| {},
        )
        .expect_err("invalid path");
        assert_eq!(err.code, "ERR_VALIDATION");
        assert!(err.error.starts_with("device.log_dir"));
    }
}
