use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse<T> {
    pub trace_id: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdbInfo {
    pub available: bool,
    pub version_output: String,
    pub command_path: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullRequest {
    pub services: Vec<String>,
    pub count: i64,
    pub need_logcat: bool,
    pub need_kernel: bool,
    pub need_anr: bool,
    /// Explicit filenames; when non-empty these are pulled instead of running selection.
    pub selected_files: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtraKind {
    Kernel,
    Anr,
    Logcat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PulledItem {
    pub remote_path: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullOutcome {
    pub target_dir: String,
    pub pulled: Vec<PulledItem>,
    pub extras: Vec<ExtraKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KillRequest {
    pub packages: Vec<String>,
    pub delete_pdlog_first: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KillReport {
    pub attempted: Vec<String>,
    pub failed: Vec<String>,
    pub remaining_pdlog: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowseListing {
    pub services: Vec<String>,
    pub files: Vec<String>,
}
