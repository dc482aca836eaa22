use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::error::AppError;

const CONFIG_PATH_ENV: &str = "LOG_PULLER_CONFIG_PATH";

pub const DEFAULT_SERVICES: &[&str] = &[
    "NavigationService",
    "pudutech-maptools",
    "RunTimeInfoService",
    "launcher",
    "can_service",
    "OTAService",
    "IOTService",
    "CoreService",
    "CloudService",
    "SpeechService",
    "Diagnose",
    "pudutech-mirsdk.g3log",
    "mirsdk.g3log",
];

pub const DEFAULT_KILL_PACKAGES: &[&str] = &[
    "com.pudutech.usher",
    "com.pudutech.resource.manager.service",
    "com.pudutech.solicit",
    "com.pudutech.business.usher",
    "com.pudutech.remotemaintenance",
    "com.pudutech.ad.service",
    "com.pudutech.business.delivery",
    "com.pudutech.business.recycle",
    "com.pudutech.business.call",
    "com.pudutech.business.function",
    "com.pudutech.function",
    "com.pudutech.puduossetting",
    "com.pudutech.business.gohome",
    "com.pudutech.robot.peanut",
    "com.pudutech.factory_test",
    "com.pudutech.bumblebee",
    "com.pudutech.business.cruise",
    "com.pudutech.project_one.business_delivery",
    "com.pudutech.map",
    "com.pudutech.iot2",
    "com.pudutech.cloud",
    "com.pudutech.hardware2",
    "com.pudutech.navigation",
    "com.pudutech.ota",
    "com.pudutech.maptools",
    "com.pudutech.setupwizard",
    "com.pudutech.hls2robot",
    "com.pudutech.robot.vacuum",
    "com.pudutech.launcher",
    "com.pudutech.core",
    "puduos.app",
    "run_time_info_service",
    "com.pudutech.diagnose",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdbSettings {
    pub command_path: String,
    pub serial: String,
    pub command_timeout_secs: u64,
    pub pull_timeout_secs: u64,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            command_path: String::new(),
            serial: String::new(),
            command_timeout_secs: 30,
            pull_timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceSettings {
    pub log_dir: String,
    pub kernel_dir: String,
    pub logcat_dir: String,
    pub anr_dir: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            log_dir: "sdcard/pudu/log".to_string(),
            kernel_dir: "/sdcard/pudu/log/kernel".to_string(),
            logcat_dir: "/sdcard/pudu/log/kernel/log".to_string(),
            anr_dir: "/data/anr".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    pub local_root: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            local_root: default_local_root().to_string_lossy().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectionSettings {
    pub default_count: i64,
    pub services: Vec<String>,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            default_count: 30,
            services: DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KillSettings {
    pub packages: Vec<String>,
}

impl Default for KillSettings {
    fn default() -> Self {
        Self {
            packages: DEFAULT_KILL_PACKAGES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub adb: AdbSettings,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub selection: SelectionSettings,
    #[serde(default)]
    pub kill: KillSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_local_root() -> PathBuf {
    home_dir().join("pudu").join("log")
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    home_dir().join(".log_puller_config.json")
}

pub fn backup_config_path(path: &Path) -> PathBuf {
    path.with_extension("backup.json")
}

pub fn load_config(trace_id: &str) -> Result<AppConfig, AppError> {
    load_config_from_path(&config_path(), trace_id)
}

pub fn save_config(config: &AppConfig, trace_id: &str) -> Result<(), AppError> {
    let path = config_path();
    save_config_to_path(config, &path, &backup_config_path(&path), trace_id)
}

pub fn load_config_from_path(path: &Path, trace_id: &str) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), trace_id))?;
    let config: AppConfig = serde_json::from_str(&raw)
        .map_err(|err| AppError::system(format!("Failed to parse config: {err}"), trace_id))?;
    Ok(validate_config(config))
}

pub fn save_config_to_path(
    config: &AppConfig,
    path: &Path,
    backup_path: &Path,
    trace_id: &str,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if path.exists() {
        let _ = fs::copy(path, backup_path);
    }
    let payload = serde_json::to_string_pretty(config).map_err(|err| {
        AppError::system(format!("Failed to serialize config: {err}"), trace_id)
    })?;
    fs::write(path, payload)
        .map_err(|err| AppError::system(format!("Failed to write config: {err}"), trace_id))?;
    Ok(())
}

pub fn validate_config(mut config: AppConfig) -> AppConfig {
    let defaults_adb = AdbSettings::default();
    if config.adb.command_timeout_secs == 0 {
        config.adb.command_timeout_secs = defaults_adb.command_timeout_secs;
    }
    if config.adb.pull_timeout_secs == 0 {
        config.adb.pull_timeout_secs = defaults_adb.pull_timeout_secs;
    }

    let defaults_device = DeviceSettings::default();
    if config.device.log_dir.trim().is_empty() {
        config.device.log_dir = defaults_device.log_dir;
    }
    if config.device.kernel_dir.trim().is_empty() {
        config.device.kernel_dir = defaults_device.kernel_dir;
    }
    if config.device.logcat_dir.trim().is_empty() {
        config.device.logcat_dir = defaults_device.logcat_dir;
    }
    if config.device.anr_dir.trim().is_empty() {
        config.device.anr_dir = defaults_device.anr_dir;
    }

    if config.output.local_root.trim().is_empty() {
        config.output.local_root = OutputSettings::default().local_root;
    }
    if config.selection.default_count < 0 {
        config.selection.default_count = SelectionSettings::default().default_count;
    }
    config.selection.services.retain(|svc| !svc.trim().is_empty());
    config.kill.packages.retain(|pkg| !pkg.trim().is_empty());
    if config.logging.level.trim().is_empty() {
        config.logging.level = LoggingSettings::default().level;
    }
    config
}
