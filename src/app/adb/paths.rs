use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

pub fn validate_device_path(path: &str) -> Result<(), String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err("device path is required".to_string());
    }
    if trimmed.contains('\0') {
        return Err("device path contains invalid characters".to_string());
    }
    if trimmed.trim_end_matches('/').is_empty() {
        return Err("device path must not be root".to_string());
    }
    if trimmed.split('/').any(|segment| segment == "..") {
        return Err("device path must not contain '..' segments".to_string());
    }
    Ok(())
}

/// Joins a device directory and an entry name with exactly one `/`.
pub fn join_device_path(dir: &str, name: &str) -> String {
    let dir = dir.trim().trim_end_matches('/');
    let name = name.trim().trim_start_matches('/');
    if dir.is_empty() {
        return format!("/{name}");
    }
    format!("{dir}/{name}")
}

pub fn batch_dir_name(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// `<root>/<YYYYMMDDHHMMSS>` for one pull batch.
pub fn batch_dir(root: &Path, now: &DateTime<Local>) -> PathBuf {
    root.join(batch_dir_name(now))
}
