use std::path::Path;

pub const DEFAULT_ADB_PROGRAM: &str = "adb";
const SERIAL_ENV: &str = "ANDROID_SERIAL";

fn strip_wrapping_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|candidate| candidate.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    trimmed
}

/// CLI override first, then the configured path, then `adb` from `PATH`.
pub fn resolve_adb_program(cli_override: Option<&str>, configured: &str) -> String {
    cli_override
        .map(strip_wrapping_quotes)
        .filter(|value| !value.is_empty())
        .or_else(|| Some(strip_wrapping_quotes(configured)).filter(|value| !value.is_empty()))
        .unwrap_or(DEFAULT_ADB_PROGRAM)
        .to_string()
}

pub fn validate_adb_program(program: &str) -> Result<(), String> {
    if program.trim().is_empty() {
        return Err("adb command is empty".to_string());
    }
    if program == DEFAULT_ADB_PROGRAM {
        return Ok(());
    }
    let path = Path::new(program);
    if path.is_dir() {
        return Err(format!("adb path {program} is a directory, expected an executable"));
    }
    if !path.exists() {
        return Err(format!("adb executable not found at {program}"));
    }
    Ok(())
}

/// CLI flag, then the configured serial, then `ANDROID_SERIAL`. `None` lets adb pick.
pub fn resolve_serial(cli_override: Option<&str>, configured: &str) -> Option<String> {
    let env_serial = std::env::var(SERIAL_ENV).ok();
    pick_serial(cli_override, configured, env_serial.as_deref())
}

fn pick_serial(cli: Option<&str>, configured: &str, env: Option<&str>) -> Option<String> {
    [cli, Some(configured), env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_quotes_from_configured_path() {
        assert_eq!(
            resolve_adb_program(None, "  \"/opt/android/platform-tools/adb\"  "),
            "/opt/android/platform-tools/adb"
        );
        assert_eq!(
            resolve_adb_program(None, "'/opt/android/platform-tools/adb'"),
            "/opt/android/platform-tools/adb"
        );
    }

    #[test]
    fn cli_override_wins_over_config() {
        assert_eq!(
            resolve_adb_program(Some("/usr/local/bin/adb"), "/opt/adb"),
            "/usr/local/bin/adb"
        );
        assert_eq!(resolve_adb_program(Some("  "), "/opt/adb"), "/opt/adb");
    }

    #[test]
    fn falls_back_to_path_lookup() {
        assert_eq!(resolve_adb_program(None, ""), "adb");
        assert_eq!(resolve_adb_program(Some(""), "   "), "adb");
    }

    #[test]
    fn rejects_missing_executable() {
        let err = validate_adb_program("/this/path/should/not/exist/adb").unwrap_err();
        assert!(err.contains("not found"));
        assert!(validate_adb_program("adb").is_ok());
    }

    #[test]
    fn rejects_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = validate_adb_program(&dir.path().to_string_lossy()).unwrap_err();
        assert!(err.contains("directory"));
    }

    #[test]
    fn serial_precedence() {
        assert_eq!(pick_serial(Some("cli"), "cfg", Some("env")).as_deref(), Some("cli"));
        assert_eq!(pick_serial(None, "cfg", Some("env")).as_deref(), Some("cfg"));
        assert_eq!(pick_serial(Some(" "), "", Some("env")).as_deref(), Some("env"));
        assert_eq!(pick_serial(None, "", None), None);
    }
}
