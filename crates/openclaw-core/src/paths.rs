//! State-directory resolution, home expansion, and secure JSON persistence.
//!
//! All persisted safety-core state lives under one state directory:
//! `$OPENCLAW_STATE_DIR` when set, otherwise `$HOME/.openclaw/`. Files are
//! written pretty-printed with a trailing newline and `0600` permissions on
//! Unix so approval rules and progression stats stay owner-readable only.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};

use crate::error::{CoreError, CoreResult};

/// Directory name under `$HOME` holding all persisted safety-core state.
pub const DEFAULT_STATE_DIR_NAME: &str = ".openclaw";

/// Resolve the state directory.
///
/// Checks `$OPENCLAW_STATE_DIR` first, then falls back to
/// `$HOME/.openclaw/`.
///
/// # Errors
///
/// Returns an error if neither environment variable is set.
pub fn state_dir() -> CoreResult<PathBuf> {
    if let Ok(custom) = std::env::var("OPENCLAW_STATE_DIR") {
        let p = PathBuf::from(&custom);
        if p.is_absolute() {
            return Ok(p);
        }
        return Err(CoreError::StateDirUnavailable(
            "OPENCLAW_STATE_DIR must be an absolute path".to_string(),
        ));
    }
    let home = std::env::var("HOME").map_err(|_| {
        CoreError::StateDirUnavailable(
            "neither OPENCLAW_STATE_DIR nor HOME environment variable is set".to_string(),
        )
    })?;
    Ok(PathBuf::from(home).join(DEFAULT_STATE_DIR_NAME))
}

/// Expand a leading `~` or `~/` to the user's home directory.
///
/// Paths without a leading tilde are returned unchanged. When `$HOME` is
/// unset the path is also returned unchanged rather than failing.
#[must_use]
pub fn expand_home(path: &str) -> PathBuf {
    let Ok(home) = std::env::var("HOME") else {
        return PathBuf::from(path);
    };
    if path == "~" {
        return PathBuf::from(home);
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}

/// Lexically normalize a path: make it absolute against the current
/// directory and resolve `.` / `..` components without touching the
/// filesystem.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                normalized.pop();
            },
            other => normalized.push(other),
        }
    }
    normalized
}

/// Write a value as pretty-printed JSON with a trailing newline.
///
/// Creates parent directories as needed. On Unix the file is chmodded to
/// `0600` after the write.
///
/// # Errors
///
/// Returns an error if serialization or any filesystem operation fails.
pub fn write_json_secure<T: Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut contents = serde_json::to_string_pretty(value)?;
    contents.push('\n');
    std::fs::write(path, &contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_expand_home_tilde_only() {
        let home = std::env::var("HOME").unwrap();
        assert_eq!(expand_home("~"), PathBuf::from(&home));
    }

    #[test]
    fn test_expand_home_tilde_slash() {
        let home = std::env::var("HOME").unwrap();
        assert_eq!(
            expand_home("~/.openclaw/rules.json"),
            PathBuf::from(home).join(".openclaw/rules.json")
        );
    }

    #[test]
    fn test_expand_home_plain_path_unchanged() {
        assert_eq!(expand_home("/etc/passwd"), PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn test_normalize_resolves_dot_components() {
        assert_eq!(
            normalize_path(Path::new("/a/b/./c/../d")),
            PathBuf::from("/a/b/d")
        );
    }

    #[test]
    fn test_write_json_secure_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sample.json");
        let value = Sample {
            name: "x".to_string(),
            count: 3,
        };

        write_json_secure(&path, &value).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with('\n'));
        let back: Sample = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, value);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_json_secure_sets_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secure.json");
        write_json_secure(&path, &serde_json::json!({"v": 1})).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
