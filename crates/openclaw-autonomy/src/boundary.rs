//! Filesystem boundary — rejects tool calls that reach outside scope.
//!
//! Readable, writable, and denied roots are home-expanded and absolutised
//! once at construction. Denied paths dominate: a path inside a denied root
//! is refused even when a writable root also covers it. Containment is
//! component-wise, never string-prefix based, so `/home/alic` does not
//! contain `/home/alice/secrets`.

use serde_json::Value;
use std::path::{Path, PathBuf};

use openclaw_core::config::FilesystemBoundaryConfig;
use openclaw_core::paths::{expand_home, normalize_path};

/// Filesystem access mode a tool call was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only access (read, ls, find, grep).
    Read,
    /// Mutating access (write, edit, apply_patch).
    Write,
}

/// Result of a boundary check.
#[derive(Debug, Clone)]
pub struct BoundaryCheck {
    /// Whether the access is allowed.
    pub allowed: bool,
    /// Why, in terms suitable for the error surfaced to the agent.
    pub reason: String,
}

impl BoundaryCheck {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Check whether `child` is `parent` or lies under it, component-wise.
#[must_use]
pub fn is_path_inside(parent: &Path, child: &Path) -> bool {
    child.starts_with(parent)
}

/// Classify a tool's filesystem access mode.
///
/// Returns `None` for tools that take no filesystem path, meaning no
/// boundary check applies.
#[must_use]
pub fn tool_filesystem_mode(tool_name: &str) -> Option<AccessMode> {
    match tool_name {
        "write" | "edit" | "apply_patch" => Some(AccessMode::Write),
        "read" | "ls" | "find" | "grep" => Some(AccessMode::Read),
        _ => None,
    }
}

/// Extract the target path from tool parameters.
///
/// Probes the documented keys in order: `path`, `file_path`, `filePath`,
/// `directory`, `dir`. Parameters are opaque JSON; everything else is
/// ignored.
#[must_use]
pub fn extract_tool_path(params: &Value) -> Option<&str> {
    ["path", "file_path", "filePath", "directory", "dir"]
        .iter()
        .find_map(|key| params.get(key).and_then(Value::as_str))
}

/// The configured filesystem access boundary.
#[derive(Debug, Clone)]
pub struct FilesystemBoundary {
    readable: Vec<PathBuf>,
    writable: Vec<PathBuf>,
    denied: Vec<PathBuf>,
}

impl FilesystemBoundary {
    /// Build a boundary from configuration, expanding `~` and absolutising
    /// every root once.
    #[must_use]
    pub fn new(config: &FilesystemBoundaryConfig) -> Self {
        let resolve =
            |paths: &[String]| -> Vec<PathBuf> {
                paths
                    .iter()
                    .map(|p| normalize_path(&expand_home(p)))
                    .collect()
            };
        Self {
            readable: resolve(&config.readable),
            writable: resolve(&config.writable),
            denied: resolve(&config.denied),
        }
    }

    /// Check whether `target` may be accessed with `mode`.
    ///
    /// Denied paths dominate; then the mode-specific list must cover the
    /// resolved target.
    #[must_use]
    pub fn check_access(&self, target: &str, mode: AccessMode) -> BoundaryCheck {
        let resolved = normalize_path(&expand_home(target));

        if let Some(denied) = self
            .denied
            .iter()
            .find(|denied| is_path_inside(denied, &resolved))
        {
            return BoundaryCheck::deny(format!(
                "path '{}' is inside denied path '{}'",
                resolved.display(),
                denied.display()
            ));
        }

        match mode {
            AccessMode::Write => {
                if self
                    .writable
                    .iter()
                    .any(|writable| is_path_inside(writable, &resolved))
                {
                    BoundaryCheck::allow(format!("path '{}' is writable", resolved.display()))
                } else {
                    BoundaryCheck::deny(format!(
                        "path '{}' is outside writable boundaries",
                        resolved.display()
                    ))
                }
            },
            AccessMode::Read => {
                if self
                    .readable
                    .iter()
                    .any(|readable| is_path_inside(readable, &resolved))
                {
                    BoundaryCheck::allow(format!("path '{}' is readable", resolved.display()))
                } else {
                    BoundaryCheck::deny(format!(
                        "path '{}' is outside readable boundaries",
                        resolved.display()
                    ))
                }
            },
        }
    }

    /// Validate a tool call against the boundary.
    ///
    /// Returns `None` (no check applies) when the tool takes no filesystem
    /// path or no path can be extracted from its parameters.
    #[must_use]
    pub fn validate_tool_access(&self, tool_name: &str, params: &Value) -> Option<BoundaryCheck> {
        let mode = tool_filesystem_mode(tool_name)?;
        let path = extract_tool_path(params)?;
        Some(self.check_access(path, mode))
    }
}

impl Default for FilesystemBoundary {
    fn default() -> Self {
        Self::new(&FilesystemBoundaryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn boundary(readable: &[&str], writable: &[&str], denied: &[&str]) -> FilesystemBoundary {
        FilesystemBoundary::new(&FilesystemBoundaryConfig {
            readable: readable.iter().map(ToString::to_string).collect(),
            writable: writable.iter().map(ToString::to_string).collect(),
            denied: denied.iter().map(ToString::to_string).collect(),
        })
    }

    // -----------------------------------------------------------------------
    // Containment
    // -----------------------------------------------------------------------

    #[test]
    fn test_containment_is_component_wise() {
        assert!(is_path_inside(
            Path::new("/home/alice"),
            Path::new("/home/alice/secrets")
        ));
        assert!(!is_path_inside(
            Path::new("/home/alic"),
            Path::new("/home/alice/secrets")
        ));
        assert!(is_path_inside(Path::new("/home/alice"), Path::new("/home/alice")));
    }

    // -----------------------------------------------------------------------
    // Access checks
    // -----------------------------------------------------------------------

    #[test]
    fn test_read_outside_readable_denied() {
        let b = boundary(&["~"], &["~/.openclaw/"], &[]);
        let check = b.check_access("/etc/passwd", AccessMode::Read);
        assert!(!check.allowed);
        assert!(check.reason.contains("outside readable boundaries"));
    }

    #[test]
    fn test_read_inside_home_allowed() {
        let b = boundary(&["~"], &["~/.openclaw/"], &[]);
        let check = b.check_access("~/notes.txt", AccessMode::Read);
        assert!(check.allowed);
    }

    #[test]
    fn test_write_requires_writable_root() {
        let b = boundary(&["~"], &["~/.openclaw/"], &[]);

        let inside = b.check_access("~/.openclaw/rules.json", AccessMode::Write);
        assert!(inside.allowed);

        let outside = b.check_access("~/file", AccessMode::Write);
        assert!(!outside.allowed);
        assert!(outside.reason.contains("outside writable boundaries"));
    }

    #[test]
    fn test_denied_dominates_readable_and_writable() {
        let b = boundary(&["~"], &["~"], &["~/secret"]);

        let read = b.check_access("~/secret/key", AccessMode::Read);
        assert!(!read.allowed);
        assert!(read.reason.contains("denied"));

        let write = b.check_access("~/secret/key", AccessMode::Write);
        assert!(!write.allowed);
    }

    #[test]
    fn test_denied_matches_path_itself() {
        let b = boundary(&["~"], &["~"], &["~/.netrc"]);
        assert!(!b.check_access("~/.netrc", AccessMode::Read).allowed);
    }

    #[test]
    fn test_default_boundary_denies_ssh() {
        let b = FilesystemBoundary::default();
        assert!(!b.check_access("~/.ssh/id_rsa", AccessMode::Read).allowed);
        assert!(!b.check_access("~/.ssh/id_rsa", AccessMode::Write).allowed);
    }

    #[test]
    fn test_relative_components_resolved_before_check() {
        let b = boundary(&["~"], &["~"], &["~/secret"]);
        let check = b.check_access("~/projects/../secret/key", AccessMode::Read);
        assert!(!check.allowed);
    }

    // -----------------------------------------------------------------------
    // Tool classification and path extraction
    // -----------------------------------------------------------------------

    #[test]
    fn test_tool_filesystem_mode() {
        assert_eq!(tool_filesystem_mode("write"), Some(AccessMode::Write));
        assert_eq!(tool_filesystem_mode("edit"), Some(AccessMode::Write));
        assert_eq!(tool_filesystem_mode("apply_patch"), Some(AccessMode::Write));
        assert_eq!(tool_filesystem_mode("read"), Some(AccessMode::Read));
        assert_eq!(tool_filesystem_mode("grep"), Some(AccessMode::Read));
        assert_eq!(tool_filesystem_mode("exec"), None);
        assert_eq!(tool_filesystem_mode("message"), None);
    }

    #[test]
    fn test_extract_tool_path_probes_keys_in_order() {
        let params = json!({"file_path": "/a", "dir": "/b"});
        assert_eq!(extract_tool_path(&params), Some("/a"));

        let params = json!({"directory": "/c"});
        assert_eq!(extract_tool_path(&params), Some("/c"));

        let params = json!({"filePath": "/d", "directory": "/c"});
        assert_eq!(extract_tool_path(&params), Some("/d"));

        let params = json!({"content": "no path here"});
        assert_eq!(extract_tool_path(&params), None);

        // Non-string values under the documented keys are ignored.
        let params = json!({"path": 42, "dir": "/e"});
        assert_eq!(extract_tool_path(&params), Some("/e"));
    }

    #[test]
    fn test_validate_tool_access_skips_unchecked_tools() {
        let b = FilesystemBoundary::default();
        assert!(
            b.validate_tool_access("exec", &json!({"command": "ls"}))
                .is_none()
        );
        assert!(b.validate_tool_access("read", &json!({})).is_none());
        assert!(
            b.validate_tool_access("read", &json!({"path": "~/x"}))
                .is_some()
        );
    }
}
