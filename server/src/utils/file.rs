//! File utility functions

use std::path::{Path, PathBuf};

/// Expand a user-supplied path to an absolute path
///
/// Handles `~` and `~/..` (home directory) and resolves relative paths
/// against the current working directory. Absolute paths pass through.
///
/// ```text
/// expand_path("~/.basalt/basalt.json") // -> /home/user/.basalt/basalt.json
/// expand_path("commands/add.json")     // -> /current/dir/commands/add.json
/// ```
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let expanded = match path.strip_prefix('~') {
        Some("") => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        Some(rest) if rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(&rest[1..]),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

/// Read a UTF-8 file after expanding its path
pub fn read_expanded(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(expand_path(&path.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_expand_path_absolute() {
        assert_eq!(expand_path("/etc/basalt.json"), PathBuf::from("/etc/basalt.json"));
    }

    #[test]
    fn test_expand_path_relative() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("cmd/add.json"), cwd.join("cmd/add.json"));
    }

    #[test]
    fn test_expand_path_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~"), home);
            assert_eq!(
                expand_path("~/.basalt/basalt.json"),
                home.join(".basalt/basalt.json")
            );
        }
    }

    #[test]
    fn test_expand_path_tilde_user_is_not_home() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("~other"), cwd.join("~other"));
    }

    #[test]
    fn test_expand_path_trims_and_empty() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("   "), cwd);
        assert_eq!(expand_path("  data  "), cwd.join("data"));
    }

    #[test]
    fn test_read_expanded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd.json");
        std::fs::write(&path, r#"{"op":"list_tables"}"#).unwrap();
        assert_eq!(read_expanded(&path).unwrap(), r#"{"op":"list_tables"}"#);
        assert!(read_expanded(&dir.path().join("missing.json")).is_err());
    }
}
