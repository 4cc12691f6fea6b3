// Glob expansion for include patterns

use crate::error::{WardenError, Result};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::warn;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Expand one glob pattern into the files it matches
///
/// Relative patterns are resolved against `base`. Wildcards (`*`, `?`,
/// `[...]`, `[!...]`) never cross a `/`, hidden entries only match a literal
/// leading dot, and matches come back in sorted order. Directories are never
/// returned.
pub fn expand(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = Path::new(&Pattern::escape(&base.to_string_lossy())).join(pattern);
    let full = full.to_string_lossy();

    let paths = glob::glob_with(&full, MATCH_OPTIONS).map_err(|e| {
        WardenError::ConfigError(format!("Invalid include pattern '{}': {}", pattern, e))
    })?;

    let mut matched: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable include candidate: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    matched.sort();

    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_expand_sorted_and_relative() {
        let temp_dir = TempDir::new().unwrap();
        let conf_d = temp_dir.path().join("conf.d");
        fs::create_dir(&conf_d).unwrap();
        fs::write(conf_d.join("b.toml"), "").unwrap();
        fs::write(conf_d.join("a.toml"), "").unwrap();
        fs::write(conf_d.join(".hidden.toml"), "").unwrap();
        fs::write(conf_d.join("notes.txt"), "").unwrap();
        fs::create_dir(conf_d.join("dir.toml")).unwrap();

        let matched = expand(temp_dir.path(), "conf.d/*.toml").unwrap();
        assert_eq!(matched, vec![conf_d.join("a.toml"), conf_d.join("b.toml")]);
    }

    #[test]
    fn test_expand_character_classes() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a.toml", "b.toml", "c.toml", "app-1.toml", "app-12.toml"] {
            fs::write(temp_dir.path().join(name), "").unwrap();
        }
        let names = |pattern: &str| -> Vec<String> {
            expand(temp_dir.path(), pattern)
                .unwrap()
                .iter()
                .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        };

        assert_eq!(names("[ab].toml"), vec!["a.toml", "b.toml"]);
        assert_eq!(names("[!ab].toml"), vec!["c.toml"]);
        assert_eq!(names("app-?.toml"), vec!["app-1.toml"]);
    }

    #[test]
    fn test_expand_wildcard_does_not_cross_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested").join("deep.toml"), "").unwrap();

        assert!(expand(temp_dir.path(), "*.toml").unwrap().is_empty());
    }

    #[test]
    fn test_expand_literal_and_missing() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("extra.toml"), "").unwrap();

        let matched = expand(temp_dir.path(), "extra.toml").unwrap();
        assert_eq!(matched, vec![temp_dir.path().join("extra.toml")]);

        assert!(expand(temp_dir.path(), "missing.toml").unwrap().is_empty());
        assert!(expand(temp_dir.path(), "nodir/*.toml").unwrap().is_empty());
    }

    #[test]
    fn test_expand_absolute_pattern() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("abs.toml"), "").unwrap();

        let pattern = format!("{}/*.toml", temp_dir.path().display());
        let matched = expand(Path::new("/nonexistent"), &pattern).unwrap();
        assert_eq!(matched.len(), 1);
        assert!(matched[0].ends_with("abs.toml"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = expand(temp_dir.path(), "weird[.toml");
        assert!(matches!(result, Err(WardenError::ConfigError(_))));
    }
}
