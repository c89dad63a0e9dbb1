//! Parses and validates a `GlobalConfig` from disk (spec.md §3, §10.2).

use std::path::Path;
use sweeper_core::{Error, GlobalConfig, PathRule, Result};

/// Reads `path`, parses it as TOML (`.toml` extension) or YAML (everything
/// else), and validates the result. Unknown fields are ignored by `serde`'s
/// default struct behavior; invalid ones fail with a typed `Config` error.
pub fn load(path: &Path) -> Result<GlobalConfig> {
    if !path.exists() {
        return Err(Error::ConfigNotFound(path.display().to_string()));
    }

    let contents = std::fs::read_to_string(path)?;

    let config: GlobalConfig = if path.extension().and_then(|e| e.to_str()) == Some("toml") {
        toml::from_str(&contents).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?
    } else {
        serde_yaml::from_str(&contents).map_err(|e| Error::Config(format!("invalid YAML: {e}")))?
    };

    validate(&config)?;
    Ok(config)
}

/// Validates the invariants spec.md §3 requires at load time: every path is
/// absolute, no explicit rule nests under another, and every percent field
/// is within 0..=100.
fn validate(config: &GlobalConfig) -> Result<()> {
    for path in &config.scan_paths {
        require_absolute(path)?;
    }
    for rule in &config.paths {
        require_absolute(&rule.path)?;
        validate_rule_percentages(rule)?;
    }

    require_percent("min_free_percent", config.min_free_percent)?;

    check_nesting(&config.paths)?;

    Ok(())
}

fn require_absolute(path: &std::path::Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(Error::Config(format!("path must be absolute: {}", path.display())));
    }
    Ok(())
}

fn require_percent(field: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(Error::Config(format!("{field} must be between 0 and 100, got {value}")));
    }
    Ok(())
}

fn validate_rule_percentages(rule: &PathRule) -> Result<()> {
    require_percent("max_free_percent", rule.max_free_percent)?;
    require_percent("target_free_percent", rule.target_free_percent)?;
    require_percent("stack_threshold", rule.stack_threshold)?;
    if let Some(min_free) = rule.min_free_percent {
        require_percent("min_free_percent", min_free)?;
    }
    Ok(())
}

/// A rule naming a path nested under another explicit rule's path is a
/// configuration error: it leaves the nested rule's thresholds unreachable,
/// since the scanner walks the outer rule's tree with the outer rule's
/// policy (spec.md §4.3 operates one rule's tree at a time, with no
/// override-by-nesting mechanism).
fn check_nesting(rules: &[PathRule]) -> Result<()> {
    for (i, a) in rules.iter().enumerate() {
        for (j, b) in rules.iter().enumerate() {
            if i == j {
                continue;
            }
            if b.path != a.path && b.path.starts_with(&a.path) {
                return Err(Error::Config(format!(
                    "rule path {} is nested under rule path {}",
                    b.path.display(),
                    a.path.display()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_is_config_not_found() {
        let result = load(Path::new("/nonexistent/sweeper.yaml"));
        assert!(matches!(result, Err(Error::ConfigNotFound(_))));
    }

    #[test]
    fn loads_valid_yaml_with_defaults() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        std::fs::write(
            file.path(),
            r#"
scan_paths:
  - /data/logs
age_off_days: 30
"#,
        )
        .unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.scan_paths, vec![std::path::PathBuf::from("/data/logs")]);
        assert_eq!(config.age_off_days, 30);
        assert_eq!(config.min_free_percent, 90.0);
    }

    #[test]
    fn loads_valid_toml() {
        let file = NamedTempFile::with_suffix(".toml").unwrap();
        std::fs::write(
            file.path(),
            r#"
scan_paths = ["/data/tmp"]
age_off_days = 14
"#,
        )
        .unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.scan_paths, vec![std::path::PathBuf::from("/data/tmp")]);
    }

    #[test]
    fn rejects_relative_scan_path() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        std::fs::write(file.path(), "scan_paths:\n  - relative/path\n").unwrap();

        let result = load(file.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn rejects_out_of_range_min_free_percent() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        std::fs::write(file.path(), "min_free_percent: 150.0\n").unwrap();

        let result = load(file.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn rejects_nested_rule_paths() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        std::fs::write(
            file.path(),
            r#"
paths:
  - path: /data/logs
  - path: /data/logs/archive
"#,
        )
        .unwrap();

        let result = load(file.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn sibling_paths_are_not_considered_nested() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        std::fs::write(
            file.path(),
            r#"
paths:
  - path: /data/logs
  - path: /data/tmp
"#,
        )
        .unwrap();

        assert!(load(file.path()).is_ok());
    }
}
