//! Demo configuration: planner options and an optional dataset override.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use dirs_next::{config_dir, home_dir};
use fieldplan_engine::PlannerOptions;
use serde::{Deserialize, Serialize};

use crate::people::PeopleDataset;

pub const CONFIG_PATH_ENV: &str = "FIELDPLAN_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub planner: PlannerOptions,
    /// Replaces the built-in people when present.
    pub people: Option<PeopleDataset>,
}

impl DemoConfig {
    pub fn dataset(&self) -> PeopleDataset {
        self.people.clone().unwrap_or_default()
    }
}

/// Returns the default path for the demo configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldplan")
        .join("config.json")
}

/// Loads the configuration from `path`; a missing file yields defaults.
///
/// `.yaml` and `.yml` files are read as YAML, everything else as JSON.
pub fn load_config_from_path(path: &Path) -> anyhow::Result<DemoConfig> {
    if !path.exists() {
        return Ok(DemoConfig::default());
    }

    let content = fs::read_to_string(path).with_context(|| format!("Failed to read config: {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| matches!(extension, "yaml" | "yml"));
    let config = if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))?
    } else {
        serde_json::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))?
    };
    Ok(config)
}

fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if trimmed == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = trimmed.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(trimmed)
}

#[cfg(test)]
mod tests {
    use fieldplan_engine::IndexOverwritePolicy;
    use std::io::Write;

    use super::*;

    #[test]
    fn default_path_honors_environment_override() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("/tmp/fieldplan/custom.yaml"), || {
            assert_eq!(default_config_path(), PathBuf::from("/tmp/fieldplan/custom.yaml"));
        });
    }

    #[test]
    fn default_path_ignores_blank_override() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("  "), || {
            let path = default_config_path();
            assert!(path.ends_with("fieldplan/config.json"), "unexpected path {}", path.display());
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config_from_path(&dir.path().join("absent.json")).expect("defaults");
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn yaml_config_overrides_policy_and_people() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().expect("tempfile");
        writeln!(
            file,
            "planner:\n  index_overwrite: preserve_index\npeople:\n  index: [\"11122233344\"]\n  covid:\n    \"11122233344\": true"
        )
        .expect("write config");

        let config = load_config_from_path(file.path()).expect("parse yaml");
        assert_eq!(config.planner.index_overwrite, IndexOverwritePolicy::PreserveIndex);

        let dataset = config.dataset();
        assert_eq!(dataset.index, vec!["11122233344".to_string()]);
        assert!(dataset.gov.is_empty());
        assert_eq!(dataset.covid.get("11122233344"), Some(&true));
    }

    #[test]
    fn invalid_json_reports_path() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().expect("tempfile");
        write!(file, "{{ not json").expect("write config");

        let error = load_config_from_path(file.path()).expect_err("invalid json");
        assert!(error.to_string().starts_with("Failed to parse config:"), "unexpected error: {error}");
    }
}
