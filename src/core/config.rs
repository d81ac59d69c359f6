use crate::core::substitute::{DEFAULT_MAX_RESULTS, MIN_CLUSTER_SIZE, SearchOptions};
use anyhow::{Context, Result, ensure};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DataConfig {
    /// CSV of classified funds, one row per fund with its cluster id.
    pub funds_path: String,
    /// Optional table of the same funds with numeric columns already standardized.
    pub normalized_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_min_cluster_size() -> usize {
    MIN_CLUSTER_SIZE
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_results: DEFAULT_MAX_RESULTS,
            min_cluster_size: MIN_CLUSTER_SIZE,
        }
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        SearchOptions {
            max_results: config.max_results,
            min_cluster_size: config.min_cluster_size,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "fundsub", "fundsub")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.search.max_results > 0,
            "search.max_results must be at least 1"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
data:
  funds_path: "/tmp/clusterized_funds.csv"
search:
  max_results: 20
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.data.funds_path, "/tmp/clusterized_funds.csv");
        assert!(config.data.normalized_path.is_none());
        assert_eq!(config.search.max_results, 20);
        assert_eq!(config.search.min_cluster_size, 10);

        let options = SearchOptions::from(&config.search);
        assert_eq!(options.max_results, 20);
        assert_eq!(options.min_cluster_size, 10);
    }

    #[test]
    fn test_search_section_is_optional() {
        let yaml_str = r#"
data:
  funds_path: "funds.csv"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert_eq!(config.search.max_results, 15);
        assert_eq!(config.search.min_cluster_size, 10);
    }

    #[test]
    fn test_missing_data_section_fails() {
        let result: Result<AppConfig, _> = serde_yaml::from_str("search:\n  max_results: 5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_max_results_is_rejected() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(
            &path,
            "data:\n  funds_path: \"funds.csv\"\nsearch:\n  max_results: 0\n",
        )
        .unwrap();

        let err = AppConfig::load_from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("max_results must be at least 1"));
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = AppConfig::load_from_path("/nonexistent/fundsub.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
