/**
 * Config Module
 *
 * Loads `lra-data.toml`. Every field is optional; a missing file means the
 * defaults (the LRA release archive under data/input/lra_data).
 *
 * ```toml
 * data_dir = "data/input/lra_data"
 * retries = 3
 *
 * [[resources]]
 * name = "lra_release"
 * url = "https://storage.googleapis.com/long-range-arena/lra_release.gz"
 * kind = "tar_gz"
 * file_name = "lra_release.gz"
 * check_path = "lra_release"
 * ```
 */

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::downloads::{Resource, RetryPolicy};
use crate::error::{DataError, Result};
use crate::paths::DEFAULT_DATA_DIR;

/// Config file looked up in the project root
pub const CONFIG_FILE_NAME: &str = "lra-data.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Data directory, relative to the project root
    pub data_dir: PathBuf,
    /// Whole-request timeout
    pub timeout_secs: u64,
    /// Extra attempts for transient failures
    pub retries: u32,
    /// First retry delay, doubled after each attempt
    pub retry_backoff_ms: u64,
    pub user_agent: String,
    /// Fetched in order
    pub resources: Vec<Resource>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            timeout_secs: 1800, // 30 minutes
            retries: 3,
            retry_backoff_ms: 500,
            user_agent: format!("lra-data/{}", env!("CARGO_PKG_VERSION")),
            resources: vec![Resource::lra_release()],
        }
    }
}

/// Non-empty relative path made only of normal components
fn is_inside_data_dir(path: &str) -> bool {
    !path.is_empty() && Path::new(path).components().all(|c| matches!(c, Component::Normal(_)))
}

/// A bare file name, no separators and no `.`/`..`
fn is_single_file_name(name: &str) -> bool {
    !name.contains(['/', '\\']) && is_inside_data_dir(name)
}

impl FetchConfig {
    /// Load the config for a project
    ///
    /// `explicit` must exist when given; otherwise `{root}/lra-data.toml` is
    /// used if present and the defaults if not.
    pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(DataError::Config(format!("config file {:?} not found", path)));
                }
                path.to_path_buf()
            }
            None => {
                let path = project_root.join(CONFIG_FILE_NAME);
                if !path.exists() {
                    tracing::debug!(
                        "[Config] no {} in {:?}, using defaults",
                        CONFIG_FILE_NAME,
                        project_root
                    );
                    return Ok(Self::default());
                }
                path
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|e| DataError::io(&path, e))?;
        let config = Self::from_toml(&text)?;
        tracing::info!("[Config] loaded {:?} ({} resources)", path, config.resources.len());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| DataError::Config(e.to_string()))
    }

    /// Append an auxiliary plain-file resource
    pub fn with_aux(mut self, url: &str, name: Option<&str>) -> Self {
        let name = name.unwrap_or("auxiliary");
        self.resources.push(Resource::auxiliary(name, url));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.resources.is_empty() {
            return Err(DataError::Config("no resources configured".to_string()));
        }

        let mut names = HashSet::new();
        for res in &self.resources {
            if !names.insert(res.name.as_str()) {
                return Err(DataError::Config(format!(
                    "duplicate resource name '{}'",
                    res.name
                )));
            }
            if res.url.trim().is_empty() {
                return Err(DataError::Config(format!(
                    "resource '{}' has an empty url",
                    res.name
                )));
            }
            if !is_single_file_name(&res.file_name) {
                return Err(DataError::Config(format!(
                    "resource '{}' has an invalid file_name '{}'",
                    res.name, res.file_name
                )));
            }
            if let Some(check) = &res.check_path {
                if !is_inside_data_dir(check) {
                    return Err(DataError::Config(format!(
                        "resource '{}' has a check_path '{}' outside the data directory",
                        res.name, check
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}
