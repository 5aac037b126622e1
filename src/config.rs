//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/netforest/netforest.toml`
//! 3. Local config: `./.netforest.toml` (or the file given with `--config`)
//! 4. Environment variables: `NETFOREST_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::builder::DEFAULT_PROGRESS_INTERVAL;
use crate::domain::OverlapPolicy;

/// Name of the local config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".netforest.toml";

/// Unified configuration for netforest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Handling of partially overlapping ranges
    pub overlap_policy: OverlapPolicy,
    /// Sweep events between two progress log lines, 0 disables
    pub progress_interval: usize,
    /// Print node annotations in tree output
    pub annotate: bool,
    /// Default reference snapshot for `refine`
    pub reference_snapshot: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            overlap_policy: OverlapPolicy::Reject,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            annotate: true,
            reference_snapshot: None,
        }
    }
}

/// Raw settings for intermediate parsing (None means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub overlap_policy: Option<OverlapPolicy>,
    pub progress_interval: Option<usize>,
    pub annotate: Option<bool>,
    pub reference_snapshot: Option<PathBuf>,
}

/// Get the XDG config directory for netforest.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "netforest").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("netforest.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(LOCAL_CONFIG_FILE)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Settings {
    /// Overlay values that were specified on top of self.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            overlap_policy: overlay.overlap_policy.unwrap_or(self.overlap_policy),
            progress_interval: overlay.progress_interval.unwrap_or(self.progress_interval),
            annotate: overlay.annotate.unwrap_or(self.annotate),
            reference_snapshot: overlay
                .reference_snapshot
                .clone()
                .or_else(|| self.reference_snapshot.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// `local` is an explicit config file; it must exist. Without it,
    /// `./.netforest.toml` is used when present.
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path().filter(|p| p.exists());
        let local = match local {
            Some(path) if !path.exists() => {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            Some(path) => Some(path.to_path_buf()),
            None => Some(local_config_path(Path::new("."))).filter(|p| p.exists()),
        };
        Self::load_from(global.as_deref(), local.as_deref())
    }

    /// Load from explicit global/local files (either may be absent), then
    /// apply environment overrides.
    pub fn load_from(global: Option<&Path>, local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        for path in [global, local].into_iter().flatten() {
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;

        if let Some(path) = current.reference_snapshot.take() {
            current.reference_snapshot = Some(expand_path(&path));
        }

        Ok(current)
    }

    /// Apply NETFOREST_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("NETFOREST")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("overlap_policy") {
            settings.overlap_policy = match val.to_lowercase().as_str() {
                "reject" => OverlapPolicy::Reject,
                "tolerate" => OverlapPolicy::Tolerate,
                other => {
                    return Err(ApplicationError::Config {
                        message: format!("invalid NETFOREST_OVERLAP_POLICY: {other}"),
                    })
                }
            };
        }
        if let Ok(val) = config.get_int("progress_interval") {
            settings.progress_interval = usize::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("invalid NETFOREST_PROGRESS_INTERVAL: {val}"),
            })?;
        }
        if let Ok(val) = config.get_bool("annotate") {
            settings.annotate = val;
        }
        if let Ok(val) = config.get_string("reference_snapshot") {
            settings.reference_snapshot = Some(PathBuf::from(val));
        }

        Ok(settings)
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_files_when_loading_then_uses_defaults() {
        let settings = Settings::load_from(None, None).unwrap();
        assert_eq!(settings.progress_interval, DEFAULT_PROGRESS_INTERVAL);
        assert!(settings.annotate);
    }

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_unspecified() {
        let base = Settings::default();
        let overlay = RawSettings {
            annotate: Some(false),
            ..RawSettings::default()
        };
        let merged = base.merge_with(&overlay);
        assert!(!merged.annotate);
        assert_eq!(merged.overlap_policy, OverlapPolicy::Reject);
        assert_eq!(merged.progress_interval, base.progress_interval);
    }

    #[test]
    fn given_plain_path_when_expanding_then_unchanged() {
        let path = Path::new("snapshots/full.txt");
        assert_eq!(expand_path(path), path.to_path_buf());
    }
}
