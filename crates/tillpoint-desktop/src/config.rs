//! Updater configuration.
//!
//! The policy lives in `updater.json` in the platform config directory. A
//! missing file means defaults. Environment variables are applied on top:
//!
//! - `TILLPOINT_UPDATE_FEED_URL` replaces the feed URL
//! - `TILLPOINT_UPDATE_DEV` forces update checks in development builds
//! - `TILLPOINT_UPDATE_PRERELEASE` offers pre-release builds

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tillpoint_updater::UpdatePolicy;

use crate::error::{ConfigError, Result};

/// Config file name inside the config directory.
pub const CONFIG_FILE: &str = "updater.json";

pub const ENV_FEED_URL: &str = "TILLPOINT_UPDATE_FEED_URL";
pub const ENV_DEV: &str = "TILLPOINT_UPDATE_DEV";
pub const ENV_PRERELEASE: &str = "TILLPOINT_UPDATE_PRERELEASE";

/// Returns the Tillpoint config directory.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "tillpoint", "Tillpoint").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Returns the path of the updater config file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Reads a policy from `path`, falling back to defaults if the file is missing.
pub fn load_policy_from(path: &Path) -> Result<UpdatePolicy> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No updater config, using defaults");
            return Ok(UpdatePolicy::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&bytes).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a policy to `path`, creating parent directories.
pub fn save_policy_to(path: &Path, policy: &UpdatePolicy) -> Result<()> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(policy).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(io_err)
}

/// Applies environment overrides read through `var`.
pub fn apply_env_overrides<F>(mut policy: UpdatePolicy, var: F) -> UpdatePolicy
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(feed) = var(ENV_FEED_URL).filter(|v| !v.trim().is_empty()) {
        tracing::info!(feed = %feed, "Feed URL overridden from environment");
        policy.feed_url = feed.trim().to_string();
    }
    if let Some(dev) = var(ENV_DEV).and_then(|v| parse_flag(ENV_DEV, &v)) {
        policy.dev_mode_override = dev;
    }
    if let Some(prerelease) = var(ENV_PRERELEASE).and_then(|v| parse_flag(ENV_PRERELEASE, &v)) {
        policy.allow_prerelease = prerelease;
    }
    policy
}

fn parse_flag(name: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            tracing::warn!(name, value = other, "Ignoring unrecognised boolean");
            None
        }
    }
}

/// Returns true for unpackaged development builds.
pub fn is_dev_build() -> bool {
    cfg!(debug_assertions)
}

/// Loads the policy from the default location and the process environment.
pub fn load_policy() -> Result<UpdatePolicy> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    let mut policy = apply_env_overrides(load_policy_from(&path)?, |name| std::env::var(name).ok());
    if is_dev_build() && !policy.dev_mode_override {
        tracing::debug!("Development build detected, enabling dev update config");
        policy.dev_mode_override = true;
    }
    Ok(policy)
}
