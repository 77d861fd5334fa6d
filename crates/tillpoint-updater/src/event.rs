//! Lifecycle events emitted by the update client.

use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Release description received with `Available`, `NotAvailable` and `Downloaded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateInfo {
    /// Release version.
    pub version: String,
    /// Release title.
    #[serde(default)]
    pub release_name: Option<String>,
    /// Release notes.
    #[serde(default)]
    pub release_notes: Option<String>,
    /// Publication date as reported by the feed.
    #[serde(default)]
    pub release_date: Option<String>,
    /// Anything else the client attaches.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl UpdateInfo {
    /// Creates info carrying only a version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release_name: None,
            release_notes: None,
            release_date: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Returns `Some(true)` if this release is newer than `current`.
    ///
    /// Returns `None` when either side is not a semantic version.
    pub fn is_newer_than(&self, current: &str) -> Option<bool> {
        let ours = parse_version(&self.version)?;
        let theirs = parse_version(current)?;
        Some(ours > theirs)
    }
}

fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed)).ok()
}

/// Download progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub bytes_per_second: u64,
    pub percent: f64,
    pub transferred: u64,
    pub total: u64,
}

/// Everything the update client can report.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    /// A check has started.
    Checking,
    /// A newer release exists.
    Available(UpdateInfo),
    /// The running build is current.
    NotAvailable(UpdateInfo),
    /// The client failed.
    Error(ClientError),
    /// Download progress.
    Progress(DownloadProgress),
    /// The release is downloaded and ready to install.
    Downloaded(UpdateInfo),
}

impl UpdateEvent {
    /// Event name as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            UpdateEvent::Checking => "checking-for-update",
            UpdateEvent::Available(_) => "update-available",
            UpdateEvent::NotAvailable(_) => "update-not-available",
            UpdateEvent::Error(_) => "error",
            UpdateEvent::Progress(_) => "download-progress",
            UpdateEvent::Downloaded(_) => "update-downloaded",
        }
    }
}

/// What kind of failure ended a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network, feed or download failure.
    Check,
    /// The artifact failed verification.
    Signature,
}

/// Failure description kept with a failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&ClientError> for ErrorDetail {
    fn from(err: &ClientError) -> Self {
        let kind = if err.is_signature_failure() {
            FailureKind::Signature
        } else {
            FailureKind::Check
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// The installed version is current.
    NoUpdate(String),
    /// A newer release exists.
    UpdateAvailable(UpdateInfo),
    /// The check failed.
    CheckFailed(ErrorDetail),
}
