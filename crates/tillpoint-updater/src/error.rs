//! Updater error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by the update client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The feed could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The feed answered with something unusable.
    #[error("malformed release feed: {0}")]
    Feed(String),

    /// The release exists but has no artifact for this platform.
    #[error("release asset missing: {0}")]
    MissingAsset(String),

    /// The downloaded artifact failed code-signature verification.
    #[error("signature verification failed: {0}")]
    Signature(String),

    /// The native installer could not run.
    #[error("install failed: {0}")]
    Install(String),

    /// Anything else the client reports.
    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// Returns true if this failure means the artifact cannot be trusted.
    ///
    /// Clients that only hand back a message are classified by its wording.
    pub fn is_signature_failure(&self) -> bool {
        match self {
            ClientError::Signature(_) => true,
            ClientError::Other(message) => {
                let lower = message.to_lowercase();
                lower.contains("code signature")
                    || lower.contains("signature verification")
                    || lower.contains("not signed")
            }
            _ => false,
        }
    }
}

/// Failures reported by the dialog and process-control capabilities.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The message box could not be shown.
    #[error("dialog failed: {0}")]
    Dialog(String),

    /// A window could not be closed.
    #[error("failed to close window: {0}")]
    Window(String),

    /// No installed application bundle was found.
    #[error("application bundle not found: {}", .0.display())]
    BundleNotFound(PathBuf),

    /// The relaunch command could not be started.
    #[error("failed to relaunch {}: {reason}", path.display())]
    Relaunch { path: PathBuf, reason: String },

    /// The URL could not be handed to the default browser.
    #[error("failed to open {url}: {reason}")]
    OpenUrl { url: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the coordinator.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Network or feed error during a check.
    #[error("update check failed: {0}")]
    CheckFailure(ClientError),

    /// The downloaded artifact failed verification.
    #[error("update signature rejected: {0}")]
    SignatureFailure(ClientError),

    /// The native install-and-relaunch primitive failed.
    #[error("native install failed: {0}")]
    InstallFailure(ClientError),

    /// The fallback relaunch of the installed bundle failed.
    #[error("relaunch failed: {0}")]
    RelaunchFailure(PlatformError),

    /// The release page could not be opened.
    #[error("could not open release page: {0}")]
    ReleasePageFailure(PlatformError),

    /// The policy cannot be used.
    #[error("invalid update policy: {0}")]
    InvalidPolicy(String),

    /// The coordinator has not been set up.
    #[error("updater has not been set up")]
    NotReady,
}

impl UpdateError {
    /// Wraps a client failure seen during a check or download.
    pub fn from_client(err: ClientError) -> Self {
        if err.is_signature_failure() {
            UpdateError::SignatureFailure(err)
        } else {
            UpdateError::CheckFailure(err)
        }
    }
}

/// Result type for updater operations.
pub type Result<T> = std::result::Result<T, UpdateError>;
