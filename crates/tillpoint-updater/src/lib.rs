//! Tillpoint Updater - update lifecycle coordination.
//!
//! This crate sequences the automatic update flow of the Tillpoint desktop app:
//!
//! - Checking the release feed (silently at startup or on demand)
//! - Offering available releases and downloading them
//! - Confirming and installing downloaded releases
//! - Falling back to a bundle relaunch or the release page when installation fails
//!
//! Feed transport, signature verification and native installation belong to the
//! host's [`UpdateClient`]; prompts go through [`Dialog`] and window/process
//! handling through [`ProcessControl`].
//!
//! # Usage
//!
//! ```ignore
//! use tillpoint_updater::{UpdateCoordinator, UpdatePolicy};
//!
//! let mut updater = UpdateCoordinator::new(client, dialog, process);
//! updater.setup(UpdatePolicy::default())?;
//! updater.check_for_updates().await;
//! updater.run().await?;
//! ```

pub mod capability;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod fallback;
pub mod messages;
pub mod policy;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use capability::{Dialog, MessageBox, MessageKind, ProcessControl, UpdateClient};
pub use coordinator::{UpdateCoordinator, UpdaterCommand, UpdaterHandle};
pub use error::{ClientError, PlatformError, Result, UpdateError};
pub use event::{CheckOutcome, DownloadProgress, ErrorDetail, FailureKind, UpdateEvent, UpdateInfo};
pub use fallback::{InstallReport, InstallTier, TierAttempt};
pub use policy::{UpdatePolicy, DEFAULT_FEED_URL};
pub use state::{CheckMode, CheckRequest, Phase, UserDecision};
