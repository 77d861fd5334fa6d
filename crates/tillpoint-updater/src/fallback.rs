//! Install chain: native install, then bundle relaunch, then the release page.
//!
//! Tiers run in order and stop at the first success. Every attempt is recorded
//! so the caller can decide whether the process still has to quit.

use crate::capability::{ProcessControl, UpdateClient};
use crate::error::UpdateError;

/// One step of the install chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallTier {
    /// The client's install-and-relaunch primitive.
    NativeInstall,
    /// Start the installed bundle directly.
    RelaunchBundle,
    /// Send the user to the release page.
    ReleasePage,
}

impl InstallTier {
    /// Tiers in the order they are tried.
    pub const ORDER: [InstallTier; 3] = [
        InstallTier::NativeInstall,
        InstallTier::RelaunchBundle,
        InstallTier::ReleasePage,
    ];
}

/// Result of one tier.
#[derive(Debug)]
pub struct TierAttempt {
    pub tier: InstallTier,
    pub result: Result<(), UpdateError>,
}

/// Every attempt made by one run of the chain.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub attempts: Vec<TierAttempt>,
}

impl InstallReport {
    /// Tier that succeeded, if any.
    pub fn succeeded(&self) -> Option<InstallTier> {
        self.attempts
            .iter()
            .find(|attempt| attempt.result.is_ok())
            .map(|attempt| attempt.tier)
    }

    /// Tiers attempted, in order.
    pub fn tiers(&self) -> Vec<InstallTier> {
        self.attempts.iter().map(|attempt| attempt.tier).collect()
    }

    /// Whether the coordinator has to terminate the process itself.
    ///
    /// A successful native install quits on its own.
    pub fn requires_quit(&self) -> bool {
        self.succeeded() != Some(InstallTier::NativeInstall)
    }
}

/// Runs the install chain.
pub async fn run_install_chain<C, P>(client: &mut C, process: &P, release_page: &str) -> InstallReport
where
    C: UpdateClient,
    P: ProcessControl,
{
    let mut report = InstallReport::default();

    for tier in InstallTier::ORDER {
        let result = match tier {
            InstallTier::NativeInstall => client
                .quit_and_install(false, true)
                .await
                .map_err(UpdateError::InstallFailure),
            InstallTier::RelaunchBundle => process
                .locate_installed_bundle()
                .and_then(|bundle| {
                    tracing::info!(bundle = %bundle.display(), "Relaunching installed bundle");
                    process.relaunch(&bundle)
                })
                .map_err(UpdateError::RelaunchFailure),
            InstallTier::ReleasePage => {
                tracing::info!(url = release_page, "Opening release page");
                process
                    .open_external(release_page)
                    .map_err(UpdateError::ReleasePageFailure)
            }
        };

        let done = match &result {
            Ok(()) => {
                tracing::info!(?tier, "Install tier succeeded");
                true
            }
            Err(e) => {
                tracing::error!(?tier, error = %e, "Install tier failed");
                false
            }
        };
        report.attempts.push(TierAttempt { tier, result });
        if done {
            break;
        }
    }

    report
}
