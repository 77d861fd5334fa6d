//! Startup hook: configure the updater, run the automatic check, serve events.

use anyhow::Context;
use tillpoint_updater::{
    CheckRequest, Dialog, ProcessControl, UpdateClient, UpdateCoordinator, UpdatePolicy,
};

use crate::config;
use crate::dialog::NativeDialog;
use crate::process::SystemProcess;

/// Coordinator wired to the native desktop capabilities.
pub type DesktopUpdater<C> = UpdateCoordinator<C, NativeDialog, SystemProcess>;

/// Builds a desktop coordinator from the stored configuration.
pub fn build<C: UpdateClient>(client: C, process: SystemProcess) -> anyhow::Result<DesktopUpdater<C>> {
    let policy = config::load_policy().context("failed to load updater configuration")?;
    build_with_policy(client, NativeDialog::new(), process, policy)
}

/// Builds a coordinator from explicit parts.
pub fn build_with_policy<C, D, P>(
    client: C,
    dialog: D,
    process: P,
    policy: UpdatePolicy,
) -> anyhow::Result<UpdateCoordinator<C, D, P>>
where
    C: UpdateClient,
    D: Dialog,
    P: ProcessControl,
{
    let mut updater = UpdateCoordinator::new(client, dialog, process);
    updater
        .setup(policy)
        .context("failed to set up auto-updater")?;
    Ok(updater)
}

/// Runs the automatic startup check and then serves update events.
///
/// Returns when the handle shuts the loop down or an install has started.
/// Update failures never escape; only a coordinator that was not set up does.
pub async fn run_on_startup<C, D, P>(updater: &mut UpdateCoordinator<C, D, P>) -> anyhow::Result<()>
where
    C: UpdateClient,
    D: Dialog,
    P: ProcessControl,
{
    tracing::info!(version = %updater.current_version(), "Starting auto-updater");
    match updater.check_for_updates().await {
        CheckRequest::Started => tracing::debug!("Startup update check started"),
        CheckRequest::Failed => tracing::debug!("Startup update check failed"),
        other => tracing::warn!(?other, "Startup update check not started"),
    }
    updater.run().await.context("auto-updater stopped")
}
