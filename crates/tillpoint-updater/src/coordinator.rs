//! Update lifecycle coordinator.
//!
//! Sequences check, prompt, download, confirm and install on top of the
//! update client, the dialog and process control. Events are handled one at a
//! time through a single dispatch over [`UpdateEvent`], and the coordinator
//! holds exactly one event subscription, so a repeated `setup` replaces the
//! previous stream instead of adding a second set of handlers.
//!
//! Prompting happens before the download: an available release is offered
//! once, and declining it turns automatic downloads off for the session. A
//! release the user already chose to download is not offered again; when the
//! client announces it again the coordinator goes straight back to waiting for
//! the download, so the install prompt returns.

use std::cell::OnceCell;
use std::collections::HashSet;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::capability::{Dialog, MessageBox, ProcessControl, UpdateClient};
use crate::error::{ClientError, Result, UpdateError};
use crate::event::{CheckOutcome, DownloadProgress, ErrorDetail, FailureKind, UpdateEvent, UpdateInfo};
use crate::fallback::{run_install_chain, InstallReport};
use crate::messages;
use crate::policy::UpdatePolicy;
use crate::state::{CheckMode, CheckRequest, Phase, UserDecision};

/// Requests sent to a running coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdaterCommand {
    /// Start a check in the given mode.
    Check(CheckMode),
    /// Leave the event loop.
    Shutdown,
}

/// Cloneable handle for menu actions and startup hooks.
#[derive(Debug, Clone)]
pub struct UpdaterHandle {
    tx: UnboundedSender<UpdaterCommand>,
}

impl UpdaterHandle {
    /// Queues an automatic check.
    pub fn check(&self) -> bool {
        self.send(UpdaterCommand::Check(CheckMode::Silent))
    }

    /// Queues a user-initiated check that reports every outcome.
    pub fn manual_check(&self) -> bool {
        self.send(UpdaterCommand::Check(CheckMode::Manual))
    }

    /// Stops the event loop.
    pub fn shutdown(&self) -> bool {
        self.send(UpdaterCommand::Shutdown)
    }

    fn send(&self, command: UpdaterCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

enum Next {
    Event(UpdateEvent),
    Command(UpdaterCommand),
    Closed,
}

/// Owns the update lifecycle for one application process.
pub struct UpdateCoordinator<C, D, P> {
    client: C,
    dialog: D,
    process: P,
    policy: UpdatePolicy,
    phase: Phase,
    mode: CheckMode,
    events: Option<UnboundedReceiver<UpdateEvent>>,
    commands_tx: UnboundedSender<UpdaterCommand>,
    commands: UnboundedReceiver<UpdaterCommand>,
    offered: HashSet<String>,
    accepted: HashSet<String>,
    last_outcome: Option<CheckOutcome>,
    current_version: OnceCell<String>,
}

impl<C, D, P> UpdateCoordinator<C, D, P>
where
    C: UpdateClient,
    D: Dialog,
    P: ProcessControl,
{
    /// Creates a coordinator. Call [`setup`](Self::setup) before checking.
    pub fn new(client: C, dialog: D, process: P) -> Self {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        Self {
            client,
            dialog,
            process,
            policy: UpdatePolicy::default(),
            phase: Phase::Idle,
            mode: CheckMode::Silent,
            events: None,
            commands_tx,
            commands,
            offered: HashSet::new(),
            accepted: HashSet::new(),
            last_outcome: None,
            current_version: OnceCell::new(),
        }
    }

    /// Applies the policy and (re)subscribes to the client's events.
    pub fn setup(&mut self, policy: UpdatePolicy) -> Result<()> {
        policy.validate()?;

        if policy.dev_mode_override {
            tracing::info!("Development build: forcing dev update config");
        }
        self.client.configure(&policy);

        if self.events.is_some() {
            tracing::debug!("Replacing existing update event subscription");
        }
        self.events = Some(self.client.subscribe());

        tracing::info!(
            feed = %policy.feed_url,
            auto_download = policy.auto_download,
            auto_install_on_quit = policy.auto_install_on_quit,
            allow_prerelease = policy.allow_prerelease,
            allow_downgrade = policy.allow_downgrade,
            verify_signature = policy.verify_signature,
            "Auto-updater configured"
        );
        self.policy = policy;
        Ok(())
    }

    /// Starts an automatic check. Outcomes that need no decision are only logged.
    pub async fn check_for_updates(&mut self) -> CheckRequest {
        self.begin_check(CheckMode::Silent).await
    }

    /// Starts a user-initiated check that reports every outcome in a dialog.
    pub async fn manual_check_for_updates(&mut self) -> CheckRequest {
        self.begin_check(CheckMode::Manual).await
    }

    async fn begin_check(&mut self, mode: CheckMode) -> CheckRequest {
        if self.events.is_none() {
            tracing::warn!("Update check requested before setup");
            return CheckRequest::NotReady;
        }
        if !self.phase.accepts_check() {
            tracing::info!(phase = %self.phase, %mode, "Update check already in progress, ignoring request");
            return CheckRequest::Ignored { phase: self.phase };
        }

        self.phase = Phase::Checking;
        self.mode = mode;
        self.last_outcome = None;
        tracing::info!(
            current_version = %self.current_version(),
            %mode,
            "Checking for updates"
        );

        self.client.configure(&self.policy);
        match self.client.check_for_updates().await {
            Ok(()) => CheckRequest::Started,
            Err(e) => {
                self.fail_cycle(&e).await;
                CheckRequest::Failed
            }
        }
    }

    /// Handles one event from the update client.
    pub async fn dispatch(&mut self, event: UpdateEvent) {
        tracing::debug!(event = event.name(), phase = %self.phase, "Update event");
        match event {
            UpdateEvent::Checking => tracing::info!("Checking for update..."),
            UpdateEvent::Available(info) => self.on_available(info).await,
            UpdateEvent::NotAvailable(info) => self.on_not_available(info).await,
            UpdateEvent::Error(err) => self.fail_cycle(&err).await,
            UpdateEvent::Progress(progress) => log_progress(&progress),
            UpdateEvent::Downloaded(info) => self.on_downloaded(info).await,
        }
    }

    /// Handles every event already queued. Returns how many were handled.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let Some(events) = self.events.as_mut() else {
                return handled;
            };
            let Ok(event) = events.try_recv() else {
                return handled;
            };
            self.dispatch(event).await;
            handled += 1;
        }
    }

    /// Runs the event loop until shutdown or until the install chain has run.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let next = match self.events.as_mut() {
                Some(events) => tokio::select! {
                    biased;
                    event = events.recv() => match event {
                        Some(event) => Next::Event(event),
                        None => Next::Closed,
                    },
                    Some(command) = self.commands.recv() => Next::Command(command),
                    else => Next::Closed,
                },
                None => return Err(UpdateError::NotReady),
            };

            match next {
                Next::Event(event) => {
                    self.dispatch(event).await;
                    if self.phase == Phase::Installing {
                        tracing::info!("Install started, leaving update loop");
                        return Ok(());
                    }
                }
                Next::Command(UpdaterCommand::Check(mode)) => {
                    self.begin_check(mode).await;
                }
                Next::Command(UpdaterCommand::Shutdown) => {
                    tracing::debug!("Update loop shut down");
                    return Ok(());
                }
                Next::Closed => {
                    tracing::warn!("Update client event stream closed");
                    return Ok(());
                }
            }
        }
    }

    async fn on_available(&mut self, info: UpdateInfo) {
        if self.phase != Phase::Checking {
            tracing::warn!(version = %info.version, phase = %self.phase, "Ignoring update-available outside a check");
            return;
        }

        let current = self.current_version().to_string();
        if !self.policy.allow_downgrade && info.is_newer_than(&current) == Some(false) {
            tracing::info!(
                version = %info.version,
                %current,
                "Offered release is not newer, treating as up to date"
            );
            self.finish_up_to_date().await;
            return;
        }

        tracing::info!(version = %info.version, mode = %self.mode, "Update available");
        self.last_outcome = Some(CheckOutcome::UpdateAvailable(info.clone()));

        if self.accepted.contains(&info.version) {
            tracing::info!(version = %info.version, "Update already accepted, waiting for download");
            self.start_download(&info).await;
            return;
        }
        if !self.mode.is_manual() && self.offered.contains(&info.version) {
            tracing::info!(version = %info.version, "Update already offered this session");
            self.settle(Phase::Idle);
            return;
        }
        self.offered.insert(info.version.clone());

        match self.ask(messages::update_available(&info, &current)).await {
            UserDecision::ProceedNow => {
                self.accepted.insert(info.version.clone());
                self.start_download(&info).await;
            }
            UserDecision::Defer => {
                tracing::info!(version = %info.version, "Update deferred, disabling auto-download for this session");
                self.policy.auto_download = false;
                self.client.configure(&self.policy);
                self.settle(Phase::Idle);
            }
        }
    }

    async fn start_download(&mut self, info: &UpdateInfo) {
        self.phase = Phase::Downloading;
        if self.policy.auto_download {
            tracing::info!(version = %info.version, "Download already started by client");
        } else if let Err(e) = self.client.download_update().await {
            self.fail_cycle(&e).await;
        }
    }

    /// Ends a cycle that needs nothing more from the user. Later unprompted
    /// events are treated as silent.
    fn settle(&mut self, phase: Phase) {
        self.phase = phase;
        self.mode = CheckMode::Silent;
    }

    async fn on_not_available(&mut self, info: UpdateInfo) {
        if self.phase != Phase::Checking {
            tracing::debug!(version = %info.version, phase = %self.phase, "Ignoring update-not-available outside a check");
            return;
        }
        self.finish_up_to_date().await;
    }

    async fn finish_up_to_date(&mut self) {
        let current = self.current_version().to_string();
        tracing::info!(%current, "No update available");
        let mode = self.mode;
        self.settle(Phase::Idle);
        self.last_outcome = Some(CheckOutcome::NoUpdate(current.clone()));
        if mode.is_manual() {
            self.show(messages::up_to_date(&current)).await;
        }
    }

    async fn on_downloaded(&mut self, info: UpdateInfo) {
        if self.phase != Phase::Downloading {
            tracing::info!(version = %info.version, phase = %self.phase, "Ignoring downloaded update");
            return;
        }

        tracing::info!(version = %info.version, "Update downloaded");
        self.phase = Phase::Downloaded;

        match self.ask(messages::update_downloaded(&info)).await {
            UserDecision::ProceedNow => {
                self.install().await;
            }
            UserDecision::Defer => {
                tracing::info!(version = %info.version, "Install deferred");
                self.settle(Phase::Downloaded);
            }
        }
    }

    async fn install(&mut self) -> InstallReport {
        self.phase = Phase::Installing;
        let closed = self.process.close_all_windows();
        tracing::info!(closed, "Closed windows before install");

        let release_page = self.policy.release_page_url();
        let report = run_install_chain(&mut self.client, &self.process, &release_page).await;

        if report.requires_quit() {
            if report.succeeded().is_none() {
                tracing::error!("Every install tier failed, quitting");
            }
            self.process.quit();
        }
        report
    }

    /// Ends the current cycle after a client failure.
    ///
    /// A dialog is shown only in manual mode and only if a cycle was active, so
    /// a rejection reported both by the check call and by an error event
    /// produces one prompt.
    async fn fail_cycle(&mut self, err: &ClientError) {
        let was_active = self.phase != Phase::Idle;
        let mode = self.mode;
        self.settle(Phase::Idle);

        let detail = ErrorDetail::from(err);
        let failure = UpdateError::from_client(err.clone());
        tracing::error!(error = %failure, %mode, "Update failed");

        if !was_active {
            tracing::debug!("Failure already handled for this check");
            return;
        }
        self.last_outcome = Some(CheckOutcome::CheckFailed(detail.clone()));

        if !mode.is_manual() {
            return;
        }
        let prompt = match detail.kind {
            FailureKind::Signature => messages::signature_failed(&self.policy.release_page_url()),
            FailureKind::Check => messages::check_failed(&detail.message),
        };
        self.show(prompt).await;
    }

    async fn ask(&self, prompt: MessageBox) -> UserDecision {
        match self.dialog.show_message_box(prompt).await {
            Ok(index) => UserDecision::from_response(index),
            Err(e) => {
                tracing::warn!(error = %e, "Update prompt failed, deferring");
                UserDecision::Defer
            }
        }
    }

    async fn show(&self, prompt: MessageBox) {
        if let Err(e) = self.dialog.show_message_box(prompt).await {
            tracing::warn!(error = %e, "Failed to show update dialog");
        }
    }

    /// Version of the running build, cached on first use.
    pub fn current_version(&self) -> &str {
        self.current_version
            .get_or_init(|| self.client.current_version())
    }

    /// Handle for queueing checks from other parts of the app.
    pub fn handle(&self) -> UpdaterHandle {
        UpdaterHandle {
            tx: self.commands_tx.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> CheckMode {
        self.mode
    }

    /// The live policy, including session changes such as a declined download.
    pub fn policy(&self) -> &UpdatePolicy {
        &self.policy
    }

    /// Outcome of the most recent check.
    pub fn last_outcome(&self) -> Option<&CheckOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn dialog(&self) -> &D {
        &self.dialog
    }

    pub fn process(&self) -> &P {
        &self.process
    }

    #[cfg(test)]
    fn force_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }
}

fn log_progress(progress: &DownloadProgress) {
    tracing::info!(
        bytes_per_second = progress.bytes_per_second,
        percent = progress.percent,
        transferred = progress.transferred,
        total = progress.total,
        "Download progress"
    );
}
