//! Scripted capabilities for coordinator tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::capability::{Dialog, MessageBox, ProcessControl, UpdateClient};
use crate::error::{ClientError, PlatformError};
use crate::event::{DownloadProgress, UpdateEvent, UpdateInfo};
use crate::policy::UpdatePolicy;

/// Call log shared by all mocks of one test.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }

    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.count_prefix(prefix) > 0
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == entry)
    }
}

/// How the mock client answers the next check.
#[derive(Debug, Clone)]
pub enum Script {
    /// `NotAvailable` carrying this version.
    UpToDate(String),
    /// `Available` with this version; downloads follow if auto-download is on.
    Available(String),
    /// Emits `Error` and rejects the check.
    Reject(ClientError),
    /// Accepts the check, then emits `Error`.
    ErrorEvent(ClientError),
}

pub struct MockClient {
    journal: Journal,
    version: String,
    tx: Option<UnboundedSender<UpdateEvent>>,
    pending: Option<UpdateInfo>,
    pub scripts: VecDeque<Script>,
    pub policy: Option<UpdatePolicy>,
    pub subscriptions: usize,
    pub fail_install: bool,
    pub fail_download: bool,
}

impl MockClient {
    pub fn new(journal: &Journal, version: &str) -> Self {
        Self {
            journal: journal.clone(),
            version: version.to_string(),
            tx: None,
            pending: None,
            scripts: VecDeque::new(),
            policy: None,
            subscriptions: 0,
            fail_install: false,
            fail_download: false,
        }
    }

    pub fn script(mut self, script: Script) -> Self {
        self.scripts.push_back(script);
        self
    }

    /// Sends an event as if the client produced it on its own.
    pub fn emit(&self, event: UpdateEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    /// Drops the event sender, closing the subscription.
    pub fn close_events(&mut self) {
        self.tx = None;
    }

    fn emit_download(&self, info: &UpdateInfo) {
        self.emit(UpdateEvent::Progress(DownloadProgress {
            bytes_per_second: 1_048_576,
            percent: 50.0,
            transferred: 5_000_000,
            total: 10_000_000,
        }));
        self.emit(UpdateEvent::Downloaded(info.clone()));
    }
}

impl UpdateClient for MockClient {
    fn configure(&mut self, policy: &UpdatePolicy) {
        self.journal.record("client:configure");
        self.policy = Some(policy.clone());
    }

    fn subscribe(&mut self) -> UnboundedReceiver<UpdateEvent> {
        self.journal.record("client:subscribe");
        self.subscriptions += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.tx = Some(tx);
        rx
    }

    async fn check_for_updates(&mut self) -> Result<(), ClientError> {
        self.journal.record("client:check");
        self.emit(UpdateEvent::Checking);

        let script = self
            .scripts
            .pop_front()
            .unwrap_or_else(|| Script::UpToDate(self.version.clone()));
        match script {
            Script::UpToDate(version) => {
                self.emit(UpdateEvent::NotAvailable(UpdateInfo::new(version)));
                Ok(())
            }
            Script::Available(version) => {
                let info = UpdateInfo::new(version);
                self.emit(UpdateEvent::Available(info.clone()));
                let auto = self.policy.as_ref().map_or(false, |p| p.auto_download);
                if auto {
                    self.emit_download(&info);
                }
                self.pending = Some(info);
                Ok(())
            }
            Script::Reject(err) => {
                self.emit(UpdateEvent::Error(err.clone()));
                Err(err)
            }
            Script::ErrorEvent(err) => {
                self.emit(UpdateEvent::Error(err));
                Ok(())
            }
        }
    }

    async fn download_update(&mut self) -> Result<(), ClientError> {
        self.journal.record("client:download");
        if self.fail_download {
            return Err(ClientError::Network("connection reset".into()));
        }
        let info = self
            .pending
            .clone()
            .ok_or_else(|| ClientError::Other("no update to download".into()))?;
        self.emit_download(&info);
        Ok(())
    }

    async fn quit_and_install(
        &mut self,
        is_silent: bool,
        force_run_after: bool,
    ) -> Result<(), ClientError> {
        self.journal
            .record(format!("client:quit_and_install({is_silent},{force_run_after})"));
        if self.fail_install {
            Err(ClientError::Install("installer not found".into()))
        } else {
            Ok(())
        }
    }

    fn current_version(&self) -> String {
        self.version.clone()
    }
}

/// Answers prompts from a queue; an empty queue picks the last button.
pub struct MockDialog {
    journal: Journal,
    responses: Mutex<VecDeque<usize>>,
    shown: Mutex<Vec<MessageBox>>,
    pub fail: bool,
}

impl MockDialog {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            responses: Mutex::new(VecDeque::new()),
            shown: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn answer(self, index: usize) -> Self {
        self.responses.lock().unwrap().push_back(index);
        self
    }

    pub fn shown(&self) -> Vec<MessageBox> {
        self.shown.lock().unwrap().clone()
    }
}

impl Dialog for MockDialog {
    async fn show_message_box(&self, message: MessageBox) -> Result<usize, PlatformError> {
        self.journal.record(format!("dialog:{}", message.message));
        let last = message.buttons.len().saturating_sub(1);
        self.shown.lock().unwrap().push(message);
        if self.fail {
            return Err(PlatformError::Dialog("no display".into()));
        }
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or(last))
    }
}

pub struct MockProcess {
    journal: Journal,
    pub bundle: Option<PathBuf>,
    pub windows: usize,
    pub fail_relaunch: bool,
    pub fail_open: bool,
}

impl MockProcess {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            bundle: Some(PathBuf::from("/Applications/Tillpoint.app")),
            windows: 2,
            fail_relaunch: false,
            fail_open: false,
        }
    }
}

impl ProcessControl for MockProcess {
    fn close_all_windows(&self) -> usize {
        self.journal.record("process:close_all_windows");
        self.windows
    }

    fn locate_installed_bundle(&self) -> Result<PathBuf, PlatformError> {
        self.journal.record("process:locate_installed_bundle");
        self.bundle
            .clone()
            .ok_or_else(|| PlatformError::BundleNotFound(PathBuf::from("/Applications")))
    }

    fn relaunch(&self, bundle: &Path) -> Result<(), PlatformError> {
        self.journal
            .record(format!("process:relaunch({})", bundle.display()));
        if self.fail_relaunch {
            return Err(PlatformError::Relaunch {
                path: bundle.to_path_buf(),
                reason: "permission denied".into(),
            });
        }
        Ok(())
    }

    fn open_external(&self, url: &str) -> Result<(), PlatformError> {
        self.journal.record(format!("process:open({url})"));
        if self.fail_open {
            return Err(PlatformError::OpenUrl {
                url: url.to_string(),
                reason: "no browser".into(),
            });
        }
        Ok(())
    }

    fn quit(&self) {
        self.journal.record("process:quit");
    }
}
