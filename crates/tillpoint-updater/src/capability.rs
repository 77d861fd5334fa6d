//! Capabilities the coordinator drives.
//!
//! The update client, the dialog and process control are supplied by the host
//! application. The coordinator only sequences calls into them.

#![allow(async_fn_in_trait)]

use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::{ClientError, PlatformError};
use crate::event::UpdateEvent;
use crate::policy::UpdatePolicy;

/// Feed checks, downloads, verification and native installation.
pub trait UpdateClient {
    /// Applies the policy to subsequent checks.
    fn configure(&mut self, policy: &UpdatePolicy);

    /// Returns a fresh event stream.
    ///
    /// Implementations keep a single subscriber: a new subscription closes the
    /// previous one.
    fn subscribe(&mut self) -> UnboundedReceiver<UpdateEvent>;

    /// Starts a check. The outcome is delivered as events.
    async fn check_for_updates(&mut self) -> Result<(), ClientError>;

    /// Starts downloading the release announced by the last `Available` event.
    async fn download_update(&mut self) -> Result<(), ClientError>;

    /// Quits the app, installs the downloaded release and relaunches.
    async fn quit_and_install(
        &mut self,
        is_silent: bool,
        force_run_after: bool,
    ) -> Result<(), ClientError>;

    /// Version of the running build.
    fn current_version(&self) -> String;
}

/// Severity of a message box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Warning,
    Error,
}

/// A modal prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBox {
    pub kind: MessageKind,
    pub title: String,
    pub message: String,
    pub detail: String,
    pub buttons: Vec<String>,
}

impl MessageBox {
    /// Creates a message box with a single OK button.
    pub fn new(kind: MessageKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            detail: String::new(),
            buttons: vec!["OK".to_string()],
        }
    }

    /// Sets the detail text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Replaces the buttons. The first one is the affirmative choice.
    pub fn with_buttons<I, S>(mut self, buttons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.buttons = buttons.into_iter().map(Into::into).collect();
        self
    }
}

/// Modal message boxes.
pub trait Dialog {
    /// Shows the prompt and returns the index of the pressed button.
    async fn show_message_box(&self, message: MessageBox) -> Result<usize, PlatformError>;
}

/// Window and process management.
pub trait ProcessControl {
    /// Closes every open top-level window and returns how many were closed.
    fn close_all_windows(&self) -> usize;

    /// Finds the application bundle the installer wrote.
    fn locate_installed_bundle(&self) -> Result<PathBuf, PlatformError>;

    /// Starts a new instance from `bundle`.
    fn relaunch(&self, bundle: &Path) -> Result<(), PlatformError>;

    /// Opens `url` in the default external handler.
    fn open_external(&self, url: &str) -> Result<(), PlatformError>;

    /// Terminates the current process.
    fn quit(&self);
}
