//! Tillpoint Desktop - desktop integration for the auto-updater.
//!
//! This crate provides the pieces the desktop shell needs around
//! [`tillpoint_updater`]:
//!
//! - Native message boxes ([`NativeDialog`])
//! - Window, relaunch and browser handling ([`SystemProcess`])
//! - Updater configuration from `updater.json` and the environment
//! - Rolling file logging
//! - The startup hook that runs the automatic check
//!
//! # Usage
//!
//! ```ignore
//! use tillpoint_desktop::{logging, startup, SystemProcess};
//!
//! let guard = logging::init(&logging::LogOptions::default());
//! let process = SystemProcess::new("Tillpoint").with_log_guard(guard);
//! let mut updater = startup::build(client, process)?;
//! let handle = updater.handle(); // for the "Check for Updates…" menu item
//! startup::run_on_startup(&mut updater).await?;
//! ```

pub mod config;
pub mod dialog;
pub mod error;
pub mod logging;
pub mod process;
pub mod startup;

pub use dialog::NativeDialog;
pub use error::ConfigError;
pub use process::{SystemProcess, WindowCloser};
pub use startup::DesktopUpdater;
