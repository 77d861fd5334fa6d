//! Window and process control for the desktop shell.
//!
//! The UI shell registers a closer for every top-level window it opens so the
//! updater can close them before the platform installer runs.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard};

use tillpoint_updater::{PlatformError, ProcessControl};
use tracing_appender::non_blocking::WorkerGuard;

/// Closes one window. Returns an error message if the window refused.
pub type WindowCloser = Box<dyn FnOnce() -> Result<(), String> + Send>;

type QuitHook = Box<dyn Fn() + Send + Sync>;

struct OpenWindow {
    label: String,
    close: WindowCloser,
}

/// [`ProcessControl`] backed by `std::process` and the default browser.
pub struct SystemProcess {
    app_name: String,
    windows: Mutex<Vec<OpenWindow>>,
    log_guard: Mutex<Option<WorkerGuard>>,
    on_quit: QuitHook,
}

impl SystemProcess {
    /// Creates process control for the app called `app_name`.
    ///
    /// Quitting exits the process unless a hook is installed. `process::exit`
    /// skips destructors, so hand over the guard from [`crate::logging::init`]
    /// with [`with_log_guard`](Self::with_log_guard) to keep the last log lines.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            windows: Mutex::new(Vec::new()),
            log_guard: Mutex::new(None),
            on_quit: Box::new(|| std::process::exit(0)),
        }
    }

    /// Replaces the quit behaviour, e.g. to stop the UI event loop instead.
    pub fn with_quit_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_quit = Box::new(hook);
        self
    }

    /// Takes ownership of the file logger's guard; it is dropped, flushing
    /// buffered lines, right before the quit hook runs.
    pub fn with_log_guard(self, guard: Option<WorkerGuard>) -> Self {
        *self.log_guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = guard;
        self
    }

    /// Registers an open top-level window.
    pub fn register_window(&self, label: impl Into<String>, close: WindowCloser) {
        self.windows().push(OpenWindow {
            label: label.into(),
            close,
        });
    }

    /// Number of registered windows.
    pub fn window_count(&self) -> usize {
        self.windows().len()
    }

    fn windows(&self) -> MutexGuard<'_, Vec<OpenWindow>> {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProcessControl for SystemProcess {
    fn close_all_windows(&self) -> usize {
        let windows: Vec<OpenWindow> = self.windows().drain(..).collect();
        let mut closed = 0;
        for window in windows {
            match (window.close)() {
                Ok(()) => closed += 1,
                Err(reason) => {
                    let err = PlatformError::Window(format!("{}: {reason}", window.label));
                    tracing::warn!(error = %err, "Window did not close");
                }
            }
        }
        closed
    }

    fn locate_installed_bundle(&self) -> Result<PathBuf, PlatformError> {
        let exe = std::env::current_exe()?;
        let bundle = bundle_for_executable(&exe, &self.app_name, cfg!(target_os = "macos"));
        if bundle.exists() {
            Ok(bundle)
        } else {
            Err(PlatformError::BundleNotFound(bundle))
        }
    }

    fn relaunch(&self, bundle: &Path) -> Result<(), PlatformError> {
        relaunch_command(bundle, cfg!(target_os = "macos"))
            .spawn()
            .map(|_| ())
            .map_err(|e| PlatformError::Relaunch {
                path: bundle.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn open_external(&self, url: &str) -> Result<(), PlatformError> {
        open::that(url).map_err(|e| PlatformError::OpenUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn quit(&self) {
        tracing::info!("Quitting for update");
        let guard = self
            .log_guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(guard);
        (self.on_quit)();
    }
}

/// Resolves the application bundle for a running executable.
///
/// On macOS the executable sits in `<App>.app/Contents/MacOS/`; when not run
/// from a bundle the installer's target in `/Applications` is used. Elsewhere
/// the installer replaces the executable in place.
fn bundle_for_executable(exe: &Path, app_name: &str, macos: bool) -> PathBuf {
    if !macos {
        return exe.to_path_buf();
    }
    match exe.parent().and_then(Path::parent).and_then(Path::parent) {
        Some(bundle) if bundle.extension().is_some_and(|e| e == "app") => bundle.to_path_buf(),
        _ => PathBuf::from("/Applications").join(format!("{app_name}.app")),
    }
}

/// Command that starts a fresh instance from `bundle`.
fn relaunch_command(bundle: &Path, macos: bool) -> Command {
    if macos {
        let mut command = Command::new("open");
        command.arg("-n").arg(bundle);
        command
    } else {
        Command::new(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn bundle_from_macos_app() {
        let exe = Path::new("/Applications/Tillpoint.app/Contents/MacOS/tillpoint");
        assert_eq!(
            bundle_for_executable(exe, "Tillpoint", true),
            PathBuf::from("/Applications/Tillpoint.app")
        );
    }

    #[test]
    fn bundle_outside_app_defaults_to_applications() {
        let exe = Path::new("/Users/dev/tillpoint/target/debug/tillpoint");
        assert_eq!(
            bundle_for_executable(exe, "Tillpoint", true),
            PathBuf::from("/Applications/Tillpoint.app")
        );
    }

    #[test]
    fn bundle_is_executable_elsewhere() {
        let exe = Path::new("/opt/tillpoint/tillpoint");
        assert_eq!(bundle_for_executable(exe, "Tillpoint", false), exe);
    }

    #[test]
    fn macos_relaunch_uses_open() {
        let command = relaunch_command(Path::new("/Applications/Tillpoint.app"), true);
        assert_eq!(command.get_program(), "open");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, vec!["-n", "/Applications/Tillpoint.app"]);
    }

    #[test]
    fn relaunch_runs_executable_directly() {
        let command = relaunch_command(Path::new("/opt/tillpoint/tillpoint"), false);
        assert_eq!(command.get_program(), "/opt/tillpoint/tillpoint");
        assert_eq!(command.get_args().count(), 0);
    }

    #[test]
    fn close_all_windows_counts_successes() {
        let process = SystemProcess::new("Tillpoint");
        process.register_window("main", Box::new(|| Ok(())));
        process.register_window("receipt", Box::new(|| Err("busy".to_string())));
        process.register_window("settings", Box::new(|| Ok(())));
        assert_eq!(process.window_count(), 3);

        assert_eq!(process.close_all_windows(), 2);
        assert_eq!(process.window_count(), 0);
        assert_eq!(process.close_all_windows(), 0);
    }

    #[test]
    fn quit_runs_hook() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let process = SystemProcess::new("Tillpoint").with_quit_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        process.quit();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn quit_flushes_file_log_before_hook() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tillpoint.log");
        let file = std::fs::File::create(&path).unwrap();
        let (mut writer, guard) = tracing_appender::non_blocking(file);

        let seen = Arc::new(Mutex::new(String::new()));
        let seen_in_hook = seen.clone();
        let log_path = path.clone();
        let process = SystemProcess::new("Tillpoint")
            .with_log_guard(Some(guard))
            .with_quit_hook(move || {
                *seen_in_hook.lock().unwrap() = std::fs::read_to_string(&log_path).unwrap();
            });

        writer.write_all(b"Every install tier failed, quitting\n").unwrap();
        process.quit();

        assert!(seen.lock().unwrap().contains("Every install tier failed"));
    }

    #[test]
    fn relaunch_failure_is_reported() {
        let process = SystemProcess::new("Tillpoint");
        let missing = Path::new("/nonexistent/tillpoint-relaunch-test");
        if cfg!(target_os = "macos") {
            return;
        }
        let err = process.relaunch(missing).unwrap_err();
        assert!(matches!(err, PlatformError::Relaunch { .. }));
    }
}
