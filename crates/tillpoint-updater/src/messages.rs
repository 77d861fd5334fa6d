//! User-facing prompt texts.

use crate::capability::{MessageBox, MessageKind};
use crate::event::UpdateInfo;

const TITLE: &str = "Application update";

/// Asks whether to download an available release.
pub fn update_available(info: &UpdateInfo, current: &str) -> MessageBox {
    let mut detail = format!("Version {} is available (installed: {}).", info.version, current);
    if let Some(notes) = info.release_notes.as_deref().filter(|n| !n.trim().is_empty()) {
        detail.push_str("\n\n");
        detail.push_str(notes.trim());
    }
    MessageBox::new(MessageKind::Info, TITLE, "A new version is available")
        .with_detail(detail)
        .with_buttons(["Download", "Later"])
}

/// Asks whether to restart into a downloaded release.
pub fn update_downloaded(info: &UpdateInfo) -> MessageBox {
    MessageBox::new(MessageKind::Info, TITLE, "A new version has been downloaded")
        .with_detail(format!(
            "Version {} is ready to install. Restart the application to apply the update.",
            info.version
        ))
        .with_buttons(["Restart", "Later"])
}

/// Tells the user the installed build is current.
pub fn up_to_date(current: &str) -> MessageBox {
    MessageBox::new(MessageKind::Info, TITLE, "You're up to date")
        .with_detail(format!("Version {current} is the latest version."))
}

/// Generic check failure.
pub fn check_failed(reason: &str) -> MessageBox {
    MessageBox::new(MessageKind::Error, TITLE, "Could not check for updates")
        .with_detail(format!(
            "{reason}\n\nPlease check your connection and try again later."
        ))
}

/// Signature verification failure; the update has to be installed by hand.
pub fn signature_failed(release_page: &str) -> MessageBox {
    MessageBox::new(
        MessageKind::Warning,
        TITLE,
        "Automatic installation is unavailable",
    )
    .with_detail(format!(
        "The update could not be verified, so it will not be installed automatically. \
         Please download the latest version manually from {release_page}"
    ))
}
