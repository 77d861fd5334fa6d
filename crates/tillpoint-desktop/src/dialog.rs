//! Native message boxes.

use rfd::{AsyncMessageDialog, MessageButtons, MessageDialogResult, MessageLevel};
use tillpoint_updater::{Dialog, MessageBox, MessageKind, PlatformError};

/// Shows prompts with the platform's native message box.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDialog;

impl NativeDialog {
    pub fn new() -> Self {
        Self
    }
}

impl Dialog for NativeDialog {
    async fn show_message_box(&self, message: MessageBox) -> Result<usize, PlatformError> {
        let description = if message.detail.is_empty() {
            message.message.clone()
        } else {
            format!("{}\n\n{}", message.message, message.detail)
        };

        let result = AsyncMessageDialog::new()
            .set_level(level(message.kind))
            .set_title(message.title.as_str())
            .set_description(description)
            .set_buttons(buttons(&message.buttons))
            .show()
            .await;

        let index = response_index(&result, &message.buttons);
        tracing::debug!(title = %message.title, ?result, index, "Message box closed");
        Ok(index)
    }
}

fn level(kind: MessageKind) -> MessageLevel {
    match kind {
        MessageKind::Info => MessageLevel::Info,
        MessageKind::Warning => MessageLevel::Warning,
        MessageKind::Error => MessageLevel::Error,
    }
}

/// Maps button labels onto the closest native layout.
fn buttons(labels: &[String]) -> MessageButtons {
    match labels {
        [] => MessageButtons::Ok,
        [only] => MessageButtons::OkCustom(only.clone()),
        [first, second] => MessageButtons::OkCancelCustom(first.clone(), second.clone()),
        [first, second, third, ..] => {
            MessageButtons::YesNoCancelCustom(first.clone(), second.clone(), third.clone())
        }
    }
}

/// Turns the native result back into a button index.
///
/// Backends report custom buttons either by label or as the standard result
/// they replace; closing the box counts as the last button.
fn response_index(result: &MessageDialogResult, labels: &[String]) -> usize {
    let last = labels.len().saturating_sub(1);
    match result {
        MessageDialogResult::Custom(label) => labels
            .iter()
            .position(|l| l == label)
            .unwrap_or(last),
        MessageDialogResult::Ok | MessageDialogResult::Yes => 0,
        MessageDialogResult::No => 1.min(last),
        MessageDialogResult::Cancel => last,
    }
}
