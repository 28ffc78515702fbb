use anyhow::{anyhow, Result};
use clipboard::{ClipboardContext, ClipboardProvider};

use crate::events::Notice;

/// Transient and modal message surface of the host.
pub trait Notifier: Send {
    fn snackbar(&self, text: &str);
    fn dialog(&self, title: &str, body: &str);

    fn notice(&self, notice: &Notice) {
        let (title, body) = notice.dialog();
        self.dialog(title, body);
    }
}

pub trait Clipboard: Send {
    fn copy(&self, text: &str) -> Result<()>;
}

/// Notifier for headless runs, everything goes to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn snackbar(&self, text: &str) {
        log::info!("{text}");
    }

    fn dialog(&self, title: &str, body: &str) {
        log::warn!("{title}: {body}");
    }
}

pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<()> {
        let mut ctx: ClipboardContext =
            ClipboardProvider::new().map_err(|e| anyhow!("Clipboard unavailable: {e}"))?;
        ctx.set_contents(text.to_string())
            .map_err(|e| anyhow!("Failed to copy to clipboard: {e}"))
    }
}
