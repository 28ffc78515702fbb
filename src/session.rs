use tokio::sync::watch;

use crate::account::Account;

/// Holds the currently selected account and publishes every change.
///
/// Screens that mirror the current account subscribe to the watch channel
/// instead of polling; the controller is the only writer.
pub struct AccountSession {
    current_tx: watch::Sender<Option<Account>>,
}

impl Default for AccountSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountSession {
    pub fn new() -> Self {
        let (current_tx, _) = watch::channel(None);
        Self { current_tx }
    }

    /// Replaces the current account. `None` means the keystore had nothing
    /// to offer and is accepted silently.
    pub fn select(&self, account: Option<Account>) {
        match &account {
            Some(account) => log::info!("Selected account {}", account.address()),
            None => log::info!("Cleared current account"),
        }
        self.current_tx.send_replace(account);
    }

    pub fn current(&self) -> Option<Account> {
        self.current_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Account>> {
        self.current_tx.subscribe()
    }
}

/// Outcome of the startup attempt to pick the primary account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionLoad {
    Selected(Account),
    NoAccount,
}
