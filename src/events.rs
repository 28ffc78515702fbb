use rust_decimal::Decimal;

use crate::ledger::TransactionRecord;
use crate::navigation::{Direction, Screen};

/// Messages posted to the main context. Background tasks never touch the
/// observable state directly, they send one of these instead.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    Navigate {
        screen: Screen,
        direction: Option<Direction>,
    },
    BalanceFetched {
        address: String,
        seq: u64,
        balance: Decimal,
    },
    /// History already ordered newest first.
    HistoryFetched {
        address: String,
        seq: u64,
        transactions: Vec<TransactionRecord>,
    },
    Notify(Notice),
    Shutdown,
}

/// User-facing messages raised by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    BalanceConnectionError,
    BalanceDecodeError,
    BalanceUnknownError,
    HistoryConnectionError,
    UnlockError,
}

impl Notice {
    /// Dialog `(title, body)` of the notice.
    pub fn dialog(&self) -> (&'static str, &'static str) {
        match self {
            Notice::BalanceConnectionError => {
                ("Network error", "Couldn't load balance, no network access.")
            }
            Notice::BalanceDecodeError => (
                "Decode error",
                "Couldn't decode the balance, the service replied with unexpected data.",
            ),
            Notice::BalanceUnknownError => {
                ("Unknown error", "Couldn't load balance, unknown error.")
            }
            Notice::HistoryConnectionError => {
                ("Network error", "Couldn't load history, no network access.")
            }
            Notice::UnlockError => (
                "Unlock error",
                "Couldn't unlock your account.\nThe issue should be reported.",
            ),
        }
    }
}
