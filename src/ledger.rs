use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::network::Network;

/// Failures of the remote ledger-indexing service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("no network access: {0}")]
    Connectivity(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("ledger service error: {0}")]
    Service(String),
    /// The address has no on-chain activity. Not a failure for history.
    #[error("no transactions found")]
    NoTransactions,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRecord {
    pub hash: String,
    pub sent: bool,
    /// Amount in ether.
    pub value: Decimal,
    pub from: String,
    pub to: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    /// The other side of the transfer.
    pub fn counterparty(&self) -> &str {
        if self.sent {
            &self.to
        } else {
            &self.from
        }
    }
}

#[async_trait]
pub trait LedgerSource: Send + Sync {
    async fn get_balance(&self, address: &str, network: Network) -> Result<Decimal, FetchError>;

    /// Transactions oldest first.
    async fn get_history(
        &self,
        address: &str,
        network: Network,
    ) -> Result<Vec<TransactionRecord>, FetchError>;
}

pub const CURRENCY: &str = "ETH";

/// One line of the history list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryItem {
    pub label: &'static str,
    pub amount: String,
    pub counterparty: String,
}

impl HistoryItem {
    pub fn from_record(record: &TransactionRecord) -> Self {
        Self {
            label: if record.sent { "Sent" } else { "Received" },
            amount: format!("{} {CURRENCY}", record.value.normalize()),
            counterparty: record.counterparty().to_string(),
        }
    }
}

/// Toolbar title for an account balance, zero until the first fetch lands.
pub fn balance_title(balance: Option<Decimal>) -> String {
    format!("{} {CURRENCY}", balance.unwrap_or_default().normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn record(sent: bool, value: &str) -> TransactionRecord {
        TransactionRecord {
            hash: "0x01".into(),
            sent,
            value: Decimal::from_str(value).unwrap(),
            from: "0xfrom".into(),
            to: "0xto".into(),
            timestamp: None,
        }
    }

    #[test]
    fn sent_item_points_at_recipient() {
        let item = HistoryItem::from_record(&record(true, "1.50"));
        assert_eq!(item.label, "Sent");
        assert_eq!(item.amount, "1.5 ETH");
        assert_eq!(item.counterparty, "0xto");
    }

    #[test]
    fn received_item_points_at_sender() {
        let item = HistoryItem::from_record(&record(false, "0.001"));
        assert_eq!(item.label, "Received");
        assert_eq!(item.amount, "0.001 ETH");
        assert_eq!(item.counterparty, "0xfrom");
    }

    #[test]
    fn title_defaults_to_zero() {
        assert_eq!(balance_title(None), "0 ETH");
        assert_eq!(balance_title(Some(Decimal::new(15, 1))), "1.5 ETH");
    }
}
