use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::account::Account;
use crate::events::{ControllerEvent, Notice};
use crate::ledger::{FetchError, LedgerSource, TransactionRecord};
use crate::network::Network;

pub type BalanceCache = HashMap<String, Decimal>;
pub type HistoryCache = HashMap<String, Vec<TransactionRecord>>;

/// Refreshes balances and histories in background tasks and owns the
/// caches they land in.
///
/// Fetches run off the main context; their results come back as
/// [`ControllerEvent`]s and are applied by the controller through
/// [`SyncEngine::apply_balance`] and [`SyncEngine::apply_history`]. Every
/// refresh gets a sequence number and a completion older than the last one
/// applied for the same address is dropped. Switching network empties the
/// caches and drops every completion started before the switch.
pub struct SyncEngine {
    source: Arc<dyn LedgerSource>,
    network: Network,
    event_tx: mpsc::Sender<ControllerEvent>,
    balances_tx: watch::Sender<BalanceCache>,
    histories_tx: watch::Sender<HistoryCache>,
    next_seq: u64,
    /// Completions at or below this sequence number belong to a previous
    /// network.
    network_floor: u64,
    applied_balance: HashMap<String, u64>,
    applied_history: HashMap<String, u64>,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn LedgerSource>,
        network: Network,
        event_tx: mpsc::Sender<ControllerEvent>,
    ) -> Self {
        let (balances_tx, _) = watch::channel(BalanceCache::new());
        let (histories_tx, _) = watch::channel(HistoryCache::new());
        Self {
            source,
            network,
            event_tx,
            balances_tx,
            histories_tx,
            next_seq: 0,
            network_floor: 0,
            applied_balance: HashMap::new(),
            applied_history: HashMap::new(),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn set_network(&mut self, network: Network) {
        if network == self.network {
            return;
        }
        self.network = network;
        self.network_floor = self.next_seq;
        self.balances_tx.send_modify(|cache| cache.clear());
        self.histories_tx.send_modify(|cache| cache.clear());
        log::debug!(
            "Caches cleared for {network}, ignoring results up to #{}",
            self.network_floor
        );
    }

    pub fn balance(&self, address: &str) -> Option<Decimal> {
        self.balances_tx.borrow().get(address).copied()
    }

    pub fn history(&self, address: &str) -> Option<Vec<TransactionRecord>> {
        self.histories_tx.borrow().get(address).cloned()
    }

    pub fn subscribe_balances(&self) -> watch::Receiver<BalanceCache> {
        self.balances_tx.subscribe()
    }

    pub fn subscribe_histories(&self) -> watch::Receiver<HistoryCache> {
        self.histories_tx.subscribe()
    }

    fn take_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Starts a balance fetch for `account`. Without an account there is
    /// nothing to do and no task is spawned.
    pub fn refresh_balance(&mut self, account: Option<&Account>) -> Option<JoinHandle<()>> {
        let address = account?.address_key();
        let seq = self.take_seq();
        let source = Arc::clone(&self.source);
        let network = self.network;
        let event_tx = self.event_tx.clone();

        log::debug!("Refreshing balance of {address} on {network} (#{seq})");
        Some(tokio::spawn(async move {
            let event = match source.get_balance(&address, network).await {
                Ok(balance) => ControllerEvent::BalanceFetched {
                    address,
                    seq,
                    balance,
                },
                Err(e) => ControllerEvent::Notify(balance_notice(&address, &e)),
            };
            if event_tx.send(event).await.is_err() {
                log::debug!("Main context closed, dropping balance result #{seq}");
            }
        }))
    }

    /// Starts a history fetch for `account`.
    ///
    /// Only connectivity failures are turned into a notice. Anything else
    /// is logged and returned through the handle for the caller to deal
    /// with.
    pub fn refresh_history(
        &mut self,
        account: Option<&Account>,
    ) -> Option<JoinHandle<Result<(), FetchError>>> {
        let address = account?.address_key();
        let seq = self.take_seq();
        let source = Arc::clone(&self.source);
        let network = self.network;
        let event_tx = self.event_tx.clone();

        log::debug!("Refreshing history of {address} on {network} (#{seq})");
        Some(tokio::spawn(async move {
            let transactions = match source.get_history(&address, network).await {
                Ok(mut transactions) => {
                    transactions.reverse();
                    transactions
                }
                Err(FetchError::NoTransactions) => Vec::new(),
                Err(FetchError::Connectivity(e)) => {
                    log::warn!("History fetch for {address} failed: {e}");
                    let _ = event_tx
                        .send(ControllerEvent::Notify(Notice::HistoryConnectionError))
                        .await;
                    return Ok(());
                }
                Err(e) => {
                    log::error!("History fetch for {address} failed: {e}");
                    return Err(e);
                }
            };
            let event = ControllerEvent::HistoryFetched {
                address,
                seq,
                transactions,
            };
            if event_tx.send(event).await.is_err() {
                log::debug!("Main context closed, dropping history result #{seq}");
            }
            Ok(())
        }))
    }

    /// Writes a fetched balance unless a newer one was already applied.
    pub fn apply_balance(&mut self, address: String, seq: u64, balance: Decimal) -> bool {
        if seq <= self.network_floor || !is_newer(&mut self.applied_balance, &address, seq) {
            log::debug!("Dropping stale balance #{seq} for {address}");
            return false;
        }
        self.balances_tx.send_modify(|cache| {
            cache.insert(address, balance);
        });
        true
    }

    pub fn apply_history(
        &mut self,
        address: String,
        seq: u64,
        transactions: Vec<TransactionRecord>,
    ) -> bool {
        if seq <= self.network_floor || !is_newer(&mut self.applied_history, &address, seq) {
            log::debug!("Dropping stale history #{seq} for {address}");
            return false;
        }
        self.histories_tx.send_modify(|cache| {
            cache.insert(address, transactions);
        });
        true
    }
}

fn is_newer(applied: &mut HashMap<String, u64>, address: &str, seq: u64) -> bool {
    match applied.get(address) {
        Some(last) if *last >= seq => false,
        _ => {
            applied.insert(address.to_string(), seq);
            true
        }
    }
}

fn balance_notice(address: &str, error: &FetchError) -> Notice {
    match error {
        FetchError::Connectivity(_) => {
            log::warn!("Balance fetch for {address} failed: {error}");
            Notice::BalanceConnectionError
        }
        FetchError::Decode(_) => {
            log::error!("Balance fetch for {address} returned bad data: {error}");
            Notice::BalanceDecodeError
        }
        FetchError::Service(_) | FetchError::NoTransactions => {
            log::error!("Balance fetch for {address} failed: {error}");
            Notice::BalanceUnknownError
        }
    }
}
