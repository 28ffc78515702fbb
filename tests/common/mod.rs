#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use walletctl::keystore::{AccountLock, AccountManager, KeystoreError};
use walletctl::notify::{Clipboard, Notifier};
use walletctl::store::SqliteStore;
use walletctl::{
    Account, Address, Collaborators, Config, Controller, FetchError, LedgerSource, Network,
    TransactionRecord,
};

pub fn account(byte: u8) -> Account {
    Account::new(Address::from_bytes([byte; 20]))
}

pub fn tx(hash: &str, sent: bool, value: &str) -> TransactionRecord {
    TransactionRecord {
        hash: hash.to_string(),
        sent,
        value: value.parse().unwrap(),
        from: "0x00000000000000000000000000000000000000aa".to_string(),
        to: "0x00000000000000000000000000000000000000bb".to_string(),
        timestamp: None,
    }
}

/// Ledger that answers from scripted queues and counts calls.
#[derive(Default)]
pub struct FakeLedger {
    pub balances: Mutex<VecDeque<Result<Decimal, FetchError>>>,
    pub histories: Mutex<VecDeque<Result<Vec<TransactionRecord>, FetchError>>>,
    pub calls: Mutex<Vec<(String, Network)>>,
}

impl FakeLedger {
    pub fn push_balance(&self, result: Result<Decimal, FetchError>) {
        self.balances.lock().unwrap().push_back(result);
    }

    pub fn push_history(&self, result: Result<Vec<TransactionRecord>, FetchError>) {
        self.histories.lock().unwrap().push_back(result);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LedgerSource for FakeLedger {
    async fn get_balance(&self, address: &str, network: Network) -> Result<Decimal, FetchError> {
        self.calls.lock().unwrap().push((address.to_string(), network));
        self.balances
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Connectivity("unscripted".into())))
    }

    async fn get_history(
        &self,
        address: &str,
        network: Network,
    ) -> Result<Vec<TransactionRecord>, FetchError> {
        self.calls.lock().unwrap().push((address.to_string(), network));
        self.histories
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::NoTransactions))
    }
}

pub enum KeystoreState {
    Accounts(Vec<Account>),
    Broken,
}

pub struct FakeKeystore {
    pub state: KeystoreState,
}

impl AccountManager for FakeKeystore {
    fn list_accounts(&self) -> Result<Vec<Account>, KeystoreError> {
        match &self.state {
            KeystoreState::Accounts(accounts) => Ok(accounts.clone()),
            KeystoreState::Broken => Err(KeystoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "keystore unreadable",
            ))),
        }
    }
}

/// Records lock/unlock calls; unlocks only with `password`.
pub struct FakeLock {
    pub password: String,
    pub calls: Mutex<Vec<&'static str>>,
}

impl AccountLock for FakeLock {
    fn lock(&self, _account: &Account) -> Result<(), KeystoreError> {
        self.calls.lock().unwrap().push("lock");
        Ok(())
    }

    fn unlock(&self, account: &Account, password: &str) -> Result<(), KeystoreError> {
        self.calls.lock().unwrap().push("unlock");
        if password == self.password {
            Ok(())
        } else {
            Err(KeystoreError::Unlock(account.address()))
        }
    }
}

#[derive(Clone, Default)]
pub struct Recorder {
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for Recorder {
    fn snackbar(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }

    fn dialog(&self, title: &str, body: &str) {
        self.messages.lock().unwrap().push(format!("{title}: {body}"));
    }
}

impl Clipboard for Recorder {
    fn copy(&self, text: &str) -> Result<()> {
        self.messages.lock().unwrap().push(format!("copied {text}"));
        Ok(())
    }
}

pub struct TestController {
    pub controller: Controller,
    pub ledger: Arc<FakeLedger>,
    pub notices: Recorder,
    pub clipboard: Recorder,
}

pub fn setup(datadir: &Path, keystore: KeystoreState) -> TestController {
    setup_with_delay(datadir, keystore, Duration::ZERO)
}

pub fn setup_with_delay(datadir: &Path, keystore: KeystoreState, delay: Duration) -> TestController {
    let mut config = Config::new(datadir);
    config.screen_switch_delay = delay;

    let ledger = Arc::new(FakeLedger::default());
    let notices = Recorder::default();
    let clipboard = Recorder::default();
    let collaborators = Collaborators {
        accounts: Arc::new(FakeKeystore { state: keystore }),
        ledger: ledger.clone(),
        store: Arc::new(SqliteStore::new(datadir).unwrap()),
        notifier: Box::new(notices.clone()),
        clipboard: Box::new(clipboard.clone()),
    };
    TestController {
        controller: Controller::new(config, collaborators).unwrap(),
        ledger,
        notices,
        clipboard,
    }
}
