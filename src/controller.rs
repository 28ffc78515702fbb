use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::account::Account;
use crate::alias::{AliasError, AliasStore};
use crate::config::{self, Config, EVENT_QUEUE_CAPACITY};
use crate::events::{ControllerEvent, Notice};
use crate::keystore::{AccountLock, AccountManager, KeystoreError};
use crate::ledger::{balance_title, FetchError, HistoryItem, LedgerSource};
use crate::navigation::{BackKey, Direction, KeystoreTab, NavigationStack, OverviewTab, Screen};
use crate::network::Network;
use crate::notify::{Clipboard, Notifier};
use crate::session::{AccountSession, SessionLoad};
use crate::store::KeyedStore;
use crate::sync::{BalanceCache, HistoryCache, SyncEngine};

/// External services the controller talks to.
pub struct Collaborators {
    pub accounts: Arc<dyn AccountManager>,
    pub ledger: Arc<dyn LedgerSource>,
    pub store: Arc<dyn KeyedStore>,
    pub notifier: Box<dyn Notifier>,
    pub clipboard: Box<dyn Clipboard>,
}

/// Handles of the fetches started by an account change.
#[derive(Default)]
pub struct RefreshHandles {
    pub balance: Option<JoinHandle<()>>,
    pub history: Option<JoinHandle<Result<(), FetchError>>>,
}

impl RefreshHandles {
    /// Waits for both fetches. Their results still sit in the event queue,
    /// so only [`Controller::settle`] may await this.
    async fn join(self) -> Result<()> {
        if let Some(balance) = self.balance {
            balance.await?;
        }
        if let Some(history) = self.history {
            history.await??;
        }
        Ok(())
    }
}

/// The main context. Owns the session, the caches, navigation and aliases;
/// background work reports back through the event queue and is applied
/// here, one event at a time.
pub struct Controller {
    config: Config,
    session: AccountSession,
    navigation: NavigationStack,
    sync: SyncEngine,
    aliases: AliasStore,
    store: Arc<dyn KeyedStore>,
    accounts: Arc<dyn AccountManager>,
    notifier: Box<dyn Notifier>,
    clipboard: Box<dyn Clipboard>,
    screen_tx: watch::Sender<Screen>,
    alias_tx: broadcast::Sender<String>,
    event_tx: mpsc::Sender<ControllerEvent>,
    event_rx: mpsc::Receiver<ControllerEvent>,
    stopping: bool,
}

impl Controller {
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self> {
        let Collaborators {
            accounts,
            ledger,
            store,
            notifier,
            clipboard,
        } = collaborators;

        let network = match config.network {
            Some(network) => network,
            None => config::stored_network(store.as_ref())?,
        };
        log::info!("Controller starting on {network}");

        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (screen_tx, _) = watch::channel(Screen::ROOT);
        let (alias_tx, _) = broadcast::channel(16);

        Ok(Self {
            sync: SyncEngine::new(ledger, network, event_tx.clone()),
            aliases: AliasStore::new(Arc::clone(&store)),
            session: AccountSession::new(),
            navigation: NavigationStack::new(),
            config,
            store,
            accounts,
            notifier,
            clipboard,
            screen_tx,
            alias_tx,
            event_tx,
            event_rx,
            stopping: false,
        })
    }

    /// Queue for posting work back onto the main context.
    pub fn sender(&self) -> mpsc::Sender<ControllerEvent> {
        self.event_tx.clone()
    }

    pub fn current_account(&self) -> Option<Account> {
        self.session.current()
    }

    pub fn navigation(&self) -> &NavigationStack {
        &self.navigation
    }

    pub fn aliases(&self) -> &AliasStore {
        &self.aliases
    }

    pub fn network(&self) -> Network {
        self.sync.network()
    }

    pub fn subscribe_account(&self) -> watch::Receiver<Option<Account>> {
        self.session.subscribe()
    }

    pub fn subscribe_balances(&self) -> watch::Receiver<BalanceCache> {
        self.sync.subscribe_balances()
    }

    pub fn subscribe_histories(&self) -> watch::Receiver<HistoryCache> {
        self.sync.subscribe_histories()
    }

    pub fn subscribe_screen(&self) -> watch::Receiver<Screen> {
        self.screen_tx.subscribe()
    }

    /// Fires with the new alias every time the current account's alias is
    /// updated.
    pub fn subscribe_alias_updates(&self) -> broadcast::Receiver<String> {
        self.alias_tx.subscribe()
    }

    /// Makes `account` current and starts fetching its data. Selecting no
    /// account fetches nothing.
    pub fn select_account(&mut self, account: Option<Account>) -> RefreshHandles {
        self.session.select(account);
        self.refresh()
    }

    /// Refetches balance and history of the current account.
    pub fn refresh(&mut self) -> RefreshHandles {
        let account = self.session.current();
        RefreshHandles {
            balance: self.sync.refresh_balance(account.as_ref()),
            history: self.sync.refresh_history(account.as_ref()),
        }
    }

    /// Picks the keystore's primary account, or routes to account creation
    /// when the keystore is empty. Other keystore errors are returned.
    pub async fn try_load_current_account(&mut self) -> Result<SessionLoad> {
        match self.primary_account().await? {
            Some(account) => {
                self.select_account(Some(account.clone()));
                self.schedule_screen(Screen::Overview, None);
                Ok(SessionLoad::Selected(account))
            }
            None => {
                log::info!("Keystore is empty, routing to account creation");
                self.load_create_new_account();
                Ok(SessionLoad::NoAccount)
            }
        }
    }

    /// The keystore's primary account, `None` when the keystore is empty.
    /// The keystore is read on the blocking pool.
    pub async fn primary_account(&self) -> Result<Option<Account>> {
        let accounts = Arc::clone(&self.accounts);
        match tokio::task::spawn_blocking(move || accounts.get_primary_account()).await? {
            Ok(account) => Ok(Some(account)),
            Err(KeystoreError::Empty) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let accounts = Arc::clone(&self.accounts);
        Ok(tokio::task::spawn_blocking(move || accounts.list_accounts()).await??)
    }

    /// Switches network, persists the choice and refetches the current
    /// account against it.
    pub fn set_network(&mut self, network: Network) -> Result<RefreshHandles> {
        config::set_stored_network(self.store.as_ref(), network)?;
        self.sync.set_network(network);
        log::info!("Network switched to {network}");
        Ok(self.refresh())
    }

    pub fn balance_title(&self) -> Option<String> {
        let account = self.session.current()?;
        Some(balance_title(self.sync.balance(&account.address_key())))
    }

    /// History of the current account, newest first, ready for display.
    pub fn history_items(&self) -> Vec<HistoryItem> {
        self.session
            .current()
            .and_then(|account| self.sync.history(&account.address_key()))
            .map(|txs| txs.iter().map(HistoryItem::from_record).collect())
            .unwrap_or_default()
    }

    /// Sets the alias of the current account and tells alias subscribers.
    pub fn update_alias(&self, alias: &str) -> Result<()> {
        let Some(account) = self.session.current() else {
            return Ok(());
        };
        self.aliases.set_for(&account, alias)?;
        // no subscriber is fine
        let _ = self.alias_tx.send(alias.to_string());
        Ok(())
    }

    pub fn current_alias(&self) -> Result<Option<String>> {
        let Some(account) = self.session.current() else {
            return Ok(None);
        };
        match self.aliases.get_for(&account) {
            Ok(alias) => Ok(Some(alias)),
            Err(AliasError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn copy_address_clipboard(&self) -> Result<()> {
        let Some(account) = self.session.current() else {
            return Ok(());
        };
        self.clipboard.copy(&account.address_key())?;
        self.notifier.snackbar("Address copied");
        Ok(())
    }

    /// Checks that `password` unlocks `account`, starting from a locked
    /// state.
    pub fn try_unlock(&self, lock: &dyn AccountLock, account: &Account, password: &str) -> bool {
        if let Err(e) = lock.lock(account) {
            log::error!("Failed to lock {}: {e}", account.address());
            self.notifier.notice(&Notice::UnlockError);
            return false;
        }
        self.notifier.snackbar("Unlocking account...");
        match lock.unlock(account, password) {
            Ok(()) => {
                self.notifier.snackbar("Unlocked!");
                true
            }
            Err(e) => {
                log::error!("Failed to unlock {}: {e}", account.address());
                self.notifier.notice(&Notice::UnlockError);
                false
            }
        }
    }

    pub fn go(&mut self, screen: Screen) {
        self.navigate(screen, None, true);
    }

    pub fn back(&mut self) -> Screen {
        let screen = self.navigation.back();
        self.screen_tx.send_replace(screen);
        screen
    }

    pub fn handle_back_key(&mut self) -> BackKey {
        let outcome = self.navigation.handle_back_key();
        self.screen_tx.send_replace(self.navigation.current());
        outcome
    }

    pub fn select_overview_tab(&mut self, tab: OverviewTab) {
        self.navigation.select_overview_tab(tab);
    }

    pub fn load_switch_account(&mut self) {
        self.schedule_screen(Screen::SwitchAccount, Some(Direction::Left));
    }

    pub fn load_manage_keystores(&mut self) {
        self.schedule_screen(Screen::ManageKeystores, Some(Direction::Left));
    }

    pub fn load_settings_screen(&mut self) {
        self.schedule_screen(Screen::Settings, Some(Direction::Left));
    }

    pub fn load_about_screen(&mut self) {
        self.schedule_screen(Screen::About, Some(Direction::Left));
    }

    pub fn load_flash_qr_code(&mut self) {
        self.navigate(Screen::FlashQrCode, Some(Direction::Left), true);
    }

    /// Opens the create-new-account tab right away, no screen delay.
    pub fn load_create_new_account(&mut self) {
        self.navigate(Screen::ManageKeystores, Some(Direction::Left), true);
        self.navigation.select_keystore_tab(KeystoreTab::CreateNewAccount);
    }

    fn navigate(&mut self, screen: Screen, direction: Option<Direction>, record_history: bool) {
        self.navigation.go_with(screen, direction, record_history);
        self.screen_tx.send_replace(screen);
    }

    /// Moves to `screen` after the configured delay, through the event
    /// queue so the move happens on the main context.
    fn schedule_screen(&mut self, screen: Screen, direction: Option<Direction>) {
        let delay = self.config.screen_switch_delay;
        if delay == Duration::ZERO {
            self.navigate(screen, direction, true);
            return;
        }
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = event_tx
                .send(ControllerEvent::Navigate { screen, direction })
                .await;
        });
    }

    /// Applies one event. Returns `false` once the controller should stop.
    pub fn handle_event(&mut self, event: ControllerEvent) -> bool {
        match event {
            ControllerEvent::Navigate { screen, direction } => {
                self.navigate(screen, direction, true);
            }
            ControllerEvent::BalanceFetched {
                address,
                seq,
                balance,
            } => {
                if self.sync.apply_balance(address.clone(), seq, balance) {
                    log::info!("Balance of {address} is {balance}");
                }
            }
            ControllerEvent::HistoryFetched {
                address,
                seq,
                transactions,
            } => {
                let count = transactions.len();
                if self.sync.apply_history(address.clone(), seq, transactions) {
                    log::info!("Loaded {count} transactions for {address}");
                }
            }
            ControllerEvent::Notify(notice) => self.notifier.notice(&notice),
            ControllerEvent::Shutdown => {
                log::info!("Controller shutting down");
                self.stopping = true;
            }
        }
        !self.stopping
    }

    /// Waits for the next event and applies it.
    pub async fn step(&mut self) -> bool {
        if self.stopping {
            return false;
        }
        match self.event_rx.recv().await {
            Some(event) => self.handle_event(event),
            None => false,
        }
    }

    /// Applies every event already queued without waiting for more.
    pub fn drain(&mut self) -> bool {
        while !self.stopping {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                }
                Err(_) => break,
            }
        }
        !self.stopping
    }

    /// Waits for the fetches behind `handles` while applying events, so
    /// their results cannot back up in the queue. Everything they posted
    /// has been applied when this returns.
    pub async fn settle(&mut self, handles: RefreshHandles) -> Result<()> {
        let mut fetches = Box::pin(handles.join());
        loop {
            tokio::select! {
                result = &mut fetches => {
                    self.drain();
                    return result;
                }
                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event);
                }
            }
        }
    }

    /// Runs the main context until a `Shutdown` event arrives.
    pub async fn run(mut self) {
        while self.step().await {}
    }
}
