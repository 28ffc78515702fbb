// Module declarations
pub mod account;
pub mod alias;
pub mod config;
pub mod controller;
pub mod etherscan;
pub mod events;
pub mod keystore;
pub mod ledger;
pub mod navigation;
pub mod network;
pub mod notify;
pub mod session;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use account::{Account, Address};
pub use config::Config;
pub use controller::{Collaborators, Controller, RefreshHandles};
pub use events::{ControllerEvent, Notice};
pub use ledger::{FetchError, HistoryItem, LedgerSource, TransactionRecord};
pub use navigation::{BackKey, Screen};
pub use network::Network;
pub use session::SessionLoad;
