use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::account::{Account, Address, AddressError};

#[derive(Debug, Error)]
pub enum KeystoreError {
    /// No accounts at all. A routing signal towards account creation
    /// rather than a failure.
    #[error("keystore is empty")]
    Empty,
    #[error("keystore io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid keystore file {path:?}: {reason}")]
    Invalid { path: PathBuf, reason: String },
    #[error("could not unlock {0}")]
    Unlock(Address),
}

/// Account listing side of the keystore.
pub trait AccountManager: Send + Sync {
    fn list_accounts(&self) -> Result<Vec<Account>, KeystoreError>;

    /// The first account of the keystore.
    fn get_primary_account(&self) -> Result<Account, KeystoreError> {
        self.list_accounts()?
            .into_iter()
            .next()
            .ok_or(KeystoreError::Empty)
    }
}

/// Lock state of the keystore. A password check locks first, then unlocks.
pub trait AccountLock: Send + Sync {
    fn lock(&self, account: &Account) -> Result<(), KeystoreError>;
    fn unlock(&self, account: &Account, password: &str) -> Result<(), KeystoreError>;
}

#[derive(Deserialize)]
struct KeyFile {
    address: String,
}

/// Read-only view over a directory of JSON keystore files. Only the
/// `address` field is read; keys are never decrypted here.
pub struct DirKeystore {
    dir: PathBuf,
}

impl DirKeystore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn read_account(path: &Path) -> Result<Account, KeystoreError> {
        let invalid = |reason: String| KeystoreError::Invalid {
            path: path.to_path_buf(),
            reason,
        };
        let contents = fs::read_to_string(path)?;
        let key_file: KeyFile =
            serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;
        let address: Address = key_file
            .address
            .parse()
            .map_err(|e: AddressError| invalid(e.to_string()))?;
        Ok(Account::new(address))
    }
}

impl AccountManager for DirKeystore {
    /// Accounts ordered by file name, which for `UTC--<timestamp>--<address>`
    /// files is creation order.
    fn list_accounts(&self) -> Result<Vec<Account>, KeystoreError> {
        if !self.dir.exists() {
            log::debug!("Keystore directory {:?} does not exist", self.dir);
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut accounts = Vec::new();
        for path in paths {
            match Self::read_account(&path) {
                Ok(account) => accounts.push(account),
                Err(e) => log::warn!("Skipping keystore entry: {e}"),
            }
        }
        Ok(accounts)
    }
}
