use std::sync::Arc;

use thiserror::Error;

use crate::account::{Account, Address};
use crate::store::{KeyedStore, Mapping, StoreError};

const ALIAS_NAMESPACE: &str = "alias";

#[derive(Debug, Error)]
pub enum AliasError {
    #[error("no alias for {0}")]
    NotFound(Address),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Address to alias mapping persisted in the keyed store.
///
/// An address without an entry and an address with an empty alias mean the
/// same thing, so setting an empty alias deletes the entry.
#[derive(Clone)]
pub struct AliasStore {
    store: Arc<dyn KeyedStore>,
}

impl AliasStore {
    pub fn new(store: Arc<dyn KeyedStore>) -> Self {
        Self { store }
    }

    pub fn set(&self, address: &Address, alias: &str) -> Result<(), AliasError> {
        if alias.is_empty() {
            return match self.delete(address) {
                Ok(()) | Err(AliasError::NotFound(_)) => Ok(()),
                Err(e) => Err(e),
            };
        }
        let mut aliases = match self.store.get(ALIAS_NAMESPACE) {
            Ok(aliases) => aliases,
            Err(StoreError::NotFound(_)) => Mapping::new(),
            Err(e) => return Err(e.into()),
        };
        aliases.insert(address.to_string(), alias.to_string());
        self.store.put(ALIAS_NAMESPACE, &aliases)?;
        log::info!("Alias for {address} set to {alias:?}");
        Ok(())
    }

    pub fn delete(&self, address: &Address) -> Result<(), AliasError> {
        let mut aliases = self.load(address)?;
        if aliases.remove(&address.to_string()).is_none() {
            return Err(AliasError::NotFound(*address));
        }
        self.store.put(ALIAS_NAMESPACE, &aliases)?;
        log::info!("Alias for {address} deleted");
        Ok(())
    }

    pub fn get(&self, address: &Address) -> Result<String, AliasError> {
        self.load(address)?
            .remove(&address.to_string())
            .ok_or(AliasError::NotFound(*address))
    }

    pub fn set_for(&self, account: &Account, alias: &str) -> Result<(), AliasError> {
        self.set(&account.address(), alias)
    }

    pub fn get_for(&self, account: &Account) -> Result<String, AliasError> {
        self.get(&account.address())
    }

    pub fn delete_for(&self, account: &Account) -> Result<(), AliasError> {
        self.delete(&account.address())
    }

    fn load(&self, address: &Address) -> Result<Mapping, AliasError> {
        match self.store.get(ALIAS_NAMESPACE) {
            Ok(aliases) => Ok(aliases),
            Err(StoreError::NotFound(_)) => Err(AliasError::NotFound(*address)),
            Err(e) => Err(e.into()),
        }
    }
}
