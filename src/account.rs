use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const ADDRESS_LEN: usize = 20;

#[derive(Debug, Error, PartialEq)]
pub enum AddressError {
    #[error("address must be {ADDRESS_LEN} bytes, got {0}")]
    InvalidLength(usize),
    #[error("address is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Fixed-length account address. Always rendered as `0x` + lowercase hex,
/// which is also the key used by every cache and by the alias store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(digits)?;
        let bytes: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| AddressError::InvalidLength(b.len()))?;
        Ok(Self(bytes))
    }
}

/// A keystore entry as seen by the controller: nothing but its address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Account {
    address: Address,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Cache and store key for this account.
    pub fn address_key(&self) -> String {
        self.address.to_string()
    }
}
