use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::network::Network;
use crate::store::{KeyedStore, Mapping, StoreError};

/// Delay before switching screens, lets the host render the current one
/// before the next screen gets built.
pub const SCREEN_SWITCH_DELAY: Duration = Duration::from_millis(400);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the queue background tasks use to reach the main context.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

const SETTINGS_NAMESPACE: &str = "settings";
const NETWORK_KEY: &str = "network";

/// Everything the controller needs to know about its environment, resolved
/// once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub datadir: PathBuf,
    pub keystore_dir: PathBuf,
    /// Overrides the stored network for this run when set.
    pub network: Option<Network>,
    pub etherscan_api_key: Option<String>,
    /// Replaces the per-network Etherscan URL, mostly for local mirrors.
    pub etherscan_api_url: Option<String>,
    pub request_timeout: Duration,
    pub screen_switch_delay: Duration,
}

impl Config {
    pub fn new(datadir: &Path) -> Self {
        Self {
            datadir: datadir.to_path_buf(),
            keystore_dir: datadir.join("keystore"),
            network: None,
            etherscan_api_key: None,
            etherscan_api_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            screen_switch_delay: SCREEN_SWITCH_DELAY,
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("walletctl")
}

/// Network persisted in the settings namespace, mainnet when never set.
pub fn stored_network(store: &dyn KeyedStore) -> Result<Network, StoreError> {
    let settings = match store.get(SETTINGS_NAMESPACE) {
        Ok(settings) => settings,
        Err(StoreError::NotFound(_)) => return Ok(Network::default()),
        Err(e) => return Err(e),
    };
    match settings.get(NETWORK_KEY).map(|n| n.parse::<Network>()) {
        Some(Ok(network)) => Ok(network),
        Some(Err(e)) => {
            log::warn!("Ignoring stored network: {e}");
            Ok(Network::default())
        }
        None => Ok(Network::default()),
    }
}

pub fn set_stored_network(store: &dyn KeyedStore, network: Network) -> Result<(), StoreError> {
    let mut settings = match store.get(SETTINGS_NAMESPACE) {
        Ok(settings) => settings,
        Err(StoreError::NotFound(_)) => Mapping::new(),
        Err(e) => return Err(e),
    };
    settings.insert(NETWORK_KEY.to_string(), network.name().to_string());
    store.put(SETTINGS_NAMESPACE, &settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    #[test]
    fn network_defaults_to_mainnet() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteStore::new(tmp.path()).unwrap();
        assert_eq!(stored_network(&store).unwrap(), Network::Mainnet);
    }

    #[test]
    fn network_is_persisted() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteStore::new(tmp.path()).unwrap();
        set_stored_network(&store, Network::Goerli).unwrap();
        assert_eq!(stored_network(&store).unwrap(), Network::Goerli);
    }

    #[test]
    fn keystore_lives_in_datadir() {
        let config = Config::new(Path::new("/tmp/wallet"));
        assert_eq!(config.keystore_dir, Path::new("/tmp/wallet/keystore"));
        assert!(config.network.is_none());
    }
}
