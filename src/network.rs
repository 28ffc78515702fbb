use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

/// Ethereum networks with an Etherscan endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Network {
    #[default]
    Mainnet,
    Ropsten,
    Rinkeby,
    Goerli,
    Kovan,
    Sepolia,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Ropsten => 3,
            Network::Rinkeby => 4,
            Network::Goerli => 5,
            Network::Kovan => 42,
            Network::Sepolia => 11155111,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Ropsten => "ropsten",
            Network::Rinkeby => "rinkeby",
            Network::Goerli => "goerli",
            Network::Kovan => "kovan",
            Network::Sepolia => "sepolia",
        }
    }

    pub fn etherscan_api_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.etherscan.io/api",
            Network::Ropsten => "https://api-ropsten.etherscan.io/api",
            Network::Rinkeby => "https://api-rinkeby.etherscan.io/api",
            Network::Goerli => "https://api-goerli.etherscan.io/api",
            Network::Kovan => "https://api-kovan.etherscan.io/api",
            Network::Sepolia => "https://api-sepolia.etherscan.io/api",
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        [
            Network::Mainnet,
            Network::Ropsten,
            Network::Rinkeby,
            Network::Goerli,
            Network::Kovan,
            Network::Sepolia,
        ]
        .into_iter()
        .find(|n| n.chain_id() == chain_id)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    /// Accepts a network name or a numeric chain id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if let Ok(chain_id) = s.parse::<u64>() {
            return Network::from_chain_id(chain_id)
                .ok_or_else(|| anyhow!("Unsupported chain id: {chain_id}"));
        }
        match s.as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "ropsten" => Ok(Network::Ropsten),
            "rinkeby" => Ok(Network::Rinkeby),
            "goerli" => Ok(Network::Goerli),
            "kovan" => Ok(Network::Kovan),
            "sepolia" => Ok(Network::Sepolia),
            other => Err(anyhow!("Unknown network: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_chain_ids() {
        assert_eq!("Goerli".parse::<Network>().unwrap(), Network::Goerli);
        assert_eq!("3".parse::<Network>().unwrap(), Network::Ropsten);
        assert!("77".parse::<Network>().is_err());
        assert!("moonbase".parse::<Network>().is_err());
    }

    #[test]
    fn default_is_mainnet() {
        assert_eq!(Network::default().chain_id(), 1);
    }
}
