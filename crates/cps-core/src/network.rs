use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network identity of this node. Selects the checkpoint master key and is
/// fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Test,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
        }
    }
}

/// Mainnet builds (`--features mainnet`) default to the main network.
impl Default for Network {
    #[cfg(feature = "mainnet")]
    fn default() -> Self {
        Network::Main
    }

    #[cfg(not(feature = "mainnet"))]
    fn default() -> Self {
        Network::Test
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            other => Err(ConfigError::InvalidValue {
                key: "network".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing() {
        assert_eq!("main".parse::<Network>().unwrap(), Network::Main);
        assert_eq!("MainNet".parse::<Network>().unwrap(), Network::Main);
        assert_eq!(" testnet ".parse::<Network>().unwrap(), Network::Test);
        assert!("regtest".parse::<Network>().is_err());
    }

    #[test]
    fn test_network_display_roundtrip() {
        for net in [Network::Main, Network::Test] {
            assert_eq!(net.to_string().parse::<Network>().unwrap(), net);
        }
    }
}
