//! Network endpoint resolution.
//!
//! Maps a logical network name to a [`NetworkProfile`]. Overrides come from the
//! immutable [`crate::LifecycleConfig`]; the resolver never reads the process
//! environment itself.

use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{LifecycleError, Result};

/// Connection parameters for one network. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// Canonical name of the network.
    pub name: String,
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Production networks require deeper confirmation and a funded identity.
    pub is_production: bool,
}

/// Networks with built-in defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum KnownNetwork {
    #[strum(serialize = "base")]
    Base,
    #[strum(serialize = "baseSepolia")]
    BaseSepolia,
    #[strum(serialize = "localhost")]
    Localhost,
}

impl KnownNetwork {
    pub fn chain_id(&self) -> u64 {
        match self {
            KnownNetwork::Base => 8453,
            KnownNetwork::BaseSepolia => 84532,
            KnownNetwork::Localhost => 31337,
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            KnownNetwork::Base => "https://mainnet.base.org",
            KnownNetwork::BaseSepolia => "https://sepolia.base.org",
            KnownNetwork::Localhost => "http://127.0.0.1:8545",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, KnownNetwork::Base)
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            KnownNetwork::Base => &["base", "basemainnet"],
            KnownNetwork::BaseSepolia => &["basesepolia"],
            KnownNetwork::Localhost => &["localhost", "hardhat", "anvil", "local"],
        }
    }
}

impl FromStr for KnownNetwork {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self> {
        let key = normalize(s);
        <KnownNetwork as strum::IntoEnumIterator>::iter()
            .find(|network| network.aliases().contains(&key.as_str()))
            .ok_or_else(|| LifecycleError::configuration(format!("unknown network '{s}'")))
    }
}

/// Per-network overrides, keyed by network name in any casing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkOverrides {
    #[serde(default)]
    pub rpc_urls: BTreeMap<String, String>,
    #[serde(default)]
    pub chain_ids: BTreeMap<String, u64>,
}

impl NetworkOverrides {
    fn rpc_url(&self, name: &str) -> Option<&str> {
        lookup(&self.rpc_urls, name).map(String::as_str)
    }

    fn chain_id(&self, name: &str) -> Option<u64> {
        lookup(&self.chain_ids, name).copied()
    }
}

/// Resolve a network name: explicit override, then built-in default, else error.
pub fn resolve(name: &str, overrides: &NetworkOverrides) -> Result<NetworkProfile> {
    if name.trim().is_empty() {
        return Err(LifecycleError::configuration("no target network configured"));
    }

    let known = KnownNetwork::from_str(name).ok();
    let rpc_override = overrides.rpc_url(name);

    let profile = match (known, rpc_override) {
        (Some(network), rpc_override) => NetworkProfile {
            name: network.to_string(),
            rpc_url: parse_url(name, rpc_override.unwrap_or(network.default_rpc_url()))?,
            chain_id: overrides.chain_id(name).unwrap_or(network.chain_id()),
            is_production: network.is_production(),
        },
        (None, Some(url)) => {
            let chain_id = overrides.chain_id(name).ok_or_else(|| {
                LifecycleError::configuration(format!(
                    "network '{name}' is not built in; a chain id override is required alongside its RPC URL"
                ))
            })?;
            NetworkProfile {
                name: name.to_string(),
                rpc_url: parse_url(name, url)?,
                chain_id,
                is_production: true,
            }
        }
        (None, None) => {
            return Err(LifecycleError::configuration(format!(
                "unknown network '{name}' and no RPC URL override configured"
            )));
        }
    };

    tracing::debug!(
        network = %profile.name,
        rpc_url = %profile.rpc_url,
        chain_id = profile.chain_id,
        is_production = profile.is_production,
        overridden = rpc_override.is_some(),
        "Resolved network profile"
    );

    Ok(profile)
}

fn parse_url(name: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| {
        LifecycleError::configuration(format!("invalid RPC URL for network '{name}': {e}"))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(LifecycleError::configuration(format!(
            "unsupported RPC scheme '{scheme}' for network '{name}'"
        ))),
    }
}

/// Lowercase and strip separators so `base-sepolia`, `BASE_SEPOLIA` and `baseSepolia` agree.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn lookup<'a, V>(map: &'a BTreeMap<String, V>, name: &str) -> Option<&'a V> {
    let key = normalize(name);
    let aliases = KnownNetwork::from_str(name)
        .map(|network| network.aliases())
        .unwrap_or_default();

    map.iter()
        .find(|(candidate, _)| {
            let candidate = normalize(candidate);
            candidate == key || aliases.contains(&candidate.as_str())
        })
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_sepolia_defaults() {
        let profile = resolve("baseSepolia", &NetworkOverrides::default()).unwrap();
        assert_eq!(profile.name, "baseSepolia");
        assert_eq!(profile.rpc_url.as_str(), "https://sepolia.base.org/");
        assert_eq!(profile.chain_id, 84532);
        assert!(!profile.is_production);
    }

    #[test]
    fn test_name_matching_ignores_case_and_separators() {
        for name in ["base-sepolia", "BASE_SEPOLIA", "basesepolia"] {
            let profile = resolve(name, &NetworkOverrides::default()).unwrap();
            assert_eq!(profile.chain_id, 84532, "{name}");
        }
        let local = resolve("hardhat", &NetworkOverrides::default()).unwrap();
        assert_eq!(local.name, "localhost");
        assert_eq!(local.chain_id, 31337);
    }

    #[test]
    fn test_override_wins_over_default() {
        let mut overrides = NetworkOverrides::default();
        // Keys arrive lowercased from environment providers.
        overrides
            .rpc_urls
            .insert("basesepolia".to_string(), "https://rpc.example.org/key".to_string());

        let profile = resolve("baseSepolia", &overrides).unwrap();
        assert_eq!(profile.rpc_url.as_str(), "https://rpc.example.org/key");
        assert_eq!(profile.chain_id, 84532);
    }

    #[test]
    fn test_base_is_production() {
        let profile = resolve("base", &NetworkOverrides::default()).unwrap();
        assert!(profile.is_production);
        assert_eq!(profile.chain_id, 8453);
    }

    #[test]
    fn test_unknown_network_without_override_fails() {
        let err = resolve("optimism", &NetworkOverrides::default()).unwrap_err();
        assert!(matches!(err, LifecycleError::Configuration(_)));
    }

    #[test]
    fn test_custom_network_requires_chain_id() {
        let mut overrides = NetworkOverrides::default();
        overrides
            .rpc_urls
            .insert("devnet".to_string(), "http://10.0.0.2:8545".to_string());
        assert!(resolve("devnet", &overrides).is_err());

        overrides.chain_ids.insert("devnet".to_string(), 1337);
        let profile = resolve("devnet", &overrides).unwrap();
        assert_eq!(profile.chain_id, 1337);
        assert!(profile.is_production);
    }

    #[test]
    fn test_malformed_url_is_configuration_error() {
        let mut overrides = NetworkOverrides::default();
        overrides
            .rpc_urls
            .insert("base".to_string(), "not a url".to_string());
        assert!(matches!(
            resolve("base", &overrides),
            Err(LifecycleError::Configuration(_))
        ));

        overrides
            .rpc_urls
            .insert("base".to_string(), "ws://127.0.0.1:8546".to_string());
        assert!(resolve("base", &overrides).is_err());
    }
}
