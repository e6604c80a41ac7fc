//! Run configuration.
//!
//! Built once per invocation and never mutated afterwards. Sources, lowest
//! precedence first: built-in defaults, the TOML file, `CURIO_*` environment
//! variables, command-line flags.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{
    confirmation::{ConfirmationPolicy, RetryPolicy},
    contract::ContractArtifact,
    error::{LifecycleError, Result},
    identity::SecretKey,
    network::{self, NetworkOverrides, NetworkProfile},
};

/// File read from the working directory when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "curio.toml";

/// Prefix of every environment variable the configuration reads.
pub const ENV_PREFIX: &str = "CURIO_";

pub const DEFAULT_CONTRACT_NAME: &str = "CurioCollection";
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    pub network: Option<String>,

    /// Hex private key or mnemonic phrase.
    #[serde(default, skip_serializing)]
    pub private_key: Option<SecretKey>,

    /// RPC URL per network name.
    #[serde(default)]
    pub rpc_urls: BTreeMap<String, String>,

    /// Chain id per network name; required for networks that are not built in.
    #[serde(default)]
    pub chain_ids: BTreeMap<String, u64>,

    pub proxy_address: Option<String>,
    pub admin_address: Option<String>,
    pub contract_address: Option<String>,

    pub contract_name: String,
    pub artifacts_dir: PathBuf,

    pub confirmation_timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// Overrides the per-network confirmation depth.
    pub confirmations: Option<u64>,
    /// Attempts per RPC read, including the first.
    pub rpc_retries: usize,

    /// Directory receiving `<network>.toml` deployment records.
    pub record_dir: Option<PathBuf>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            network: None,
            private_key: None,
            rpc_urls: BTreeMap::new(),
            chain_ids: BTreeMap::new(),
            proxy_address: None,
            admin_address: None,
            contract_address: None,
            contract_name: DEFAULT_CONTRACT_NAME.to_string(),
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            confirmation_timeout_secs: crate::confirmation::DEFAULT_CONFIRMATION_TIMEOUT.as_secs(),
            poll_interval_secs: crate::confirmation::DEFAULT_POLL_INTERVAL.as_secs(),
            confirmations: None,
            rpc_retries: RetryPolicy::default().max_attempts,
            record_dir: None,
        }
    }
}

/// Values supplied on the command line. Unset fields leave lower layers untouched.
///
/// Secret material only comes from the file or the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_dir: Option<PathBuf>,
}

impl LifecycleConfig {
    /// Merge every configuration source.
    ///
    /// An explicit `config_path` must exist; the default `curio.toml` is optional.
    pub fn load(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(path) = config_path.filter(|p| !p.is_file()) {
            return Err(LifecycleError::configuration(format!(
                "config file {} does not exist",
                path.display()
            )));
        }

        let file = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));

        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(|e| LifecycleError::configuration(format!("invalid configuration: {e}")))?;

        tracing::debug!(
            network = ?config.network,
            file = %file.display(),
            has_private_key = config.private_key.is_some(),
            "Loaded configuration"
        );

        Ok(config)
    }

    pub fn network_overrides(&self) -> NetworkOverrides {
        NetworkOverrides {
            rpc_urls: self.rpc_urls.clone(),
            chain_ids: self.chain_ids.clone(),
        }
    }

    /// Resolve the target network. Fails before any network access when none is set.
    pub fn network_profile(&self) -> Result<NetworkProfile> {
        let name = self
            .network
            .as_deref()
            .ok_or_else(|| LifecycleError::configuration("no target network configured"))?;
        network::resolve(name, &self.network_overrides())
    }

    pub fn confirmation_policy(&self, profile: &NetworkProfile) -> ConfirmationPolicy {
        let policy = ConfirmationPolicy::for_profile(profile)
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs.max(1)))
            .with_timeout(Duration::from_secs(self.confirmation_timeout_secs));

        match self.confirmations {
            Some(confirmations) => policy.with_required_confirmations(confirmations),
            None => policy,
        }
    }

    pub fn rpc_retry_policy(&self) -> RetryPolicy {
        let default = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.rpc_retries.max(1),
            ..default
        }
    }

    /// Load the configured contract's compiled artifact.
    pub fn artifact(&self) -> Result<ContractArtifact> {
        ContractArtifact::load(&self.artifacts_dir, &self.contract_name)
    }
}
