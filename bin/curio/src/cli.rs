use std::path::PathBuf;

use clap::{Parser, Subcommand};
use curio_lifecycle::ConfigOverrides;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "curio")]
#[command(
    author,
    version,
    about = "Deploy, upgrade and administer the Curio collection contract"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "CURIO_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Target network: base, baseSepolia, localhost, or any name with an RPC URL
    /// and chain id configured.
    #[arg(short, long)]
    pub network: Option<String>,

    /// Path to a TOML configuration file. Defaults to `curio.toml` when present.
    #[arg(short, long, env = "CURIO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding compiled contract artifacts.
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Append a TOML record of every successful run to `<dir>/<network>.toml`.
    #[arg(long)]
    pub record_dir: Option<PathBuf>,

    /// Confirmations to wait for, overriding the network default.
    #[arg(long)]
    pub confirmations: Option<u64>,

    /// Overall deadline, in seconds, for each confirmation wait.
    #[arg(long)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Command {
    /// Deploy a fresh contract and check its declared constants.
    Deploy {
        /// Contract name, as found in the artifacts directory.
        #[arg(long)]
        contract_name: Option<String>,
    },
    /// Deploy a new implementation and repoint an existing proxy to it.
    Upgrade {
        /// Proxy address. Falls back to `proxy_address` from the configuration.
        #[arg(long)]
        proxy: Option<String>,
        /// Implementation contract name, as found in the artifacts directory.
        #[arg(long)]
        contract_name: Option<String>,
    },
    /// Grant admin rights on a deployed contract. Only the owner may do this.
    AddAdmin {
        /// Contract address. Falls back to `contract_address` from the configuration.
        #[arg(long)]
        contract: Option<String>,
        /// Account to grant. Falls back to `admin_address` from the configuration.
        #[arg(long)]
        admin: Option<String>,
    },
}

impl Cli {
    /// Flags that take precedence over every other configuration source.
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            network: self.network.clone(),
            artifacts_dir: self.artifacts.clone(),
            record_dir: self.record_dir.clone(),
            confirmations: self.confirmations,
            confirmation_timeout_secs: self.timeout,
            ..Default::default()
        };

        match &self.command {
            Command::Deploy { contract_name } => {
                overrides.contract_name = contract_name.clone();
            }
            Command::Upgrade {
                proxy,
                contract_name,
            } => {
                overrides.proxy_address = proxy.clone();
                overrides.contract_name = contract_name.clone();
            }
            Command::AddAdmin { contract, admin } => {
                overrides.contract_address = contract.clone();
                overrides.admin_address = admin.clone();
            }
        }

        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_flags_become_overrides() {
        let cli = Cli::parse_from([
            "curio",
            "--network",
            "baseSepolia",
            "--timeout",
            "30",
            "upgrade",
            "--proxy",
            "0x000000000000000000000000000000000000dEaD",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.network.as_deref(), Some("baseSepolia"));
        assert_eq!(overrides.confirmation_timeout_secs, Some(30));
        assert_eq!(
            overrides.proxy_address.as_deref(),
            Some("0x000000000000000000000000000000000000dEaD")
        );
        assert!(overrides.contract_name.is_none());
    }

    #[test]
    fn test_add_admin_subcommand() {
        let cli = Cli::parse_from(["curio", "add-admin", "--admin", "0xabc"]);
        assert_eq!(cli.command.to_string(), "add-admin");
        assert_eq!(cli.overrides().admin_address.as_deref(), Some("0xabc"));
    }
}
