//! Persistent records of successful runs, one TOML file per network.

use std::path::{Path, PathBuf};

use alloy_core::primitives::{Address, TxHash};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    admin::{AdminGrantResult, AdminOutcome},
    deploy::DeploymentResult,
    network::NetworkProfile,
    upgrade::UpgradeResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
    Deploy,
    Upgrade,
    AddAdmin,
}

/// One successful state-changing run, as persisted to `<record_dir>/<network>.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub kind: RecordKind,
    pub network: String,
    pub chain_id: u64,
    pub sender: Address,
    /// The deployed contract, the proxy, or the contract an admin was granted on.
    pub contract_address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_address: Option<Address>,
    #[serde(default)]
    pub transactions: Vec<TxHash>,
    /// RFC 3339, UTC.
    pub recorded_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordFile {
    #[serde(default)]
    records: Vec<DeploymentRecord>,
}

impl DeploymentRecord {
    fn new(kind: RecordKind, profile: &NetworkProfile, sender: Address, contract: Address) -> Self {
        Self {
            kind,
            network: profile.name.clone(),
            chain_id: profile.chain_id,
            sender,
            contract_address: contract,
            contract_name: None,
            implementation_address: None,
            admin_address: None,
            transactions: Vec::new(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn deployment(
        profile: &NetworkProfile,
        sender: Address,
        contract_name: &str,
        result: &DeploymentResult,
    ) -> Self {
        Self {
            contract_name: Some(contract_name.to_string()),
            transactions: vec![result.deployment_transaction.hash],
            ..Self::new(RecordKind::Deploy, profile, sender, result.contract_address)
        }
    }

    pub fn upgrade(
        profile: &NetworkProfile,
        sender: Address,
        contract_name: &str,
        result: &UpgradeResult,
    ) -> Self {
        Self {
            contract_name: Some(contract_name.to_string()),
            implementation_address: Some(result.new_implementation),
            transactions: vec![
                result.implementation_deployment.hash,
                result.upgrade_transaction.hash,
            ],
            ..Self::new(RecordKind::Upgrade, profile, sender, result.proxy_address)
        }
    }

    /// `None` when the grant was a no-op; nothing changed on chain.
    pub fn admin_grant(
        profile: &NetworkProfile,
        sender: Address,
        result: &AdminGrantResult,
    ) -> Option<Self> {
        match &result.outcome {
            AdminOutcome::AlreadyAdmin => None,
            AdminOutcome::Granted { transaction } => Some(Self {
                admin_address: Some(result.target),
                transactions: vec![transaction.hash],
                ..Self::new(RecordKind::AddAdmin, profile, sender, result.contract_address)
            }),
        }
    }

    /// Append this record to `<dir>/<network>.toml`, creating the file if needed.
    pub fn append_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .context(format!("Failed to create record directory {}", dir.display()))?;

        let path = dir.join(format!("{}.toml", self.network));
        let mut file = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .context(format!("Failed to read records from {}", path.display()))?;
            toml::from_str::<RecordFile>(&content)
                .context(format!("Failed to parse records in {}", path.display()))?
        } else {
            RecordFile::default()
        };

        file.records.push(self.clone());

        let content =
            toml::to_string_pretty(&file).context("Failed to serialize deployment records")?;
        std::fs::write(&path, content)
            .context(format!("Failed to write records to {}", path.display()))?;

        tracing::info!(path = %path.display(), kind = %self.kind, "Deployment record saved");
        Ok(path)
    }
}

/// Read every record stored for `network` under `dir`.
pub fn load_records(dir: &Path, network: &str) -> Result<Vec<DeploymentRecord>> {
    let path = dir.join(format!("{network}.toml"));
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(&path)
        .context(format!("Failed to read records from {}", path.display()))?;
    let file: RecordFile =
        toml::from_str(&content).context(format!("Failed to parse records in {}", path.display()))?;
    Ok(file.records)
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::U256;
    use tempdir::TempDir;

    use super::*;
    use crate::{
        deploy::{ConstantCheck, ConstantsReport},
        network::{NetworkOverrides, resolve},
        tx::TransactionReceipt,
    };

    fn deployment_result() -> DeploymentResult {
        DeploymentResult {
            contract_address: Address::repeat_byte(0x11),
            deployment_transaction: TransactionReceipt::pending(TxHash::repeat_byte(0x22)),
            constants: ConstantsReport {
                operations_address: ConstantCheck::Matched,
                operations_fee: ConstantCheck::Mismatched {
                    expected: U256::from(1).to_string(),
                    observed: U256::from(2).to_string(),
                },
            },
        }
    }

    #[test]
    fn test_records_accumulate() {
        let dir = TempDir::new("curio-records").unwrap();
        let profile = resolve("baseSepolia", &NetworkOverrides::default()).unwrap();
        let sender = Address::repeat_byte(0x33);

        let first = DeploymentRecord::deployment(&profile, sender, "Curio", &deployment_result());
        let path = first.append_to(dir.path()).unwrap();
        assert!(path.ends_with("baseSepolia.toml"));

        let second = DeploymentRecord::deployment(&profile, sender, "CurioV2", &deployment_result());
        second.append_to(dir.path()).unwrap();

        let records = load_records(dir.path(), "baseSepolia").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], first);
        assert_eq!(records[1].contract_name.as_deref(), Some("CurioV2"));
        assert_eq!(records[1].transactions, vec![TxHash::repeat_byte(0x22)]);
    }

    #[test]
    fn test_noop_admin_grant_is_not_recorded() {
        let profile = resolve("localhost", &NetworkOverrides::default()).unwrap();
        let result = AdminGrantResult {
            contract_address: Address::repeat_byte(1),
            target: Address::repeat_byte(2),
            outcome: AdminOutcome::AlreadyAdmin,
        };
        assert!(DeploymentRecord::admin_grant(&profile, Address::ZERO, &result).is_none());
    }

    #[test]
    fn test_missing_record_file_is_empty() {
        let dir = TempDir::new("curio-records").unwrap();
        assert!(load_records(dir.path(), "base").unwrap().is_empty());
    }
}
