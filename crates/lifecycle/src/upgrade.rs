//! Proxy upgrades.
//!
//! The proxy address is fixed for the whole run. The run moves through
//! state read → implementation deployment → repoint → verification; the
//! repoint transaction is submitted at most once.

use alloy_core::primitives::Address;
use serde::Serialize;

use crate::{
    confirmation::{ConfirmationPolicy, await_confirmations},
    contract::{ChainClient, ContractArtifact, Upgradeable, parse_address},
    deploy::{deploy_confirmed, ensure_funded},
    error::{LifecycleError, Result},
    identity::Identity,
    tx::TransactionReceipt,
};

/// Terminal state of a successful repoint transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum UpgradeOutcome {
    /// The implementation address changed.
    Upgraded,
    /// The transaction succeeded but the implementation address reads the same as before.
    UpgradedUnverified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeResult {
    /// Identical before and after the run.
    pub proxy_address: Address,
    pub previous_implementation: Address,
    /// Implementation the proxy reports after the repoint.
    pub new_implementation: Address,
    /// Implementation contract deployed by this run.
    pub deployed_implementation: Address,
    pub implementation_deployment: TransactionReceipt,
    pub upgrade_transaction: TransactionReceipt,
    pub outcome: UpgradeOutcome,
}

/// Validate the configured proxy address without touching the network.
pub fn parse_proxy_address(proxy: Option<&str>) -> Result<Address> {
    let proxy = proxy
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(LifecycleError::MissingProxyAddress)?;

    let address = parse_address(proxy)?;
    if address.is_zero() {
        return Err(LifecycleError::InvalidAddress {
            input: proxy.to_string(),
            reason: "the zero address cannot be a proxy".to_string(),
        });
    }

    Ok(address)
}

pub struct UpgradeOrchestrator<'a, C> {
    client: &'a C,
    identity: &'a Identity,
    policy: ConfirmationPolicy,
}

impl<'a, C: Upgradeable> UpgradeOrchestrator<'a, C> {
    pub fn new(client: &'a C, identity: &'a Identity, policy: ConfirmationPolicy) -> Self {
        Self {
            client,
            identity,
            policy,
        }
    }

    pub async fn run(
        &self,
        proxy: Option<&str>,
        artifact: &ContractArtifact,
    ) -> Result<UpgradeResult> {
        let proxy_address = parse_proxy_address(proxy)?;

        tracing::info!(
            proxy = %proxy_address,
            contract = %artifact.name,
            network = %self.client.profile().name,
            "Starting upgrade..."
        );

        if self.client.code_at(proxy_address).await?.is_empty() {
            return Err(LifecycleError::configuration(format!(
                "no contract deployed at proxy address {proxy_address} on {}",
                self.client.profile().name
            )));
        }

        let previous_implementation = self.client.implementation(proxy_address).await?;
        tracing::info!(%previous_implementation, "Current implementation");

        ensure_funded(self.client, self.identity).await?;

        let (deployed_implementation, implementation_deployment) =
            deploy_confirmed(self.client, self.identity, &self.policy, artifact).await?;

        tracing::info!(
            proxy = %proxy_address,
            new_implementation = %deployed_implementation,
            "Repointing proxy..."
        );
        let pending = self
            .client
            .upgrade_to(proxy_address, deployed_implementation, self.identity)
            .await?;
        let upgrade_transaction =
            await_confirmations(self.client, pending.hash, &self.policy).await?;

        let observed = self.client.implementation(proxy_address).await?;
        if observed != deployed_implementation {
            tracing::warn!(
                expected = %deployed_implementation,
                %observed,
                "Proxy reports a different implementation than the one just deployed"
            );
        }

        let outcome = if observed == previous_implementation {
            tracing::warn!(
                proxy = %proxy_address,
                implementation = %observed,
                "UpgradeVerificationWarning: implementation address unchanged after a confirmed upgrade"
            );
            UpgradeOutcome::UpgradedUnverified
        } else {
            UpgradeOutcome::Upgraded
        };

        Ok(UpgradeResult {
            proxy_address,
            previous_implementation,
            new_implementation: observed,
            deployed_implementation,
            implementation_deployment,
            upgrade_transaction,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_proxy_address() {
        for input in [None, Some(""), Some("   ")] {
            assert!(matches!(
                parse_proxy_address(input),
                Err(LifecycleError::MissingProxyAddress)
            ));
        }
    }

    #[test]
    fn test_malformed_and_zero_proxy_address() {
        assert!(matches!(
            parse_proxy_address(Some("0xnope")),
            Err(LifecycleError::InvalidAddress { .. })
        ));
        assert!(matches!(
            parse_proxy_address(Some("0x0000000000000000000000000000000000000000")),
            Err(LifecycleError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(UpgradeOutcome::UpgradedUnverified.to_string(), "UpgradedUnverified");
    }
}
