//! Fresh contract deployment.

use alloy_core::primitives::{Address, U256, address};
use serde::Serialize;

use crate::{
    confirmation::{ConfirmationPolicy, await_confirmations},
    contract::{ChainClient, ContractArtifact, Deployable},
    error::{LifecycleError, Result},
    identity::Identity,
    tx::TransactionReceipt,
};

/// Address every fresh deployment must route operations fees to.
pub const EXPECTED_OPERATIONS_ADDRESS: Address =
    address!("0x7eB8F203167dF3bC14D59536E671528dd97FB72a");

/// Fixed operations fee: 0.0001 ether.
pub const EXPECTED_OPERATIONS_FEE: U256 = U256::from_limbs([100_000_000_000_000, 0, 0, 0]);

/// Values a freshly deployed contract is expected to declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedConstants {
    pub operations_address: Address,
    pub operations_fee: U256,
}

impl Default for ExpectedConstants {
    fn default() -> Self {
        Self {
            operations_address: EXPECTED_OPERATIONS_ADDRESS,
            operations_fee: EXPECTED_OPERATIONS_FEE,
        }
    }
}

/// Result of comparing one deployed constant against its expected value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConstantCheck {
    Matched,
    Mismatched { expected: String, observed: String },
    Unreadable { reason: String },
}

impl ConstantCheck {
    fn compare<T: PartialEq + ToString>(expected: &T, observed: Result<T>) -> Self {
        match observed {
            Ok(observed) if observed == *expected => ConstantCheck::Matched,
            Ok(observed) => ConstantCheck::Mismatched {
                expected: expected.to_string(),
                observed: observed.to_string(),
            },
            Err(e) => ConstantCheck::Unreadable {
                reason: e.to_string(),
            },
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, ConstantCheck::Matched)
    }
}

/// Advisory post-deployment sanity check. Never causes a rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstantsReport {
    pub operations_address: ConstantCheck,
    pub operations_fee: ConstantCheck,
}

impl ConstantsReport {
    pub fn is_clean(&self) -> bool {
        self.operations_address.is_matched() && self.operations_fee.is_matched()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentResult {
    pub contract_address: Address,
    pub deployment_transaction: TransactionReceipt,
    pub constants: ConstantsReport,
}

/// Refuse to spend from an empty account on production; only warn elsewhere.
pub(crate) async fn ensure_funded<C: ChainClient>(client: &C, identity: &Identity) -> Result<()> {
    let balance = identity.read_balance(client).await?;
    let profile = client.profile();

    tracing::info!(address = %identity.address(), %balance, network = %profile.name, "Identity balance");

    if balance.is_zero() {
        if profile.is_production {
            return Err(LifecycleError::InsufficientFunds {
                address: identity.address(),
                network: profile.name.clone(),
            });
        }
        tracing::warn!(
            address = %identity.address(),
            network = %profile.name,
            "Identity has zero balance; continuing on a non-production network"
        );
    }

    Ok(())
}

/// Submit a creation transaction and wait until it is confirmed.
///
/// Returns the address recorded in the confirmed receipt, falling back to the
/// sender/nonce derivation when the node omits it.
pub(crate) async fn deploy_confirmed<C: Deployable>(
    client: &C,
    identity: &Identity,
    policy: &ConfirmationPolicy,
    artifact: &ContractArtifact,
) -> Result<(Address, TransactionReceipt)> {
    let pending = client.deploy(artifact, identity).await?;
    let receipt = await_confirmations(client, pending.receipt.hash, policy).await?;

    let address = match receipt.contract_address {
        Some(address) if address != pending.expected_address => {
            tracing::warn!(
                expected = %pending.expected_address,
                reported = %address,
                "Receipt contract address differs from sender/nonce derivation; using receipt"
            );
            address
        }
        Some(address) => address,
        None => pending.expected_address,
    };

    tracing::info!(contract = %artifact.name, %address, tx_hash = %receipt.hash, "Contract deployed");

    Ok((address, receipt))
}

/// Drives a fresh deployment and its post-deployment constants check.
pub struct DeploymentOrchestrator<'a, C> {
    client: &'a C,
    identity: &'a Identity,
    policy: ConfirmationPolicy,
    expected: ExpectedConstants,
}

impl<'a, C: Deployable> DeploymentOrchestrator<'a, C> {
    pub fn new(client: &'a C, identity: &'a Identity, policy: ConfirmationPolicy) -> Self {
        Self {
            client,
            identity,
            policy,
            expected: ExpectedConstants::default(),
        }
    }

    pub fn expected_constants(mut self, expected: ExpectedConstants) -> Self {
        self.expected = expected;
        self
    }

    pub async fn run(&self, artifact: &ContractArtifact) -> Result<DeploymentResult> {
        tracing::info!(
            contract = %artifact.name,
            network = %self.client.profile().name,
            deployer = %self.identity.address(),
            "Starting deployment..."
        );

        ensure_funded(self.client, self.identity).await?;

        let (contract_address, deployment_transaction) =
            deploy_confirmed(self.client, self.identity, &self.policy, artifact).await?;

        let constants = self.check_constants(contract_address).await;

        Ok(DeploymentResult {
            contract_address,
            deployment_transaction,
            constants,
        })
    }

    async fn check_constants(&self, contract: Address) -> ConstantsReport {
        let report = ConstantsReport {
            operations_address: ConstantCheck::compare(
                &self.expected.operations_address,
                self.client.operations_address(contract).await,
            ),
            operations_fee: ConstantCheck::compare(
                &self.expected.operations_fee,
                self.client.operations_fee(contract).await,
            ),
        };

        for (name, check) in [
            ("OPERATIONS_ADDRESS", &report.operations_address),
            ("OPERATIONS_FEE", &report.operations_fee),
        ] {
            match check {
                ConstantCheck::Matched => {
                    tracing::info!(constant = name, "Deployed constant matches");
                }
                ConstantCheck::Mismatched { expected, observed } => {
                    tracing::warn!(
                        constant = name,
                        %expected,
                        %observed,
                        "Deployed constant mismatch; the deployment stands"
                    );
                }
                ConstantCheck::Unreadable { reason } => {
                    tracing::warn!(constant = name, %reason, "Could not read deployed constant");
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_fee_is_a_ten_thousandth_ether() {
        let one_ether = U256::from(10u64).pow(U256::from(18));
        assert_eq!(EXPECTED_OPERATIONS_FEE * U256::from(10_000), one_ether);
    }

    #[test]
    fn test_constant_check_compare() {
        let expected = Address::repeat_byte(1);
        assert!(ConstantCheck::compare(&expected, Ok(expected)).is_matched());
        assert!(matches!(
            ConstantCheck::compare(&expected, Ok(Address::ZERO)),
            ConstantCheck::Mismatched { .. }
        ));
        assert!(matches!(
            ConstantCheck::compare(&expected, Err(LifecycleError::MissingCredential)),
            ConstantCheck::Unreadable { .. }
        ));
    }
}
