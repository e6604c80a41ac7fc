//! Owner-gated admin grants.

use alloy_core::primitives::Address;
use serde::Serialize;

use crate::{
    confirmation::{ConfirmationPolicy, await_confirmations},
    contract::{AdminManageable, ChainClient, parse_address},
    error::{LifecycleError, Result},
    identity::Identity,
    tx::TransactionReceipt,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdminOutcome {
    /// A grant transaction was confirmed and the admin set now contains the target.
    Granted { transaction: TransactionReceipt },
    /// The target was already an admin; nothing was submitted.
    AlreadyAdmin,
}

impl AdminOutcome {
    pub fn transaction(&self) -> Option<&TransactionReceipt> {
        match self {
            AdminOutcome::Granted { transaction } => Some(transaction),
            AdminOutcome::AlreadyAdmin => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminGrantResult {
    pub contract_address: Address,
    pub target: Address,
    pub outcome: AdminOutcome,
}

/// Applies admin grants against one contract.
///
/// Every precondition is checked against freshly read remote state before any
/// transaction is built, so an unauthorized caller never spends gas.
pub struct AdminOperator<'a, C> {
    client: &'a C,
    policy: ConfirmationPolicy,
}

impl<'a, C: AdminManageable> AdminOperator<'a, C> {
    pub fn new(client: &'a C, policy: ConfirmationPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn add_admin(
        &self,
        contract: Address,
        target: &str,
        caller: &Identity,
    ) -> Result<AdminGrantResult> {
        let target = parse_address(target)?;
        let caller_address = caller.address();

        tracing::info!(
            %contract,
            %target,
            caller = %caller_address,
            network = %self.client.profile().name,
            "Granting admin..."
        );

        let owner = self.client.owner(contract).await?;
        if owner != caller_address {
            return Err(LifecycleError::Unauthorized {
                caller: caller_address,
                owner,
            });
        }

        if self.client.is_admin(contract, target).await? {
            tracing::info!(%target, "Target is already an admin, nothing to do");
            return Ok(AdminGrantResult {
                contract_address: contract,
                target,
                outcome: AdminOutcome::AlreadyAdmin,
            });
        }

        let pending = self.client.add_admin(contract, target, caller).await?;
        let transaction = await_confirmations(self.client, pending.hash, &self.policy).await?;

        if !self.client.is_admin(contract, target).await? {
            return Err(LifecycleError::StateVerification(format!(
                "addAdmin({target}) confirmed in {} but admins({target}) still reads false",
                transaction.hash
            )));
        }

        tracing::info!(%target, tx_hash = %transaction.hash, "Admin granted");

        Ok(AdminGrantResult {
            contract_address: contract,
            target,
            outcome: AdminOutcome::Granted { transaction },
        })
    }
}
