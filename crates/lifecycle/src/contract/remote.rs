//! JSON-RPC backed implementation of the contract roles.

use alloy_core::primitives::{Address, B256, Bytes, TxHash, U64, U256};
use alloy_sol_types::SolCall;
use serde::Deserialize;
use serde_json::json;

use super::{
    AdminManageable, ChainClient, ContractArtifact, Deployable, PendingDeployment, Upgradeable,
    abi::{ICurio, IMPLEMENTATION_SLOT},
};
use crate::{
    confirmation::RetryPolicy,
    error::{LifecycleError, Result},
    identity::Identity,
    network::NetworkProfile,
    rpc::RpcClient,
    tx::{TransactionReceipt, TransactionRequest, TxStatus},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    block_number: Option<U64>,
    /// Post-Byzantium status: `0x1` success, `0x0` revert.
    status: Option<U64>,
    contract_address: Option<Address>,
}

/// Contract handle bound to one network over JSON-RPC.
///
/// Reads are never cached; every call re-queries the endpoint.
#[derive(Debug, Clone)]
pub struct RemoteContract {
    profile: NetworkProfile,
    rpc: RpcClient,
}

impl RemoteContract {
    pub fn connect(profile: NetworkProfile, retry: RetryPolicy) -> Result<Self> {
        let rpc = RpcClient::new(profile.rpc_url.clone(), retry)?;
        Ok(Self { profile, rpc })
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Check that the endpoint serves the chain the profile names.
    ///
    /// Transactions are signed for the profile's chain id, so a mismatch would
    /// make every submission fail.
    pub async fn verify_chain_id(&self) -> Result<()> {
        let chain_id: U64 = self.rpc.call("eth_chainId", vec![]).await?;
        let chain_id = chain_id.to::<u64>();

        if chain_id != self.profile.chain_id {
            return Err(LifecycleError::configuration(format!(
                "endpoint {} serves chain {chain_id}, expected {} for network '{}'",
                self.profile.rpc_url, self.profile.chain_id, self.profile.name
            )));
        }

        Ok(())
    }

    async fn eth_call<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return> {
        let data: Bytes = self
            .rpc
            .call(
                "eth_call",
                vec![
                    json!({ "to": to, "data": Bytes::from(call.abi_encode()) }),
                    json!("latest"),
                ],
            )
            .await?;

        if data.is_empty() {
            return Err(LifecycleError::Reverted {
                hash: None,
                reason: format!("{} returned no data from {to}", C::SIGNATURE),
            });
        }

        C::abi_decode_returns(&data).map_err(|e| LifecycleError::Rpc {
            method: C::SIGNATURE.to_string(),
            code: 0,
            message: format!("failed to decode return data: {e}"),
        })
    }

    async fn send_call<C: SolCall>(
        &self,
        to: Address,
        call: C,
        identity: &Identity,
    ) -> Result<TransactionReceipt> {
        let request = TransactionRequest::call(to, call.abi_encode());
        identity
            .sign_and_send(&self.rpc, self.profile.chain_id, request, C::SIGNATURE)
            .await
    }
}

impl ChainClient for RemoteContract {
    fn profile(&self) -> &NetworkProfile {
        &self.profile
    }

    async fn block_number(&self) -> Result<u64> {
        let number: U64 = self.rpc.call("eth_blockNumber", vec![]).await?;
        Ok(number.to::<u64>())
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        self.rpc
            .call("eth_getBalance", vec![json!(address), json!("latest")])
            .await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        self.rpc
            .call("eth_getCode", vec![json!(address), json!("latest")])
            .await
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<TransactionReceipt>> {
        let receipt: Option<RpcReceipt> = self
            .rpc
            .call("eth_getTransactionReceipt", vec![json!(hash)])
            .await?;

        let Some(receipt) = receipt else {
            return Ok(None);
        };

        // Some nodes return a receipt skeleton for pending transactions.
        let Some(block_number) = receipt.block_number.map(|n| n.to::<u64>()) else {
            return Ok(None);
        };

        let head = self.block_number().await?;
        let status = match receipt.status.map(|s| s.to::<u64>()) {
            Some(0) => TxStatus::Failed,
            _ => TxStatus::Included,
        };

        Ok(Some(TransactionReceipt {
            hash: receipt.transaction_hash,
            status,
            confirmations: head.saturating_sub(block_number) + 1,
            block_number: Some(block_number),
            contract_address: receipt.contract_address,
        }))
    }
}

impl Deployable for RemoteContract {
    async fn deploy(
        &self,
        artifact: &ContractArtifact,
        identity: &Identity,
    ) -> Result<PendingDeployment> {
        let request = TransactionRequest::create(artifact.bytecode.clone());
        let prepared = identity
            .prepare(&self.rpc, self.profile.chain_id, &request)
            .await?;
        let expected_address = identity.address().create(prepared.nonce);

        tracing::info!(
            contract = %artifact.name,
            deployer = %identity.address(),
            nonce = prepared.nonce,
            expected_address = %expected_address,
            "Submitting contract creation..."
        );

        let label = format!("deploy {}", artifact.name);
        let receipt = identity.submit(&self.rpc, &prepared, &label).await?;

        Ok(PendingDeployment {
            expected_address,
            receipt,
        })
    }

    async fn operations_address(&self, contract: Address) -> Result<Address> {
        self.eth_call(contract, ICurio::OPERATIONS_ADDRESSCall {}).await
    }

    async fn operations_fee(&self, contract: Address) -> Result<U256> {
        self.eth_call(contract, ICurio::OPERATIONS_FEECall {}).await
    }
}

impl Upgradeable for RemoteContract {
    /// Reads the ERC-1967 slot, falling back to `implementationAddress()` for
    /// proxies that keep the pointer elsewhere.
    async fn implementation(&self, proxy: Address) -> Result<Address> {
        let word: B256 = self
            .rpc
            .call(
                "eth_getStorageAt",
                vec![json!(proxy), json!(IMPLEMENTATION_SLOT), json!("latest")],
            )
            .await?;

        let from_slot = Address::from_word(word);
        if !from_slot.is_zero() {
            return Ok(from_slot);
        }

        tracing::debug!(%proxy, "ERC-1967 slot empty, calling implementationAddress()");
        self.eth_call(proxy, ICurio::implementationAddressCall {})
            .await
    }

    async fn upgrade_to(
        &self,
        proxy: Address,
        new_implementation: Address,
        identity: &Identity,
    ) -> Result<TransactionReceipt> {
        self.send_call(
            proxy,
            ICurio::upgradeToCall {
                newImplementation: new_implementation,
            },
            identity,
        )
        .await
    }
}

impl AdminManageable for RemoteContract {
    async fn owner(&self, contract: Address) -> Result<Address> {
        self.eth_call(contract, ICurio::ownerCall {}).await
    }

    async fn is_admin(&self, contract: Address, account: Address) -> Result<bool> {
        self.eth_call(contract, ICurio::adminsCall { account }).await
    }

    async fn add_admin(
        &self,
        contract: Address,
        account: Address,
        identity: &Identity,
    ) -> Result<TransactionReceipt> {
        self.send_call(contract, ICurio::addAdminCall { account }, identity)
            .await
    }
}
