//! The single transacting identity of a run.

use std::{fmt, str::FromStr};

use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy_core::primitives::{Address, Bytes, TxHash, U256, U64};
use alloy_eips::eip2718::Encodable2718;
use alloy_signer::SignerSync;
use alloy_signer_local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English};
use serde::{Deserialize, Deserializer};
use serde_json::json;

use crate::{
    contract::ChainClient,
    error::{LifecycleError, Result},
    rpc::RpcClient,
    tx::{TransactionReceipt, TransactionRequest, TxJournal},
};

/// Gas estimates are padded by this percentage.
const GAS_LIMIT_MARGIN_PERCENT: u64 = 20;

/// Tip used when the node does not implement `eth_maxPriorityFeePerGas`.
const FALLBACK_PRIORITY_FEE: u128 = 1_000_000_000;

/// Secret key material: a hex private key or a BIP-39 mnemonic phrase.
///
/// Never printed, never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    pub fn new(material: impl Into<String>) -> Self {
        Self(material.into())
    }

    fn expose(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}

/// A signed transaction ready for submission.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub nonce: u64,
    pub raw: Bytes,
    pub hash: TxHash,
}

/// The account every transaction of a run is sent from.
pub struct Identity {
    signer: PrivateKeySigner,
    journal: TxJournal,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl Identity {
    /// Build the identity from configured secret material.
    ///
    /// Fails with [`LifecycleError::MissingCredential`] before any network access
    /// when nothing is configured.
    pub fn from_secret(secret: Option<&SecretKey>) -> Result<Self> {
        let secret = secret
            .filter(|s| !s.expose().is_empty())
            .ok_or(LifecycleError::MissingCredential)?;
        let material = secret.expose();

        let signer = if material.split_whitespace().count() > 1 {
            MnemonicBuilder::<English>::default()
                .phrase(material)
                .build()
                .map_err(|_| LifecycleError::configuration("invalid mnemonic phrase"))?
        } else {
            PrivateKeySigner::from_str(material)
                .map_err(|_| LifecycleError::configuration("invalid private key"))?
        };

        tracing::debug!(address = %signer.address(), "Loaded signing identity");

        Ok(Self {
            signer,
            journal: TxJournal::default(),
        })
    }

    /// Share a journal with the caller so submitted hashes survive an interrupted run.
    pub fn with_journal(mut self, journal: TxJournal) -> Self {
        self.journal = journal;
        self
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn journal(&self) -> &TxJournal {
        &self.journal
    }

    pub async fn read_balance<C: ChainClient>(&self, client: &C) -> Result<U256> {
        client.balance(self.address()).await
    }

    /// Fill nonce, gas and fees for `request`, then sign it.
    ///
    /// Gas estimation runs the transaction against current state, so a call that
    /// would revert fails here with [`LifecycleError::Reverted`] before anything is spent.
    pub async fn prepare(
        &self,
        rpc: &RpcClient,
        chain_id: u64,
        request: &TransactionRequest,
    ) -> Result<PreparedTransaction> {
        let from = self.address();

        let nonce: U64 = rpc
            .call("eth_getTransactionCount", vec![json!(from), json!("pending")])
            .await?;

        let mut estimate_params = json!({
            "from": from,
            "data": request.input,
            "value": request.value,
        });
        if let Some(to) = request.to.to() {
            estimate_params["to"] = json!(to);
        }
        let gas: U64 = rpc.call("eth_estimateGas", vec![estimate_params]).await?;
        let gas_limit = padded_gas_limit(gas.to::<u64>());

        let latest: serde_json::Value = rpc
            .call("eth_getBlockByNumber", vec![json!("latest"), json!(false)])
            .await?;
        let base_fee = latest
            .get("baseFeePerGas")
            .and_then(|v| serde_json::from_value::<U256>(v.clone()).ok())
            .map(|fee| fee.saturating_to::<u128>())
            .unwrap_or_default();

        let priority_fee = match rpc
            .call::<U256>("eth_maxPriorityFeePerGas", vec![])
            .await
        {
            Ok(fee) => fee.saturating_to::<u128>(),
            Err(LifecycleError::Rpc { .. }) => FALLBACK_PRIORITY_FEE,
            Err(e) => return Err(e),
        };

        let tx = TxEip1559 {
            chain_id,
            nonce: nonce.to::<u64>(),
            gas_limit,
            max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(priority_fee),
            max_priority_fee_per_gas: priority_fee,
            to: request.to,
            value: request.value,
            access_list: Default::default(),
            input: request.input.clone(),
        };

        self.sign(tx)
    }

    fn sign(&self, tx: TxEip1559) -> Result<PreparedTransaction> {
        let nonce = tx.nonce;
        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|e| LifecycleError::configuration(format!("failed to sign transaction: {e}")))?;

        let envelope: TxEnvelope = tx.into_signed(signature).into();
        let hash = *envelope.tx_hash();

        Ok(PreparedTransaction {
            nonce,
            raw: envelope.encoded_2718().into(),
            hash,
        })
    }

    /// Broadcast a prepared transaction and return a pending receipt.
    ///
    /// The hash is journaled before the request goes out, so an interrupted or
    /// failed broadcast still leaves it on record. Submission is never retried.
    pub async fn submit(
        &self,
        rpc: &RpcClient,
        prepared: &PreparedTransaction,
        label: &str,
    ) -> Result<TransactionReceipt> {
        self.journal.record(prepared.hash, label);

        let hash: TxHash = match rpc
            .request("eth_sendRawTransaction", vec![json!(prepared.raw)])
            .await
        {
            Ok(hash) => hash,
            Err(err) => {
                tracing::warn!(
                    tx_hash = %prepared.hash,
                    error = %err,
                    "Broadcast failed; the node may still have received the transaction"
                );
                return Err(err);
            }
        };

        if hash != prepared.hash {
            tracing::warn!(expected = %prepared.hash, returned = %hash, "Node returned an unexpected transaction hash");
            self.journal.record(hash, label);
        }

        Ok(TransactionReceipt::pending(hash))
    }

    /// Prepare, sign and submit in one step.
    pub async fn sign_and_send(
        &self,
        rpc: &RpcClient,
        chain_id: u64,
        request: TransactionRequest,
        label: &str,
    ) -> Result<TransactionReceipt> {
        let prepared = self.prepare(rpc, chain_id, &request).await?;
        self.submit(rpc, &prepared, label).await
    }
}

fn padded_gas_limit(estimate: u64) -> u64 {
    estimate.saturating_mul(100 + GAS_LIMIT_MARGIN_PERCENT) / 100
}
