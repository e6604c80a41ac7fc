//! Error taxonomy shared by every lifecycle operation.

use alloy_core::primitives::{Address, TxHash};

/// Result alias used across the crate.
pub type Result<T, E = LifecycleError> = std::result::Result<T, E>;

/// Every failure an orchestrator can surface.
///
/// Configuration and authorization failures are detected locally before any
/// transaction is signed. Everything else originates from the remote network.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Missing or invalid input.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No secret material was configured for the transacting identity.
    #[error("no signing key configured")]
    MissingCredential,

    /// An upgrade was requested without a proxy address.
    #[error("no proxy address configured")]
    MissingProxyAddress,

    /// An address string did not parse as a 20-byte hex value.
    #[error("invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    /// The compiled bytecode artifact could not be located.
    #[error("artifact for contract '{contract}' not found (searched: {searched})")]
    ArtifactMissing { contract: String, searched: String },

    /// The endpoint could not be reached or timed out.
    #[error("RPC endpoint unavailable during {method}: {reason}")]
    RpcUnavailable { method: String, reason: String },

    /// The endpoint answered with a JSON-RPC error that is not a revert.
    #[error("RPC error from {method} (code {code}): {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    /// The call or transaction reverted.
    #[error("execution reverted{}: {reason}", .hash.map(|h| format!(" in {h}")).unwrap_or_default())]
    Reverted {
        hash: Option<TxHash>,
        reason: String,
    },

    /// The caller is not the owner recorded on chain.
    #[error("caller {caller} is not the contract owner {owner}")]
    Unauthorized { caller: Address, owner: Address },

    /// The transacting identity cannot pay for the transaction.
    #[error("identity {address} has no balance on {network}")]
    InsufficientFunds { address: Address, network: String },

    /// The transaction did not reach the required depth in time. It may still land.
    #[error("transaction {hash} not confirmed after {waited_secs}s ({confirmations}/{required} confirmations)")]
    ConfirmationTimeout {
        hash: TxHash,
        confirmations: u64,
        required: u64,
        waited_secs: u64,
    },

    /// Remote state after a confirmed transaction contradicts what the transaction should have done.
    #[error("state verification failed: {0}")]
    StateVerification(String),
}

impl LifecycleError {
    /// Stable name of the error kind, printed by the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::MissingCredential => "MissingCredentialError",
            Self::MissingProxyAddress => "MissingProxyAddressError",
            Self::InvalidAddress { .. } => "InvalidAddressError",
            Self::ArtifactMissing { .. } => "ArtifactMissingError",
            Self::RpcUnavailable { .. } => "RpcUnavailableError",
            Self::Rpc { .. } => "RpcError",
            Self::Reverted { .. } => "RevertedError",
            Self::Unauthorized { .. } => "UnauthorizedError",
            Self::InsufficientFunds { .. } => "InsufficientFundsError",
            Self::ConfirmationTimeout { .. } => "ConfirmationTimeoutError",
            Self::StateVerification(_) => "StateVerificationError",
        }
    }

    /// Remediation hint for the operator.
    pub fn hint(&self) -> String {
        match self {
            Self::Configuration(_) => {
                "check curio.toml, CURIO_* environment variables and command-line flags".to_string()
            }
            Self::MissingCredential => {
                "set CURIO_PRIVATE_KEY (hex private key or mnemonic phrase)".to_string()
            }
            Self::MissingProxyAddress => {
                "set CURIO_PROXY_ADDRESS or pass --proxy to the upgrade command".to_string()
            }
            Self::InvalidAddress { .. } => {
                "addresses must be 0x-prefixed and contain 40 hex characters".to_string()
            }
            Self::ArtifactMissing { .. } => {
                "compile the contracts first or point --artifacts at the build output".to_string()
            }
            Self::RpcUnavailable { .. } => {
                "the endpoint is unreachable; retry later or override the RPC URL".to_string()
            }
            Self::Rpc { .. } => "inspect the node's message; the request was rejected".to_string(),
            Self::Reverted { .. } => {
                "the contract rejected the call; review arguments and permissions".to_string()
            }
            Self::Unauthorized { owner, .. } => {
                format!("sign with the owner key ({owner}) to perform this operation")
            }
            Self::InsufficientFunds { address, .. } => {
                format!("fund {address} with native currency before retrying")
            }
            Self::ConfirmationTimeout { hash, .. } => {
                format!("the transaction may still land; monitor {hash} in a block explorer")
            }
            Self::StateVerification(_) => {
                "remote state disagrees with the confirmed transaction; inspect the contract"
                    .to_string()
            }
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RpcUnavailable { .. })
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rpc_unavailable_is_retryable() {
        let unavailable = LifecycleError::RpcUnavailable {
            method: "eth_call".to_string(),
            reason: "timeout".to_string(),
        };
        assert!(unavailable.is_retryable());
        assert!(
            !LifecycleError::Reverted {
                hash: None,
                reason: "nope".to_string()
            }
            .is_retryable()
        );
        assert!(!LifecycleError::MissingCredential.is_retryable());
    }

    #[test]
    fn test_timeout_hint_carries_hash() {
        let err = LifecycleError::ConfirmationTimeout {
            hash: TxHash::repeat_byte(0xab),
            confirmations: 0,
            required: 1,
            waited_secs: 120,
        };
        assert_eq!(err.kind(), "ConfirmationTimeoutError");
        assert!(err.hint().contains("0xabab"));
        assert!(err.to_string().contains("0/1 confirmations"));
    }
}
