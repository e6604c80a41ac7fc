//! Typed access to the remote contract.
//!
//! Each orchestrator depends on the narrowest role it needs:
//! [`Deployable`] for fresh deployments, [`Upgradeable`] for proxy repoints,
//! [`AdminManageable`] for access-control changes. [`RemoteContract`] backs all
//! three with JSON-RPC; tests substitute an in-memory chain.

mod abi;
mod artifact;
mod remote;

use std::{future::Future, str::FromStr};

use alloy_core::primitives::{Address, Bytes, TxHash, U256};

pub use abi::ICurio;
pub use artifact::ContractArtifact;
pub use remote::RemoteContract;

use crate::{
    error::{LifecycleError, Result},
    identity::Identity,
    network::NetworkProfile,
    tx::TransactionReceipt,
};

/// A creation transaction that has been accepted by the node but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeployment {
    /// Address derived from sender and nonce. Authoritative only after inclusion.
    pub expected_address: Address,
    pub receipt: TransactionReceipt,
}

/// Chain-level reads shared by every contract role.
pub trait ChainClient: Send + Sync {
    /// The network this client is bound to.
    fn profile(&self) -> &NetworkProfile;

    fn block_number(&self) -> impl Future<Output = Result<u64>> + Send;

    fn balance(&self, address: Address) -> impl Future<Output = Result<U256>> + Send;

    /// Runtime bytecode at `address`; empty when nothing is deployed there.
    fn code_at(&self, address: Address) -> impl Future<Output = Result<Bytes>> + Send;

    /// Current receipt for `hash`, or `None` while the transaction is not yet included.
    fn receipt(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<Option<TransactionReceipt>>> + Send;
}

/// Contract creation plus the constants a fresh deployment declares.
pub trait Deployable: ChainClient {
    /// Submit the creation transaction. Does not wait for inclusion.
    fn deploy(
        &self,
        artifact: &ContractArtifact,
        identity: &Identity,
    ) -> impl Future<Output = Result<PendingDeployment>> + Send;

    /// `OPERATIONS_ADDRESS()`
    fn operations_address(&self, contract: Address) -> impl Future<Output = Result<Address>> + Send;

    /// `OPERATIONS_FEE()`
    fn operations_fee(&self, contract: Address) -> impl Future<Output = Result<U256>> + Send;
}

/// Proxy repointing.
pub trait Upgradeable: Deployable {
    /// Implementation the proxy currently delegates to.
    fn implementation(&self, proxy: Address) -> impl Future<Output = Result<Address>> + Send;

    /// Submit `upgradeTo(new_implementation)` on the proxy. Does not wait for inclusion.
    fn upgrade_to(
        &self,
        proxy: Address,
        new_implementation: Address,
        identity: &Identity,
    ) -> impl Future<Output = Result<TransactionReceipt>> + Send;
}

/// Owner-gated access control.
pub trait AdminManageable: ChainClient {
    fn owner(&self, contract: Address) -> impl Future<Output = Result<Address>> + Send;

    fn is_admin(
        &self,
        contract: Address,
        account: Address,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Submit `addAdmin(account)`. Does not wait for inclusion.
    fn add_admin(
        &self,
        contract: Address,
        account: Address,
        identity: &Identity,
    ) -> impl Future<Output = Result<TransactionReceipt>> + Send;
}

/// Parse a 0x-prefixed, 40 hex character address.
///
/// Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_address(input: &str) -> Result<Address> {
    let invalid = |reason: &str| LifecycleError::InvalidAddress {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .ok_or_else(|| invalid("missing 0x prefix"))?;

    if hex_part.len() != 40 {
        return Err(invalid("expected 40 hex characters"));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("contains non-hex characters"));
    }

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());

    if has_lower && has_upper {
        Address::parse_checksummed(trimmed, None).map_err(|_| invalid("bad EIP-55 checksum"))
    } else {
        Address::from_str(trimmed).map_err(|e| invalid(&e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_valid() {
        assert!(parse_address("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").is_ok());
        assert!(parse_address("0x0000000000000000000000000000000000000000").is_ok());
        assert!(parse_address("0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef").is_ok());
    }

    #[test]
    fn test_parse_address_invalid() {
        for input in [
            "0x1234",
            "1234567890abcdef1234567890abcdef12345678",
            "0xGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG",
            "",
        ] {
            assert!(
                matches!(parse_address(input), Err(LifecycleError::InvalidAddress { .. })),
                "{input}"
            );
        }
    }

    #[test]
    fn test_parse_address_rejects_bad_checksum() {
        // Valid checksum is ...dc79C8; flip the case of the last letter.
        assert!(parse_address("0x70997970C51812dc3A010C7d01b50e0d17dc79c8").is_err());
    }
}
