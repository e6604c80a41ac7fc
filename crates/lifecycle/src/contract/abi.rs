//! ABI of the Curio collection contract and its UUPS proxy.

use alloy_core::primitives::{B256, b256};
use alloy_sol_types::sol;

sol! {
    interface ICurio {
        function owner() external view returns (address);
        function admins(address account) external view returns (bool);
        function OPERATIONS_ADDRESS() external view returns (address);
        function OPERATIONS_FEE() external view returns (uint256);
        function implementationAddress() external view returns (address);

        function addAdmin(address account) external;
        function upgradeTo(address newImplementation) external;
    }
}

/// ERC-1967 implementation slot: `keccak256("eip1967.proxy.implementation") - 1`.
pub(crate) const IMPLEMENTATION_SLOT: B256 =
    b256!("0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

#[cfg(test)]
mod tests {
    use alloy_core::primitives::{Address, U256, keccak256};
    use alloy_sol_types::SolCall;

    use super::*;

    #[test]
    fn test_implementation_slot_derivation() {
        let hash = U256::from_be_bytes(keccak256("eip1967.proxy.implementation").0);
        assert_eq!(B256::from(hash - U256::from(1)), IMPLEMENTATION_SLOT);
    }

    #[test]
    fn test_add_admin_calldata() {
        let account = Address::repeat_byte(0x11);
        let calldata = ICurio::addAdminCall { account }.abi_encode();

        assert_eq!(&calldata[..4], ICurio::addAdminCall::SELECTOR.as_slice());
        assert_eq!(calldata.len(), 4 + 32);
        assert_eq!(&calldata[16..], account.as_slice());
    }

    #[test]
    fn test_decode_operations_fee() {
        let word = U256::from(100_000_000_000_000u64).to_be_bytes::<32>();
        let fee = ICurio::OPERATIONS_FEECall::abi_decode_returns(&word).unwrap();
        assert_eq!(fee, U256::from(100_000_000_000_000u64));
    }
}
