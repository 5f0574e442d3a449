//! Contract call descriptions and view ABIs.
//!
//! Mutating calls are described by a human-readable signature plus ordered
//! dynamic arguments, and only encoded at submission time. View calls use
//! `sol!` bindings so their return data decodes into typed structs.

use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::json_abi::Function;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

pub const REGISTER_STUDENT: &str =
    "function registerStudentRequest(string cardUID, uint256 studentId, string metadata)";
pub const CREATE_CERTIFICATION: &str =
    "function createCertification(string metadata, address[] eligibleAddresses)";
pub const CLAIM_CERTIFICATION: &str = "function claimCertification(uint256 certificationId)";
pub const WITHDRAW_USDC: &str = "function withdrawUsdc(uint256 amount)";
pub const SWAP_ETH_FOR_USDC: &str = "function swapEthForUsdc(uint256 amount)";
pub const TRANSFER_USDC: &str =
    "function transferUsdcToAddress(address _usdcAddress, address _recipient, uint256 _amount)";
pub const TBA_EXECUTE: &str =
    "function execute(address to, uint256 value, bytes data, uint8 operation)";

sol! {
    function students_(string cardUID)
        external
        view
        returns (uint256 studentId, string metadata, address tba);
    function admin_() external view returns (address admin);
    function getCertifications(string cardUID) external view returns (uint256[] ids);
    function certifications_(uint256 certificationId) external view returns (string metadata);
    function balanceOf(address owner) external view returns (uint256 balance);
}

/// A mutating call against a contract: target, method signature, arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCall {
    pub target: Address,
    pub signature: &'static str,
    pub args: Vec<DynSolValue>,
    /// Native value attached to the transaction.
    pub value: U256,
}

impl ContractCall {
    pub fn new(target: Address, signature: &'static str, args: Vec<DynSolValue>) -> Self {
        Self {
            target,
            signature,
            args,
            value: U256::ZERO,
        }
    }

    /// Bare method name, for logs.
    pub fn method(&self) -> &str {
        let sig = self.signature.strip_prefix("function ").unwrap_or(self.signature);
        sig.split('(').next().unwrap_or(sig)
    }

    /// Selector-prefixed ABI encoding of the call.
    pub fn calldata(&self) -> BlockchainResult<Bytes> {
        let function = Function::parse(self.signature)
            .map_err(|e| BlockchainError::Encoding(format!("{}: {}", self.signature, e)))?;
        let data = function
            .abi_encode_input(&self.args)
            .map_err(|e| BlockchainError::Encoding(format!("{}: {}", self.method(), e)))?;
        Ok(data.into())
    }
}

/// `uint256` argument from a u64.
pub fn uint(value: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(value), 256)
}

/// `uint256` argument.
pub fn uint256(value: U256) -> DynSolValue {
    DynSolValue::Uint(value, 256)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;

    fn selector(sig: &str) -> [u8; 4] {
        let hash = keccak256(sig.as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    #[test]
    fn test_method_name() {
        let call = ContractCall::new(Address::ZERO, WITHDRAW_USDC, vec![uint(1)]);
        assert_eq!(call.method(), "withdrawUsdc");
    }

    #[test]
    fn test_calldata_selector_and_argument() {
        let call = ContractCall::new(Address::ZERO, WITHDRAW_USDC, vec![uint(12_500_000)]);
        let data = call.calldata().unwrap();
        assert_eq!(&data[..4], &selector("withdrawUsdc(uint256)"));
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(U256::from_be_slice(&data[4..]), U256::from(12_500_000u64));
    }

    #[test]
    fn test_calldata_dynamic_arguments() {
        let call = ContractCall::new(
            Address::ZERO,
            CREATE_CERTIFICATION,
            vec![
                DynSolValue::String("{}".to_string()),
                DynSolValue::Array(vec![
                    DynSolValue::Address(Address::repeat_byte(1)),
                    DynSolValue::Address(Address::repeat_byte(2)),
                ]),
            ],
        );
        let data = call.calldata().unwrap();
        assert_eq!(&data[..4], &selector("createCertification(string,address[])"));
    }

    #[test]
    fn test_calldata_argument_mismatch() {
        let call = ContractCall::new(Address::ZERO, CLAIM_CERTIFICATION, vec![]);
        assert!(matches!(call.calldata(), Err(BlockchainError::Encoding(_))));
    }
}
