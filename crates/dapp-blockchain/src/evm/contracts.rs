use alloy::{
    primitives::{Address, address},
    sol,
};

/// Canonical Multicall3 deployment, identical on most EVM chains.
pub const MULTICALL3_ADDRESS: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

sol! {
    /// Multicall3, see https://www.multicall3.com/
    #[sol(rpc)]
    contract Multicall3 {
        struct Call {
            address target;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function tryBlockAndAggregate(bool requireSuccess, Call[] calldata calls)
            public
            payable
            returns (uint256 blockNumber, bytes32 blockHash, Result[] memory returnData);
    }
}
