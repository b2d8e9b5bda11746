use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};
use dapp_domain::TxPayload;

use crate::BuildError;

/// A state-changing contract call waiting for its sender.
#[derive(Debug, Clone)]
pub struct ContractCall {
    label: String,
    contract: Option<Address>,
    data: Bytes,
    value: U256,
}

impl ContractCall {
    pub fn new<C: SolCall>(contract: Option<Address>, call: &C) -> Self {
        Self::raw(C::SIGNATURE, contract, call.abi_encode())
    }

    /// Pre-encoded calldata. `label` names the call in errors.
    pub fn raw(label: impl Into<String>, contract: Option<Address>, data: impl Into<Bytes>) -> Self {
        Self {
            label: label.into(),
            contract,
            data: data.into(),
            value: U256::ZERO,
        }
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn build(self, account: Option<Address>) -> Result<TxPayload, BuildError> {
        let from = account.ok_or(BuildError::MissingAccount)?;
        let to = self
            .contract
            .ok_or_else(|| BuildError::MissingContract(self.label.clone()))?;
        if to.is_zero() {
            return Err(BuildError::InvalidArguments(format!(
                "{}: contract address is zero",
                self.label
            )));
        }

        Ok(TxPayload {
            from,
            to,
            data: self.data,
            value: self.value,
        })
    }
}

pub fn build_call<C: SolCall>(
    account: Option<Address>,
    contract: Option<Address>,
    call: &C,
    value: U256,
) -> Result<TxPayload, BuildError> {
    ContractCall::new(contract, call).value(value).build(account)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use alloy::{primitives::address, sol};

    use super::*;

    sol! {
        function approve(address spender, uint256 amount) external returns (bool);
    }

    const ACCOUNT: Address = address!("0x00000000000000000000000000000000000000aa");
    const TOKEN: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");

    fn approve() -> approveCall {
        approveCall {
            spender: Address::with_last_byte(1),
            amount: U256::MAX,
        }
    }

    #[test]
    fn builds_payload() {
        let payload = build_call(Some(ACCOUNT), Some(TOKEN), &approve(), U256::ZERO).unwrap();
        assert_eq!(payload.from, ACCOUNT);
        assert_eq!(payload.to, TOKEN);
        assert_eq!(payload.data, Bytes::from(approve().abi_encode()));
        assert_eq!(payload.value, U256::ZERO);
    }

    #[test]
    fn missing_account_or_contract_is_rejected() {
        assert_eq!(
            build_call(None, Some(TOKEN), &approve(), U256::ZERO),
            Err(BuildError::MissingAccount)
        );
        assert_eq!(
            build_call(Some(ACCOUNT), None, &approve(), U256::ZERO),
            Err(BuildError::MissingContract(
                "approve(address,uint256)".to_string()
            ))
        );
    }

    #[test]
    fn zero_contract_is_invalid() {
        let err = ContractCall::raw("deposit", Some(Address::ZERO), vec![0xd0, 0xe3, 0x0d, 0xb0])
            .build(Some(ACCOUNT))
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidArguments(_)));
    }

    #[test]
    fn value_is_carried() {
        let payload = ContractCall::raw("deposit", Some(TOKEN), Bytes::new())
            .value(U256::from(10))
            .build(Some(ACCOUNT))
            .unwrap();
        assert_eq!(payload.value, U256::from(10));
    }
}
