use alloy::primitives::Bytes;

/// Raw cached outcome of a call as seen by a consumer.
///
/// `valid == false` means the call was never registered (no chain or no
/// contract). A valid result without `block_number` has been requested but
/// not answered yet. Empty `data` at a known block means the call reverted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallResult {
    pub valid: bool,
    pub data: Option<Bytes>,
    pub block_number: Option<u64>,
}

impl CallResult {
    pub const INVALID: Self = Self {
        valid: false,
        data: None,
        block_number: None,
    };

    pub const LOADING: Self = Self {
        valid: true,
        data: None,
        block_number: None,
    };

    pub fn fetched(data: Bytes, block_number: u64) -> Self {
        Self {
            valid: true,
            data: Some(data),
            block_number: Some(block_number),
        }
    }
}
