use alloy::primitives::{Address, B256, Bytes, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ChainId;

pub type TxHash = B256;

/// A fully built, not yet priced transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxPayload {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Approval,
    Swap,
    Bridge,
    Migrate,
    Convert,
    Stake,
    Unstake,
    ClaimRewards,
    Other,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approval => "approval",
            Self::Swap => "swap",
            Self::Bridge => "bridge",
            Self::Migrate => "migrate",
            Self::Convert => "convert",
            Self::Stake => "stake",
            Self::Unstake => "unstake",
            Self::ClaimRewards => "claim_rewards",
            Self::Other => "other",
        }
    }
}

/// Caller-supplied description attached to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub kind: TransactionKind,
    pub summary: String,
}

impl TransactionInfo {
    pub fn new(kind: TransactionKind, summary: impl Into<String>) -> Self {
        Self {
            kind,
            summary: summary.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub status: bool,
    pub gas_used: u64,
    pub from: Address,
    pub to: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: TxHash,
    pub chain_id: ChainId,
    pub from: Address,
    pub info: TransactionInfo,
    pub added_at: DateTime<Utc>,
    pub last_checked_block: Option<u64>,
    pub receipt: Option<TxReceipt>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl PendingTransaction {
    pub fn new(
        chain_id: ChainId,
        hash: TxHash,
        from: Address,
        info: TransactionInfo,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            hash,
            chain_id,
            from,
            info,
            added_at,
            last_checked_block: None,
            receipt: None,
            confirmed_at: None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.receipt.is_some()
    }
}
