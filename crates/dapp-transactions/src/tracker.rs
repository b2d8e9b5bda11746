use std::collections::HashMap;

use alloy::primitives::Address;
use chrono::{DateTime, TimeDelta, Utc};
use dapp_blockchain::ChainClient;
use dapp_domain::{ChainId, PendingTransaction, TransactionInfo, TransactionKind, TxHash, TxReceipt};
use dapp_observability::{record_pending_tx_finalized, record_pending_tx_snapshot};
use dashmap::DashMap;
use futures::future::join_all;

use crate::TrackError;

/// Window used by [`PendingTransactions::recent`].
pub const RECENT_WINDOW: TimeDelta = TimeDelta::hours(24);

/// Blocks to wait between receipt checks for a transaction of the given age.
pub fn check_interval_blocks(age: TimeDelta) -> u64 {
    if age < TimeDelta::minutes(5) {
        1
    } else if age < TimeDelta::minutes(60) {
        3
    } else {
        10
    }
}

/// Submitted transactions per chain, checked for receipts as blocks arrive.
///
/// A transaction is finalized exactly once, when its first receipt is seen.
/// Unconfirmed transactions stay until [`PendingTransactions::clear_chain`]
/// unless a TTL is configured.
#[derive(Debug, Default)]
pub struct PendingTransactions {
    chains: DashMap<ChainId, HashMap<TxHash, PendingTransaction>>,
    ttl: Option<TimeDelta>,
}

impl PendingTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: TimeDelta) -> Self {
        Self {
            chains: DashMap::new(),
            ttl: Some(ttl),
        }
    }

    pub fn ttl(&self) -> Option<TimeDelta> {
        self.ttl
    }

    pub fn track(
        &self,
        chain_id: ChainId,
        hash: TxHash,
        from: Address,
        info: TransactionInfo,
    ) -> Result<(), TrackError> {
        self.track_at(chain_id, hash, from, info, Utc::now())
    }

    pub fn track_at(
        &self,
        chain_id: ChainId,
        hash: TxHash,
        from: Address,
        info: TransactionInfo,
        now: DateTime<Utc>,
    ) -> Result<(), TrackError> {
        let mut chain = self.chains.entry(chain_id).or_default();
        if chain.contains_key(&hash) {
            return Err(TrackError::AlreadyTracked { chain_id, hash });
        }
        chain.insert(hash, PendingTransaction::new(chain_id, hash, from, info, now));
        tracing::debug!(%chain_id, %hash, "Tracking transaction");
        Ok(())
    }

    pub fn get(&self, chain_id: ChainId, hash: &TxHash) -> Option<PendingTransaction> {
        self.chains
            .get(&chain_id)
            .and_then(|chain| chain.get(hash).cloned())
    }

    /// Transactions without a receipt, oldest first.
    pub fn pending(&self, chain_id: ChainId) -> Vec<PendingTransaction> {
        let mut pending: Vec<PendingTransaction> = self
            .chains
            .get(&chain_id)
            .map(|chain| {
                chain
                    .values()
                    .filter(|tx| !tx.is_finalized())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        pending.sort_by_key(|tx| tx.added_at);
        pending
    }

    pub fn recent(&self, chain_id: ChainId) -> Vec<PendingTransaction> {
        self.recent_at(chain_id, Utc::now())
    }

    /// Transactions added within [`RECENT_WINDOW`] of `now`, newest first.
    pub fn recent_at(&self, chain_id: ChainId, now: DateTime<Utc>) -> Vec<PendingTransaction> {
        let mut recent: Vec<PendingTransaction> = self
            .chains
            .get(&chain_id)
            .map(|chain| {
                chain
                    .values()
                    .filter(|tx| now - tx.added_at <= RECENT_WINDOW)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        recent.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        recent
    }

    pub fn has_pending_kind(&self, chain_id: ChainId, kind: TransactionKind) -> bool {
        self.chains.get(&chain_id).is_some_and(|chain| {
            chain
                .values()
                .any(|tx| !tx.is_finalized() && tx.info.kind == kind)
        })
    }

    /// Record a receipt check at `block_number`. Never moves backwards.
    pub fn mark_checked(&self, chain_id: ChainId, hash: &TxHash, block_number: u64) {
        if let Some(mut chain) = self.chains.get_mut(&chain_id)
            && let Some(tx) = chain.get_mut(hash)
            && tx
                .last_checked_block
                .is_none_or(|checked| checked < block_number)
        {
            tx.last_checked_block = Some(block_number);
        }
    }

    /// Attach the first receipt seen for `hash`. Returns the finalized
    /// transaction, or `None` if it was unknown or already finalized.
    pub fn finalize(
        &self,
        chain_id: ChainId,
        hash: &TxHash,
        receipt: TxReceipt,
        now: DateTime<Utc>,
    ) -> Option<PendingTransaction> {
        let mut chain = self.chains.get_mut(&chain_id)?;
        let tx = chain.get_mut(hash)?;
        if tx.is_finalized() {
            return None;
        }

        let status = if receipt.status { "success" } else { "reverted" };
        tx.receipt = Some(receipt);
        tx.confirmed_at = Some(now);

        record_pending_tx_finalized(
            chain_id.as_u64(),
            status,
            (now - tx.added_at).to_std().unwrap_or_default(),
        );
        tracing::info!(
            %chain_id,
            %hash,
            kind = tx.info.kind.as_str(),
            status,
            "Transaction finalized"
        );
        Some(tx.clone())
    }

    pub fn clear_chain(&self, chain_id: ChainId) {
        self.chains.remove(&chain_id);
        record_pending_tx_snapshot(chain_id.as_u64(), 0);
    }

    /// Drop unconfirmed transactions older than the configured TTL. Does
    /// nothing without a TTL.
    pub fn expire_unconfirmed(&self, now: DateTime<Utc>) -> Vec<PendingTransaction> {
        let Some(ttl) = self.ttl else {
            return Vec::new();
        };

        let mut expired = Vec::new();
        for mut chain in self.chains.iter_mut() {
            let hashes: Vec<TxHash> = chain
                .values()
                .filter(|tx| !tx.is_finalized() && now - tx.added_at > ttl)
                .map(|tx| tx.hash)
                .collect();
            for hash in hashes {
                if let Some(tx) = chain.remove(&hash) {
                    tracing::warn!(
                        chain_id = %tx.chain_id,
                        hash = %tx.hash,
                        kind = tx.info.kind.as_str(),
                        "Dropping unconfirmed transaction past its TTL"
                    );
                    expired.push(tx);
                }
            }
        }
        expired
    }

    fn due_for_check(&self, chain_id: ChainId, block_number: u64, now: DateTime<Utc>) -> Vec<TxHash> {
        let Some(chain) = self.chains.get(&chain_id) else {
            return Vec::new();
        };
        chain
            .values()
            .filter(|tx| !tx.is_finalized())
            .filter(|tx| match tx.last_checked_block {
                None => true,
                Some(checked) => {
                    let interval = check_interval_blocks(now - tx.added_at);
                    block_number >= checked.saturating_add(interval)
                }
            })
            .map(|tx| tx.hash)
            .collect()
    }

    pub async fn on_block(
        &self,
        client: &dyn ChainClient,
        block_number: u64,
    ) -> Vec<PendingTransaction> {
        self.on_block_at(client, block_number, Utc::now()).await
    }

    /// Check every due transaction of the client's chain for a receipt.
    /// Returns the transactions finalized by this block.
    pub async fn on_block_at(
        &self,
        client: &dyn ChainClient,
        block_number: u64,
        now: DateTime<Utc>,
    ) -> Vec<PendingTransaction> {
        let chain_id = client.chain_id();
        let due = self.due_for_check(chain_id, block_number, now);
        if due.is_empty() {
            return Vec::new();
        }

        for hash in &due {
            self.mark_checked(chain_id, hash, block_number);
        }

        let receipts = join_all(due.iter().map(|hash| client.transaction_receipt(*hash))).await;

        let mut finalized = Vec::new();
        for (hash, receipt) in due.iter().zip(receipts) {
            match receipt {
                Ok(Some(receipt)) => {
                    if let Some(tx) = self.finalize(chain_id, hash, receipt, now) {
                        finalized.push(tx);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        %chain_id,
                        %hash,
                        block_number,
                        error = %e,
                        "Receipt check failed; will retry"
                    );
                }
            }
        }

        record_pending_tx_snapshot(chain_id.as_u64(), self.pending(chain_id).len());
        finalized
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use alloy::primitives::B256;

    use super::*;

    const CHAIN: ChainId = ChainId::new(10);

    fn info(kind: TransactionKind) -> TransactionInfo {
        TransactionInfo::new(kind, "test")
    }

    fn receipt(hash: TxHash) -> TxReceipt {
        TxReceipt {
            transaction_hash: hash,
            block_number: Some(1),
            block_hash: None,
            status: true,
            gas_used: 21_000,
            from: Address::ZERO,
            to: None,
        }
    }

    #[test]
    fn duplicate_track_is_rejected() {
        let tracker = PendingTransactions::new();
        let hash = B256::with_last_byte(1);
        tracker
            .track(CHAIN, hash, Address::ZERO, info(TransactionKind::Swap))
            .unwrap();
        assert_eq!(
            tracker.track(CHAIN, hash, Address::ZERO, info(TransactionKind::Swap)),
            Err(TrackError::AlreadyTracked {
                chain_id: CHAIN,
                hash
            })
        );
        // Same hash on another chain is a different transaction.
        tracker
            .track(ChainId::new(1), hash, Address::ZERO, info(TransactionKind::Swap))
            .unwrap();
    }

    #[test]
    fn finalize_happens_once() {
        let tracker = PendingTransactions::new();
        let hash = B256::with_last_byte(2);
        tracker
            .track(CHAIN, hash, Address::ZERO, info(TransactionKind::Approval))
            .unwrap();
        assert!(tracker.has_pending_kind(CHAIN, TransactionKind::Approval));

        let now = Utc::now();
        assert!(tracker.finalize(CHAIN, &hash, receipt(hash), now).is_some());
        assert!(
            tracker
                .finalize(CHAIN, &hash, receipt(hash), now + TimeDelta::seconds(5))
                .is_none()
        );
        assert_eq!(tracker.get(CHAIN, &hash).unwrap().confirmed_at, Some(now));
        assert!(!tracker.has_pending_kind(CHAIN, TransactionKind::Approval));
        assert!(tracker.pending(CHAIN).is_empty());
    }

    #[test]
    fn checks_back_off_with_age() {
        assert_eq!(check_interval_blocks(TimeDelta::seconds(30)), 1);
        assert_eq!(check_interval_blocks(TimeDelta::minutes(5)), 3);
        assert_eq!(check_interval_blocks(TimeDelta::minutes(59)), 3);
        assert_eq!(check_interval_blocks(TimeDelta::hours(2)), 10);

        let tracker = PendingTransactions::new();
        let hash = B256::with_last_byte(3);
        let added = Utc::now();
        tracker
            .track_at(CHAIN, hash, Address::ZERO, info(TransactionKind::Bridge), added)
            .unwrap();

        let later = added + TimeDelta::minutes(10);
        assert_eq!(tracker.due_for_check(CHAIN, 100, later), vec![hash]);
        tracker.mark_checked(CHAIN, &hash, 100);
        assert!(tracker.due_for_check(CHAIN, 102, later).is_empty());
        assert_eq!(tracker.due_for_check(CHAIN, 103, later), vec![hash]);
    }

    #[test]
    fn last_checked_block_is_monotonic() {
        let tracker = PendingTransactions::new();
        let hash = B256::with_last_byte(4);
        tracker
            .track(CHAIN, hash, Address::ZERO, info(TransactionKind::Stake))
            .unwrap();
        tracker.mark_checked(CHAIN, &hash, 9);
        tracker.mark_checked(CHAIN, &hash, 7);
        assert_eq!(tracker.get(CHAIN, &hash).unwrap().last_checked_block, Some(9));
    }

    #[test]
    fn recent_is_newest_first_within_a_day() {
        let tracker = PendingTransactions::new();
        let now = Utc::now();
        let ages = [(1u8, 30), (2, 60 * 25), (3, 5)];
        for (n, minutes_ago) in ages {
            tracker
                .track_at(
                    CHAIN,
                    B256::with_last_byte(n),
                    Address::ZERO,
                    info(TransactionKind::Other),
                    now - TimeDelta::minutes(minutes_ago),
                )
                .unwrap();
        }

        let recent: Vec<TxHash> = tracker.recent_at(CHAIN, now).iter().map(|tx| tx.hash).collect();
        assert_eq!(recent, vec![B256::with_last_byte(3), B256::with_last_byte(1)]);
    }

    #[test]
    fn expiry_requires_a_ttl() {
        let now = Utc::now();
        let old = now - TimeDelta::hours(3);

        let keep_forever = PendingTransactions::new();
        keep_forever
            .track_at(CHAIN, B256::with_last_byte(5), Address::ZERO, info(TransactionKind::Swap), old)
            .unwrap();
        assert!(keep_forever.expire_unconfirmed(now).is_empty());
        assert_eq!(keep_forever.pending(CHAIN).len(), 1);

        let expiring = PendingTransactions::with_ttl(TimeDelta::hours(1));
        expiring
            .track_at(CHAIN, B256::with_last_byte(5), Address::ZERO, info(TransactionKind::Swap), old)
            .unwrap();
        expiring
            .track_at(CHAIN, B256::with_last_byte(6), Address::ZERO, info(TransactionKind::Swap), now)
            .unwrap();
        let expired = expiring.expire_unconfirmed(now);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].hash, B256::with_last_byte(5));
        assert_eq!(expiring.pending(CHAIN).len(), 1);
    }

    #[test]
    fn clear_chain_forgets_everything() {
        let tracker = PendingTransactions::new();
        let hash = B256::with_last_byte(7);
        tracker
            .track(CHAIN, hash, Address::ZERO, info(TransactionKind::Unstake))
            .unwrap();
        tracker.clear_chain(CHAIN);
        assert!(tracker.get(CHAIN, &hash).is_none());
    }
}
