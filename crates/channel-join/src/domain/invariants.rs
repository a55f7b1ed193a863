//! # Domain Invariants
//!
//! Rules that must hold for every join invocation.

use super::entities::CleanupReport;
use super::value_objects::TransactionId;

/// Status code a peer returns when it accepts the join.
pub const STATUS_ACCEPTED: u16 = 200;

/// A channel's config/genesis block carries exactly one transaction.
pub const CONFIG_BLOCK_TRANSACTION_COUNT: usize = 1;

/// Default wait for a peer's block commit event.
pub const DEFAULT_EVENT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Invariant: one subscription per targeted peer.
pub fn invariant_one_subscription_per_peer(target_peers: usize, subscriptions: usize) -> bool {
    target_peers == subscriptions
}

/// Invariant: no subscription outlives its invocation.
///
/// Every opened subscription was released, found already inactive, or had
/// its (logged) release failure recorded.
pub fn invariant_all_released(report: &CleanupReport) -> bool {
    report.is_complete()
}

/// Invariant: transaction ids are never reused within an invocation.
pub fn invariant_distinct_transaction_ids(ids: &[TransactionId]) -> bool {
    ids.iter()
        .enumerate()
        .all(|(i, id)| ids[i + 1..].iter().all(|other| other != id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_subscription_per_peer() {
        assert!(invariant_one_subscription_per_peer(3, 3));
        assert!(!invariant_one_subscription_per_peer(3, 2));
    }

    #[test]
    fn test_all_released() {
        let report = CleanupReport {
            opened: 2,
            released: 1,
            already_inactive: 0,
            failed: 0,
        };
        assert!(!invariant_all_released(&report));
    }

    #[test]
    fn test_distinct_transaction_ids() {
        let a = TransactionId::new();
        let b = TransactionId::new();
        assert!(invariant_distinct_transaction_ids(&[a, b]));
        assert!(!invariant_distinct_transaction_ids(&[a, b, a]));
    }
}
