use std::collections::HashMap;

use ordered_float::OrderedFloat;

use super::{RiskTier, ThresholdSet, ThresholdSnapshot};
use crate::employees::normalize_probability;

/// Tier cache keyed by probability for one threshold set.
///
/// Entries are dropped the first time a snapshot with a different threshold
/// set is used (new version or new cut points), so a lookup never returns a
/// tier computed against other thresholds. Calibrating snapshots bypass the
/// cache.
#[derive(Debug, Default)]
pub struct TierMemo {
    thresholds: Option<ThresholdSet>,
    tiers: HashMap<OrderedFloat<f64>, RiskTier>,
}

impl TierMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier_for(&mut self, probability: Option<f64>, snapshot: &ThresholdSnapshot) -> RiskTier {
        if snapshot.calibrating {
            return RiskTier::Calibrating;
        }
        if self.thresholds != Some(snapshot.thresholds) {
            self.tiers.clear();
            self.thresholds = Some(snapshot.thresholds);
        }
        let key = OrderedFloat(normalize_probability(probability));
        *self
            .tiers
            .entry(key)
            .or_insert_with(|| snapshot.tier_for(Some(key.0)))
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::ThresholdSet;

    #[test]
    fn reuses_entries_within_a_version() {
        let mut memo = TierMemo::new();
        let snapshot = ThresholdSnapshot::settled(ThresholdSet::defaults());
        assert_eq!(memo.tier_for(Some(0.8), &snapshot), RiskTier::High);
        assert_eq!(memo.tier_for(Some(0.8), &snapshot), RiskTier::High);
        assert_eq!(memo.tier_for(None, &snapshot), RiskTier::Low);
        assert_eq!(memo.tier_for(Some(f64::NAN), &snapshot), RiskTier::Low);
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn version_change_discards_old_entries() {
        let mut memo = TierMemo::new();
        let first = ThresholdSnapshot::settled(ThresholdSet::defaults());
        assert_eq!(memo.tier_for(Some(0.5), &first), RiskTier::Medium);

        let second = ThresholdSnapshot::settled(ThresholdSet::new(0.2, 0.45, 1).unwrap());
        assert_eq!(memo.tier_for(Some(0.5), &second), RiskTier::High);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn new_cut_points_under_the_same_version_discard_old_entries() {
        let mut memo = TierMemo::new();
        let first = ThresholdSnapshot::settled(ThresholdSet::new(0.4, 0.7, 1).unwrap());
        assert_eq!(memo.tier_for(Some(0.5), &first), RiskTier::Medium);

        let second = ThresholdSnapshot::settled(ThresholdSet::new(0.05, 0.3, 1).unwrap());
        assert_eq!(memo.tier_for(Some(0.5), &second), RiskTier::High);
        assert_eq!(memo.tier_for(Some(0.1), &second), RiskTier::Medium);
    }

    #[test]
    fn calibrating_snapshot_is_not_cached() {
        let mut memo = TierMemo::new();
        let snapshot = ThresholdSnapshot {
            thresholds: ThresholdSet::defaults(),
            calibrating: true,
        };
        assert_eq!(memo.tier_for(Some(0.9), &snapshot), RiskTier::Calibrating);
        assert!(memo.is_empty());
    }
}
