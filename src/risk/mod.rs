//! Risk tiers and the pure classifier that maps a churn probability to one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::employees::{EmployeeRecord, normalize_probability};

mod memo;

pub use memo::TierMemo;

/// Static medium-risk cut point used before the first calibration and for degenerate populations.
pub const DEFAULT_MEDIUM_RISK: f64 = 0.4;
/// Static high-risk cut point used before the first calibration and for degenerate populations.
pub const DEFAULT_HIGH_RISK: f64 = 0.7;

/// Coarse risk classification shown next to each employee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    High,
    Medium,
    Low,
    /// Placeholder shown while thresholds are being recomputed.
    Calibrating,
}

impl RiskTier {
    /// Tiers that `classify` can produce, highest first.
    pub const CLASSIFIED: [RiskTier; 3] = [RiskTier::High, RiskTier::Medium, RiskTier::Low];

    /// Ordering rank used when sorting by risk.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
            Self::Calibrating => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Calibrating => "Calibrating",
        }
    }

    /// Parse a tier label (case-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        [Self::High, Self::Medium, Self::Low, Self::Calibrating]
            .into_iter()
            .find(|tier| tier.label().eq_ignore_ascii_case(label))
    }

    /// True for the `Calibrating` placeholder, which the UI renders greyed out.
    pub fn is_placeholder(self) -> bool {
        self == Self::Calibrating
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

/// Rejected cut points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("Thresholds must be finite (medium {medium}, high {high})")]
    NotFinite { medium: f64, high: f64 },
    #[error("Thresholds must satisfy 0 <= medium < high <= 1 (medium {medium}, high {high})")]
    OutOfOrder { medium: f64, high: f64 },
}

/// Versioned pair of cut points. Always satisfies `0 <= medium_risk < high_risk <= 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ThresholdSet {
    medium_risk: f64,
    high_risk: f64,
    version: u64,
}

impl ThresholdSet {
    /// Validate and build a threshold set.
    pub fn new(medium_risk: f64, high_risk: f64, version: u64) -> Result<Self, ThresholdError> {
        if !medium_risk.is_finite() || !high_risk.is_finite() {
            return Err(ThresholdError::NotFinite {
                medium: medium_risk,
                high: high_risk,
            });
        }
        if !(0.0 <= medium_risk && medium_risk < high_risk && high_risk <= 1.0) {
            return Err(ThresholdError::OutOfOrder {
                medium: medium_risk,
                high: high_risk,
            });
        }
        Ok(Self {
            medium_risk,
            high_risk,
            version,
        })
    }

    /// The static `{0.4, 0.7}` set at version 0.
    pub fn defaults() -> Self {
        Self {
            medium_risk: DEFAULT_MEDIUM_RISK,
            high_risk: DEFAULT_HIGH_RISK,
            version: 0,
        }
    }

    pub fn medium_risk(&self) -> f64 {
        self.medium_risk
    }

    pub fn high_risk(&self) -> f64 {
        self.high_risk
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Same cut points under a different version.
    pub(crate) fn with_version(self, version: u64) -> Self {
        Self { version, ..self }
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Classify a probability against a threshold set.
///
/// Missing and NaN probabilities count as `0`. The result is never
/// `Calibrating`; substituting the placeholder is the caller's job (see
/// [`ThresholdSnapshot::tier_for`]).
pub fn classify(probability: Option<f64>, thresholds: &ThresholdSet) -> RiskTier {
    let probability = normalize_probability(probability);
    if probability >= thresholds.high_risk {
        RiskTier::High
    } else if probability >= thresholds.medium_risk {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Threshold state as seen by a reader at one point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdSnapshot {
    pub thresholds: ThresholdSet,
    pub calibrating: bool,
}

impl ThresholdSnapshot {
    /// Snapshot of settled thresholds.
    pub fn settled(thresholds: ThresholdSet) -> Self {
        Self {
            thresholds,
            calibrating: false,
        }
    }

    pub fn version(&self) -> u64 {
        self.thresholds.version()
    }

    /// Tier for a probability, or `Calibrating` while thresholds are in flux.
    pub fn tier_for(&self, probability: Option<f64>) -> RiskTier {
        if self.calibrating {
            return RiskTier::Calibrating;
        }
        classify(probability, &self.thresholds)
    }

    pub fn tier_of(&self, record: &EmployeeRecord) -> RiskTier {
        self.tier_for(record.churn_probability)
    }
}

impl Default for ThresholdSnapshot {
    fn default() -> Self {
        Self::settled(ThresholdSet::defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(medium: f64, high: f64) -> ThresholdSet {
        ThresholdSet::new(medium, high, 1).unwrap()
    }

    #[test]
    fn classify_respects_cut_points() {
        let t = thresholds(0.4, 0.7);
        assert_eq!(classify(Some(0.7), &t), RiskTier::High);
        assert_eq!(classify(Some(0.95), &t), RiskTier::High);
        assert_eq!(classify(Some(0.4), &t), RiskTier::Medium);
        assert_eq!(classify(Some(0.69), &t), RiskTier::Medium);
        assert_eq!(classify(Some(0.39), &t), RiskTier::Low);
    }

    #[test]
    fn missing_and_nan_classify_as_zero() {
        let t = ThresholdSet::defaults();
        assert_eq!(classify(Some(f64::NAN), &t), RiskTier::Low);
        assert_eq!(classify(None, &t), RiskTier::Low);
        assert_eq!(classify(Some(0.0), &t), RiskTier::Low);
    }

    #[test]
    fn zero_medium_threshold_makes_missing_medium() {
        let t = thresholds(0.0, 0.5);
        assert_eq!(classify(None, &t), RiskTier::Medium);
    }

    #[test]
    fn classify_is_monotonic() {
        let sets = [thresholds(0.4, 0.7), thresholds(0.0, 1.0), thresholds(0.25, 0.26)];
        for t in &sets {
            let mut previous = 0;
            for step in 0..=1000 {
                let p = step as f64 / 1000.0;
                let tier = classify(Some(p), t);
                assert!(RiskTier::CLASSIFIED.contains(&tier));
                assert!(tier.rank() >= previous, "rank dropped at p={p}");
                previous = tier.rank();
            }
        }
    }

    #[test]
    fn rejects_invalid_threshold_sets() {
        assert!(matches!(
            ThresholdSet::new(0.7, 0.4, 0),
            Err(ThresholdError::OutOfOrder { .. })
        ));
        assert!(ThresholdSet::new(0.5, 0.5, 0).is_err());
        assert!(ThresholdSet::new(-0.1, 0.5, 0).is_err());
        assert!(ThresholdSet::new(0.1, 1.5, 0).is_err());
        assert!(matches!(
            ThresholdSet::new(f64::NAN, 0.5, 0),
            Err(ThresholdError::NotFinite { .. })
        ));
        assert!(ThresholdSet::new(0.0, 1.0, 0).is_ok());
    }

    #[test]
    fn calibrating_snapshot_returns_placeholder() {
        let snapshot = ThresholdSnapshot {
            thresholds: ThresholdSet::defaults(),
            calibrating: true,
        };
        assert_eq!(snapshot.tier_for(Some(0.99)), RiskTier::Calibrating);
        assert!(snapshot.tier_for(None).is_placeholder());
    }

    #[test]
    fn tier_labels_round_trip_case_insensitively() {
        assert_eq!(RiskTier::from_label("high"), Some(RiskTier::High));
        assert_eq!(RiskTier::from_label(" Medium "), Some(RiskTier::Medium));
        assert_eq!(RiskTier::from_label("extreme"), None);
    }
}
