use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use super::CalibrationError;
use crate::employees::EmployeeRecord;
use crate::risk::{DEFAULT_HIGH_RISK, DEFAULT_MEDIUM_RISK, ThresholdSet};

/// How often the sample collector checks the cancel flag.
const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Tunable percentile policy for deriving cut points from a population.
///
/// Config keys: `high_percentile`, `medium_percentile`, `fallback_medium`, `fallback_high`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPolicy {
    /// Quantile of the probability distribution that starts the high tier (top decile by default).
    #[serde(default = "default_high_percentile")]
    pub high_percentile: f64,
    /// Quantile that starts the medium tier (top tercile by default).
    #[serde(default = "default_medium_percentile")]
    pub medium_percentile: f64,
    #[serde(default = "default_fallback_medium")]
    pub fallback_medium: f64,
    #[serde(default = "default_fallback_high")]
    pub fallback_high: f64,
}

impl Default for CalibrationPolicy {
    fn default() -> Self {
        Self {
            high_percentile: default_high_percentile(),
            medium_percentile: default_medium_percentile(),
            fallback_medium: default_fallback_medium(),
            fallback_high: default_fallback_high(),
        }
    }
}

impl CalibrationPolicy {
    /// Reject policies whose percentiles or fallbacks cannot produce a valid threshold set.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let in_unit = |value: f64| value.is_finite() && (0.0..=1.0).contains(&value);
        if !in_unit(self.medium_percentile) || !in_unit(self.high_percentile) {
            return Err(CalibrationError::InvalidPolicy {
                reason: format!(
                    "percentiles must lie in [0, 1] (medium {}, high {})",
                    self.medium_percentile, self.high_percentile
                ),
            });
        }
        if self.medium_percentile >= self.high_percentile {
            return Err(CalibrationError::InvalidPolicy {
                reason: format!(
                    "medium percentile {} must be below high percentile {}",
                    self.medium_percentile, self.high_percentile
                ),
            });
        }
        self.fallback()?;
        Ok(())
    }

    /// Static threshold set used for degenerate populations.
    pub fn fallback(&self) -> Result<ThresholdSet, CalibrationError> {
        ThresholdSet::new(self.fallback_medium, self.fallback_high, 0).map_err(|err| {
            CalibrationError::InvalidPolicy {
                reason: format!("fallback thresholds rejected: {err}"),
            }
        })
    }
}

fn default_high_percentile() -> f64 {
    0.9
}

fn default_medium_percentile() -> f64 {
    2.0 / 3.0
}

fn default_fallback_medium() -> f64 {
    DEFAULT_MEDIUM_RISK
}

fn default_fallback_high() -> f64 {
    DEFAULT_HIGH_RISK
}

/// Where a calibrated threshold set came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationBasis {
    /// Percentile cut points over this many scored employees.
    Percentile { sample_size: usize },
    /// Fewer than two distinct probabilities were available.
    DegeneratePopulation { distinct: usize },
    /// The percentile cut points coincided, so no medium band could be formed.
    CollapsedCutPoints,
}

/// Result of a successful calibration run, before it is versioned and published.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibratedThresholds {
    pub thresholds: ThresholdSet,
    pub basis: CalibrationBasis,
}

/// Compute cut points for `population`. Returns `Ok(None)` when `cancel` was raised mid-run.
///
/// Records without a usable probability (missing, NaN or infinite) are left
/// out of the sample. A finite probability outside `[0, 1]` means the backend
/// sent malformed data and fails the run. A medium cut point at or below the
/// sample minimum would leave the Low tier empty, so it counts as collapsed.
pub fn calibrate(
    population: &[EmployeeRecord],
    policy: &CalibrationPolicy,
    cancel: &AtomicBool,
) -> Result<Option<CalibratedThresholds>, CalibrationError> {
    policy.validate()?;
    let fallback = policy.fallback()?;

    let mut sample = Vec::with_capacity(population.len());
    for (index, record) in population.iter().enumerate() {
        if index % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            return Ok(None);
        }
        let Some(value) = record.churn_probability.filter(|value| value.is_finite()) else {
            continue;
        };
        if !(0.0..=1.0).contains(&value) {
            return Err(CalibrationError::ProbabilityOutOfRange {
                id: record.id.clone(),
                value,
            });
        }
        sample.push(value);
    }
    if cancel.load(Ordering::Relaxed) {
        return Ok(None);
    }

    sample.sort_by(f64::total_cmp);
    let distinct = count_distinct_sorted(&sample);
    if distinct <= 1 {
        return Ok(Some(CalibratedThresholds {
            thresholds: fallback,
            basis: CalibrationBasis::DegeneratePopulation { distinct },
        }));
    }

    let (Some(medium), Some(high)) = (
        quantile_sorted(&sample, policy.medium_percentile),
        quantile_sorted(&sample, policy.high_percentile),
    ) else {
        return Ok(Some(CalibratedThresholds {
            thresholds: fallback,
            basis: CalibrationBasis::DegeneratePopulation { distinct },
        }));
    };

    let floor = sample[0];
    match ThresholdSet::new(medium, high, 0) {
        Ok(thresholds) if medium > floor => Ok(Some(CalibratedThresholds {
            thresholds,
            basis: CalibrationBasis::Percentile {
                sample_size: sample.len(),
            },
        })),
        _ => Ok(Some(CalibratedThresholds {
            thresholds: fallback,
            basis: CalibrationBasis::CollapsedCutPoints,
        })),
    }
}

/// Linear-interpolated quantile of an ascending slice.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }
    let pos = q * ((sorted.len() - 1) as f64);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - (lo as f64);
    Some(sorted[lo] * (1.0 - frac) + sorted[hi] * frac)
}

fn count_distinct_sorted(sorted: &[f64]) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    1 + sorted.windows(2).filter(|pair| pair[0] != pair[1]).count()
}
