use crate::calibration::CalibrationPolicy;
use crate::view::{SortDirection, SortField};

pub(super) fn clamp_unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

pub(super) fn default_high_percentile() -> f64 {
    CalibrationPolicy::default().high_percentile
}

pub(super) fn default_medium_percentile() -> f64 {
    CalibrationPolicy::default().medium_percentile
}

pub(super) fn default_fallback_medium() -> f64 {
    CalibrationPolicy::default().fallback_medium
}

pub(super) fn default_fallback_high() -> f64 {
    CalibrationPolicy::default().fallback_high
}

pub(super) fn default_sort_field() -> SortField {
    SortField::ChurnProbability
}

pub(super) fn default_sort_direction() -> SortDirection {
    SortDirection::Desc
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_true() -> bool {
    true
}
