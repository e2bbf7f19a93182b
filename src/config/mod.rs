//! Persisted engine settings (`config.toml` in the application directory).
//!
//! Missing files and missing keys fall back to defaults; loaded values are
//! normalized so the engine never sees an unusable policy.

mod defaults;
mod errors;
mod io;

use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationMode, CalibrationPolicy};
use crate::risk::ThresholdSet;
use crate::view::{SortDirection, SortField, SortSpec};

use defaults::*;
pub use errors::ConfigError;
pub use io::{CONFIG_FILE_NAME, config_path, load_from, load_or_default, save, save_to_path};

/// Top-level settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub calibration: CalibrationSettings,
    #[serde(default)]
    pub view: ViewSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    pub(crate) fn normalized(self) -> Self {
        Self {
            calibration: self.calibration.normalized(),
            view: self.view,
            logging: self.logging.normalized(),
        }
    }
}

/// Threshold calibration policy and execution mode.
///
/// Config keys: `high_percentile`, `medium_percentile`, `fallback_medium`,
/// `fallback_high`, `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    #[serde(default = "default_high_percentile")]
    pub high_percentile: f64,
    #[serde(default = "default_medium_percentile")]
    pub medium_percentile: f64,
    #[serde(default = "default_fallback_medium")]
    pub fallback_medium: f64,
    #[serde(default = "default_fallback_high")]
    pub fallback_high: f64,
    #[serde(default)]
    pub mode: CalibrationMode,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            high_percentile: default_high_percentile(),
            medium_percentile: default_medium_percentile(),
            fallback_medium: default_fallback_medium(),
            fallback_high: default_fallback_high(),
            mode: CalibrationMode::default(),
        }
    }
}

impl CalibrationSettings {
    pub fn policy(&self) -> CalibrationPolicy {
        CalibrationPolicy {
            high_percentile: self.high_percentile,
            medium_percentile: self.medium_percentile,
            fallback_medium: self.fallback_medium,
            fallback_high: self.fallback_high,
        }
    }

    fn normalized(mut self) -> Self {
        self.high_percentile = clamp_unit(self.high_percentile, default_high_percentile());
        self.medium_percentile = clamp_unit(self.medium_percentile, default_medium_percentile());
        if self.medium_percentile >= self.high_percentile {
            tracing::warn!(
                "Calibration percentiles out of order (medium {}, high {}); using defaults",
                self.medium_percentile,
                self.high_percentile
            );
            self.high_percentile = default_high_percentile();
            self.medium_percentile = default_medium_percentile();
        }
        if ThresholdSet::new(self.fallback_medium, self.fallback_high, 0).is_err() {
            tracing::warn!(
                "Fallback thresholds unusable (medium {}, high {}); using defaults",
                self.fallback_medium,
                self.fallback_high
            );
            self.fallback_medium = default_fallback_medium();
            self.fallback_high = default_fallback_high();
        }
        self
    }
}

/// Initial ordering of the employee list.
///
/// Config keys: `default_sort_field`, `default_sort_direction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    #[serde(default = "default_sort_field")]
    pub default_sort_field: SortField,
    #[serde(default = "default_sort_direction")]
    pub default_sort_direction: SortDirection,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            default_sort_field: default_sort_field(),
            default_sort_direction: default_sort_direction(),
        }
    }
}

impl ViewSettings {
    pub fn sort_spec(&self) -> SortSpec {
        SortSpec::new(self.default_sort_field, self.default_sort_direction)
    }
}

/// Log filter and file output.
///
/// Config keys: `level` (an `EnvFilter` directive; `RUST_LOG` wins when set),
/// `file_output`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub file_output: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: true,
        }
    }
}

impl LoggingSettings {
    fn normalized(mut self) -> Self {
        let trimmed = self.level.trim();
        self.level = if trimmed.is_empty() {
            default_log_level()
        } else {
            trimmed.to_string()
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.calibration.policy(), CalibrationPolicy::default());
        assert_eq!(
            settings.view.sort_spec(),
            SortSpec::desc(SortField::ChurnProbability)
        );
        assert!(settings.logging.file_output);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let settings: Settings = toml::from_str(
            "[calibration]\nmode = \"deferred\"\nhigh_percentile = 0.95\n\n[view]\ndefault_sort_field = \"fullName\"\n",
        )
        .unwrap();
        assert_eq!(settings.calibration.mode, CalibrationMode::Deferred);
        assert_eq!(settings.calibration.high_percentile, 0.95);
        assert_eq!(
            settings.calibration.medium_percentile,
            default_medium_percentile()
        );
        assert_eq!(settings.view.sort_spec(), SortSpec::desc(SortField::FullName));
    }

    #[test]
    fn normalization_clamps_and_reorders_percentiles() {
        let mut settings = Settings::default();
        settings.calibration.high_percentile = 1.5;
        settings.calibration.medium_percentile = 0.5;
        let normalized = settings.normalized();
        assert_eq!(normalized.calibration.high_percentile, 1.0);
        assert_eq!(normalized.calibration.medium_percentile, 0.5);

        let mut settings = Settings::default();
        settings.calibration.high_percentile = 0.3;
        settings.calibration.medium_percentile = f64::NAN;
        let normalized = settings.normalized();
        assert_eq!(
            normalized.calibration.high_percentile,
            default_high_percentile()
        );
        assert_eq!(
            normalized.calibration.medium_percentile,
            default_medium_percentile()
        );
        assert!(normalized.calibration.policy().validate().is_ok());
    }

    #[test]
    fn normalization_replaces_unusable_fallbacks() {
        let mut settings = Settings::default();
        settings.calibration.fallback_medium = 0.8;
        settings.calibration.fallback_high = 0.2;
        settings.logging.level = "   ".into();
        let normalized = settings.normalized();
        assert_eq!(normalized.calibration.fallback_medium, 0.4);
        assert_eq!(normalized.calibration.fallback_high, 0.7);
        assert_eq!(normalized.logging.level, "info");
    }
}
