//! Employee records as delivered by the prediction backend.
//!
//! Records are immutable once fetched. Dirty values (missing department,
//! NaN probability, ...) are never rewritten; the accessors below apply the
//! default-substitution rules on read so every consumer sees the same labels.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

mod load;

pub use load::{LoadError, load_population, parse_population};

/// Label used when a record has no department.
pub const UNASSIGNED_DEPARTMENT: &str = "Unassigned";
/// Label used when a record has no position.
pub const UNASSIGNED_POSITION: &str = "Unassigned";
/// Label used when a record has no status.
pub const DEFAULT_STATUS: &str = "Active";

/// One fetch generation of employee records, shared by reference.
///
/// Identity matters: the calibration service treats two populations as the
/// same input only when they are the same allocation.
pub type Population = Arc<[EmployeeRecord]>;

/// Identifier assigned by the backend. Numeric ids are kept in their decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EmployeeId(String);

impl EmployeeId {
    /// Wrap an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl<'de> Deserialize<'de> for EmployeeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Unsigned(value) => Self(value.to_string()),
            RawId::Signed(value) => Self(value.to_string()),
        })
    }
}

/// A single employee row with its model-estimated churn probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub id: EmployeeId,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Model output in `[0, 1]`; absent when the backend has not scored the employee.
    #[serde(default)]
    pub churn_probability: Option<f64>,
    #[serde(default)]
    pub tenure_years: Option<f64>,
}

impl EmployeeRecord {
    /// Create a record with only an id and a name; remaining fields are unset.
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: EmployeeId::new(id),
            full_name: full_name.into(),
            department: None,
            position: None,
            status: None,
            churn_probability: None,
            tenure_years: None,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.churn_probability = Some(probability);
        self
    }

    pub fn with_tenure(mut self, years: f64) -> Self {
        self.tenure_years = Some(years);
        self
    }

    /// Department label with the `Unassigned` substitution applied.
    pub fn department_label(&self) -> &str {
        label_or(self.department.as_deref(), UNASSIGNED_DEPARTMENT)
    }

    /// Position label with the `Unassigned` substitution applied.
    pub fn position_label(&self) -> &str {
        label_or(self.position.as_deref(), UNASSIGNED_POSITION)
    }

    /// Status label with the `Active` substitution applied.
    pub fn status_label(&self) -> &str {
        label_or(self.status.as_deref(), DEFAULT_STATUS)
    }

    /// Churn probability normalized for classification and sorting.
    pub fn probability(&self) -> f64 {
        normalize_probability(self.churn_probability)
    }

    /// Tenure in years, `0` when missing or not finite.
    pub fn tenure(&self) -> f64 {
        self.tenure_years
            .filter(|years| years.is_finite())
            .unwrap_or(0.0)
    }
}

/// Map a raw probability to `[0, 1]`: missing and non-finite values become `0`.
pub fn normalize_probability(probability: Option<f64>) -> f64 {
    match probability {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

fn label_or<'a>(value: Option<&'a str>, fallback: &'static str) -> &'a str {
    match value.map(str::trim) {
        Some(label) if !label.is_empty() => label,
        _ => fallback,
    }
}
