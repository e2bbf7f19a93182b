use std::borrow::Borrow;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::employees::EmployeeRecord;
use crate::risk::{ThresholdSnapshot, TierMemo};

/// Column the employee list can be ordered by.
///
/// Config values: `fullName`, `department`, `position`, `status`,
/// `churnProbability`, `riskLevel`, `tenureYears`, `id`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    FullName,
    Department,
    Position,
    Status,
    ChurnProbability,
    RiskLevel,
    TenureYears,
    Id,
}

impl SortField {
    pub const EVERY: [SortField; 8] = [
        SortField::FullName,
        SortField::Department,
        SortField::Position,
        SortField::Status,
        SortField::ChurnProbability,
        SortField::RiskLevel,
        SortField::TenureYears,
        SortField::Id,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::FullName => "fullName",
            Self::Department => "department",
            Self::Position => "position",
            Self::Status => "status",
            Self::ChurnProbability => "churnProbability",
            Self::RiskLevel => "riskLevel",
            Self::TenureYears => "tenureYears",
            Self::Id => "id",
        }
    }

    /// Parse a field label (case-insensitive).
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::EVERY
            .into_iter()
            .find(|field| field.label().eq_ignore_ascii_case(label))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn asc(field: SortField) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: SortField) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Sorted row order stamped with the thresholds it was computed against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortedRows {
    pub rows: Vec<usize>,
    pub thresholds_version: u64,
    pub calibrating: bool,
}

impl SortedRows {
    /// True when the order was computed against `snapshot`'s thresholds and calibrating state.
    pub fn is_current_for(&self, snapshot: &ThresholdSnapshot) -> bool {
        self.thresholds_version == snapshot.version() && self.calibrating == snapshot.calibrating
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Text(String),
    Number(OrderedFloat<f64>),
    Rank(u8),
}

fn sort_key(
    record: &EmployeeRecord,
    field: SortField,
    snapshot: &ThresholdSnapshot,
    memo: &mut TierMemo,
) -> SortKey {
    match field {
        SortField::FullName => SortKey::Text(record.full_name.to_lowercase()),
        SortField::Department => SortKey::Text(record.department_label().to_lowercase()),
        SortField::Position => SortKey::Text(record.position_label().to_lowercase()),
        SortField::Status => SortKey::Text(record.status_label().to_lowercase()),
        SortField::Id => SortKey::Text(record.id.as_str().to_lowercase()),
        SortField::ChurnProbability => SortKey::Number(OrderedFloat(record.probability())),
        SortField::TenureYears => SortKey::Number(OrderedFloat(record.tenure())),
        SortField::RiskLevel => {
            SortKey::Rank(memo.tier_for(record.churn_probability, snapshot).rank())
        }
    }
}

/// Stable ordering of `(position, record)` pairs; returns positions.
fn stable_order<'a>(
    records: impl Iterator<Item = (usize, &'a EmployeeRecord)>,
    spec: &SortSpec,
    snapshot: &ThresholdSnapshot,
    memo: &mut TierMemo,
) -> Vec<usize> {
    let mut keyed: Vec<(SortKey, usize)> = records
        .map(|(position, record)| (sort_key(record, spec.field, snapshot, memo), position))
        .collect();
    keyed.sort_by(|a, b| {
        let order = a.0.cmp(&b.0);
        match spec.direction {
            SortDirection::Asc => order,
            SortDirection::Desc => order.reverse(),
        }
    });
    keyed.into_iter().map(|(_, position)| position).collect()
}

/// Order `rows` (indices into `base`) by `spec`.
pub fn sort_rows(
    base: &[EmployeeRecord],
    rows: &[usize],
    spec: &SortSpec,
    snapshot: &ThresholdSnapshot,
) -> SortedRows {
    sort_rows_with_memo(base, rows, spec, snapshot, &mut TierMemo::new())
}

pub(crate) fn sort_rows_with_memo(
    base: &[EmployeeRecord],
    rows: &[usize],
    spec: &SortSpec,
    snapshot: &ThresholdSnapshot,
    memo: &mut TierMemo,
) -> SortedRows {
    let rows = stable_order(
        rows.iter().filter_map(|&row| base.get(row).map(|record| (row, record))),
        spec,
        snapshot,
        memo,
    );
    SortedRows {
        rows,
        thresholds_version: snapshot.version(),
        calibrating: snapshot.calibrating,
    }
}

/// Sorted copy of `records`. Works with owned records or references.
pub fn sort<R>(records: &[R], spec: &SortSpec, snapshot: &ThresholdSnapshot) -> Vec<R>
where
    R: Borrow<EmployeeRecord> + Clone,
{
    let order = stable_order(
        records
            .iter()
            .enumerate()
            .map(|(position, record)| (position, record.borrow())),
        spec,
        snapshot,
        &mut TierMemo::new(),
    );
    order
        .into_iter()
        .map(|position| records[position].clone())
        .collect()
}
