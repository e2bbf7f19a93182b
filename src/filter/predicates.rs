use super::{Facet, FilterSelection, facet_value};
use crate::employees::EmployeeRecord;
use crate::risk::{RiskTier, ThresholdSnapshot};

/// One independent row test. A selection is the conjunction of its predicates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowPredicate {
    /// Lower-cased, trimmed needle matched against name, department and position.
    Search(String),
    /// Exact match on a facet's substituted label. Risk labels match case-insensitively.
    Facet { facet: Facet, value: String },
}

impl RowPredicate {
    pub fn matches(&self, record: &EmployeeRecord, snapshot: &ThresholdSnapshot) -> bool {
        match self {
            Self::Search(needle) => [
                record.full_name.as_str(),
                record.department_label(),
                record.position_label(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(needle.as_str())),
            Self::Facet {
                facet: Facet::RiskLevel,
                value,
            } => RiskTier::from_label(value) == Some(snapshot.tier_of(record)),
            Self::Facet { facet, value } => facet_value(record, *facet, snapshot) == value.as_str(),
        }
    }

    /// Facet this predicate constrains; `None` for search.
    pub fn facet(&self) -> Option<Facet> {
        match self {
            Self::Search(_) => None,
            Self::Facet { facet, .. } => Some(*facet),
        }
    }
}

/// Active predicates for `selection`.
///
/// Blank search text and "All" facets produce no predicate. The risk-level
/// facet produces none while thresholds are being recalibrated.
pub fn predicates(selection: &FilterSelection, snapshot: &ThresholdSnapshot) -> Vec<RowPredicate> {
    let mut active = Vec::with_capacity(Facet::EVERY.len() + 1);
    let needle = selection.search.trim().to_lowercase();
    if !needle.is_empty() {
        active.push(RowPredicate::Search(needle));
    }
    for facet in Facet::EVERY {
        let Some(value) = selection.value(facet) else {
            continue;
        };
        if facet == Facet::RiskLevel && snapshot.calibrating {
            continue;
        }
        active.push(RowPredicate::Facet {
            facet,
            value: value.to_string(),
        });
    }
    active
}

/// True when a risk-level choice is being ignored because thresholds are in flux.
pub fn risk_filter_suspended(selection: &FilterSelection, snapshot: &ThresholdSnapshot) -> bool {
    snapshot.calibrating && selection.value(Facet::RiskLevel).is_some()
}
