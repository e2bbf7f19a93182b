use std::collections::BTreeSet;

use super::{ALL, Facet, FilterSelection, RowPredicate, predicates};
use crate::employees::EmployeeRecord;
use crate::risk::ThresholdSnapshot;

/// Legal options for every facet, each starting with [`ALL`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FacetOptions {
    pub department: Vec<String>,
    pub position: Vec<String>,
    pub risk_level: Vec<String>,
    pub status: Vec<String>,
}

impl FacetOptions {
    pub fn get(&self, facet: Facet) -> &[String] {
        match facet {
            Facet::Department => &self.department,
            Facet::Position => &self.position,
            Facet::RiskLevel => &self.risk_level,
            Facet::Status => &self.status,
        }
    }
}

impl Default for FacetOptions {
    fn default() -> Self {
        let all = vec![ALL.to_string()];
        Self {
            department: all.clone(),
            position: all.clone(),
            risk_level: all.clone(),
            status: all,
        }
    }
}

/// Value of `facet` for `record` after default substitution.
pub fn facet_value<'a>(
    record: &'a EmployeeRecord,
    facet: Facet,
    snapshot: &ThresholdSnapshot,
) -> &'a str {
    match facet {
        Facet::Department => record.department_label(),
        Facet::Position => record.position_label(),
        Facet::RiskLevel => snapshot.tier_of(record).label(),
        Facet::Status => record.status_label(),
    }
}

/// `["All", ...]` followed by the sorted distinct values of `facet` among the
/// records that satisfy every other part of `selection`.
///
/// While calibrating, the risk-level facet only offers `"All"`.
pub fn compute_facet_options(
    base: &[EmployeeRecord],
    selection: &FilterSelection,
    facet: Facet,
    snapshot: &ThresholdSnapshot,
) -> Vec<String> {
    if facet == Facet::RiskLevel && snapshot.calibrating {
        return vec![ALL.to_string()];
    }
    let others: Vec<RowPredicate> = predicates(selection, snapshot)
        .into_iter()
        .filter(|predicate| predicate.facet() != Some(facet))
        .collect();
    let values: BTreeSet<&str> = base
        .iter()
        .filter(|record| {
            others
                .iter()
                .all(|predicate| predicate.matches(record, snapshot))
        })
        .map(|record| facet_value(record, facet, snapshot))
        .collect();
    std::iter::once(ALL)
        .chain(values)
        .map(str::to_string)
        .collect()
}

/// Options for all four facets at once.
pub fn compute_all_facet_options(
    base: &[EmployeeRecord],
    selection: &FilterSelection,
    snapshot: &ThresholdSnapshot,
) -> FacetOptions {
    let options = |facet| compute_facet_options(base, selection, facet, snapshot);
    FacetOptions {
        department: options(Facet::Department),
        position: options(Facet::Position),
        risk_level: options(Facet::RiskLevel),
        status: options(Facet::Status),
    }
}
