//! Cascading filter engine.
//!
//! A [`FilterSelection`] is turned into a conjunction of independent
//! [`RowPredicate`]s. The filtered rows are the records matching every
//! predicate; the options offered for a facet are the values found among the
//! records matching every predicate *except* that facet's own. Both are pure
//! functions of their inputs.

use crate::employees::EmployeeRecord;
use crate::risk::ThresholdSnapshot;

mod facets;
mod predicates;

pub use facets::{FacetOptions, compute_all_facet_options, compute_facet_options, facet_value};
pub use predicates::{RowPredicate, predicates, risk_filter_suspended};

/// Sentinel option meaning "no constraint on this facet".
pub const ALL: &str = "All";

/// One filterable dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Facet {
    Department,
    Position,
    RiskLevel,
    Status,
}

impl Facet {
    pub const EVERY: [Facet; 4] = [
        Facet::Department,
        Facet::Position,
        Facet::RiskLevel,
        Facet::Status,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Position => "position",
            Self::RiskLevel => "riskLevel",
            Self::Status => "status",
        }
    }
}

/// Active search text and facet choices. `None` on a facet means [`ALL`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FilterSelection {
    pub search: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub risk_level: Option<String>,
    pub status: Option<String>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Builder form of [`FilterSelection::set`].
    pub fn with(mut self, facet: Facet, value: impl Into<String>) -> Self {
        self.set(facet, value);
        self
    }

    /// Choose a value for `facet`; the literal `"All"` clears the facet.
    pub fn set(&mut self, facet: Facet, value: impl Into<String>) {
        let value = value.into();
        *self.slot_mut(facet) = if value == ALL { None } else { Some(value) };
    }

    pub fn clear(&mut self, facet: Facet) {
        *self.slot_mut(facet) = None;
    }

    /// Chosen value for `facet`, `None` when the facet is "All".
    pub fn value(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::Department => self.department.as_deref(),
            Facet::Position => self.position.as_deref(),
            Facet::RiskLevel => self.risk_level.as_deref(),
            Facet::Status => self.status.as_deref(),
        }
    }

    /// Chosen value as shown in a dropdown (`"All"` when unset).
    pub fn display_value(&self, facet: Facet) -> &str {
        self.value(facet).unwrap_or(ALL)
    }

    fn slot_mut(&mut self, facet: Facet) -> &mut Option<String> {
        match facet {
            Facet::Department => &mut self.department,
            Facet::Position => &mut self.position,
            Facet::RiskLevel => &mut self.risk_level,
            Facet::Status => &mut self.status,
        }
    }
}

/// Indices into `base` of the records matching every predicate of `selection`, in base order.
pub fn filter_rows(
    base: &[EmployeeRecord],
    selection: &FilterSelection,
    snapshot: &ThresholdSnapshot,
) -> Vec<usize> {
    rows_matching(base, &predicates(selection, snapshot), snapshot)
}

/// Indices into `base` of the records matching every predicate in `predicates`.
pub fn rows_matching(
    base: &[EmployeeRecord],
    predicates: &[RowPredicate],
    snapshot: &ThresholdSnapshot,
) -> Vec<usize> {
    base.iter()
        .enumerate()
        .filter(|(_, record)| {
            predicates
                .iter()
                .all(|predicate| predicate.matches(record, snapshot))
        })
        .map(|(index, _)| index)
        .collect()
}

/// Records of `base` that satisfy `selection`, in base order.
pub fn compute_filtered<'a>(
    base: &'a [EmployeeRecord],
    selection: &FilterSelection,
    snapshot: &ThresholdSnapshot,
) -> Vec<&'a EmployeeRecord> {
    filter_rows(base, selection, snapshot)
        .into_iter()
        .map(|index| &base[index])
        .collect()
}
