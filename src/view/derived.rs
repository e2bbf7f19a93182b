use std::{ops::Range, sync::Arc};

use crate::employees::{EmployeeRecord, Population};
use crate::filter::{
    FacetOptions, FilterSelection, compute_all_facet_options, filter_rows, risk_filter_suspended,
};
use crate::risk::{RiskTier, ThresholdSnapshot, TierMemo};

use super::sort::{SortSpec, SortedRows, sort_rows_with_memo};

/// Per-tier head counts over the filtered rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RiskSummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub calibrating: usize,
}

impl RiskSummary {
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low + self.calibrating
    }

    pub fn count(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::High => self.high,
            RiskTier::Medium => self.medium,
            RiskTier::Low => self.low,
            RiskTier::Calibrating => self.calibrating,
        }
    }

    fn add(&mut self, tier: RiskTier) {
        match tier {
            RiskTier::High => self.high += 1,
            RiskTier::Medium => self.medium += 1,
            RiskTier::Low => self.low += 1,
            RiskTier::Calibrating => self.calibrating += 1,
        }
    }
}

/// Everything a list view renders, computed in one pass from explicit inputs.
///
/// Row lists hold indices into the population the view was built from. The
/// view is never patched; a change to any input produces a new one.
#[derive(Clone, Debug)]
pub struct DerivedView {
    population: Population,
    snapshot: ThresholdSnapshot,
    selection: FilterSelection,
    sort_spec: SortSpec,
    filtered: Vec<usize>,
    sorted: SortedRows,
    facet_options: FacetOptions,
    risk_summary: RiskSummary,
    risk_filter_suspended: bool,
}

impl DerivedView {
    pub fn compute(
        population: &Population,
        snapshot: &ThresholdSnapshot,
        selection: &FilterSelection,
        sort_spec: &SortSpec,
    ) -> Self {
        Self::compute_with_memo(population, snapshot, selection, sort_spec, &mut TierMemo::new())
    }

    fn compute_with_memo(
        population: &Population,
        snapshot: &ThresholdSnapshot,
        selection: &FilterSelection,
        sort_spec: &SortSpec,
        memo: &mut TierMemo,
    ) -> Self {
        let filtered = filter_rows(population, selection, snapshot);
        let sorted = sort_rows_with_memo(population, &filtered, sort_spec, snapshot, memo);
        let facet_options = compute_all_facet_options(population, selection, snapshot);
        let mut risk_summary = RiskSummary::default();
        for &row in &filtered {
            risk_summary.add(memo.tier_for(population[row].churn_probability, snapshot));
        }
        Self {
            population: Arc::clone(population),
            snapshot: *snapshot,
            selection: selection.clone(),
            sort_spec: *sort_spec,
            filtered,
            sorted,
            facet_options,
            risk_summary,
            risk_filter_suspended: risk_filter_suspended(selection, snapshot),
        }
    }

    /// True when the view was built from exactly these inputs.
    pub fn matches_inputs(
        &self,
        population: &Population,
        snapshot: &ThresholdSnapshot,
        selection: &FilterSelection,
        sort_spec: &SortSpec,
    ) -> bool {
        Arc::ptr_eq(&self.population, population)
            && self.snapshot == *snapshot
            && self.selection == *selection
            && self.sort_spec == *sort_spec
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Filtered row indices in population order.
    pub fn filtered_rows(&self) -> &[usize] {
        &self.filtered
    }

    pub fn filtered(&self) -> impl Iterator<Item = &EmployeeRecord> + '_ {
        self.filtered.iter().map(|&row| &self.population[row])
    }

    pub fn sorted_rows(&self) -> &SortedRows {
        &self.sorted
    }

    pub fn sorted(&self) -> impl Iterator<Item = &EmployeeRecord> + '_ {
        self.sorted.rows.iter().map(|&row| &self.population[row])
    }

    pub fn len(&self) -> usize {
        self.sorted.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.rows.is_empty()
    }

    /// Record at `position` in sorted order.
    pub fn row(&self, position: usize) -> Option<&EmployeeRecord> {
        self.sorted
            .rows
            .get(position)
            .map(|&row| &self.population[row])
    }

    /// Records in sorted order for a visible range; out-of-range bounds are clamped.
    pub fn window(&self, range: Range<usize>) -> impl Iterator<Item = &EmployeeRecord> + '_ {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        self.sorted.rows[start..end]
            .iter()
            .map(|&row| &self.population[row])
    }

    /// Tier shown for `record` in this view (`Calibrating` while thresholds are in flux).
    pub fn tier_of(&self, record: &EmployeeRecord) -> RiskTier {
        self.snapshot.tier_of(record)
    }

    pub fn facet_options(&self) -> &FacetOptions {
        &self.facet_options
    }

    pub fn risk_summary(&self) -> RiskSummary {
        self.risk_summary
    }

    pub fn risk_filter_suspended(&self) -> bool {
        self.risk_filter_suspended
    }

    pub fn thresholds_version(&self) -> u64 {
        self.snapshot.version()
    }

    pub fn calibrating(&self) -> bool {
        self.snapshot.calibrating
    }

    /// False once the published thresholds have moved past the ones this view used.
    pub fn is_current_for(&self, snapshot: &ThresholdSnapshot) -> bool {
        self.snapshot == *snapshot
    }
}

/// Holds the latest [`DerivedView`] and rebuilds it when any input changes.
#[derive(Debug, Default)]
pub struct DerivedViewCache {
    view: Option<DerivedView>,
    memo: TierMemo,
    recomputations: u64,
}

impl DerivedViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// View for these inputs, recomputed from scratch unless the cached one matches them exactly.
    pub fn derive(
        &mut self,
        population: &Population,
        snapshot: &ThresholdSnapshot,
        selection: &FilterSelection,
        sort_spec: &SortSpec,
    ) -> &DerivedView {
        let stale = self
            .view
            .as_ref()
            .is_none_or(|view| !view.matches_inputs(population, snapshot, selection, sort_spec));
        if stale {
            self.view = None;
        }
        self.view.get_or_insert_with(|| {
            self.recomputations += 1;
            tracing::debug!(
                "Recomputing employee view ({} records, thresholds v{}, calibrating {})",
                population.len(),
                snapshot.version(),
                snapshot.calibrating
            );
            DerivedView::compute_with_memo(population, snapshot, selection, sort_spec, &mut self.memo)
        })
    }

    pub fn current(&self) -> Option<&DerivedView> {
        self.view.as_ref()
    }

    /// Drop the cached view, e.g. when the owning list is closed.
    pub fn invalidate(&mut self) {
        self.view = None;
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}
