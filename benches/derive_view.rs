use std::hint::black_box;
use std::sync::atomic::AtomicBool;

use churnguard::calibration::{CalibrationPolicy, calibrate};
use churnguard::employees::{EmployeeRecord, Population};
use churnguard::filter::{Facet, FilterSelection, compute_all_facet_options};
use churnguard::risk::{ThresholdSet, ThresholdSnapshot};
use churnguard::view::{DerivedView, SortField, SortSpec};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};

const EMPLOYEE_COUNT: usize = 20_000;
const DEPARTMENTS: [&str; 6] = ["Eng", "Sales", "Finance", "Support", "Legal", "Ops"];
const POSITIONS: [&str; 4] = ["Engineer", "Manager", "Analyst", "Director"];
const STATUSES: [&str; 3] = ["Active", "On Leave", "Probation"];

fn population() -> Population {
    let mut rng = StdRng::seed_from_u64(42);
    (0..EMPLOYEE_COUNT)
        .map(|i| {
            let mut record = EmployeeRecord::new(i.to_string(), format!("Employee {i:05}"))
                .with_department(DEPARTMENTS[rng.random_range(0..DEPARTMENTS.len())])
                .with_position(POSITIONS[rng.random_range(0..POSITIONS.len())])
                .with_status(STATUSES[rng.random_range(0..STATUSES.len())])
                .with_tenure(rng.random_range(0.0..30.0));
            if rng.random_bool(0.97) {
                record = record.with_probability(rng.random::<f64>());
            }
            record
        })
        .collect::<Vec<_>>()
        .into()
}

fn snapshot() -> ThresholdSnapshot {
    ThresholdSnapshot::settled(ThresholdSet::defaults())
}

fn bench_calibrate(c: &mut Criterion) {
    let population = population();
    let policy = CalibrationPolicy::default();
    let cancel = AtomicBool::new(false);
    c.bench_with_input(
        BenchmarkId::new("calibrate", EMPLOYEE_COUNT),
        &population,
        |b, population| {
            b.iter(|| calibrate(black_box(population), &policy, &cancel));
        },
    );
}

fn bench_facet_options(c: &mut Criterion) {
    let population = population();
    let selection = FilterSelection::new()
        .with(Facet::Department, "Eng")
        .with(Facet::RiskLevel, "High");
    let snapshot = snapshot();
    c.bench_with_input(
        BenchmarkId::new("facet_options", EMPLOYEE_COUNT),
        &population,
        |b, population| {
            b.iter(|| compute_all_facet_options(black_box(population), &selection, &snapshot));
        },
    );
}

fn bench_derive_view(c: &mut Criterion) {
    let population = population();
    let snapshot = snapshot();
    let mut group = c.benchmark_group("derive_view");
    for (name, selection, spec) in [
        (
            "unfiltered_by_name",
            FilterSelection::new(),
            SortSpec::asc(SortField::FullName),
        ),
        (
            "search_by_risk",
            FilterSelection::new().with_search("employee 1"),
            SortSpec::desc(SortField::RiskLevel),
        ),
        (
            "department_by_probability",
            FilterSelection::new().with(Facet::Department, "Sales"),
            SortSpec::desc(SortField::ChurnProbability),
        ),
    ] {
        group.bench_with_input(BenchmarkId::new(name, EMPLOYEE_COUNT), &population, |b, population| {
            b.iter(|| DerivedView::compute(black_box(population), &snapshot, &selection, &spec));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_calibrate, bench_facet_options, bench_derive_view);
criterion_main!(benches);
