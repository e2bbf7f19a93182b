//! Developer utility to calibrate a population file and print the derived employee view.

use std::path::PathBuf;
use std::time::Duration;

use churnguard::calibration::ThresholdCalibrationService;
use churnguard::config;
use churnguard::employees::load_population;
use churnguard::filter::{Facet, FilterSelection};
use churnguard::logging;
use churnguard::view::{DerivedView, SortDirection, SortField, SortSpec};

const DEFAULT_LIMIT: usize = 20;
const CALIBRATION_TIMEOUT: Duration = Duration::from_secs(30);

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    let settings = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    if let Err(err) = logging::init(&settings.logging) {
        eprintln!("Logging disabled: {err}");
    }

    let population = load_population(&options.input).map_err(|err| err.to_string())?;
    let mut service = ThresholdCalibrationService::from_settings(&settings.calibration);
    let _errors = service.subscribe_errors(|err| eprintln!("Calibration failed: {err}"));
    service.start(population.clone());
    if !service.wait_until_idle(CALIBRATION_TIMEOUT) {
        return Err(format!(
            "Calibration did not finish within {}s",
            CALIBRATION_TIMEOUT.as_secs()
        ));
    }

    let snapshot = service.snapshot();
    let sort_spec = options
        .sort
        .unwrap_or_else(|| settings.view.sort_spec());
    let view = DerivedView::compute(&population, &snapshot, &options.selection, &sort_spec);

    let thresholds = snapshot.thresholds;
    println!("Input: {}", options.input.display());
    println!("Records: {}", population.len());
    println!(
        "Thresholds v{}: medium >= {:.4}, high >= {:.4}",
        thresholds.version(),
        thresholds.medium_risk(),
        thresholds.high_risk()
    );
    if view.risk_filter_suspended() {
        println!("Risk filter suspended while calibrating");
    }

    println!();
    println!("Facet options:");
    for facet in Facet::EVERY {
        println!(
            "- {} [{}]: {}",
            facet.label(),
            options.selection.display_value(facet),
            view.facet_options().get(facet).join(", ")
        );
    }

    let summary = view.risk_summary();
    println!();
    println!(
        "Matching: {} (high {}, medium {}, low {})",
        summary.total(),
        summary.high,
        summary.medium,
        summary.low
    );

    println!();
    println!(
        "Top {} by {} {}:",
        options.limit.min(view.len()),
        sort_spec.field.label(),
        direction_label(sort_spec.direction)
    );
    for record in view.window(0..options.limit) {
        println!(
            "- {:<8} {:<24} {:<16} {:<16} {:<10} p={:.3} {}",
            record.id,
            record.full_name,
            record.department_label(),
            record.position_label(),
            record.status_label(),
            record.probability(),
            view.tier_of(record)
        );
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    input: PathBuf,
    config_path: Option<PathBuf>,
    selection: FilterSelection,
    sort: Option<SortSpec>,
    limit: usize,
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut input: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut selection = FilterSelection::new();
    let mut sort = None;
    let mut limit = DEFAULT_LIMIT;
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        if matches!(flag, "-h" | "--help") {
            println!("{}", help_text());
            return Ok(None);
        }
        idx += 1;
        let value = args
            .get(idx)
            .ok_or_else(|| format!("{flag} requires a value"))?;
        match flag {
            "--input" => input = Some(PathBuf::from(value)),
            "--config" => config_path = Some(PathBuf::from(value)),
            "--search" => selection.search = value.clone(),
            "--department" => selection.set(Facet::Department, value.as_str()),
            "--position" => selection.set(Facet::Position, value.as_str()),
            "--risk" => selection.set(Facet::RiskLevel, value.as_str()),
            "--status" => selection.set(Facet::Status, value.as_str()),
            "--sort" => sort = Some(parse_sort(value)?),
            "--limit" => {
                limit = value
                    .parse()
                    .map_err(|_| format!("--limit expects a non-negative integer, got {value}"))?;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let Some(input) = input else {
        return Err("--input is required".to_string());
    };
    Ok(Some(CliOptions {
        input,
        config_path,
        selection,
        sort,
        limit,
    }))
}

fn parse_sort(value: &str) -> Result<SortSpec, String> {
    let (field, direction) = match value.split_once(':') {
        Some((field, direction)) => (field, Some(direction)),
        None => (value, None),
    };
    let field = SortField::parse(field).ok_or_else(|| {
        let known: Vec<&str> = SortField::EVERY.iter().map(|f| f.label()).collect();
        format!("Unknown sort field {field:?}; expected one of {}", known.join(", "))
    })?;
    let direction = match direction {
        Some(direction) => SortDirection::parse(direction)
            .ok_or_else(|| format!("Unknown sort direction {direction:?}; expected asc or desc"))?,
        None => SortDirection::default(),
    };
    Ok(SortSpec::new(field, direction))
}

fn direction_label(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ascending",
        SortDirection::Desc => "descending",
    }
}

fn help_text() -> String {
    [
        "churnguard-inspect",
        "",
        "Usage:",
        "  churnguard-inspect --input <records.json> [options]",
        "",
        "Options:",
        "  --config <path>            Settings file (default: app config.toml)",
        "  --search <text>            Case-insensitive name/department/position search",
        "  --department <value>       Department facet (\"All\" clears)",
        "  --position <value>         Position facet",
        "  --risk <High|Medium|Low>   Risk level facet",
        "  --status <value>           Status facet",
        "  --sort <field[:asc|desc]>  Sort order (default from config)",
        "  --limit <n>                Rows to print (default 20)",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn parses_filters_sort_and_limit() {
        let options = parse_args(args(&[
            "--input",
            "people.json",
            "--department",
            "Eng",
            "--risk",
            "All",
            "--sort",
            "churnProbability:desc",
            "--limit",
            "5",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(options.input, PathBuf::from("people.json"));
        assert_eq!(options.selection.value(Facet::Department), Some("Eng"));
        assert_eq!(options.selection.value(Facet::RiskLevel), None);
        assert_eq!(options.sort, Some(SortSpec::desc(SortField::ChurnProbability)));
        assert_eq!(options.limit, 5);
    }

    #[test]
    fn rejects_missing_input_and_bad_values() {
        assert!(parse_args(args(&["--department", "Eng"])).is_err());
        assert!(parse_args(args(&["--input"])).is_err());
        assert!(parse_args(args(&["--input", "a.json", "--sort", "salary"])).is_err());
        assert!(parse_args(args(&["--input", "a.json", "--sort", "id:up"])).is_err());
        assert!(parse_args(args(&["--input", "a.json", "--limit", "-1"])).is_err());
    }

    #[test]
    fn sort_direction_defaults_to_ascending() {
        assert_eq!(parse_sort("tenureYears").unwrap(), SortSpec::asc(SortField::TenureYears));
    }
}
