use churnguard::employees::{EmployeeRecord, Population};

/// The three-employee dashboard used throughout the scenario tests.
pub fn three_employees() -> Population {
    vec![
        EmployeeRecord::new("1", "Ada")
            .with_department("Eng")
            .with_probability(0.8),
        EmployeeRecord::new("2", "Grace")
            .with_department("Eng")
            .with_probability(0.2),
        EmployeeRecord::new("3", "Alan")
            .with_department("Sales")
            .with_probability(0.5),
    ]
    .into()
}

/// Ten employees with probabilities 0.0, 0.1, ... 0.9 spread over two departments.
pub fn spread_population() -> Population {
    (0..10)
        .map(|idx| {
            let department = if idx % 2 == 0 { "Eng" } else { "Sales" };
            EmployeeRecord::new(format!("e{idx}"), format!("Employee {idx}"))
                .with_department(department)
                .with_position(if idx < 5 { "Engineer" } else { "Manager" })
                .with_probability(idx as f64 / 10.0)
        })
        .collect::<Vec<_>>()
        .into()
}

/// Backend export with numeric ids, missing fields and a null probability.
pub const EXPORT_JSON: &str = r#"[
    {"id": 101, "fullName": "Ada Lovelace", "department": "Eng", "position": "Engineer",
     "status": "Active", "churnProbability": 0.82, "tenureYears": 4.5},
    {"id": "b-7", "fullName": "Grace Hopper", "department": "Eng", "churnProbability": 0.12},
    {"id": 103, "fullName": "Alan Turing", "department": "", "status": "On Leave",
     "churnProbability": null},
    {"id": 104, "fullName": "Katherine Johnson", "department": "Sales",
     "position": "Analyst", "churnProbability": 0.55, "tenureYears": 9}
]"#;
