use crate::report::ReportSnapshot;
use serde::{Deserialize, Serialize};

/// `(year, quarter)` used for chronological ordering.
///
/// Missing year sorts as 0. A missing quarter is 4 for annual reports, so a
/// full year lands after its own quarters, and 0 otherwise.
pub fn sort_key(report: &ReportSnapshot) -> (i32, u8) {
    let year = report.report_year.unwrap_or(0);
    let quarter = match report.quarter() {
        Some(q) => q,
        None if report.is_annual() => 4,
        None => 0,
    };
    (year, quarter)
}

/// Stable chronological order; equal keys keep their input order.
pub fn order_reports(reports: &[ReportSnapshot]) -> Vec<&ReportSnapshot> {
    let mut ordered: Vec<&ReportSnapshot> = reports.iter().collect();
    ordered.sort_by_key(|r| sort_key(r));
    ordered
}

/// "Q3 2024" for quarterly data, "2024" otherwise.
pub fn period_label(report: &ReportSnapshot) -> String {
    let year = report
        .report_year
        .map_or_else(|| "N/A".to_string(), |y| y.to_string());
    match report.quarter() {
        Some(q) => format!("Q{q} {year}"),
        None => year,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    pub from: String,
    pub to: String,
}

/// Labels of the earliest and latest report, or "-" for an empty set.
pub fn timeframe(reports: &[ReportSnapshot]) -> Timeframe {
    let ordered = order_reports(reports);
    match (ordered.first(), ordered.last()) {
        (Some(first), Some(last)) => Timeframe {
            from: period_label(first),
            to: period_label(last),
        },
        _ => Timeframe {
            from: "-".into(),
            to: "-".into(),
        },
    }
}
