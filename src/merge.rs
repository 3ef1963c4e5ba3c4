use crate::{
    metrics::MetricMap,
    report::ReportType,
    semantic::{self, CompanyInfo, SemanticExtractor},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Non-null external values override; everything else keeps the regex value.
pub fn merge_metrics(regex: &MetricMap, external: &MetricMap) -> MetricMap {
    let mut merged = regex.clone();
    for (key, value) in external {
        if value.is_some() {
            merged.insert(key.clone(), *value);
        }
    }
    merged
}

/// Asks the collaborator for metrics and merges them over `regex`.
/// Any failure leaves `regex` as the result.
pub fn merge_with(collab: &dyn SemanticExtractor, regex: &MetricMap, text: &str) -> MetricMap {
    let external = collab
        .financial_metrics(text)
        .and_then(|reply| semantic::parse_metrics(&reply));
    match external {
        Ok(external) => {
            info!("semantic metrics: {} keys", external.len());
            merge_metrics(regex, &external)
        }
        Err(err) => {
            warn!("semantic metric extraction failed; keeping regex metrics: {err:#}");
            regex.clone()
        }
    }
}

/// Company info from the collaborator, or `None` on any failure.
pub fn company_info(collab: &dyn SemanticExtractor, sample: &str) -> Option<CompanyInfo> {
    match collab
        .company_info(sample)
        .and_then(|reply| semantic::parse_company_info(&reply))
    {
        Ok(info) => Some(info),
        Err(err) => {
            warn!("semantic company info failed: {err:#}");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportIdentity {
    pub report_period: Option<String>,
    pub report_year: Option<i32>,
    pub report_quarter: Option<u8>,
    pub report_type: ReportType,
}

/// Settles which period a report covers.
///
/// The collaborator's period string beats the regex one; year and quarter
/// only come from the collaborator. A known quarter makes the report
/// quarterly, a bare year makes it annual.
pub fn resolve_identity(
    regex_period: Option<&str>,
    info: Option<&CompanyInfo>,
    default_type: ReportType,
) -> ReportIdentity {
    let ai_period = info
        .and_then(|i| i.report_period.as_deref())
        .filter(|p| !p.trim().is_empty());
    let report_year = info.and_then(|i| i.report_year);
    let report_quarter = info
        .and_then(|i| i.report_quarter)
        .filter(|q| (1..=4).contains(q));

    let report_type = match (report_year, report_quarter) {
        (_, Some(_)) => ReportType::Quarterly,
        (Some(_), None) => ReportType::Annual,
        (None, None) => default_type,
    };

    ReportIdentity {
        report_period: ai_period.or(regex_period).map(str::to_string),
        report_year,
        report_quarter,
        report_type,
    }
}
