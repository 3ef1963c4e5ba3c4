use crate::metrics::{FieldOutcome, MetricMap};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Quarterly,
    Annual,
}

impl ReportType {
    pub fn parse(raw: &str) -> Option<ReportType> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "quarterly" => Some(ReportType::Quarterly),
            "annual" => Some(ReportType::Annual),
            _ => None,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportType::Quarterly => "quarterly",
            ReportType::Annual => "annual",
        })
    }
}

/// A stored report as handed over by the persistence layer. Read-only here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub id: i64,
    pub company_id: i64,
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub report_period: Option<String>,
    #[serde(default)]
    pub report_year: Option<i32>,
    #[serde(default)]
    pub report_quarter: Option<u8>,
    /// Stored free-form; anything other than quarterly/annual loads as `None`.
    #[serde(default, deserialize_with = "lenient_report_type")]
    pub report_type: Option<ReportType>,
    #[serde(default)]
    pub key_metrics: Option<MetricMap>,
}

fn lenient_report_type<'de, D>(de: D) -> Result<Option<ReportType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    Ok(raw.as_deref().and_then(ReportType::parse))
}

impl ReportSnapshot {
    /// Quarter in 1..=4; anything else counts as absent.
    pub fn quarter(&self) -> Option<u8> {
        self.report_quarter.filter(|q| (1..=4).contains(q))
    }

    pub fn is_annual(&self) -> bool {
        self.report_type == Some(ReportType::Annual)
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.key_metrics.as_ref()?.get(key).copied().flatten()
    }
}

/// Everything pulled out of one document; handed straight back to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    pub company_name: Option<String>,
    pub report_period: Option<String>,
    pub metrics: MetricMap,
    pub metric_outcomes: BTreeMap<String, FieldOutcome>,
    pub tables_count: usize,
    pub decoder: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}
