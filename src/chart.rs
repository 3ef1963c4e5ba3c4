use crate::{
    config::{Charts, ColorPair},
    metrics::MetricKey,
    period::{self, Timeframe},
    report::ReportSnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: String,
    pub background_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Series>,
}

/// Chart-ready data: every series has one point per label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub chart_id: String,
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    pub data: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub company_id: i64,
    pub company_name: String,
    pub timeframe: Timeframe,
    pub charts: Vec<Chart>,
    pub available_metrics: BTreeSet<String>,
}

pub struct ChartBuilder {
    palette: Vec<ColorPair>,
}

impl ChartBuilder {
    pub fn new(cfg: &Charts) -> Self {
        let palette = if cfg.palette.is_empty() {
            Charts::default().palette
        } else {
            cfg.palette.clone()
        };
        Self { palette }
    }

    /// One series per metric key over the chronologically ordered reports.
    /// Returns `None` for an empty collection.
    pub fn build(
        &self,
        reports: &[ReportSnapshot],
        metric_keys: &[&str],
        kind: ChartKind,
        title: &str,
    ) -> Option<Chart> {
        if reports.is_empty() {
            return None;
        }

        let ordered = period::order_reports(reports);
        let labels: Vec<String> = ordered.iter().map(|r| period::period_label(r)).collect();

        let datasets = metric_keys
            .iter()
            .enumerate()
            .map(|(idx, key)| {
                let color = &self.palette[idx % self.palette.len()];
                Series {
                    label: series_label(key),
                    // Gaps become 0 to keep every series aligned with `labels`.
                    data: ordered.iter().map(|r| r.metric(key).unwrap_or(0.0)).collect(),
                    border_color: color.border.clone(),
                    background_color: color.background.clone(),
                }
            })
            .collect();

        Some(Chart {
            chart_id: format!("chart_{}", metric_keys.join("_")),
            kind,
            title: title.to_string(),
            data: ChartData { labels, datasets },
        })
    }

    /// Revenue, net income and the two combined, plus timeframe and the
    /// chartable metric keys.
    pub fn dashboard(
        &self,
        company_id: i64,
        company_name: &str,
        reports: &[ReportSnapshot],
    ) -> Dashboard {
        let revenue = MetricKey::Revenue.as_str();
        let net_income = MetricKey::NetIncome.as_str();

        let mut charts = Vec::new();
        charts.extend(self.build(reports, &[revenue], ChartKind::Line, "Przychody w czasie"));
        charts.extend(self.build(reports, &[net_income], ChartKind::Bar, "Zysk Netto"));
        if let Some(mut combined) = self.build(
            reports,
            &[revenue, net_income],
            ChartKind::Line,
            "Przychody vs Zysk Netto",
        ) {
            combined.chart_id = "revenue_vs_profit".into();
            charts.push(combined);
        }

        Dashboard {
            company_id,
            company_name: company_name.to_string(),
            timeframe: period::timeframe(reports),
            charts,
            available_metrics: available_metrics(reports),
        }
    }
}

/// Keys with a non-null value in at least one report.
pub fn available_metrics(reports: &[ReportSnapshot]) -> BTreeSet<String> {
    reports
        .iter()
        .filter_map(|r| r.key_metrics.as_ref())
        .flat_map(|m| m.iter())
        .filter(|(_, v)| v.is_some())
        .map(|(k, _)| k.clone())
        .collect()
}

/// Display name for a metric series.
pub fn series_label(key: &str) -> String {
    match MetricKey::parse(key) {
        Some(MetricKey::Revenue) => "Przychody".into(),
        Some(MetricKey::NetIncome) => "Zysk Netto".into(),
        Some(MetricKey::TotalAssets) => "Aktywa Razem".into(),
        _ => title_case(&key.replace('_', " ")),
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}
