use crate::{
    config::Config,
    metrics::{MetricExtraction, MetricPatterns},
};
use anyhow::{Context, Result};
use regex::Regex;

const COMPANY_PATTERNS: &[&str] = &[
    r"(?i)(?:Spółka|Firma|Company):\s*([A-ZĄĆĘŁŃÓŚŹŻ\w\s\-\.]+)",
    r"(?i)([A-ZĄĆĘŁŃÓŚŹŻ\w\s]+)\s+S\.?A\.?",
    r"(?i)Raport\s+(?:roczny|kwartalny|okresowy)\s+([A-ZĄĆĘŁŃÓŚŹŻ\w\s]+)",
];

const PERIOD_PATTERNS: &[&str] = &[
    r"(?i)(?:za|okres|period)?\s*(\d{4})\s*(?:rok|year)",
    r"(?i)Q([1-4])\s*(\d{4})",
    r"(\d{1,2})\.(\d{4})",
    r"(?i)(?:styczeń|luty|marzec|kwiecień|maj|czerwiec|lipiec|sierpień|wrzesień|październik|listopad|grudzień)\s+(\d{4})",
];

/// Pulls company name, report period and metrics out of report text.
///
/// All patterns are compiled once here; extraction itself is pure.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    company: Vec<Regex>,
    period: Vec<Regex>,
    metrics: MetricPatterns,
    name_min_chars: usize,
    name_max_chars: usize,
}

impl FieldExtractor {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            company: compile(COMPANY_PATTERNS).with_context(|| "company name patterns")?,
            period: compile(PERIOD_PATTERNS).with_context(|| "report period patterns")?,
            metrics: MetricPatterns::new(&cfg.extraction.extra_metric_patterns)?,
            name_min_chars: cfg.extraction.company_name_min_chars,
            name_max_chars: cfg.extraction.company_name_max_chars,
        })
    }

    /// First pattern yielding a plausibly sized name wins; a rejected
    /// candidate falls through to the next pattern.
    pub fn company_name(&self, text: &str) -> Option<String> {
        self.company.iter().find_map(|re| {
            let candidate = re.captures(text)?.get(1)?.as_str().trim();
            let len = candidate.chars().count();
            (len > self.name_min_chars && len < self.name_max_chars)
                .then(|| candidate.to_string())
        })
    }

    /// Earliest mention in the text wins, whichever pattern found it.
    /// Ties go to the pattern listed first.
    pub fn report_period(&self, text: &str) -> Option<String> {
        let mut best: Option<regex::Match<'_>> = None;
        for re in &self.period {
            if let Some(m) = re.find(text) {
                if best.is_none_or(|b| m.start() < b.start()) {
                    best = Some(m);
                }
            }
        }
        best.map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn metrics(&self, text: &str) -> MetricExtraction {
        self.metrics.extract(text)
    }
}

fn compile(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("compiling {p}")))
        .collect()
}
