use crate::numeric::{self, Unit};
use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Metric name to value. Keys are free-form strings so stored snapshots and
/// collaborator replies can carry keys outside [`MetricKey`].
pub type MetricMap = BTreeMap<String, Option<f64>>;

/// The financial fields this crate knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    Revenue,
    NetIncome,
    TotalAssets,
    TotalLiabilities,
    Equity,
    OperatingIncome,
}

impl MetricKey {
    pub const ALL: [MetricKey; 6] = [
        MetricKey::Revenue,
        MetricKey::NetIncome,
        MetricKey::TotalAssets,
        MetricKey::TotalLiabilities,
        MetricKey::Equity,
        MetricKey::OperatingIncome,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::Revenue => "revenue",
            MetricKey::NetIncome => "net_income",
            MetricKey::TotalAssets => "total_assets",
            MetricKey::TotalLiabilities => "total_liabilities",
            MetricKey::Equity => "equity",
            MetricKey::OperatingIncome => "operating_income",
        }
    }

    pub fn parse(key: &str) -> Option<MetricKey> {
        MetricKey::ALL.into_iter().find(|k| k.as_str() == key)
    }

    /// Built-in label-anchored patterns, most specific first. Group 1 is the figure.
    fn builtin_patterns(self) -> &'static [&'static str] {
        match self {
            MetricKey::Revenue => &[
                r"(?i)(?:przychody|revenues?)[\s:]+(?:ze\s+sprzedaży\s+)?[\s\w]*?[\s:]+([\d\s\.,]+)\s*(?:mln|mld|tys)?\s*(?:PLN|zł)",
                r"(?i)(?:sprzedaż|sales)[\s:]+[\s\w]*?[\s:]+([\d\s\.,]+)\s*(?:mln|mld|tys)?",
            ],
            MetricKey::NetIncome => &[
                r"(?i)(?:zysk|wynik)\s+(?:netto|net)[\s:]+[\s\w]*?[\s:]+([\d\s\.,\-]+)\s*(?:mln|mld|tys)?",
                r"(?i)(?:profit|net\s+income)[\s:]+[\s\w]*?[\s:]+([\d\s\.,\-]+)\s*(?:mln|mld|tys)?",
            ],
            MetricKey::TotalAssets => &[
                r"(?i)(?:aktywa|assets)\s+(?:razem|total)[\s:]+[\s\w]*?[\s:]+([\d\s\.,]+)\s*(?:mln|mld|tys)?",
                r"(?i)(?:suma|total)\s+aktywów[\s:]+[\s\w]*?[\s:]+([\d\s\.,]+)\s*(?:mln|mld|tys)?",
            ],
            MetricKey::TotalLiabilities => &[
                r"(?i)(?:zobowiązania|liabilities)\s+(?:razem|total|ogółem)[\s:]+[\s\w]*?[\s:]+([\d\s\.,]+)\s*(?:mln|mld|tys)?",
                r"(?i)(?:suma|total)\s+(?:zobowiązań|liabilities)[\s:]+[\s\w]*?[\s:]+([\d\s\.,]+)\s*(?:mln|mld|tys)?",
            ],
            MetricKey::Equity => &[
                r"(?i)kapitał\s+własny[\s:]+[\s\w]*?[\s:]+([\d\s\.,\-]+)\s*(?:mln|mld|tys)?",
                r"(?i)(?:total|shareholders'?)\s+equity[\s:]+[\s\w]*?[\s:]+([\d\s\.,\-]+)\s*(?:mln|mld|tys)?",
            ],
            // Only reachable through configured extra patterns or a collaborator reply.
            MetricKey::OperatingIncome => &[],
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one metric during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldOutcome {
    Present { value: f64 },
    /// No pattern matched.
    Absent,
    /// A pattern matched but the figure would not parse.
    Malformed { raw: String },
}

impl FieldOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            FieldOutcome::Present { value } => Some(*value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricExtraction {
    /// Resolved metrics only; absent and malformed fields are left out.
    pub values: MetricMap,
    pub outcomes: BTreeMap<String, FieldOutcome>,
}

static UNIT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(mln|mld|tys)").expect("unit token pattern is valid")
});

/// Compiled per-metric pattern lists.
#[derive(Debug, Clone)]
pub struct MetricPatterns {
    groups: Vec<(String, Vec<Regex>)>,
}

impl MetricPatterns {
    /// Built-in patterns with `extra` appended per key. Keys in `extra` that
    /// are outside the vocabulary get their own group after the built-ins.
    pub fn new(extra: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut groups: Vec<(String, Vec<Regex>)> = Vec::new();

        for key in MetricKey::ALL {
            let mut regs = key
                .builtin_patterns()
                .iter()
                .map(|p| Regex::new(p).with_context(|| format!("built-in pattern for {key}")))
                .collect::<Result<Vec<_>>>()?;
            if let Some(more) = extra.get(key.as_str()) {
                regs.extend(compile_extra(key.as_str(), more)?);
            }
            groups.push((key.as_str().to_string(), regs));
        }

        for (key, patterns) in extra {
            if MetricKey::parse(key).is_none() {
                warn!("extra metric patterns for unknown key {key}; extracting it anyway");
                groups.push((key.clone(), compile_extra(key, patterns)?));
            }
        }

        Ok(Self { groups })
    }

    /// Runs every metric group over `text`. First matching pattern wins per
    /// metric; a figure that fails to parse leaves that metric unresolved.
    pub fn extract(&self, text: &str) -> MetricExtraction {
        let mut out = MetricExtraction::default();

        for (key, regs) in &self.groups {
            let outcome = extract_one(regs, text);
            match &outcome {
                FieldOutcome::Present { value } => {
                    debug!("metric {key}={value}");
                    out.values.insert(key.clone(), Some(*value));
                }
                FieldOutcome::Malformed { raw } => {
                    warn!("metric {key} matched but {raw:?} is not a number");
                }
                FieldOutcome::Absent => {}
            }
            out.outcomes.insert(key.clone(), outcome);
        }

        out
    }
}

fn compile_extra(key: &str, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            let re = Regex::new(p).with_context(|| format!("extra pattern for {key}: {p}"))?;
            if re.captures_len() < 2 {
                return Err(anyhow!("extra pattern for {key} has no capture group: {p}"));
            }
            Ok(re)
        })
        .collect()
}

fn extract_one(regs: &[Regex], text: &str) -> FieldOutcome {
    let Some(caps) = regs.iter().find_map(|re| re.captures(text)) else {
        return FieldOutcome::Absent;
    };

    let whole = caps.get(0).map_or("", |m| m.as_str());
    let raw = caps.get(1).map_or("", |m| m.as_str()).trim();
    let unit = UNIT_TOKEN
        .find(whole)
        .and_then(|m| Unit::from_token(m.as_str()));

    match numeric::parse_amount(raw, unit) {
        Some(value) => FieldOutcome::Present { value },
        None => FieldOutcome::Malformed {
            raw: raw.to_string(),
        },
    }
}
