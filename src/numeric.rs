//! Locale-tolerant number parsing for figures lifted out of report text.

use serde::{Deserialize, Serialize};

/// Scale word that may follow a figure ("1 500 tys PLN").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Tys,
    Mln,
    Mld,
}

impl Unit {
    pub fn multiplier(self) -> f64 {
        match self {
            Unit::Tys => 1_000.0,
            Unit::Mln => 1_000_000.0,
            Unit::Mld => 1_000_000_000.0,
        }
    }

    pub fn from_token(token: &str) -> Option<Unit> {
        match token.to_lowercase().as_str() {
            "tys" => Some(Unit::Tys),
            "mln" => Some(Unit::Mln),
            "mld" => Some(Unit::Mld),
            _ => None,
        }
    }
}

/// Rewrites `raw` into a form `f64::from_str` understands.
///
/// Whitespace is always dropped. With only commas present the comma is the
/// decimal point. With both commas and dots, whichever shows up first is the
/// thousands separator and the other one is the decimal point.
pub fn normalize(raw: &str) -> String {
    let clean: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    match (clean.find(','), clean.find('.')) {
        (Some(_), None) => clean.replace(',', "."),
        (Some(comma), Some(dot)) if comma < dot => clean.replace(',', ""),
        (Some(_), Some(_)) => clean.replace('.', "").replace(',', "."),
        _ => clean,
    }
}

/// Parses a raw figure and applies the unit scale, if any.
pub fn parse_amount(raw: &str, unit: Option<Unit>) -> Option<f64> {
    let value: f64 = normalize(raw).parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(match unit {
        Some(u) => value * u.multiplier(),
        None => value,
    })
}
