use anyhow::{Result, bail};
use report_sift::{
    merge::{company_info, merge_metrics, merge_with, resolve_identity},
    metrics::MetricMap,
    report::ReportType,
    semantic::{CompanyInfo, Disabled, SemanticExtractor, parse_metrics, strip_code_fence},
};

fn map(entries: &[(&str, Option<f64>)]) -> MetricMap {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

struct Canned {
    info: &'static str,
    metrics: &'static str,
}

impl SemanticExtractor for Canned {
    fn company_info(&self, _sample: &str) -> Result<String> {
        Ok(self.info.to_string())
    }

    fn financial_metrics(&self, _text: &str) -> Result<String> {
        Ok(self.metrics.to_string())
    }
}

struct Broken;

impl SemanticExtractor for Broken {
    fn company_info(&self, _sample: &str) -> Result<String> {
        bail!("quota exceeded")
    }

    fn financial_metrics(&self, _text: &str) -> Result<String> {
        bail!("quota exceeded")
    }
}

#[test]
fn null_external_keeps_regex_value() {
    let regex = map(&[("revenue", Some(100.0))]);
    let external = map(&[("revenue", None), ("net_income", Some(50.0))]);
    let merged = merge_metrics(&regex, &external);
    assert_eq!(merged, map(&[("revenue", Some(100.0)), ("net_income", Some(50.0))]));
}

#[test]
fn external_value_overrides_regex() {
    let regex = map(&[("revenue", Some(100.0)), ("equity", Some(7.0))]);
    let external = map(&[("revenue", Some(120.0))]);
    let merged = merge_metrics(&regex, &external);
    assert_eq!(merged, map(&[("revenue", Some(120.0)), ("equity", Some(7.0))]));
}

#[test]
fn null_for_missing_key_adds_nothing() {
    let merged = merge_metrics(&MetricMap::new(), &map(&[("equity", None)]));
    assert!(merged.is_empty());
}

#[test]
fn fenced_reply_is_merged() {
    let collab = Canned {
        info: "{}",
        metrics: "```json\n{\"revenue\": 200, \"equity\": null}\n```",
    };
    let regex = map(&[("revenue", Some(100.0)), ("equity", Some(9.0))]);
    let merged = merge_with(&collab, &regex, "text");
    assert_eq!(merged, map(&[("revenue", Some(200.0)), ("equity", Some(9.0))]));
}

#[test]
fn collaborator_failure_keeps_regex_metrics() {
    let regex = map(&[("revenue", Some(100.0))]);
    assert_eq!(merge_with(&Broken, &regex, "text"), regex);
    assert_eq!(merge_with(&Disabled, &regex, "text"), regex);
}

#[test]
fn shape_violation_keeps_regex_metrics() {
    let regex = map(&[("revenue", Some(100.0))]);
    for reply in ["{\"revenue\": \"200\"}", "[1, 2]", "not json at all"] {
        let collab = Canned {
            info: "{}",
            metrics: reply,
        };
        assert_eq!(merge_with(&collab, &regex, "text"), regex, "reply: {reply}");
    }
}

#[test]
fn strip_fences() {
    assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
    assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
}

#[test]
fn parse_metrics_accepts_numbers_and_nulls() {
    let parsed = parse_metrics("{\"revenue\": 1.5e9, \"net_income\": null}").expect("valid");
    assert_eq!(parsed, map(&[("revenue", Some(1.5e9)), ("net_income", None)]));
}

#[test]
fn company_info_parsed_from_reply() {
    let collab = Canned {
        info: "```json\n{\"name\": \"Orlen S.A.\", \"ticker\": \"PKN\", \"report_year\": 2024, \"report_quarter\": 3, \"report_period\": \"Q3 2024\"}\n```",
        metrics: "{}",
    };
    let info = company_info(&collab, "sample").expect("info");
    assert_eq!(info.name.as_deref(), Some("Orlen S.A."));
    assert_eq!(info.ticker.as_deref(), Some("PKN"));
    assert_eq!(info.report_quarter, Some(3));
    assert!(company_info(&Broken, "sample").is_none());
}

#[test]
fn identity_from_collaborator_quarter() {
    let info = CompanyInfo {
        report_period: Some("Q3 2024".into()),
        report_year: Some(2024),
        report_quarter: Some(3),
        ..Default::default()
    };
    let id = resolve_identity(Some("za 2024 rok"), Some(&info), ReportType::Annual);
    assert_eq!(id.report_period.as_deref(), Some("Q3 2024"));
    assert_eq!(id.report_year, Some(2024));
    assert_eq!(id.report_quarter, Some(3));
    assert_eq!(id.report_type, ReportType::Quarterly);
}

#[test]
fn identity_year_only_is_annual() {
    let info = CompanyInfo {
        report_year: Some(2023),
        ..Default::default()
    };
    let id = resolve_identity(Some("za 2023 rok"), Some(&info), ReportType::Quarterly);
    assert_eq!(id.report_period.as_deref(), Some("za 2023 rok"));
    assert_eq!(id.report_type, ReportType::Annual);
}

#[test]
fn identity_without_collaborator_uses_default() {
    let id = resolve_identity(Some("Q1 2022"), None, ReportType::Quarterly);
    assert_eq!(id.report_period.as_deref(), Some("Q1 2022"));
    assert_eq!(id.report_year, None);
    assert_eq!(id.report_type, ReportType::Quarterly);
}

#[test]
fn command_extractor_needs_a_command() {
    let cfg = report_sift::config::Config::default();
    assert!(report_sift::semantic::CommandExtractor::new(&cfg).is_err());
}

#[cfg(unix)]
#[test]
fn command_extractor_streams_large_prompt_through_echoing_command() {
    use report_sift::{config::Config, semantic::CommandExtractor};

    let mut cfg = Config::default();
    cfg.semantic.enabled = true;
    cfg.semantic.command = vec!["cat".into()];
    cfg.semantic.timeout_seconds = 30;
    let collab = CommandExtractor::new(&cfg).unwrap();

    // Well past a pipe buffer in both directions.
    let sample = "x".repeat(512 * 1024);
    let reply = collab.company_info(&sample).unwrap();
    assert!(reply.contains(&sample));
    assert!(reply.starts_with("Przeanalizuj"));
}
