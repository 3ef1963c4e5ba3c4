use anyhow::{Result, anyhow, bail};
use report_sift::{
    acquire::{acquire_text, count_tables, validate_input},
    config::Config,
    engine::{DocDiag, Engine, TablesOut, TextOut},
    pipeline::Pipeline,
    report::ReportType,
    semantic::{Disabled, SemanticExtractor},
};
use std::cell::RefCell;
use std::path::Path;

#[derive(Clone)]
enum Behavior {
    Pages(Vec<&'static str>),
    NotOk,
    Fault,
}

struct FakeEngine {
    pypdf: Behavior,
    pdfplumber: Behavior,
    tables: Option<usize>,
    calls: RefCell<Vec<String>>,
}

impl FakeEngine {
    fn new(pypdf: Behavior, pdfplumber: Behavior) -> Self {
        Self {
            pypdf,
            pdfplumber,
            tables: Some(2),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl Engine for FakeEngine {
    fn doctor(&self) -> Result<DocDiag> {
        bail!("not used")
    }

    fn extract_text(&self, _input: &Path, backend: &str) -> Result<TextOut> {
        self.calls.borrow_mut().push(backend.to_string());
        let behavior = match backend {
            "pypdf" => &self.pypdf,
            "pdfplumber" => &self.pdfplumber,
            other => return Err(anyhow!("unknown backend {other}")),
        };
        match behavior {
            Behavior::Pages(pages) => Ok(TextOut {
                ok: true,
                pages: pages.iter().map(|p| p.to_string()).collect(),
                error: None,
            }),
            Behavior::NotOk => Ok(TextOut {
                ok: false,
                pages: vec![],
                error: Some(format!("{backend}: stream is corrupt")),
            }),
            Behavior::Fault => Err(anyhow!("{backend} crashed")),
        }
    }

    fn extract_tables(&self, _input: &Path) -> Result<TablesOut> {
        match self.tables {
            Some(n) => Ok(TablesOut {
                ok: true,
                tables_count: n,
                error: None,
            }),
            None => Err(anyhow!("tables crashed")),
        }
    }
}

struct Replies;

impl SemanticExtractor for Replies {
    fn company_info(&self, _sample: &str) -> Result<String> {
        Ok(r#"{"name": "Orlen", "report_period": "Q2 2024", "report_year": 2024, "report_quarter": 2}"#.into())
    }

    fn financial_metrics(&self, _text: &str) -> Result<String> {
        Ok(r#"{"revenue": null, "net_income": 50}"#.into())
    }
}

const REPORT: &str = "Raport kwartalny Q2 2024\nSpółka: Orlen Polska, Płock\nPrzychody ze sprzedaży: 1\u{a0}500\u{a0}000 tys PLN";

#[test]
fn primary_decoder_used_when_it_works() {
    let engine = FakeEngine::new(Behavior::Pages(vec!["a", "b"]), Behavior::Fault);
    let acq = acquire_text(&Config::default(), &engine, Path::new("r.pdf"));
    assert_eq!(acq.text, "a\nb\n");
    assert_eq!(acq.decoder.as_deref(), Some("pypdf"));
    assert!(!acq.used_fallback);
    assert_eq!(*engine.calls.borrow(), vec!["pypdf"]);
}

#[test]
fn fallback_after_primary_fault() {
    let engine = FakeEngine::new(Behavior::Fault, Behavior::Pages(vec!["page one"]));
    let acq = acquire_text(&Config::default(), &engine, Path::new("r.pdf"));
    assert_eq!(acq.text, "page one\n");
    assert_eq!(acq.decoder.as_deref(), Some("pdfplumber"));
    assert!(acq.used_fallback);
    assert!(acq.error.is_none());
}

#[test]
fn fallback_after_primary_not_ok() {
    let engine = FakeEngine::new(Behavior::NotOk, Behavior::Pages(vec!["x"]));
    let acq = acquire_text(&Config::default(), &engine, Path::new("r.pdf"));
    assert_eq!(acq.decoder.as_deref(), Some("pdfplumber"));
    assert_eq!(*engine.calls.borrow(), vec!["pypdf", "pdfplumber"]);
}

#[test]
fn both_decoders_failing_yields_empty_text() {
    let engine = FakeEngine::new(Behavior::Fault, Behavior::NotOk);
    let acq = acquire_text(&Config::default(), &engine, Path::new("r.pdf"));
    assert!(acq.text.is_empty());
    assert!(acq.decoder.is_none());
    let err = acq.error.expect("error detail");
    assert!(err.contains("pypdf crashed"));
    assert!(err.contains("stream is corrupt"));
}

#[test]
fn unknown_primary_falls_back() {
    let mut cfg = Config::default();
    cfg.acquisition.primary = "mupdf".into();
    let engine = FakeEngine::new(Behavior::Fault, Behavior::Pages(vec!["ok"]));
    let acq = acquire_text(&cfg, &engine, Path::new("r.pdf"));
    assert_eq!(acq.decoder.as_deref(), Some("pdfplumber"));
}

#[test]
fn control_chars_are_removed() {
    let engine = FakeEngine::new(Behavior::Pages(vec!["Alpha\u{0002}Beta\r\nNext\tTab"]), Behavior::Fault);
    let acq = acquire_text(&Config::default(), &engine, Path::new("r.pdf"));
    assert_eq!(acq.text, "AlphaBeta\nNext\tTab\n");
}

#[test]
fn table_failure_counts_zero() {
    let mut engine = FakeEngine::new(Behavior::Fault, Behavior::Fault);
    assert_eq!(count_tables(&engine, Path::new("r.pdf")), 2);
    engine.tables = None;
    assert_eq!(count_tables(&engine, Path::new("r.pdf")), 0);
}

#[test]
fn url_inputs_are_rejected() {
    let cfg = Config::default();
    assert!(validate_input(&cfg, Path::new("https://example.com/r.pdf")).is_err());
    assert!(validate_input(&cfg, Path::new("/definitely/not/here.pdf")).is_err());
}

#[test]
fn process_report_extracts_fields() {
    let engine = FakeEngine::new(Behavior::Pages(vec![REPORT]), Behavior::Fault);
    let pipeline = Pipeline::new(&Config::default(), engine).expect("pipeline");
    let res = pipeline.process_report(Path::new("r.pdf"));

    assert!(res.success);
    assert_eq!(res.company_name.as_deref(), Some("Orlen Polska"));
    assert_eq!(res.report_period.as_deref(), Some("Q2 2024"));
    assert_eq!(res.metrics.get("revenue"), Some(&Some(1_500_000_000.0)));
    assert_eq!(res.tables_count, 2);
    assert_eq!(res.decoder.as_deref(), Some("pypdf"));
}

#[test]
fn process_report_reports_decoding_failure() {
    let engine = FakeEngine::new(Behavior::Fault, Behavior::Fault);
    let pipeline = Pipeline::new(&Config::default(), engine).expect("pipeline");
    let res = pipeline.process_report(Path::new("r.pdf"));

    assert!(!res.success);
    assert!(res.text.is_empty());
    assert!(res
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("failed to extract text from PDF")));
    assert!(res.metrics.is_empty());
}

#[test]
fn ingest_merges_collaborator_output() {
    let engine = FakeEngine::new(Behavior::Pages(vec![REPORT]), Behavior::Fault);
    let pipeline = Pipeline::new(&Config::default(), engine).expect("pipeline");
    let ingested = pipeline.ingest(Path::new("r.pdf"), &Replies, ReportType::Annual);

    assert_eq!(ingested.metrics.get("revenue"), Some(&Some(1_500_000_000.0)));
    assert_eq!(ingested.metrics.get("net_income"), Some(&Some(50.0)));
    assert_eq!(ingested.identity.report_type, ReportType::Quarterly);
    assert_eq!(ingested.identity.report_quarter, Some(2));

    let snap = ingested.snapshot(11, 3);
    assert_eq!(snap.company_id, 3);
    assert_eq!(snap.report_year, Some(2024));
    assert_eq!(snap.metric("net_income"), Some(50.0));
}

#[test]
fn ingest_without_collaborator_keeps_regex_results() {
    let mut cfg = Config::default();
    cfg.ingest.stored_text_chars = 10;
    let engine = FakeEngine::new(Behavior::Pages(vec![REPORT]), Behavior::Fault);
    let pipeline = Pipeline::new(&cfg, engine).expect("pipeline");
    let ingested = pipeline.ingest(Path::new("r.pdf"), &Disabled, ReportType::Annual);

    assert_eq!(ingested.metrics, ingested.extraction.metrics);
    assert_eq!(ingested.identity.report_period.as_deref(), Some("Q2 2024"));
    assert_eq!(ingested.identity.report_type, ReportType::Annual);
    assert_eq!(ingested.stored_text.chars().count(), 10);
}
