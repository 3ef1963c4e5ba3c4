use crate::{
    acquire,
    config::Config,
    engine::Engine,
    fields::FieldExtractor,
    merge::{self, ReportIdentity},
    metrics::MetricMap,
    postprocess::truncate_chars,
    report::{ExtractionResult, ReportSnapshot, ReportType},
    semantic::{CompanyInfo, SemanticExtractor},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct Pipeline<E: Engine> {
    cfg: Config,
    engine: E,
    extractor: FieldExtractor,
}

/// Result of a full ingestion, ready to be persisted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingested {
    pub extraction: ExtractionResult,
    pub company: Option<CompanyInfo>,
    pub identity: ReportIdentity,
    /// Regex metrics with collaborator values merged over them.
    pub metrics: MetricMap,
    pub stored_text: String,
}

impl Ingested {
    pub fn snapshot(&self, id: i64, company_id: i64) -> ReportSnapshot {
        ReportSnapshot {
            id,
            company_id,
            extracted_text: Some(self.stored_text.clone()),
            report_period: self.identity.report_period.clone(),
            report_year: self.identity.report_year,
            report_quarter: self.identity.report_quarter,
            report_type: Some(self.identity.report_type),
            key_metrics: Some(self.metrics.clone()),
        }
    }
}

impl<E: Engine> Pipeline<E> {
    pub fn new(cfg: &Config, engine: E) -> Result<Self> {
        Ok(Self {
            cfg: cfg.clone(),
            engine,
            extractor: FieldExtractor::new(cfg)?,
        })
    }

    pub fn extractor(&self) -> &FieldExtractor {
        &self.extractor
    }

    /// Decode and extract one document. Failures land in `error`, never in `Err`.
    pub fn process_report(&self, input: &Path) -> ExtractionResult {
        let started = Instant::now();
        let acquired = acquire::acquire_text(&self.cfg, &self.engine, input);

        if acquired.text.is_empty() {
            let detail = acquired.error.unwrap_or_else(|| "document has no text".into());
            warn!("no text from {}: {detail}", input.display());
            return ExtractionResult {
                decoder: acquired.decoder,
                success: false,
                error: Some(format!("failed to extract text from PDF: {detail}")),
                ..Default::default()
            };
        }

        let company_name = self.extractor.company_name(&acquired.text);
        let report_period = self.extractor.report_period(&acquired.text);
        let metrics = self.extractor.metrics(&acquired.text);
        let tables_count = if self.cfg.acquisition.count_tables {
            acquire::count_tables(&self.engine, input)
        } else {
            0
        };

        info!(
            "extracted company={:?} period={:?} metrics={} tables={} in {:?}",
            company_name,
            report_period,
            metrics.values.len(),
            tables_count,
            started.elapsed()
        );

        ExtractionResult {
            text: acquired.text,
            company_name,
            report_period,
            metrics: metrics.values,
            metric_outcomes: metrics.outcomes,
            tables_count,
            decoder: acquired.decoder,
            success: true,
            error: None,
        }
    }

    /// Extraction plus the semantic collaborator: company info, merged
    /// metrics and a resolved period. Collaborator failures only degrade
    /// the result.
    pub fn ingest(
        &self,
        input: &Path,
        collab: &dyn SemanticExtractor,
        default_type: ReportType,
    ) -> Ingested {
        let extraction = self.process_report(input);

        let (company, metrics) = if extraction.success {
            let sample = truncate_chars(&extraction.text, self.cfg.ingest.company_info_sample_chars);
            let company = merge::company_info(collab, sample);
            let metrics = merge::merge_with(collab, &extraction.metrics, &extraction.text);
            (company, metrics)
        } else {
            (None, extraction.metrics.clone())
        };
        debug!(?company, "company info");

        let identity = merge::resolve_identity(
            extraction.report_period.as_deref(),
            company.as_ref(),
            default_type,
        );
        let stored_text =
            truncate_chars(&extraction.text, self.cfg.ingest.stored_text_chars).to_string();

        Ingested {
            extraction,
            company,
            identity,
            metrics,
            stored_text,
        }
    }
}
