use crate::{
    acquire,
    chart::{self, ChartBuilder, ChartKind},
    config::Config,
    engine::{Engine, python::PythonEngine},
    pipeline::Pipeline,
    report::ReportType,
    semantic::{CommandExtractor, Disabled, SemanticExtractor},
    util::{ensure_dir, hash_file, now_rfc3339, read_reports},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "report-sift")]
#[command(about = "Financial report field extraction and period-ordered chart series")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./report-sift.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check the PDF helper and its libraries.
    Doctor {},
    /// Extract fields and metrics from one PDF report.
    Extract {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum)]
        report_type: Option<KindArg>,
        /// Skip the semantic collaborator even if it is configured.
        #[arg(long)]
        no_semantic: bool,
    },
    /// Build one chart from a JSON array of report snapshots.
    Chart {
        #[arg(long)]
        reports: PathBuf,
        #[arg(long = "metric", required = true)]
        metrics: Vec<String>,
        #[arg(long, value_enum, default_value_t = ChartArg::Line)]
        kind: ChartArg,
        #[arg(long, default_value = "")]
        title: String,
    },
    /// List metric keys that have data in at least one report.
    Metrics {
        #[arg(long)]
        reports: PathBuf,
    },
    /// Standard chart set for one company.
    Dashboard {
        #[arg(long)]
        reports: PathBuf,
        #[arg(long)]
        company_id: i64,
        #[arg(long)]
        company_name: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KindArg {
    Quarterly,
    Annual,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ChartArg {
    Line,
    Bar,
}

impl From<ChartArg> for ChartKind {
    fn from(a: ChartArg) -> Self {
        match a {
            ChartArg::Line => ChartKind::Line,
            ChartArg::Bar => ChartKind::Bar,
        }
    }
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let cfg = match &cfg_path {
        Some(p) => Config::load(p)?,
        None => Config::default(),
    };
    let _guard = init_logging(&args, &cfg)?;
    if let Some(p) = &cfg_path {
        info!("config {}", p.display());
    }

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg),
        Command::Extract {
            input,
            report_type,
            no_semantic,
        } => extract(&cfg, input, *report_type, *no_semantic),
        Command::Chart {
            reports,
            metrics,
            kind,
            title,
        } => {
            let reports = read_reports(reports)?;
            let keys: Vec<&str> = metrics.iter().map(String::as_str).collect();
            let chart =
                ChartBuilder::new(&cfg.charts).build(&reports, &keys, (*kind).into(), title);
            println!("{}", serde_json::to_string_pretty(&chart)?);
            Ok(())
        }
        Command::Metrics { reports } => {
            let reports = read_reports(reports)?;
            let available = chart::available_metrics(&reports);
            println!("{}", serde_json::to_string_pretty(&available)?);
            Ok(())
        }
        Command::Dashboard {
            reports,
            company_id,
            company_name,
        } => {
            let reports = read_reports(reports)?;
            let dash = ChartBuilder::new(&cfg.charts).dashboard(*company_id, company_name, &reports);
            println!("{}", serde_json::to_string_pretty(&dash)?);
            Ok(())
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    ["report-sift.toml", "report-sift.example.toml"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr; stdout carries the JSON results.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let file_path = resolve_log_path(cfg);
    let (file_layer, guard) = if let Some(path) = file_path.as_deref() {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.paths.out_dir).join("report-sift.log"))
}

fn doctor(cfg: &Config) -> Result<()> {
    let engine = PythonEngine::new(cfg)?;
    let diag = engine.doctor()?;
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn extract(cfg: &Config, input: &Path, kind: Option<KindArg>, no_semantic: bool) -> Result<()> {
    acquire::validate_input(cfg, input)?;

    let fingerprint =
        hash_file(input).with_context(|| format!("hashing input: {}", input.display()))?;
    let started = now_rfc3339();

    let engine = PythonEngine::new(cfg)?;
    let pipeline = Pipeline::new(cfg, engine)?;

    let collab: Box<dyn SemanticExtractor> = if cfg.semantic.enabled && !no_semantic {
        Box::new(CommandExtractor::new(cfg)?)
    } else {
        Box::new(Disabled)
    };

    let default_type = match kind {
        Some(KindArg::Quarterly) => ReportType::Quarterly,
        Some(KindArg::Annual) => ReportType::Annual,
        None => ReportType::parse(&cfg.ingest.default_report_type).ok_or_else(|| {
            anyhow!(
                "unknown ingest.default_report_type: {}",
                cfg.ingest.default_report_type
            )
        })?,
    };

    let mut ingested = pipeline.ingest(input, collab.as_ref(), default_type);
    if !cfg.debug.include_text_in_output {
        ingested.extraction.text.clear();
        ingested.stored_text.clear();
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "sha256": fingerprint,
            "started": started,
            "finished": now_rfc3339(),
            "result": ingested,
        }))?
    );

    if !ingested.extraction.success {
        return Err(anyhow!(
            "{}",
            ingested
                .extraction
                .error
                .unwrap_or_else(|| "extraction failed".into())
        ));
    }
    Ok(())
}
