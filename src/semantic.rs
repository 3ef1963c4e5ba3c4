use crate::{config::Config, metrics::MetricMap, subprocess::wait_with_timeout};
use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;

/// Company facts a language model can usually read off a report's first pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub report_period: Option<String>,
    #[serde(default)]
    pub report_year: Option<i32>,
    #[serde(default)]
    pub report_quarter: Option<u8>,
}

/// An out-of-process semantic extractor. Implementations return the raw reply;
/// parsing and validation happen on this side.
pub trait SemanticExtractor {
    fn company_info(&self, sample: &str) -> Result<String>;
    fn financial_metrics(&self, text: &str) -> Result<String>;
}

/// Always fails, so merges degrade to regex-only results.
pub struct Disabled;

impl SemanticExtractor for Disabled {
    fn company_info(&self, _sample: &str) -> Result<String> {
        bail!("semantic extraction is disabled")
    }

    fn financial_metrics(&self, _text: &str) -> Result<String> {
        bail!("semantic extraction is disabled")
    }
}

/// Pipes a prompt into a configured command and reads the reply from stdout.
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    metrics_text_chars: usize,
}

impl CommandExtractor {
    pub fn new(cfg: &Config) -> Result<Self> {
        let (program, args) = cfg
            .semantic
            .command
            .split_first()
            .ok_or_else(|| anyhow!("semantic.command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout: Duration::from_secs(cfg.semantic.timeout_seconds.max(1)),
            metrics_text_chars: cfg.semantic.metrics_text_chars,
        })
    }

    fn ask(&self, prompt: String) -> Result<String> {
        debug!("semantic command {} ({} prompt bytes)", self.program, prompt.len());
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning semantic command: {}", self.program))?;

        // Fed from its own thread so a reply larger than the pipe buffer can't stall us.
        let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
        let writer = std::thread::spawn(move || stdin.write_all(prompt.as_bytes()));

        let output = wait_with_timeout(&mut child, self.timeout)?;
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("semantic command closed stdin early: {e}"),
            Err(_) => bail!("semantic stdin writer panicked"),
        }
        if !output.status.success() {
            bail!(
                "semantic command failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        String::from_utf8(output.stdout).with_context(|| "semantic reply is not UTF-8")
    }
}

impl SemanticExtractor for CommandExtractor {
    fn company_info(&self, sample: &str) -> Result<String> {
        self.ask(company_info_prompt(sample))
    }

    fn financial_metrics(&self, text: &str) -> Result<String> {
        let text = crate::postprocess::truncate_chars(text, self.metrics_text_chars);
        self.ask(metrics_prompt(text))
    }
}

pub fn company_info_prompt(sample: &str) -> String {
    format!(
        "Przeanalizuj początek raportu finansowego i wyodrębnij dane firmy w formacie JSON.\n\n\
         TEKST:\n{sample}\n\n\
         Zwróć TYLKO obiekt JSON z polami: name, ticker, industry, description, \
         report_period (np. \"Q3 2024\"), report_year (int), report_quarter (int 1-4 lub null dla rocznego)."
    )
}

pub fn metrics_prompt(text: &str) -> String {
    format!(
        "Wyodrębnij z raportu finansowego wartości w jednostkach bazowych (PLN, bez skrótów tys/mln).\n\n\
         TEKST:\n{text}\n\n\
         Zwróć TYLKO obiekt JSON z polami: revenue, net_income, total_assets, \
         total_liabilities, equity, operating_income (liczba lub null)."
    )
}

/// Drops a surrounding Markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_code_fence(reply: &str) -> &str {
    let s = reply.trim();
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_company_info(reply: &str) -> Result<CompanyInfo> {
    let value: serde_json::Value =
        serde_json::from_str(strip_code_fence(reply)).with_context(|| "company info reply is not JSON")?;
    if !value.is_object() {
        bail!("company info reply is not a JSON object");
    }
    serde_json::from_value(value).with_context(|| "company info reply has unexpected shape")
}

/// Metric reply must be an object of numbers or nulls; anything else is rejected whole.
pub fn parse_metrics(reply: &str) -> Result<MetricMap> {
    let value: serde_json::Value =
        serde_json::from_str(strip_code_fence(reply)).with_context(|| "metrics reply is not JSON")?;
    let obj = value
        .as_object()
        .ok_or_else(|| anyhow!("metrics reply is not a JSON object"))?;

    let mut out = MetricMap::new();
    for (key, v) in obj {
        let parsed = match v {
            serde_json::Value::Null => None,
            serde_json::Value::Number(n) => Some(
                n.as_f64()
                    .ok_or_else(|| anyhow!("metric {key} is out of range"))?,
            ),
            other => bail!("metric {key} is neither a number nor null: {other}"),
        };
        out.insert(key.clone(), parsed);
    }
    Ok(out)
}
