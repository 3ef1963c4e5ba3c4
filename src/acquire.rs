use crate::{config::Config, engine::Engine, postprocess};
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acquisition {
    pub text: String,
    /// Backend that produced `text`; `None` when both failed.
    pub decoder: Option<String>,
    pub used_fallback: bool,
    pub error: Option<String>,
}

/// Decodes `input` with the primary backend, then the fallback if the first one faults.
///
/// Never returns an error: a double failure yields empty text plus both reasons.
pub fn acquire_text(cfg: &Config, engine: &dyn Engine, input: &Path) -> Acquisition {
    let primary = cfg.acquisition.primary.as_str();
    let fallback = cfg.acquisition.fallback.as_str();

    let primary_err = match decode(cfg, engine, input, primary) {
        Ok(text) => {
            info!("decoded {} with {primary} ({} chars)", input.display(), text.len());
            return Acquisition {
                text,
                decoder: Some(primary.to_string()),
                used_fallback: false,
                error: None,
            };
        }
        Err(err) => err,
    };

    warn!("{primary} failed; falling back to {fallback}: {primary_err:#}");

    match decode(cfg, engine, input, fallback) {
        Ok(text) => Acquisition {
            text,
            decoder: Some(fallback.to_string()),
            used_fallback: true,
            error: None,
        },
        Err(fallback_err) => {
            warn!("{fallback} failed too: {fallback_err:#}");
            Acquisition {
                text: String::new(),
                decoder: None,
                used_fallback: true,
                error: Some(format!(
                    "{primary}: {primary_err:#}; {fallback}: {fallback_err:#}"
                )),
            }
        }
    }
}

fn decode(cfg: &Config, engine: &dyn Engine, input: &Path, backend: &str) -> Result<String> {
    let out = engine.extract_text(input, backend)?;
    if !out.ok {
        return Err(anyhow!(
            out.error
                .unwrap_or_else(|| format!("{backend} returned ok=false"))
        ));
    }
    debug!("{backend} returned {} pages", out.pages.len());
    let joined = postprocess::join_pages(&out.pages);
    Ok(postprocess::clean_text(cfg, &joined))
}

/// Table count used as a document quality signal; any failure counts as zero.
pub fn count_tables(engine: &dyn Engine, input: &Path) -> usize {
    match engine.extract_tables(input) {
        Ok(out) if out.ok => out.tables_count,
        Ok(out) => {
            warn!(
                "table extraction returned ok=false: {}",
                out.error.as_deref().unwrap_or("no detail")
            );
            0
        }
        Err(err) => {
            warn!("table extraction failed: {err:#}");
            0
        }
    }
}

/// Rejects inputs that are not local PDF files.
pub fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    match input.extension().and_then(|s| s.to_str()) {
        Some(ext) if !ext.eq_ignore_ascii_case("pdf") => {
            Err(anyhow!("input is not a PDF: {}", input.display()))
        }
        Some(_) => Ok(()),
        None => {
            warn!("input has no extension; assuming PDF: {}", input.display());
            Ok(())
        }
    }
}

fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}
