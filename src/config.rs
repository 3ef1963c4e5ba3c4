use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub acquisition: Acquisition,
    #[serde(default)]
    pub postprocess: Postprocess,
    #[serde(default)]
    pub extraction: Extraction,
    #[serde(default)]
    pub ingest: Ingest,
    #[serde(default)]
    pub semantic: Semantic,
    #[serde(default)]
    pub charts: Charts,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub scripts_dir: String,
    pub out_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            scripts_dir: "scripts".into(),
            out_dir: "out".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acquisition {
    /// Decoder tried first: "pypdf" or "pdfplumber".
    pub primary: String,
    /// Decoder tried only when the primary one fails.
    pub fallback: String,
    pub python_exe: String,
    pub timeout_seconds: u64,
    pub count_tables: bool,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}
impl Default for Acquisition {
    fn default() -> Self {
        Self {
            primary: "pypdf".into(),
            fallback: "pdfplumber".into(),
            python_exe: "auto".into(),
            timeout_seconds: 300,
            count_tables: true,
            env: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Postprocess {
    pub normalize_unicode: bool,
    pub normalize_newlines: bool,
    pub control_chars_to_sanitize: Vec<u8>,
}
impl Default for Postprocess {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            normalize_newlines: true,
            control_chars_to_sanitize: (0u8..32)
                .filter(|c| !matches!(*c, b'\n' | b'\r' | b'\t'))
                .chain(std::iter::once(127))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub company_name_min_chars: usize,
    pub company_name_max_chars: usize,
    /// Extra label-anchored patterns per metric key, tried after the built-in ones.
    /// Capture group 1 must hold the number.
    #[serde(default)]
    pub extra_metric_patterns: BTreeMap<String, Vec<String>>,
}
impl Default for Extraction {
    fn default() -> Self {
        Self {
            company_name_min_chars: 3,
            company_name_max_chars: 100,
            extra_metric_patterns: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingest {
    pub company_info_sample_chars: usize,
    pub stored_text_chars: usize,
    /// "quarterly" or "annual"; used when nothing better is known.
    pub default_report_type: String,
}
impl Default for Ingest {
    fn default() -> Self {
        Self {
            company_info_sample_chars: 5000,
            stored_text_chars: 50_000,
            default_report_type: "quarterly".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Semantic {
    pub enabled: bool,
    /// Program and arguments; the prompt goes to stdin, the reply is read from stdout.
    pub command: Vec<String>,
    pub timeout_seconds: u64,
    pub metrics_text_chars: usize,
}
impl Default for Semantic {
    fn default() -> Self {
        Self {
            enabled: false,
            command: Vec::new(),
            timeout_seconds: 120,
            metrics_text_chars: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPair {
    pub border: String,
    pub background: String,
}

impl ColorPair {
    fn new(border: &str, background: &str) -> Self {
        Self {
            border: border.into(),
            background: background.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charts {
    pub palette: Vec<ColorPair>,
}
impl Default for Charts {
    fn default() -> Self {
        Self {
            palette: vec![
                ColorPair::new("rgb(75, 192, 192)", "rgba(75, 192, 192, 0.2)"),
                ColorPair::new("rgb(54, 162, 235)", "rgba(54, 162, 235, 0.2)"),
                ColorPair::new("rgb(255, 99, 132)", "rgba(255, 99, 132, 0.2)"),
                ColorPair::new("rgb(255, 206, 86)", "rgba(255, 206, 86, 0.2)"),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    pub keep_python_stderr: bool,
    pub include_text_in_output: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_python_stderr: true,
            include_text_in_output: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub reject_url_inputs: bool,
    pub pin_scripts_dir: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
            pin_scripts_dir: true,
        }
    }
}
