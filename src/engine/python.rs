use super::{Engine, types::*};
use crate::config::Config;
use crate::subprocess::wait_with_timeout;
use anyhow::{Context, Result, anyhow};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

const SCRIPT: &str = "pdf_extract.py";

/// Drives `scripts/pdf_extract.py`, which wraps pypdf and pdfplumber.
pub struct PythonEngine {
    cfg: Config,
    script: PathBuf,
    python_exe: PathBuf,
}

impl PythonEngine {
    pub fn new(cfg: &Config) -> Result<Self> {
        let scripts_dir = PathBuf::from(&cfg.paths.scripts_dir);
        if cfg.security.pin_scripts_dir {
            let cwd = std::env::current_dir().with_context(|| "current_dir")?;
            let canon = scripts_dir
                .canonicalize()
                .with_context(|| format!("canonicalize scripts_dir: {}", scripts_dir.display()))?;
            if !canon.starts_with(&cwd) {
                return Err(anyhow!(
                    "scripts_dir is outside cwd while pin_scripts_dir=true: {}",
                    canon.display()
                ));
            }
        }
        let script = scripts_dir.join(SCRIPT);
        if !script.exists() {
            return Err(anyhow!("missing script: {}", script.display()));
        }
        let python_exe = resolve_python_exe(&cfg.acquisition.python_exe);
        Ok(Self {
            cfg: cfg.clone(),
            script,
            python_exe,
        })
    }

    fn run_json<O: for<'de> serde::Deserialize<'de>>(&self, req: &serde_json::Value) -> Result<O> {
        debug!(
            "python run {} req={} timeout={}s",
            self.script.display(),
            req,
            self.cfg.acquisition.timeout_seconds
        );
        let mut cmd = Command::new(&self.python_exe);
        cmd.arg(&self.script);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        for (k, v) in &self.cfg.acquisition.env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning python: {}", self.script.display()))?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
            stdin.write_all(&serde_json::to_vec(req)?)?;
            stdin.flush().ok();
        }

        let output = if self.cfg.acquisition.timeout_seconds > 0 {
            wait_with_timeout(
                &mut child,
                Duration::from_secs(self.cfg.acquisition.timeout_seconds),
            )?
        } else {
            child
                .wait_with_output()
                .with_context(|| "waiting for python")?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "python script failed: {}\n{}",
                self.script.display(),
                stderr
            ));
        }

        if self.cfg.debug.keep_python_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("python stderr: {}", stderr.trim());
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing python JSON output: {}", self.script.display()))
    }
}

fn resolve_python_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("REPORT_SIFT_PYTHON") {
            let p = expand_tilde(&env_val);
            if p.exists() {
                return p;
            }
        }
        return PathBuf::from("python3");
    }
    expand_tilde(raw)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

impl Engine for PythonEngine {
    fn doctor(&self) -> Result<DocDiag> {
        self.run_json(&serde_json::json!({"cmd": "doctor"}))
    }

    fn extract_text(&self, input: &Path, backend: &str) -> Result<TextOut> {
        let out: TextOut = self.run_json(&serde_json::json!({
            "cmd": "text",
            "input_pdf": input,
            "backend": backend,
        }))?;
        if !out.ok {
            warn!(
                "{backend} returned ok=false: {}",
                out.error.as_deref().unwrap_or("no detail")
            );
        }
        Ok(out)
    }

    fn extract_tables(&self, input: &Path) -> Result<TablesOut> {
        let out: TablesOut = self.run_json(&serde_json::json!({
            "cmd": "tables",
            "input_pdf": input,
        }))?;
        if let Some(err) = out.error.as_deref() {
            return Err(anyhow!("table extraction error: {err}"));
        }
        Ok(out)
    }
}
