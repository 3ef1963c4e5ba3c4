use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocDiag {
    pub python_exe: String,
    pub python_version: String,
    #[serde(default)]
    pub pypdf_version: Option<String>,
    #[serde(default)]
    pub pdfplumber_version: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Page-by-page text produced by one decoding backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextOut {
    pub ok: bool,
    #[serde(default)]
    pub pages: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablesOut {
    pub ok: bool,
    #[serde(default)]
    pub tables_count: usize,
    #[serde(default)]
    pub error: Option<String>,
}
