pub mod python;
pub mod types;

use anyhow::Result;
use std::path::Path;

pub use types::{DocDiag, TablesOut, TextOut};

/// Access to the external PDF decoding library.
pub trait Engine {
    fn doctor(&self) -> Result<DocDiag>;
    /// Decode every page with the named backend ("pypdf" or "pdfplumber").
    fn extract_text(&self, input: &Path, backend: &str) -> Result<TextOut>;
    fn extract_tables(&self, input: &Path) -> Result<TablesOut>;
}
