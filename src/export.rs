use crate::error::{RagError, Result};
use log::info;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;

/// One question and the answer given to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaRecord {
    #[serde(rename = "Soru")]
    pub question: String,
    #[serde(rename = "Cevap")]
    pub answer: String,
}

/// Append a record to a two-column CSV file, writing the header for a new file
pub fn append_record<P: AsRef<Path>>(path: P, record: &QaRecord) -> Result<()> {
    let path = path.as_ref();
    let export_error = |reason: String| RagError::Export {
        path: path.display().to_string(),
        reason,
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| export_error(e.to_string()))?;
    let is_new = file
        .metadata()
        .map_err(|e| export_error(e.to_string()))?
        .len()
        == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    writer
        .serialize(record)
        .map_err(|e| export_error(e.to_string()))?;
    writer.flush().map_err(|e| export_error(e.to_string()))?;

    info!("Saved answer to {}", path.display());
    Ok(())
}
