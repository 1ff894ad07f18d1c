//! JSON Lines export collaborator.
//!
//! Writes each exported record as one JSON line, followed by an audit line
//! carrying the justification, the record count and the export time.

use crate::model::ExportFailure;
use crate::source::RecordExporter;
use crate::state::bulk::ExportJustification;
use chrono::Utc;
use serde::Serialize;
use std::io::Write;

/// Trailing audit line of an export.
#[derive(Debug, Serialize)]
struct AuditLine<'a> {
    audit: &'static str,
    justification: &'a str,
    count: usize,
    exported_at: String,
}

/// Exporter writing JSON Lines to any [`Write`].
#[derive(Debug)]
pub struct JsonLinesExporter<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesExporter<W> {
    /// Exporter writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<R: Serialize, W: Write> RecordExporter<R> for JsonLinesExporter<W> {
    fn export(
        &mut self,
        records: &[&R],
        justification: &ExportJustification,
    ) -> Result<(), ExportFailure> {
        let to_failure = |e: serde_json::Error| ExportFailure(e.to_string());

        for record in records {
            serde_json::to_writer(&mut self.writer, record).map_err(to_failure)?;
            self.writer.write_all(b"\n")?;
        }

        let audit = AuditLine {
            audit: "export",
            justification: justification.as_str(),
            count: records.len(),
            exported_at: Utc::now().to_rfc3339(),
        };
        serde_json::to_writer(&mut self.writer, &audit).map_err(to_failure)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
