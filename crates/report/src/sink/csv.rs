use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use engine::{ReportSink, SinkError, Table};
use tracing::debug;

use crate::naming::output_path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One CSV file per table, named `<stem>_<table>.csv`.
pub struct CsvSink {
    dir: PathBuf,
    stem: String,
    bom: bool,
    written: Vec<PathBuf>,
}

impl CsvSink {
    pub fn new(dir: &Path, stem: &str, bom: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            stem: stem.to_string(),
            bom,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ReportSink for CsvSink {
    fn write_table(&mut self, table: &Table) -> Result<(), SinkError> {
        let path = output_path(&self.dir, &self.stem, Some(&table.name), "csv");
        let mut out = BufWriter::new(File::create(&path)?);
        write_csv(&mut out, table, self.bom)?;
        out.flush()?;

        debug!(path = %path.display(), rows = table.rows.len(), "csv: table written");
        self.written.push(path);
        Ok(())
    }
}

/// Header first, always; every field quoted only when it must be.
pub fn write_csv<W: Write>(out: &mut W, table: &Table, bom: bool) -> std::io::Result<()> {
    if bom {
        out.write_all(UTF8_BOM)?;
    }
    write_record(out, table.header())?;
    for row in table.rendered_rows() {
        write_record(out, row.iter().map(String::as_str))?;
    }
    Ok(())
}

fn write_record<'a, W: Write>(out: &mut W, fields: impl IntoIterator<Item = &'a str>) -> std::io::Result<()> {
    let line = fields.into_iter().map(escape).collect::<Vec<_>>().join(",");
    out.write_all(line.as_bytes())?;
    out.write_all(b"\r\n")
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
