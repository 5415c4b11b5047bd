use std::fs::File;
use std::io::Read;

use camino::Utf8Path;
use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::domain::Accession;
use crate::error::GbkError;

/// Header label of the accession column in PATRIC genome exports.
pub const GENBANK_COLUMN: &str = "GenBank Accessions";

#[derive(Debug, Clone)]
pub struct TableOptions {
    pub column: String,
    pub delimiter: u8,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            column: GENBANK_COLUMN.to_string(),
            delimiter: b',',
        }
    }
}

pub fn extract_accessions(
    path: &Utf8Path,
    options: &TableOptions,
) -> Result<Vec<Accession>, GbkError> {
    let file = File::open(path.as_std_path()).map_err(|err| GbkError::InputRead {
        path: path.to_string(),
        message: err.to_string(),
    })?;
    let accessions = extract_from_reader(file, options).map_err(|err| match err {
        GbkError::MissingColumn { column, .. } => GbkError::MissingColumn {
            column,
            path: path.to_string(),
        },
        other => other,
    })?;
    info!(path = %path, count = accessions.len(), "read accession table");
    Ok(accessions)
}

/// Reads the accession column from any delimited source whose first row is
/// a header. Rows keep file order; duplicates are kept.
pub fn extract_from_reader<R: Read>(
    reader: R,
    options: &TableOptions,
) -> Result<Vec<Accession>, GbkError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|err| GbkError::InputParse(err.to_string()))?;
    let index = headers
        .iter()
        .position(|cell| cell == options.column)
        .ok_or_else(|| GbkError::MissingColumn {
            column: options.column.clone(),
            path: "<input>".to_string(),
        })?;
    debug!(column = %options.column, index, "located accession column");

    let mut accessions = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| GbkError::InputParse(err.to_string()))?;
        let cell = record.get(index).ok_or_else(|| GbkError::MalformedRow {
            line: record.position().map(|pos| pos.line()).unwrap_or(0),
            expected: index + 1,
            found: record.len(),
        })?;
        accessions.push(Accession::new(cell));
    }
    Ok(accessions)
}
