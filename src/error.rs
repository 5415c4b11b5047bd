use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GbkError {
    #[error("config file not found: {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    #[diagnostic(help("set the value in gbk-fetch.json or pass it on the command line"))]
    InvalidConfig(String),

    #[error("column \"{column}\" not found in header of {path}")]
    #[diagnostic(help("the input table must have a header cell exactly equal to the column label"))]
    MissingColumn { column: String, path: String },

    #[error("failed to read accession table {path}: {message}")]
    InputRead { path: String, message: String },

    #[error("failed to parse accession table: {0}")]
    InputParse(String),

    #[error("output directory {path} is not usable: {message}")]
    OutputDir { path: String, message: String },

    #[error("line {line} has {found} columns, expected at least {expected}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("NCBI request failed: {0}")]
    NcbiHttp(String),

    #[error("NCBI returned status {status}: {message}")]
    NcbiStatus { status: u16, message: String },

    #[error("NCBI reported an error: {0}")]
    NcbiService(String),

    #[error("NCBI returned an empty response for {0}")]
    EmptyResponse(String),

    #[error("download cancelled before {0} was attempted")]
    Cancelled(String),

    #[error("failed to write {path}: {message}")]
    Write { path: String, message: String },
}

/// Coarse classification used for exit codes and failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    MalformedRow,
    Fetch,
    Write,
}

impl GbkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GbkError::MissingConfig(_)
            | GbkError::ConfigRead(_)
            | GbkError::ConfigParse(_)
            | GbkError::InvalidConfig(_)
            | GbkError::MissingColumn { .. }
            | GbkError::InputRead { .. }
            | GbkError::InputParse(_)
            | GbkError::OutputDir { .. } => ErrorKind::Configuration,
            GbkError::MalformedRow { .. } => ErrorKind::MalformedRow,
            GbkError::NcbiHttp(_)
            | GbkError::NcbiStatus { .. }
            | GbkError::NcbiService(_)
            | GbkError::EmptyResponse(_)
            | GbkError::Cancelled(_) => ErrorKind::Fetch,
            GbkError::Write { .. } => ErrorKind::Write,
        }
    }

    pub fn is_fetch(&self) -> bool {
        self.kind() == ErrorKind::Fetch
    }

    pub fn is_write(&self) -> bool {
        self.kind() == ErrorKind::Write
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let missing = GbkError::MissingColumn {
            column: "GenBank Accessions".to_string(),
            path: "genomes.csv".to_string(),
        };
        assert_eq!(missing.kind(), ErrorKind::Configuration);
        assert!(missing.to_string().contains("GenBank Accessions"));

        let status = GbkError::NcbiStatus {
            status: 502,
            message: "Bad Gateway".to_string(),
        };
        assert!(status.is_fetch());

        let write = GbkError::Write {
            path: "out/A1.gbk".to_string(),
            message: "permission denied".to_string(),
        };
        assert!(write.is_write());
        assert!(!write.is_fetch());
    }
}
