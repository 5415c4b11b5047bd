use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::domain::{Accession, FetchFormat};
use crate::error::GbkError;

/// Output directories, one per format.
#[derive(Debug, Clone)]
pub struct Store {
    genbank_dir: Utf8PathBuf,
    fasta_dir: Utf8PathBuf,
}

impl Store {
    pub fn new(genbank_dir: Utf8PathBuf, fasta_dir: Utf8PathBuf) -> Self {
        Self {
            genbank_dir,
            fasta_dir,
        }
    }

    pub fn dir_for(&self, format: FetchFormat) -> &Utf8Path {
        match format {
            FetchFormat::GenBank => &self.genbank_dir,
            FetchFormat::Fasta => &self.fasta_dir,
        }
    }

    /// Creates the directory for `format` if needed and checks it is a directory.
    pub fn ensure_dir(&self, format: FetchFormat) -> Result<&Utf8Path, GbkError> {
        let dir = self.dir_for(format);
        fs::create_dir_all(dir.as_std_path()).map_err(|err| GbkError::OutputDir {
            path: dir.to_string(),
            message: err.to_string(),
        })?;
        if !dir.as_std_path().is_dir() {
            return Err(GbkError::OutputDir {
                path: dir.to_string(),
                message: "not a directory".to_string(),
            });
        }
        Ok(dir)
    }
}

/// `<dir>/<accession>.<ext>`, or a write error when the accession is not a
/// plain file name.
pub fn record_path(
    dir: &Utf8Path,
    accession: &Accession,
    format: FetchFormat,
) -> Result<Utf8PathBuf, GbkError> {
    let stem = accession.file_stem().ok_or_else(|| GbkError::Write {
        path: dir.join(accession.as_str()).to_string(),
        message: "accession is not a valid file name".to_string(),
    })?;
    Ok(dir.join(format!("{stem}.{}", format.extension())))
}

/// Writes through a temp file in the destination directory, then renames over
/// any existing file, so an interrupted write never leaves a truncated record.
pub fn write_text_atomic(path: &Utf8Path, content: &str) -> Result<(), GbkError> {
    let write_err = |message: String| GbkError::Write {
        path: path.to_string(),
        message,
    };
    let parent = path
        .parent()
        .ok_or_else(|| write_err("invalid destination path".to_string()))?;
    let mut temp = Builder::new()
        .prefix(".gbk-fetch")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| write_err(err.to_string()))?;
    temp.write_all(content.as_bytes())
        .map_err(|err| write_err(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| write_err(err.error.to_string()))?;
    Ok(())
}
