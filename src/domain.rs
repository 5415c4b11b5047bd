use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::GbkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchFormat {
    #[value(name = "gbk", alias = "gb", alias = "genbank")]
    #[serde(rename = "gbk", alias = "gb", alias = "genbank")]
    GenBank,
    Fasta,
}

impl FetchFormat {
    /// Both formats, in the order a full run downloads them.
    pub const ALL: [FetchFormat; 2] = [FetchFormat::GenBank, FetchFormat::Fasta];

    /// Value of the E-utilities `rettype` parameter.
    pub fn rettype(self) -> &'static str {
        match self {
            FetchFormat::GenBank => "gb",
            FetchFormat::Fasta => "fasta",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FetchFormat::GenBank => "gbk",
            FetchFormat::Fasta => "fasta",
        }
    }
}

impl fmt::Display for FetchFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFormat::GenBank => write!(f, "gbk"),
            FetchFormat::Fasta => write!(f, "fasta"),
        }
    }
}

/// Identifier of one nucleotide record, as read from the accession table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Accession(String);

impl Accession {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name stem for this accession, or `None` when the value could
    /// escape the output directory.
    pub fn file_stem(&self) -> Option<&str> {
        let value = self.0.as_str();
        let is_plain = !value.is_empty()
            && value != "."
            && value != ".."
            && !value.contains(['/', '\\'])
            && !value.contains('\0');
        is_plain.then_some(value)
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = GbkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(value))
    }
}

impl From<&str> for Accession {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
