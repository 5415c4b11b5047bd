use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::accessions::{GENBANK_COLUMN, TableOptions};
use crate::domain::FetchFormat;
use crate::error::GbkError;
use crate::ncbi::{ClientSettings, DEFAULT_EUTILS_BASE};
use crate::store::Store;

pub const DEFAULT_CONFIG_FILE: &str = "gbk-fetch.json";
pub const DEFAULT_INPUT: &str = "PATRIC_genome.csv";
pub const DEFAULT_GENBANK_DIR: &str = "gbk_file";
pub const DEFAULT_FASTA_DIR: &str = "fasta_file";
pub const DEFAULT_TOOL: &str = "gbk-fetch";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// On-disk configuration. Every field may also come from the command line.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub genbank_dir: Option<String>,
    #[serde(default)]
    pub fasta_dir: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub formats: Option<Vec<FetchFormat>>,
}

impl Config {
    /// Values set in `overrides` win over values from the file.
    pub fn merge(self, overrides: Config) -> Config {
        Config {
            input: overrides.input.or(self.input),
            genbank_dir: overrides.genbank_dir.or(self.genbank_dir),
            fasta_dir: overrides.fasta_dir.or(self.fasta_dir),
            email: overrides.email.or(self.email),
            tool: overrides.tool.or(self.tool),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            column: overrides.column.or(self.column),
            delimiter: overrides.delimiter.or(self.delimiter),
            base_url: overrides.base_url.or(self.base_url),
            api_key: overrides.api_key.or(self.api_key),
            formats: overrides.formats.or(self.formats),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub input: Utf8PathBuf,
    pub store: Store,
    pub table: TableOptions,
    pub client: ClientSettings,
    pub formats: Vec<FetchFormat>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path` (or `gbk-fetch.json` when present), applies `overrides`
    /// and falls back to `NCBI_API_KEY` for the API key.
    pub fn resolve(path: Option<&str>, overrides: Config) -> Result<ResolvedConfig, GbkError> {
        let file_config = match path {
            Some(path) => {
                let config_path = PathBuf::from(path);
                if !config_path.exists() {
                    return Err(GbkError::MissingConfig(config_path));
                }
                Self::read(config_path)?
            }
            None => {
                let config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if config_path.exists() {
                    Self::read(config_path)?
                } else {
                    Config::default()
                }
            }
        };

        let mut config = file_config.merge(overrides);
        if config.api_key.is_none() {
            config.api_key = std::env::var("NCBI_API_KEY").ok();
        }
        Self::resolve_config(config)
    }

    fn read(config_path: PathBuf) -> Result<Config, GbkError> {
        let content = fs::read_to_string(&config_path)
            .map_err(|_| GbkError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| GbkError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, GbkError> {
        let email = config
            .email
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                GbkError::InvalidConfig(
                    "a contact email is required by NCBI E-utilities (--email)".to_string(),
                )
            })?;

        let tool = config
            .tool
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_TOOL.to_string());

        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(GbkError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        let delimiter = match config.delimiter.as_deref() {
            Some(value) => parse_delimiter(value)?,
            None => b',',
        };

        let formats = match config.formats {
            Some(formats) => {
                let mut unique = Vec::new();
                for format in formats {
                    if !unique.contains(&format) {
                        unique.push(format);
                    }
                }
                if unique.is_empty() {
                    return Err(GbkError::InvalidConfig(
                        "at least one format is required".to_string(),
                    ));
                }
                unique
            }
            None => FetchFormat::ALL.to_vec(),
        };

        let api_key = config
            .api_key
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(ResolvedConfig {
            input: Utf8PathBuf::from(config.input.unwrap_or_else(|| DEFAULT_INPUT.to_string())),
            store: Store::new(
                Utf8PathBuf::from(
                    config
                        .genbank_dir
                        .unwrap_or_else(|| DEFAULT_GENBANK_DIR.to_string()),
                ),
                Utf8PathBuf::from(
                    config
                        .fasta_dir
                        .unwrap_or_else(|| DEFAULT_FASTA_DIR.to_string()),
                ),
            ),
            table: TableOptions {
                column: config.column.unwrap_or_else(|| GENBANK_COLUMN.to_string()),
                delimiter,
            },
            client: ClientSettings {
                email,
                tool,
                api_key,
                base_url: config
                    .base_url
                    .unwrap_or_else(|| DEFAULT_EUTILS_BASE.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            formats,
        })
    }
}

fn parse_delimiter(value: &str) -> Result<u8, GbkError> {
    match value {
        "\t" | "\\t" | "tab" => Ok(b'\t'),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) if ch.is_ascii() => Ok(ch as u8),
                _ => Err(GbkError::InvalidConfig(format!(
                    "delimiter must be a single ASCII character, got {value:?}"
                ))),
            }
        }
    }
}
