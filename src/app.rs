use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::accessions::extract_accessions;
use crate::config::ResolvedConfig;
use crate::domain::FetchFormat;
use crate::downloader::Downloader;
use crate::error::GbkError;
use crate::ncbi::NcbiClient;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input: String,
    pub accessions: usize,
    pub started_at: String,
    pub finished_at: String,
    pub cancelled: bool,
    pub formats: Vec<FormatSummary>,
}

impl RunSummary {
    pub fn manual_total(&self) -> usize {
        self.formats.iter().map(|format| format.manual.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FormatSummary {
    pub format: FetchFormat,
    pub directory: String,
    pub requested: usize,
    pub saved: usize,
    pub first_pass_failed: usize,
    pub recovered: usize,
    /// Accessions that failed both attempts, in input order.
    pub manual: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<N: NcbiClient> {
    downloader: Downloader<N>,
}

impl<N: NcbiClient> App<N> {
    pub fn new(client: N) -> Self {
        Self {
            downloader: Downloader::new(client),
        }
    }

    pub fn with_cancel(self, cancel: Arc<AtomicBool>) -> Self {
        Self {
            downloader: self.downloader.with_cancel(cancel),
        }
    }

    pub fn downloader(&self) -> &Downloader<N> {
        &self.downloader
    }

    /// Reads the accession table, then runs a download pass and a retry pass
    /// for each configured format. Only configuration and input errors are
    /// returned as `Err`; per-accession failures end up in the summary.
    pub fn run(
        &self,
        config: &ResolvedConfig,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, GbkError> {
        let started_at = Utc::now().to_rfc3339();

        let accessions = extract_accessions(&config.input, &config.table)?;
        sink.event(ProgressEvent {
            message: format!("read {} accessions from {}", accessions.len(), config.input),
            elapsed: None,
        });

        for format in &config.formats {
            config.store.ensure_dir(*format)?;
        }

        let mut formats = Vec::with_capacity(config.formats.len());
        let mut cancelled = false;
        for &format in &config.formats {
            let dir = config.store.dir_for(format);

            let first = self
                .downloader
                .download_batch(&accessions, dir, format, sink);
            let failed = first.failed_accessions();
            let retry = self.downloader.retry_failed(&failed, dir, format, sink);
            cancelled |= first.cancelled || retry.cancelled;

            let manual = retry
                .failed_accessions()
                .into_iter()
                .map(|acc| acc.as_str().to_string())
                .collect::<Vec<_>>();
            if manual.is_empty() {
                info!(format = %format, saved = first.saved.len() + retry.saved.len(), "format complete");
            } else {
                warn!(format = %format, count = manual.len(), "accessions require manual download");
            }

            formats.push(FormatSummary {
                format,
                directory: dir.to_string(),
                requested: accessions.len(),
                saved: first.saved.len() + retry.saved.len(),
                first_pass_failed: failed.len(),
                recovered: retry.saved.len(),
                manual,
            });
        }

        Ok(RunSummary {
            input: config.input.to_string(),
            accessions: accessions.len(),
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            cancelled,
            formats,
        })
    }
}
