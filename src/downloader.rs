use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{Accession, FetchFormat};
use crate::error::GbkError;
use crate::ncbi::NcbiClient;
use crate::store::{record_path, write_text_atomic};

#[derive(Debug)]
pub struct Failure {
    pub accession: Accession,
    pub error: GbkError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub saved: Vec<Utf8PathBuf>,
    pub failures: Vec<Failure>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn failed_accessions(&self) -> Vec<Accession> {
        self.failures
            .iter()
            .map(|failure| failure.accession.clone())
            .collect()
    }
}

/// Marks `cancel` as requested. Returns `true` when it was already set, i.e.
/// the operator interrupted twice and the caller should exit immediately.
pub fn request_cancel(cancel: &AtomicBool) -> bool {
    cancel.swap(true, Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    First,
    Retry,
}

/// Fetch-and-save loop shared by the batch pass and the retry pass.
pub struct Downloader<N: NcbiClient> {
    client: N,
    cancel: Arc<AtomicBool>,
}

impl<N: NcbiClient> Downloader<N> {
    pub fn new(client: N) -> Self {
        Self {
            client,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares `cancel` with a signal handler; once set, remaining accessions
    /// are recorded as failures without being fetched.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn client(&self) -> &N {
        &self.client
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// One attempt per accession, in order. Never aborts on a single failure.
    pub fn download_batch(
        &self,
        accessions: &[Accession],
        dir: &Utf8Path,
        format: FetchFormat,
        sink: &dyn ProgressSink,
    ) -> BatchReport {
        info!(format = %format, dir = %dir, count = accessions.len(), "starting download pass");
        sink.event(ProgressEvent {
            message: format!(
                "downloading {} {format} records into {dir}",
                accessions.len()
            ),
            elapsed: None,
        });
        self.run_pass(accessions, dir, format, Pass::First, sink)
    }

    /// Exactly one more attempt per previously failed accession.
    pub fn retry_failed(
        &self,
        failed: &[Accession],
        dir: &Utf8Path,
        format: FetchFormat,
        sink: &dyn ProgressSink,
    ) -> BatchReport {
        if failed.is_empty() {
            return BatchReport::default();
        }
        info!(format = %format, count = failed.len(), "retrying failed downloads");
        sink.event(ProgressEvent {
            message: format!("retrying {} failed {format} downloads", failed.len()),
            elapsed: None,
        });
        self.run_pass(failed, dir, format, Pass::Retry, sink)
    }

    fn run_pass(
        &self,
        accessions: &[Accession],
        dir: &Utf8Path,
        format: FetchFormat,
        pass: Pass,
        sink: &dyn ProgressSink,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for accession in accessions {
            if self.is_cancelled() {
                report.cancelled = true;
                report.failures.push(Failure {
                    accession: accession.clone(),
                    error: GbkError::Cancelled(accession.to_string()),
                });
                continue;
            }

            let started = Instant::now();
            match self.fetch_and_save(accession, dir, format) {
                Ok(path) => {
                    let message = match pass {
                        Pass::First => format!("downloaded {accession} -> {path}"),
                        Pass::Retry => format!("second attempt downloaded {accession} -> {path}"),
                    };
                    sink.event(ProgressEvent {
                        message,
                        elapsed: Some(started.elapsed()),
                    });
                    report.saved.push(path);
                }
                Err(error) => {
                    warn!(accession = %accession, format = %format, error = %error, "download failed");
                    let message = match pass {
                        Pass::First => format!("failed {accession} ({format}): {error}"),
                        Pass::Retry => format!(
                            "failed {accession} ({format}) again, download it manually: {error}"
                        ),
                    };
                    sink.event(ProgressEvent {
                        message,
                        elapsed: Some(started.elapsed()),
                    });
                    report.failures.push(Failure {
                        accession: accession.clone(),
                        error,
                    });
                }
            }
        }
        if report.cancelled {
            warn!(format = %format, "pass interrupted; remaining accessions were not attempted");
        }
        report
    }

    fn fetch_and_save(
        &self,
        accession: &Accession,
        dir: &Utf8Path,
        format: FetchFormat,
    ) -> Result<Utf8PathBuf, GbkError> {
        let body = self.client.fetch(accession, format)?;
        let path = record_path(dir, accession, format)?;
        write_text_atomic(&path, &body)?;
        Ok(path)
    }
}
