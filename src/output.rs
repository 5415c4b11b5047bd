use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunSummary};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

/// Progress lines and the final report as plain text on stdout.
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        write_summary(&mut stdout, summary)
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => println!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => println!("{}", event.message),
        }
    }
}

pub fn write_summary<W: Write>(out: &mut W, summary: &RunSummary) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "summary for {} ({} accessions)", summary.input, summary.accessions)?;
    for format in &summary.formats {
        writeln!(
            out,
            "  {}: saved {}/{} into {} ({} recovered on retry)",
            format.format, format.saved, format.requested, format.directory, format.recovered
        )?;
        if format.manual.is_empty() {
            writeln!(out, "  {}: nothing to download manually", format.format)?;
        } else {
            writeln!(
                out,
                "  {}: download manually: {}",
                format.format,
                format.manual.join(", ")
            )?;
        }
    }
    if summary.cancelled {
        writeln!(out, "run was interrupted; unattempted accessions are listed above")?;
    }
    Ok(())
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
