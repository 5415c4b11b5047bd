use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use gbk_fetch::app::App;
use gbk_fetch::config::{Config, ConfigLoader};
use gbk_fetch::domain::FetchFormat;
use gbk_fetch::downloader::request_cancel;
use gbk_fetch::error::{ErrorKind, GbkError};
use gbk_fetch::ncbi::EntrezHttpClient;
use gbk_fetch::output::{ConsoleOutput, JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "gbk-fetch")]
#[command(about = "Download GenBank and FASTA records from NCBI for every accession in a table")]
#[command(version, author)]
struct Cli {
    /// JSON config file (defaults to gbk-fetch.json when present)
    #[arg(long)]
    config: Option<String>,

    /// Accession table with a "GenBank Accessions" column
    #[arg(long, short)]
    input: Option<String>,

    #[arg(long)]
    genbank_dir: Option<String>,

    #[arg(long)]
    fasta_dir: Option<String>,

    /// Contact email sent with every E-utilities request
    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    tool: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[arg(long)]
    column: Option<String>,

    #[arg(long)]
    delimiter: Option<String>,

    /// Restrict the run to these formats (repeatable)
    #[arg(long = "format", value_enum)]
    formats: Vec<FetchFormat>,

    /// Print the summary as JSON instead of progress lines
    #[arg(long)]
    non_interactive: bool,
}

impl Cli {
    fn overrides(&self) -> Config {
        Config {
            input: self.input.clone(),
            genbank_dir: self.genbank_dir.clone(),
            fasta_dir: self.fasta_dir.clone(),
            email: self.email.clone(),
            tool: self.tool.clone(),
            timeout_secs: self.timeout,
            column: self.column.clone(),
            delimiter: self.delimiter.clone(),
            base_url: None,
            api_key: None,
            formats: (!self.formats.is_empty()).then(|| self.formats.clone()),
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(error) = report.downcast_ref::<GbkError>() {
                return ExitCode::from(map_exit_code(error));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &GbkError) -> u8 {
    match error.kind() {
        ErrorKind::Configuration | ErrorKind::MalformedRow => 2,
        ErrorKind::Fetch | ErrorKind::Write => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let resolved = ConfigLoader::resolve(cli.config.as_deref(), cli.overrides())?;
    let client = EntrezHttpClient::new(&resolved.client)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        if request_cancel(&handler_flag) {
            std::process::exit(130);
        }
        eprintln!("interrupt received; finishing the current request (Ctrl-C again to abort)");
    })
    .into_diagnostic()?;

    let app = App::new(client).with_cancel(cancel);

    let summary = match output_mode {
        OutputMode::Interactive => {
            let summary = app.run(&resolved, &ConsoleOutput)?;
            ConsoleOutput::print_summary(&summary).into_diagnostic()?;
            summary
        }
        OutputMode::NonInteractive => {
            let summary = app.run(&resolved, &JsonOutput)?;
            JsonOutput::print_summary(&summary).into_diagnostic()?;
            summary
        }
    };

    if summary.cancelled {
        warn!("interrupted by user");
        return Ok(ExitCode::from(130));
    }
    Ok(ExitCode::SUCCESS)
}
