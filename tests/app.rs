use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use gbk_fetch::accessions::TableOptions;
use gbk_fetch::app::App;
use gbk_fetch::config::ResolvedConfig;
use gbk_fetch::domain::{Accession, FetchFormat};
use gbk_fetch::error::{ErrorKind, GbkError};
use gbk_fetch::ncbi::{ClientSettings, DEFAULT_EUTILS_BASE, NcbiClient};
use gbk_fetch::output::JsonOutput;
use gbk_fetch::store::Store;

/// Serves FASTA records but never GenBank records for accessions in `broken`.
#[derive(Default)]
struct MockNcbi {
    broken: Vec<String>,
    calls: Mutex<usize>,
}

impl NcbiClient for MockNcbi {
    fn fetch(&self, accession: &Accession, format: FetchFormat) -> Result<String, GbkError> {
        *self.calls.lock().unwrap() += 1;
        if format == FetchFormat::GenBank && self.broken.iter().any(|b| b == accession.as_str()) {
            return Err(GbkError::NcbiHttp("timed out".to_string()));
        }
        Ok(format!("{}:{}\n", format.rettype(), accession))
    }
}

fn config_for(root: &Utf8PathBuf, table: &str) -> ResolvedConfig {
    let input = root.join("PATRIC_genome.csv");
    fs::write(input.as_std_path(), table).unwrap();
    ResolvedConfig {
        input,
        store: Store::new(root.join("gbk_file"), root.join("fasta_file")),
        table: TableOptions::default(),
        client: ClientSettings {
            email: "someone@example.org".to_string(),
            tool: "gbk-fetch".to_string(),
            api_key: None,
            base_url: DEFAULT_EUTILS_BASE.to_string(),
            timeout: Duration::from_secs(30),
        },
        formats: FetchFormat::ALL.to_vec(),
    }
}

fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

#[test]
fn run_downloads_both_formats_and_reports_manual_list() {
    let (_temp, root) = temp_root();
    let config = config_for(
        &root,
        "Genome ID,GenBank Accessions\n1,NC_000001\n2,NC_000002\n3,NC_000003\n",
    );
    let app = App::new(MockNcbi {
        broken: vec!["NC_000002".to_string()],
        ..MockNcbi::default()
    });

    let summary = app.run(&config, &JsonOutput).unwrap();

    assert_eq!(summary.accessions, 3);
    assert!(!summary.cancelled);
    assert_eq!(summary.formats.len(), 2);

    let gbk = &summary.formats[0];
    assert_eq!(gbk.format, FetchFormat::GenBank);
    assert_eq!(gbk.saved, 2);
    assert_eq!(gbk.first_pass_failed, 1);
    assert_eq!(gbk.recovered, 0);
    assert_eq!(gbk.manual, vec!["NC_000002".to_string()]);

    let fasta = &summary.formats[1];
    assert_eq!(fasta.format, FetchFormat::Fasta);
    assert_eq!(fasta.saved, 3);
    assert!(fasta.manual.is_empty());
    assert_eq!(summary.manual_total(), 1);

    // 3 GenBank + 1 GenBank retry + 3 FASTA
    assert_eq!(*app.downloader().client().calls.lock().unwrap(), 7);

    let gbk_file = root.join("gbk_file").join("NC_000001.gbk");
    assert_eq!(
        fs::read_to_string(gbk_file.as_std_path()).unwrap(),
        "gb:NC_000001\n"
    );
    assert!(!root.join("gbk_file").join("NC_000002.gbk").as_std_path().exists());
    assert!(root.join("fasta_file").join("NC_000002.fasta").as_std_path().exists());
}

#[test]
fn missing_column_fails_before_any_fetch() {
    let (_temp, root) = temp_root();
    let config = config_for(&root, "Genome ID,Genome Name\n1,E. coli\n");
    let app = App::new(MockNcbi::default());

    let err = app.run(&config, &JsonOutput).unwrap_err();

    assert_matches!(err, GbkError::MissingColumn { ref column, .. } if column == "GenBank Accessions");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(*app.downloader().client().calls.lock().unwrap(), 0);
    assert!(!root.join("gbk_file").as_std_path().exists());
}

#[test]
fn unusable_output_dir_fails_before_any_fetch() {
    let (_temp, root) = temp_root();
    let mut config = config_for(&root, "GenBank Accessions\nNC_000001\n");
    let blocker = root.join("blocker");
    fs::write(blocker.as_std_path(), b"").unwrap();
    config.store = Store::new(root.join("gbk_file"), blocker);
    let app = App::new(MockNcbi::default());

    let err = app.run(&config, &JsonOutput).unwrap_err();

    assert_matches!(err, GbkError::OutputDir { .. });
    assert_eq!(*app.downloader().client().calls.lock().unwrap(), 0);
}

#[test]
fn single_format_run() {
    let (_temp, root) = temp_root();
    let mut config = config_for(&root, "GenBank Accessions\nNC_000001\n");
    config.formats = vec![FetchFormat::Fasta];
    let app = App::new(MockNcbi::default());

    let summary = app.run(&config, &JsonOutput).unwrap();

    assert_eq!(summary.formats.len(), 1);
    assert_eq!(summary.formats[0].format, FetchFormat::Fasta);
    assert!(!root.join("gbk_file").as_std_path().exists());
}

#[test]
fn interrupted_run_lists_every_accession_for_manual_download() {
    let (_temp, root) = temp_root();
    let config = config_for(&root, "GenBank Accessions\nNC_000001\nNC_000002\n");
    let cancel = Arc::new(AtomicBool::new(true));
    let app = App::new(MockNcbi::default()).with_cancel(cancel.clone());

    let summary = app.run(&config, &JsonOutput).unwrap();

    assert!(cancel.load(Ordering::SeqCst));
    assert!(summary.cancelled);
    assert_eq!(*app.downloader().client().calls.lock().unwrap(), 0);
    assert_eq!(summary.formats.len(), 2);
    for format in &summary.formats {
        assert_eq!(format.saved, 0);
        assert_eq!(format.recovered, 0);
        assert_eq!(
            format.manual,
            vec!["NC_000001".to_string(), "NC_000002".to_string()]
        );
    }
    assert_eq!(summary.manual_total(), 4);
    assert!(!root.join("gbk_file").join("NC_000001.gbk").as_std_path().exists());
}
