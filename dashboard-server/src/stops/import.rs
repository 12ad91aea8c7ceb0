//! One-time import of GTFS stops into the stop table.
//!
//! Runs at startup. If the table already has rows nothing happens;
//! otherwise the archive is downloaded, `stops.txt` extracted and parsed,
//! and every stop written in a single transaction. Failures are logged and
//! leave the table as it was.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::USER_AGENT;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use super::error::StopsError;
use super::parse::parse_stops;
use super::store::StopStore;

/// Aggregated GTFS feed for Skyss (Vestland).
const DEFAULT_ARCHIVE_URL: &str =
    "https://storage.googleapis.com/marduk-production/outbound/gtfs/rb_sky-aggregated-gtfs.zip";

/// Archives are large; allow well beyond a normal request timeout.
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const STOPS_ENTRY: &str = "stops.txt";

/// Configuration for the GTFS stop import.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub archive_url: String,
    /// Where the downloaded archive is kept
    pub archive_path: PathBuf,
    /// Where the stops entry is extracted to
    pub extract_path: PathBuf,
    pub user_agent: String,
    pub timeout: Duration,
}

impl ImportConfig {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            archive_path: PathBuf::from("database/gtfs.zip"),
            extract_path: PathBuf::from("database/zipCache/stops.txt"),
            user_agent: user_agent.into(),
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    pub fn with_archive_url(mut self, url: impl Into<String>) -> Self {
        self.archive_url = url.into();
        self
    }

    /// Keep the archive and extracted file under `dir`.
    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.archive_path = dir.join("gtfs.zip");
        self.extract_path = dir.join("zipCache").join(STOPS_ENTRY);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// What an import run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The table already had this many stops; nothing was downloaded.
    AlreadyPopulated(i64),
    /// This many stops were written.
    Imported(u64),
    /// The archive parsed to zero stops; nothing was written.
    NothingParsed,
}

/// Populates the stop table from a GTFS archive.
pub struct GtfsImporter {
    config: ImportConfig,
    store: StopStore,
}

impl GtfsImporter {
    pub fn new(config: ImportConfig, store: StopStore) -> Self {
        Self { config, store }
    }

    /// Import if needed, logging instead of returning errors.
    pub async fn run(&self) {
        match self.import().await {
            Ok(ImportOutcome::AlreadyPopulated(count)) => {
                info!(count, "stop data already present, skipping import");
            }
            Ok(ImportOutcome::Imported(count)) => info!(count, "imported GTFS stops"),
            Ok(ImportOutcome::NothingParsed) => {
                warn!("no stops were parsed from the GTFS archive");
            }
            Err(e) => error!(error = %e, "GTFS stop import failed"),
        }
    }

    /// [`run`](Self::run), abandoned if `cancel` fires first.
    ///
    /// An insert cut short rolls back, leaving the table empty.
    pub async fn run_until_cancelled(&self, cancel: CancellationToken) {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => info!("GTFS stop import cancelled"),
            _ = self.run() => {}
        }
    }

    /// Import if the table is empty.
    pub async fn import(&self) -> Result<ImportOutcome, StopsError> {
        let existing = self.store.count().await?;
        if existing > 0 {
            return Ok(ImportOutcome::AlreadyPopulated(existing));
        }

        info!(url = %self.config.archive_url, "no stop data found, downloading GTFS archive");
        self.download().await?;

        let archive = self.config.archive_path.clone();
        let extract = self.config.extract_path.clone();
        let stops = tokio::task::spawn_blocking(move || {
            extract_entry(&archive, STOPS_ENTRY, &extract)?;
            Ok::<_, StopsError>(parse_stops(File::open(&extract)?))
        })
        .await??;

        if stops.is_empty() {
            return Ok(ImportOutcome::NothingParsed);
        }
        info!(count = stops.len(), "parsed GTFS stops");

        let written = self.store.insert_all(&stops).await?;
        Ok(ImportOutcome::Imported(written))
    }

    async fn download(&self) -> Result<(), StopsError> {
        let client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()?;

        let response = client
            .get(&self.config.archive_url)
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StopsError::Download {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        if let Some(parent) = self.config.archive_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.config.archive_path, &bytes).await?;

        info!(
            bytes = bytes.len(),
            path = %self.config.archive_path.display(),
            "downloaded GTFS archive"
        );
        Ok(())
    }
}

/// Copy one named entry out of a zip archive to `dest`.
///
/// A missing entry is an error; the entries that are present get logged.
pub fn extract_entry(archive: &Path, name: &str, dest: &Path) -> Result<(), StopsError> {
    let mut archive = ZipArchive::new(File::open(archive)?)?;

    if !archive.file_names().any(|n| n == name) {
        let present: Vec<&str> = archive.file_names().collect();
        error!(entry = name, ?present, "entry missing from GTFS archive");
        return Err(StopsError::EntryNotFound(name.to_string()));
    }
    let mut entry = archive.by_name(name).map_err(|e| match e {
        ZipError::FileNotFound => StopsError::EntryNotFound(name.to_string()),
        e => e.into(),
    })?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = File::create(dest)?;
    io::copy(&mut entry, &mut out)?;

    info!(entry = name, path = %dest.display(), "extracted archive entry");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stops::StopRecord;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    const STOPS_TXT: &str = "stop_id,stop_name,stop_lat,stop_lon,stop_desc,location_type,parent_station,wheelchair_boarding,vehicle_type,platform_code
NSR:StopPlace:1,Torget,60.395,5.323,,1,,,,
NSR:Quay:11,Torget,60.395,5.324,,0,NSR:StopPlace:1,1,,A
";

    fn write_archive(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn config_defaults() {
        let config = ImportConfig::new("BergenApp/1.0");
        assert_eq!(config.archive_url, DEFAULT_ARCHIVE_URL);
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert_eq!(config.archive_path, PathBuf::from("database/gtfs.zip"));
        assert_eq!(
            config.extract_path,
            PathBuf::from("database/zipCache/stops.txt")
        );
    }

    #[test]
    fn config_work_dir() {
        let config = ImportConfig::new("BergenApp/1.0").with_work_dir("/tmp/gtfs");
        assert_eq!(config.archive_path, PathBuf::from("/tmp/gtfs/gtfs.zip"));
        assert_eq!(
            config.extract_path,
            PathBuf::from("/tmp/gtfs/zipCache/stops.txt")
        );
    }

    #[test]
    fn extracts_named_entry() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("gtfs.zip");
        write_archive(&archive, &[("agency.txt", "agency_id\n"), ("stops.txt", STOPS_TXT)]);

        let dest = dir.path().join("nested").join("stops.txt");
        extract_entry(&archive, "stops.txt", &dest).unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), STOPS_TXT);
        let stops = parse_stops(File::open(&dest).unwrap());
        assert_eq!(stops.len(), 2);
    }

    #[test]
    fn missing_entry_is_an_error() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("gtfs.zip");
        write_archive(&archive, &[("agency.txt", "agency_id\n")]);

        let err = extract_entry(&archive, "stops.txt", &dir.path().join("stops.txt")).unwrap_err();
        assert!(matches!(err, StopsError::EntryNotFound(name) if name == "stops.txt"));
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("gtfs.zip");
        std::fs::write(&archive, b"not a zip").unwrap();

        let err = extract_entry(&archive, "stops.txt", &dir.path().join("stops.txt")).unwrap_err();
        assert!(matches!(err, StopsError::Zip(_)));
    }

    #[tokio::test]
    async fn populated_store_skips_download() {
        let store = StopStore::in_memory().await.unwrap();
        store
            .insert_all(&[StopRecord {
                stop_id: "NSR:StopPlace:1".into(),
                stop_name: "Torget".into(),
                stop_lat: 60.395,
                stop_lon: 5.323,
                stop_desc: None,
                location_type: None,
                parent_station: None,
                wheelchair_boarding: None,
                vehicle_type: None,
                platform_code: None,
            }])
            .await
            .unwrap();

        // Unroutable URL: reaching the download step would fail the import
        let config = ImportConfig::new("test").with_archive_url("http://127.0.0.1:9/gtfs.zip");
        let importer = GtfsImporter::new(config, store);

        assert_eq!(
            importer.import().await.unwrap(),
            ImportOutcome::AlreadyPopulated(1)
        );
    }

    #[tokio::test]
    async fn failed_download_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = StopStore::in_memory().await.unwrap();
        let config = ImportConfig::new("test")
            .with_archive_url("http://127.0.0.1:9/gtfs.zip")
            .with_work_dir(dir.path())
            .with_timeout(Duration::from_secs(2));
        let importer = GtfsImporter::new(config, store.clone());

        assert!(importer.import().await.is_err());
        importer.run().await;
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cancellation_abandons_a_stalled_download() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/gtfs.zip", listener.local_addr().unwrap());

        let dir = tempdir().unwrap();
        let store = StopStore::in_memory().await.unwrap();
        let config = ImportConfig::new("test")
            .with_archive_url(url)
            .with_work_dir(dir.path())
            .with_timeout(Duration::from_secs(60));
        let importer = GtfsImporter::new(config, store.clone());

        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { importer.run_until_cancelled(cancel).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("import did not stop after cancellation")
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        drop(listener);
    }
}
