//! Stop store and GTFS import error types.

/// Errors from the stop table and the GTFS import pipeline.
#[derive(Debug, thiserror::Error)]
pub enum StopsError {
    /// Archive download failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Archive download returned an error status
    #[error("download failed with status {status}")]
    Download { status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The archive has no entry with the expected name
    #[error("{0} not found in GTFS archive")]
    EntryNotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A blocking import step panicked or was cancelled
    #[error("import task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
