//! GBFS feed error types.

/// Errors that can occur while fetching or merging the bike feeds.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed returned an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body was not the JSON we expected
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// Response had no `data.stations` array
    #[error("{feed} feed has no data.stations array")]
    MissingStations { feed: &'static str },
}
