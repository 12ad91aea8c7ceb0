//! Journey-planner client error types.

/// Errors from the Entur journey-planner API.
#[derive(Debug, thiserror::Error)]
pub enum DeparturesError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response was not the JSON we expected
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// The stop place is unknown or has no active service
    #[error("stop {0} not found or inactive")]
    StopPlaceNotFound(String),
}

impl DeparturesError {
    /// Whether the failure is the upstream service being unreachable or
    /// refusing the request, rather than a bad answer.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DeparturesError::Http(_) | DeparturesError::Api { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DeparturesError::StopPlaceNotFound("NSR:StopPlace:1".into());
        assert_eq!(err.to_string(), "stop NSR:StopPlace:1 not found or inactive");

        let err = DeparturesError::Api {
            status: 429,
            message: "Too Many Requests".into(),
        };
        assert_eq!(err.to_string(), "API error 429: Too Many Requests");
        assert!(err.is_unavailable());

        let err = DeparturesError::Json {
            message: "expected value".into(),
        };
        assert!(!err.is_unavailable());
    }
}
