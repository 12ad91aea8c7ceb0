//! Entur journey-planner GraphQL client.
//!
//! Asks for the next estimated calls at a stop place. The response's
//! `stopPlace` object is passed through untouched; the frontend reads it
//! directly.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use super::error::DeparturesError;

/// Default journey-planner endpoint.
const DEFAULT_ENDPOINT: &str = "https://api.entur.io/journey-planner/v3/graphql";

/// Entur identifies API consumers by this header.
const CLIENT_NAME_HEADER: &str = "et-client-name";

/// Departure board for one stop place.
const STOP_PLACE_QUERY: &str = "\
query StopPlaceDepartures($id: String!, $timeRange: Int!, $numberOfDepartures: Int!) {
  stopPlace(id: $id) {
    name
    id
    estimatedCalls(timeRange: $timeRange, numberOfDepartures: $numberOfDepartures) {
      realtime
      aimedDepartureTime
      expectedDepartureTime
      destinationDisplay {
        frontText
      }
      serviceJourney {
        line {
          id
          name
          transportMode
        }
      }
    }
  }
}";

/// Default look-ahead window in seconds.
pub const DEFAULT_TIME_RANGE: u32 = 7200;

/// Default number of departures returned.
pub const DEFAULT_NUMBER_OF_DEPARTURES: u32 = 15;

/// A departure board request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DepartureQuery {
    /// Stop place id, e.g. `NSR:StopPlace:30000`
    pub stop_place_id: String,
    /// Look-ahead window in seconds
    pub time_range: u32,
    pub number_of_departures: u32,
}

impl DepartureQuery {
    pub fn new(stop_place_id: impl Into<String>) -> Self {
        Self {
            stop_place_id: stop_place_id.into(),
            time_range: DEFAULT_TIME_RANGE,
            number_of_departures: DEFAULT_NUMBER_OF_DEPARTURES,
        }
    }

    pub fn with_time_range(mut self, secs: u32) -> Self {
        self.time_range = secs;
        self
    }

    pub fn with_number_of_departures(mut self, n: u32) -> Self {
        self.number_of_departures = n;
        self
    }
}

/// GraphQL request body.
#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'static str,
    variables: Variables<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Variables<'a> {
    id: &'a str,
    time_range: u32,
    number_of_departures: u32,
}

impl<'a> GraphQlRequest<'a> {
    fn stop_place(query: &'a DepartureQuery) -> Self {
        Self {
            query: STOP_PLACE_QUERY,
            variables: Variables {
                id: &query.stop_place_id,
                time_range: query.time_range,
                number_of_departures: query.number_of_departures,
            },
        }
    }
}

/// Configuration for the Entur client.
#[derive(Debug, Clone)]
pub struct EnturConfig {
    /// Value of the `ET-Client-Name` header, `<company>-<application>`
    pub client_name: String,
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl EnturConfig {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }

    /// Set a custom endpoint (for testing).
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Entur journey-planner client.
#[derive(Debug, Clone)]
pub struct EnturClient {
    http: reqwest::Client,
    endpoint: String,
}

impl EnturClient {
    pub fn new(config: EnturConfig) -> Result<Self, DeparturesError> {
        let mut headers = HeaderMap::new();
        let client_name =
            HeaderValue::from_str(&config.client_name).map_err(|_| DeparturesError::Api {
                status: 0,
                message: "Invalid client name".to_string(),
            })?;
        headers.insert(HeaderName::from_static(CLIENT_NAME_HEADER), client_name);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint,
        })
    }

    /// Fetch the departure board for a stop place.
    ///
    /// Returns the `stopPlace` object. An unknown stop place is
    /// `StopPlaceNotFound`.
    pub async fn stop_place_departures(
        &self,
        query: &DepartureQuery,
    ) -> Result<Value, DeparturesError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&GraphQlRequest::stop_place(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeparturesError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        extract_stop_place(&body, &query.stop_place_id)
    }
}

/// Pull `data.stopPlace` out of a GraphQL response.
pub(crate) fn extract_stop_place(
    body: &str,
    stop_place_id: &str,
) -> Result<Value, DeparturesError> {
    if body.trim().is_empty() {
        return Err(DeparturesError::Json {
            message: "empty response from Entur API".to_string(),
        });
    }

    let mut document: Value = serde_json::from_str(body).map_err(|e| DeparturesError::Json {
        message: e.to_string(),
    })?;

    match document.pointer_mut("/data/stopPlace").map(Value::take) {
        Some(Value::Null) | None => Err(DeparturesError::StopPlaceNotFound(
            stop_place_id.to_string(),
        )),
        Some(stop_place) => Ok(stop_place),
    }
}
