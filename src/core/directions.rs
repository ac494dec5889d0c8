//! Direction-lookup collaborator
//!
//! The pipeline consumes travel durations through the [`DirectionLookup`]
//! seam. [`HttpDirections`] implements it against a Google-Directions-style
//! JSON endpoint; tests substitute scripted fakes.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;

use crate::core::error::{Error, Result};
use crate::core::geo::GeoPoint;

/// What the directions service said about one (from, to) pair.
///
/// These are service vocabulary, not errors: the pipeline handles each of
/// them. Transport and protocol failures travel as `Err` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// A route exists; travel takes this many seconds.
    Duration(u32),
    /// The service found no transit route between the points.
    NoRoute,
    /// The service refused the request for rate reasons; retry later.
    RateLimited,
}

/// Asynchronous travel-duration source.
///
/// Implementations must be cheap to call repeatedly: the pipeline issues
/// two calls per grid cell and retries rate-limited calls verbatim.
pub trait DirectionLookup {
    fn travel_duration(
        &self,
        from: GeoPoint,
        to: GeoPoint,
    ) -> impl Future<Output = Result<LookupOutcome>> + Send;
}

/// Shared HTTP client with keepalive and timeouts
static GLOBAL_CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .tcp_keepalive(Duration::from_secs(60))
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(format!("fairgrid/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to create HTTP client")
});

/// Configuration for the HTTP directions backend
#[derive(Debug, Clone)]
pub struct DirectionsConfig {
    /// Full endpoint URL for the directions service
    pub base_url: String,

    /// API key appended to every request, if the service wants one
    pub api_key: Option<String>,

    /// Departures are fixed at this hour (next occurrence, UTC)
    pub departure_hour: u8,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/directions/json".to_string(),
            api_key: None,
            departure_hour: 7,
        }
    }
}

impl DirectionsConfig {
    /// Default configuration with the API key taken from `FAIRGRID_API_KEY`.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("FAIRGRID_API_KEY").ok(),
            ..Default::default()
        }
    }
}

/// Directions lookup over a Google-Directions-style HTTP endpoint.
///
/// The service's `status` field carries its error vocabulary:
/// `OK`, `ZERO_RESULTS` (no route), `OVER_QUERY_LIMIT` (rate limited).
/// Anything else is a protocol failure and surfaces as [`Error::ApiError`].
pub struct HttpDirections {
    client: Client,
    config: DirectionsConfig,
}

impl HttpDirections {
    /// Create a lookup backend with the given configuration, sharing the
    /// global HTTP client.
    pub fn new(config: DirectionsConfig) -> Self {
        Self {
            client: GLOBAL_CLIENT.clone(),
            config,
        }
    }

    async fn request(&self, from: GeoPoint, to: GeoPoint) -> Result<LookupOutcome> {
        let departure = next_departure_epoch(self.config.departure_hour, SystemTime::now());

        let mut query: Vec<(&str, String)> = vec![
            ("origin", format!("{},{}", from.lat, from.lng)),
            ("destination", format!("{},{}", to.lat, to.lng)),
            ("mode", "transit".to_string()),
            ("departure_time", departure.to_string()),
        ];
        if let Some(key) = &self.config.api_key {
            query.push(("key", key.clone()));
        }

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::HttpError(format!(
                "Directions request failed: {status}"
            )));
        }

        let body: DirectionsResponse = response
            .json()
            .await
            .map_err(|e| Error::ApiError(format!("Malformed directions response: {e}")))?;

        match body.status.as_str() {
            "OK" => {
                let seconds = body
                    .routes
                    .first()
                    .and_then(|route| route.legs.first())
                    .map(|leg| leg.duration.value)
                    .ok_or_else(|| {
                        Error::ApiError("OK response carried no route leg".to_string())
                    })?;
                Ok(LookupOutcome::Duration(seconds))
            }
            "ZERO_RESULTS" => Ok(LookupOutcome::NoRoute),
            "OVER_QUERY_LIMIT" => Ok(LookupOutcome::RateLimited),
            other => {
                let detail = body
                    .error_message
                    .map(|msg| format!("{other}: {msg}"))
                    .unwrap_or_else(|| other.to_string());
                Err(Error::ApiError(detail))
            }
        }
    }
}

impl DirectionLookup for HttpDirections {
    fn travel_duration(
        &self,
        from: GeoPoint,
        to: GeoPoint,
    ) -> impl Future<Output = Result<LookupOutcome>> + Send {
        self.request(from, to)
    }
}

/// Epoch seconds of the next occurrence of `hour`:00 UTC at or after `now`.
fn next_departure_epoch(hour: u8, now: SystemTime) -> u64 {
    let now_secs = now
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    let midnight = now_secs - now_secs % 86_400;
    let mut departure = midnight + u64::from(hour) * 3_600;
    if departure <= now_secs {
        departure += 86_400;
    }
    departure
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<Route>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    duration: DurationValue,
}

#[derive(Debug, Deserialize)]
struct DurationValue {
    value: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_backend(server: &MockServer) -> HttpDirections {
        HttpDirections::new(DirectionsConfig {
            base_url: format!("{}/directions/json", server.uri()),
            api_key: Some("test-key".to_string()),
            departure_hour: 7,
        })
    }

    const FROM: GeoPoint = GeoPoint {
        lat: 52.5,
        lng: 13.3,
    };
    const TO: GeoPoint = GeoPoint {
        lat: 52.52,
        lng: 13.41,
    };

    #[tokio::test]
    async fn test_ok_response_yields_duration() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/directions/json"))
            .and(query_param("origin", "52.5,13.3"))
            .and(query_param("destination", "52.52,13.41"))
            .and(query_param("mode", "transit"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "routes": [{"legs": [{"duration": {"value": 1860}}]}]
            })))
            .mount(&server)
            .await;

        let outcome = test_backend(&server)
            .travel_duration(FROM, TO)
            .await
            .unwrap();
        assert_eq!(outcome, LookupOutcome::Duration(1860));
    }

    #[tokio::test]
    async fn test_zero_results_maps_to_no_route() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/directions/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ZERO_RESULTS",
                "routes": []
            })))
            .mount(&server)
            .await;

        let outcome = test_backend(&server)
            .travel_duration(FROM, TO)
            .await
            .unwrap();
        assert_eq!(outcome, LookupOutcome::NoRoute);
    }

    #[tokio::test]
    async fn test_over_query_limit_maps_to_rate_limited() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/directions/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OVER_QUERY_LIMIT",
                "routes": []
            })))
            .mount(&server)
            .await;

        let outcome = test_backend(&server)
            .travel_duration(FROM, TO)
            .await
            .unwrap();
        assert_eq!(outcome, LookupOutcome::RateLimited);
    }

    #[tokio::test]
    async fn test_request_denied_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/directions/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid.",
                "routes": []
            })))
            .mount(&server)
            .await;

        let err = test_backend(&server)
            .travel_duration(FROM, TO)
            .await
            .unwrap_err();
        match err {
            Error::ApiError(msg) => {
                assert!(msg.contains("REQUEST_DENIED"));
                assert!(msg.contains("API key"));
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_failure_is_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/directions/json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = test_backend(&server)
            .travel_duration(FROM, TO)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HttpError(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_ok_without_legs_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/directions/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "routes": []
            })))
            .mount(&server)
            .await;

        let err = test_backend(&server)
            .travel_duration(FROM, TO)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ApiError(_)), "got {err:?}");
    }

    #[test]
    fn test_next_departure_epoch() {
        // 2024-01-15 06:00 UTC -> same day 07:00.
        let morning = UNIX_EPOCH + Duration::from_secs(1_705_298_400);
        assert_eq!(next_departure_epoch(7, morning), 1_705_302_000);

        // 2024-01-15 08:00 UTC -> next day 07:00.
        let late = UNIX_EPOCH + Duration::from_secs(1_705_305_600);
        assert_eq!(next_departure_epoch(7, late), 1_705_302_000 + 86_400);

        // Exactly 07:00 rolls to the next day (departure strictly ahead).
        let exact = UNIX_EPOCH + Duration::from_secs(1_705_302_000);
        assert_eq!(next_departure_epoch(7, exact), 1_705_302_000 + 86_400);
    }
}
