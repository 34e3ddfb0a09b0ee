//! HTTP client for the dashboard backend's query endpoints.
//!
//! Stateless request/response calls: snapshot, history, alarm and stats
//! fetches plus the acknowledge round-trip. The client never mutates local
//! state; callers feed successful responses into the store and leave
//! existing state untouched on failure.
//!
//! # Example
//!
//! ```no_run
//! use shield_net::ApiClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new("http://localhost:5000")?;
//!
//! let sensors = client.sensors().await?;
//! println!("{} sensors registered", sensors.len());
//!
//! let history = client.sensor_data("HUMID_001", 100).await?;
//! println!("{} points", history.len());
//! Ok(())
//! # }
//! ```

use reqwest::Client;
use serde::Deserialize;

use shield_types::{Alarm, Point, SensorMeta, SystemStats};

use crate::error::{Error, Result};

/// HTTP client for the backend API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

/// Health probe response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    /// `"healthy"` or `"unhealthy"`.
    pub status: String,
    /// Server-side timestamp, verbatim.
    #[serde(default)]
    pub timestamp: String,
    /// Storage backend descriptor.
    #[serde(default)]
    pub storage: Option<String>,
}

impl HealthResponse {
    /// Whether the backend reported itself healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Outcome of an acknowledge round-trip.
#[derive(Debug, Clone, Deserialize)]
pub struct AckResponse {
    /// `"success"` on the happy path.
    pub status: String,
    /// Human-readable outcome.
    #[serde(default)]
    pub message: String,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The backend base URL (e.g. "http://localhost:5000")
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(Error::Request)?;
        Self::with_client(base_url, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        // Normalize URL (remove trailing slash)
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        Ok(Self { client, base_url })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the backend is reachable and healthy.
    pub async fn is_reachable(&self) -> bool {
        self.health().await.map(|h| h.is_healthy()).unwrap_or(false)
    }

    /// Probe backend health.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base_url);
        self.get(&url).await
    }

    /// Fetch the authoritative sensor snapshot.
    pub async fn sensors(&self) -> Result<Vec<SensorMeta>> {
        let url = format!("{}/api/sensors", self.base_url);
        self.get(&url).await
    }

    /// Fetch reading history for one sensor, newest first, at most `limit`
    /// entries.
    pub async fn sensor_data(&self, sensor_id: &str, limit: usize) -> Result<Vec<Point>> {
        let url = format!(
            "{}/api/sensors/{}/data?limit={}",
            self.base_url, sensor_id, limit
        );
        self.get(&url).await
    }

    /// Fetch alarms, newest first, optionally filtered by acknowledged
    /// state.
    pub async fn alarms(&self, limit: usize, acknowledged: Option<bool>) -> Result<Vec<Alarm>> {
        let mut url = format!("{}/api/alarms?limit={}", self.base_url, limit);
        if let Some(acknowledged) = acknowledged {
            url.push_str(&format!("&acknowledged={}", acknowledged));
        }
        self.get(&url).await
    }

    /// Acknowledge one alarm on the backend.
    ///
    /// On success the caller applies the local acknowledge; a 404 means the
    /// backend no longer knows the alarm.
    pub async fn acknowledge_alarm(&self, alarm_id: u64) -> Result<AckResponse> {
        let url = format!("{}/api/alarms/{}/acknowledge", self.base_url, alarm_id);
        self.post_empty(&url).await
    }

    /// Fetch the dashboard stats aggregate.
    pub async fn dashboard_stats(&self) -> Result<SystemStats> {
        let url = format!("{}/api/dashboard/stats", self.base_url);
        self.get(&url).await
    }

    // ======================================================================
    // Internal HTTP helpers
    // ======================================================================

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::NotReachable {
                url: url.to_string(),
                source: e,
            })?;

        self.handle_response(response).await
    }

    async fn post_empty<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| Error::NotReachable {
                url: url.to_string(),
                source: e,
            })?;

        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(Error::Request)
        } else {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .or_else(|| v.get("error"))
                        .and_then(|m| m.as_str())
                        .map(String::from)
                })
                .unwrap_or_else(|| status.to_string());

            Err(Error::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new("http://localhost:5000");
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_client_normalizes_url() {
        let client = ApiClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_client_invalid_url() {
        let result = ApiClient::new("localhost:5000");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_health_response_flag() {
        let healthy: HealthResponse =
            serde_json::from_str(r#"{"status": "healthy", "storage": "in-memory"}"#).unwrap();
        assert!(healthy.is_healthy());

        let sick: HealthResponse = serde_json::from_str(r#"{"status": "unhealthy"}"#).unwrap();
        assert!(!sick.is_healthy());
    }

    #[test]
    fn test_ack_response_shape() {
        let ack: AckResponse =
            serde_json::from_str(r#"{"status": "success", "message": "Alarm acknowledged"}"#)
                .unwrap();
        assert_eq!(ack.status, "success");
    }
}
