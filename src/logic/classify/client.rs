//! Classifier API Client
//!
//! HTTP client for the external traffic classifier service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logic::store::RequestDetail;

/// Classifier service configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        use crate::constants;

        Self {
            base_url: constants::get_classifier_url(),
            timeout_seconds: constants::DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

/// Classifier API client
pub struct ClassifierClient {
    config: ClassifierConfig,
    http_client: reqwest::Client,
}

// Request/Response types

#[derive(Debug, Serialize)]
pub struct ClassifyRequest {
    pub traffic: Vec<RequestDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifySummary {
    pub attack_percentage: f64,
    pub threat_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub url: String,
    /// "attack" or "normal"
    pub prediction: String,
    pub confidence: f64,
    pub attack_probability: f64,
}

impl Prediction {
    pub fn is_attack(&self) -> bool {
        self.prediction == "attack"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyResponse {
    pub summary: ClassifySummary,
    pub total_requests: u64,
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl ClassifierClient {
    /// Create new classifier client
    pub fn new(config: ClassifierConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Check classifier service health
    pub async fn health_check(&self) -> Result<HealthResponse, ClassifierError> {
        let url = format!("{}/health", self.config.base_url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClassifierError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| ClassifierError::ParseError(e.to_string()))
        } else {
            Err(ClassifierError::ServerError(response.status().as_u16()))
        }
    }

    /// Send one batch of completed request details for scoring
    pub async fn classify(
        &self,
        traffic: Vec<RequestDetail>,
    ) -> Result<ClassifyResponse, ClassifierError> {
        let url = format!("{}/analyze-traffic", self.config.base_url);
        let request = ClassifyRequest { traffic };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| ClassifierError::ParseError(e.to_string()))
        } else {
            Err(ClassifierError::ServerError(response.status().as_u16()))
        }
    }
}

/// Classifier client errors
#[derive(Debug, Clone)]
pub enum ClassifierError {
    NetworkError(String),
    ServerError(u16),
    ParseError(String),
}

impl std::fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkError(e) => write!(f, "Network error: {}", e),
            Self::ServerError(code) => write!(f, "Server error: {}", code),
            Self::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ClassifierError {}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const RESPONSE_JSON: &str = r#"{
        "summary": {"attack_percentage": 20.0, "threat_level": "medium"},
        "total_requests": 10,
        "predictions": [
            {"url": "https://a.com/login", "prediction": "attack", "confidence": 0.95, "attack_probability": 0.92},
            {"url": "https://b.com/", "prediction": "normal", "confidence": 0.88, "attack_probability": 0.05}
        ]
    }"#;

    fn detail(url: &str) -> RequestDetail {
        RequestDetail {
            url: url.to_string(),
            method: "GET".to_string(),
            domain: "a.com".to_string(),
            observed_at_ms: 1_000,
            start_ms: 1_000,
            request_size_bytes: 20,
            status_code: Some(200),
            duration_ms: Some(40),
            response_size_bytes: Some(1000),
        }
    }

    /// One-shot HTTP server: reads a full request, answers with `body`.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            // Read headers, then the content-length body
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(header_end) = find_header_end(&buf) {
                    let headers = String::from_utf8_lossy(&buf[..header_end]);
                    let expected = content_length(&headers);
                    if buf.len() >= header_end + 4 + expected {
                        break;
                    }
                }
            }

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}", addr)
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    fn content_length(headers: &str) -> usize {
        headers
            .lines()
            .find(|l| l.to_ascii_lowercase().starts_with("content-length:"))
            .and_then(|l| l.split(':').nth(1))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    #[test]
    fn test_parse_classifier_response() {
        let response: ClassifyResponse = serde_json::from_str(RESPONSE_JSON).unwrap();
        assert_eq!(response.total_requests, 10);
        assert_eq!(response.summary.threat_level, "medium");
        assert_eq!(response.predictions.len(), 2);
        assert!(response.predictions[0].is_attack());
        assert!(!response.predictions[1].is_attack());
    }

    #[test]
    fn test_request_body_shape() {
        let request = ClassifyRequest {
            traffic: vec![detail("https://a.com/login")],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["traffic"].is_array());
        assert_eq!(json["traffic"][0]["status_code"], 200);
    }

    #[tokio::test]
    async fn test_classify_against_mock_server() {
        let base = serve_once("HTTP/1.1 200 OK", RESPONSE_JSON).await;
        let client = ClassifierClient::new(ClassifierConfig {
            base_url: base,
            timeout_seconds: 5,
        });

        let response = client.classify(vec![detail("https://a.com/login")]).await.unwrap();
        assert_eq!(response.total_requests, 10);
        assert_eq!(response.predictions.len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let base = serve_once("HTTP/1.1 500 Internal Server Error", "{}").await;
        let client = ClassifierClient::new(ClassifierConfig {
            base_url: base,
            timeout_seconds: 5,
        });

        match client.classify(vec![detail("https://a.com/")]).await {
            Err(ClassifierError::ServerError(500)) => {}
            other => panic!("expected ServerError(500), got {:?}", other.map(|r| r.total_requests)),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let base = serve_once("HTTP/1.1 200 OK", "not json").await;
        let client = ClassifierClient::new(ClassifierConfig {
            base_url: base,
            timeout_seconds: 5,
        });

        match client.classify(vec![detail("https://a.com/")]).await {
            Err(ClassifierError::ParseError(_)) => {}
            other => panic!("expected ParseError, got {:?}", other.map(|r| r.total_requests)),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ClassifierClient::new(ClassifierConfig {
            base_url: format!("http://{}", addr),
            timeout_seconds: 2,
        });

        match client.health_check().await {
            Err(ClassifierError::NetworkError(_)) => {}
            other => panic!("expected NetworkError, got {:?}", other.map(|h| h.status)),
        }
    }

    #[tokio::test]
    async fn test_health_check_parses_status() {
        let base = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"status": "ok", "model": "Gradient Boosting Classifier"}"#,
        )
        .await;
        let client = ClassifierClient::new(ClassifierConfig {
            base_url: base,
            timeout_seconds: 5,
        });

        let health = client.health_check().await.unwrap();
        assert_eq!(health.status, "ok");
        assert!(health.model.is_some());
    }
}
