//! HTTP transport for the collection and profile endpoints.
//!
//! The agent only depends on the [`Transport`] trait; [`ReqwestTransport`]
//! is the default implementation when the `http` feature is enabled.

use async_trait::async_trait;
use thiserror::Error;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Transport error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Client could not be constructed
    #[error("transport setup error: {0}")]
    Setup(String),
    /// Network/HTTP error
    #[error("network error: {0}")]
    Network(String),
    /// Response body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

/// Issues cache-disabled GET requests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl ReqwestTransport {
    /// Create a transport with the given request timeout.
    pub fn new(timeout: std::time::Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_status() {
        assert!(TransportResponse::new(200, "").is_ok());
        assert!(!TransportResponse::new(204, "").is_ok());
        assert!(!TransportResponse::new(500, "oops").is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::Network("connection refused".to_string());
        assert_eq!(format!("{err}"), "network error: connection refused");
    }
}
