//! Pitch-deck scoring collaborator.
//!
//! The scoring call is the only external call that blocks a request, so it
//! carries an explicit timeout. A timeout is the same failure class as any
//! other scoring error: hard failure, no partial completion.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;

use crate::config::ScoringConfig;
use crate::error::ExternalServiceError;
use crate::onboarding::model::ScoringResult;

/// External scoring API operations.
#[async_trait]
pub trait ScoringClient: Send + Sync {
    /// Score a pitch deck from its raw bytes and original filename.
    async fn score_deck(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ScoringResult, ExternalServiceError>;

    /// Trigger certificate-artifact generation for a scored venture.
    /// Fire-and-forget on the caller side; failures are logged there.
    async fn generate_certificate(
        &self,
        venture_name: &str,
        result: &ScoringResult,
    ) -> Result<(), ExternalServiceError>;
}

/// HTTP implementation against the configured scoring API.
pub struct HttpScoringClient {
    config: ScoringConfig,
    client: reqwest::Client,
}

impl HttpScoringClient {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ScoringClient for HttpScoringClient {
    async fn score_deck(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ScoringResult, ExternalServiceError> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        // The timeout budget covers the whole exchange, body read included —
        // a stalled response body is still a timeout.
        let exchange = async {
            let resp = self
                .client
                .post(self.url("score"))
                .bearer_auth(self.config.api_key.expose_secret())
                .multipart(form)
                .send()
                .await
                .map_err(|e| ExternalServiceError::ScoringFailed {
                    reason: e.to_string(),
                })?;

            if !resp.status().is_success() {
                return Err(ExternalServiceError::ScoringFailed {
                    reason: format!("scoring API returned {}", resp.status()),
                });
            }

            resp.json()
                .await
                .map_err(|e| ExternalServiceError::InvalidResponse {
                    service: "scoring",
                    reason: e.to_string(),
                })
        };

        tokio::time::timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| ExternalServiceError::ScoringTimeout {
                secs: self.config.timeout.as_secs(),
            })?
    }

    async fn generate_certificate(
        &self,
        venture_name: &str,
        result: &ScoringResult,
    ) -> Result<(), ExternalServiceError> {
        let body = serde_json::json!({
            "venture": venture_name,
            "total_score": result.total_score,
            "dimensions": result.dimensions,
        });
        let resp = self
            .client
            .post(self.url("certificates"))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ExternalServiceError::ScoringFailed {
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(ExternalServiceError::ScoringFailed {
                reason: format!("certificate generation returned {}", resp.status()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[tokio::test]
    async fn stalled_response_body_hits_the_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // Headers promise a body that never finishes arriving.
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 1024\r\n\r\n{\"tot",
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = HttpScoringClient::new(ScoringConfig {
            base_url: format!("http://{addr}"),
            api_key: SecretString::from("test-key"),
            timeout: Duration::from_millis(250),
        });

        let err = client
            .score_deck("deck.pdf", b"deck bytes".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalServiceError::ScoringTimeout { .. }));
    }
}
