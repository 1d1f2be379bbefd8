//! OpenAI embeddings provider.
//!
//! Talks to any OpenAI-compatible `/embeddings` endpoint over HTTP.

use super::types::*;
use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt;
use tracing::debug;

/// OpenAI HTTP API provider.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
    http_client: reqwest::Client,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl OpenAiProvider {
    /// Creates a provider from the embedding section of the config.
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url);

        let embed_request = EmbedRequest {
            model: self.model.clone(),
            input: text.to_string(),
        };

        debug!(model = %self.model, chars = text.len(), "Requesting embedding");
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&embed_request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Auth(error_text));
        }
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await?;
        let embed_response: EmbedResponse = serde_json::from_str(&body)?;

        let embedding = embed_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::Malformed("No embeddings returned".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(ProviderError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one canned HTTP response and returns the raw request.
    async fn serve_once(status_line: &'static str, body: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}/v1", addr), handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn provider(base_url: String, dimension: usize) -> OpenAiProvider {
        OpenAiProvider::new(&EmbeddingConfig {
            api_key: "sk-test".to_string(),
            base_url,
            dimension,
            ..EmbeddingConfig::default()
        })
    }

    #[tokio::test]
    async fn test_embed_success() {
        let body = serde_json::json!({"data": [{"embedding": [0.1, 0.2, 0.3]}]}).to_string();
        let (url, server) = serve_once("200 OK", body).await;

        let embedding = provider(url, 3).embed("thin airfoil").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/embeddings"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains("\"input\":\"thin airfoil\""));
    }

    #[tokio::test]
    async fn test_embed_unauthorized() {
        let (url, _server) = serve_once("401 Unauthorized", "{\"error\":\"bad key\"}".to_string()).await;
        let err = provider(url, 3).embed("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Auth(_)));
    }

    #[tokio::test]
    async fn test_embed_server_error() {
        let (url, _server) = serve_once("500 Internal Server Error", "{}".to_string()).await;
        let err = provider(url, 3).embed("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_embed_malformed_body() {
        let (url, _server) = serve_once("200 OK", "not json".to_string()).await;
        let err = provider(url, 3).embed("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Json(_)));
    }

    #[tokio::test]
    async fn test_embed_empty_data() {
        let (url, _server) = serve_once("200 OK", "{\"data\": []}".to_string()).await;
        let err = provider(url, 3).embed("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_embed_wrong_dimension() {
        let body = serde_json::json!({"data": [{"embedding": [0.1, 0.2]}]}).to_string();
        let (url, _server) = serve_once("200 OK", body).await;
        let err = provider(url, 3).embed("x").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::DimensionMismatch { expected: 3, actual: 2 }
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let rendered = format!("{:?}", provider("http://localhost".to_string(), 3));
        assert!(!rendered.contains("sk-test"));
    }
}
