//! Embedding capability and vector similarity.

use crate::error::MemoryError;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com/v1";
/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[async_trait]
/// External capability turning text into a vector.
pub trait Embedder: Send + Sync {
    /// Embed `text`.
    ///
    /// Implementations report `EmbeddingUnavailable` when they cannot run at
    /// all and `EmbeddingFailed` when a call produced no usable vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;

    /// Model identifier, for diagnostics.
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiEmbedder {
    /// Create an embedder for the default endpoint and model.
    ///
    /// A missing or blank key makes every call fail with `EmbeddingUnavailable`.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }

    /// Override the endpoint base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Endpoint base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True when a credential is configured.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(MemoryError::EmbeddingUnavailable(
                "no embedding API key configured".to_string(),
            ));
        };

        debug!(
            "requesting embedding (model={}, text_len={})",
            self.model,
            text.len()
        );
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|err| MemoryError::EmbeddingFailed(format!("request failed: {err}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| MemoryError::EmbeddingFailed(format!("failed to read body: {err}")))?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|error| error.error.message)
                .unwrap_or(body);
            return Err(MemoryError::EmbeddingFailed(format!(
                "api error ({status}): {message}"
            )));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|err| MemoryError::EmbeddingFailed(format!("invalid response: {err}")))?;
        match parsed.data.into_iter().next() {
            Some(data) if !data.embedding.is_empty() => Ok(data.embedding),
            _ => Err(MemoryError::EmbeddingFailed(
                "response contained no embedding".to_string(),
            )),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Cosine similarity of two vectors.
///
/// Returns 0 when either vector is empty, the lengths differ, or either
/// magnitude is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_EMBEDDING_BASE_URL, Embedder, OpenAiEmbedder, cosine_similarity};
    use crate::error::MemoryError;
    use pretty_assertions::assert_eq;

    #[test]
    fn identical_vectors_are_fully_similar() {
        let value = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!((value - 1.0).abs() < 1e-3);
        let value = cosine_similarity(&[0.3, 0.4, 0.5], &[0.3, 0.4, 0.5]);
        assert!((value - 1.0).abs() < 1e-3);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let value = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(value.abs() < 1e-3);
    }

    #[test]
    fn degenerate_vectors_score_exactly_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn builder_normalizes_base_url() {
        let embedder = OpenAiEmbedder::new(Some("key".to_string()))
            .with_base_url("http://localhost:8080/v1/")
            .with_model("custom-model");
        assert_eq!(embedder.base_url(), "http://localhost:8080/v1");
        assert_eq!(embedder.model(), "custom-model");
        assert!(embedder.is_configured());
        assert_eq!(
            OpenAiEmbedder::new(None).base_url(),
            DEFAULT_EMBEDDING_BASE_URL
        );
    }

    #[tokio::test]
    async fn missing_key_is_unavailable_not_failed() {
        let embedder = OpenAiEmbedder::new(Some("   ".to_string()));
        assert!(!embedder.is_configured());
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, MemoryError::EmbeddingUnavailable(_)));
    }
}
