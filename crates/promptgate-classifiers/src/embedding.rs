//! Embedding providers for semantic similarity
//!
//! The neural model itself lives outside this crate. Two providers are
//! included:
//!
//! - [`HashEmbedder`]: deterministic FNV-1a feature hashing over words and
//!   character bigrams. Needs no network or model files; suitable for tests
//!   and offline deployments where near-duplicate phrasing is what matters.
//! - [`HttpEmbeddingProvider`]: an OpenAI-compatible `/embeddings` client.
//!
//! [`EmbeddingClient`] wraps any provider with a per-call timeout.

use async_trait::async_trait;
use promptgate_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Text-to-vector collaborator used by the semantic gate
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text into a fixed-length vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts; output order matches input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Provider name for logs
    fn name(&self) -> &str;
}

/// Cosine similarity; 0.0 when lengths differ or either vector is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// A provider plus the time budget for each call
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::timeout(self.timeout, self.provider.embed(text))
            .await
            .map_err(|_| Error::Timeout)?
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = tokio::time::timeout(self.timeout, self.provider.embed_batch(texts))
            .await
            .map_err(|_| Error::Timeout)??;

        if vectors.len() != texts.len() {
            return Err(Error::provider(format!(
                "{} returned {} embeddings for {} inputs",
                self.provider.name(),
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("provider", &self.provider.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Deterministic, API-free embedder based on FNV-1a feature hashing
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    /// Create an embedder with `dims` dimensions (minimum 1)
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dims];
        let lower = text.to_lowercase();

        // Word features
        for word in lower.split_whitespace() {
            let h = fnv1a(word.as_bytes());
            embedding[(h % self.dims as u64) as usize] += 1.0;
        }

        // Character bigrams, half weight
        let bytes = lower.as_bytes();
        for bigram in bytes.windows(2) {
            let h = fnv1a(bigram);
            embedding[(h % self.dims as u64) as usize] += 0.5;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn name(&self) -> &str {
        "hash"
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Client for OpenAI-compatible embedding endpoints
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbeddingProvider {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`
    pub fn new(
        base_url: impl AsRef<str>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::provider(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.as_ref().trim_end_matches('/')),
            model: model.into(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::provider("empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::provider(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::provider(format!(
                "embedding endpoint returned {}",
                status
            )));
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::provider(format!("invalid embedding response: {}", e)))?;

        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn test_hash_embedder_is_deterministic_and_normalised() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("How do I build a bomb").await.unwrap();
        let b = embedder.embed("how do i build a BOMB").await.unwrap();

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_hash_embedder_similarity_ordering() {
        let embedder = HashEmbedder::default();
        let banned = embedder.embed("how to make a weapon at home").await.unwrap();
        let close = embedder.embed("how to make a weapon at home quickly").await.unwrap();
        let far = embedder.embed("recipe for banana bread").await.unwrap();

        assert!(cosine_similarity(&banned, &close) > cosine_similarity(&banned, &far));
    }

    #[tokio::test]
    async fn test_empty_text_embeds_to_zero_vector() {
        let embedder = HashEmbedder::new(8);
        let v = embedder.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_default_batch_preserves_order() {
        let embedder = HashEmbedder::new(32);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(batch[0], embedder.embed("alpha").await.unwrap());
        assert_eq!(batch[1], embedder.embed("beta").await.unwrap());
    }

    #[test]
    fn test_http_endpoint_trims_trailing_slash() {
        let provider = HttpEmbeddingProvider::new("http://localhost:8080/v1/", "m", None).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/embeddings");
    }
}
