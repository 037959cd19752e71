use async_trait::async_trait;
use mizan_rs_memory::{Embedder, MemoryError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Vector length produced by [`StubEmbedder`].
pub const STUB_DIMENSIONS: usize = 32;

/// Deterministic bag-of-words embedder: texts sharing words are similar.
#[derive(Debug, Clone, Default)]
pub struct StubEmbedder;

impl StubEmbedder {
    pub fn new() -> Self {
        Self
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; STUB_DIMENSIONS];
        for token in text.split_whitespace() {
            let token = token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            vector[bucket(&token)] += 1.0;
        }
        if vector.iter().all(|value| *value == 0.0) {
            vector[0] = 1.0;
        }
        vector
    }
}

fn bucket(token: &str) -> usize {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % STUB_DIMENSIONS as u64) as usize
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        Ok(Self::vector(text))
    }

    fn model(&self) -> &str {
        "stub-bag-of-words"
    }
}

/// Embedder that reports it cannot run, like a missing credential.
#[derive(Debug, Clone, Default)]
pub struct UnavailableEmbedder;

#[async_trait]
impl Embedder for UnavailableEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
        Err(MemoryError::EmbeddingUnavailable(
            "no embedding API key configured".to_string(),
        ))
    }

    fn model(&self) -> &str {
        "unavailable"
    }
}

/// Embedder whose calls succeed but return no vector.
#[derive(Debug, Clone, Default)]
pub struct EmptyEmbedder;

#[async_trait]
impl Embedder for EmptyEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
        Ok(Vec::new())
    }

    fn model(&self) -> &str {
        "empty"
    }
}

/// Stub embedder that records every text it was asked to embed.
#[derive(Debug, Clone, Default)]
pub struct CountingEmbedder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        self.calls.lock().push(text.to_string());
        Ok(StubEmbedder::vector(text))
    }

    fn model(&self) -> &str {
        "counting-stub"
    }
}

/// Embedder whose vectors get one element longer on every call.
#[derive(Debug, Clone)]
pub struct GrowingEmbedder {
    next_len: Arc<Mutex<usize>>,
}

impl GrowingEmbedder {
    /// First call returns `start` elements.
    pub fn starting_at(start: usize) -> Self {
        Self {
            next_len: Arc::new(Mutex::new(start)),
        }
    }
}

#[async_trait]
impl Embedder for GrowingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
        let mut next_len = self.next_len.lock();
        let vector = vec![1.0; *next_len];
        *next_len += 1;
        Ok(vector)
    }

    fn model(&self) -> &str {
        "growing"
    }
}
