//! Provider Pool: credential-distinct LLM clients plus a TTS engine,
//! with round-robin distribution and a shared retry wrapper.
//!
//! Semaphore-bounded concurrency and `distribute`-sized concurrent worker
//! groups generalize a single hardcoded provider into a pool of
//! interchangeable clients, constructed explicitly with no module-level
//! singleton.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::AppError;
use crate::retry::with_retry;

const CHAT_TIMEOUT: Duration = Duration::from_secs(30);
const TTS_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials and identity for one LLM client.
#[derive(Debug, Clone)]
pub struct LlmClient {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    http: HttpClient,
}

impl LlmClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            base_url,
            api_key,
            model,
            http: HttpClient::new(),
        }
    }

    /// Send a single chat-completion request and return the assistant
    /// message content. OpenAI-compatible wire shape.
    pub async fn chat(&self, system: &str, user: &str, temperature: f64) -> Result<String, AppError> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system".into(), content: system.into() },
                ChatMessage { role: "user".into(), content: user.into() },
            ],
            temperature,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(CHAT_TIMEOUT)
            .send()
            .await?;

        if resp.status().is_client_error() {
            return Err(AppError::ProviderRejection(format!(
                "LLM provider returned {}",
                resp.status()
            )));
        }
        if !resp.status().is_success() {
            return Err(AppError::Transient(format!("LLM provider returned {}", resp.status())));
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::Transient("LLM response had no choices".into()))
    }

    /// Request a fixed-dimension embedding vector for `text`.
    pub async fn embed(&self, text: &str, dimension: u32) -> Result<Vec<f32>, AppError> {
        let body = EmbeddingRequest {
            model: self.model.clone(),
            input: text.to_string(),
        };

        let resp = self
            .http
            .post(format!("{}/embeddings", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(DEFAULT_TIMEOUT)
            .send()
            .await?;

        if resp.status().is_client_error() {
            return Err(AppError::ProviderRejection(format!(
                "embedding provider returned {}",
                resp.status()
            )));
        }
        if !resp.status().is_success() {
            return Err(AppError::Transient(format!(
                "embedding provider returned {}",
                resp.status()
            )));
        }

        let parsed: EmbeddingResponse = resp.json().await?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AppError::Transient("embedding response had no data".into()))?;

        if vector.len() != dimension as usize {
            return Err(AppError::Integrity(format!(
                "embedding dimension mismatch: expected {}, got {}",
                dimension,
                vector.len()
            )));
        }
        Ok(vector)
    }
}

/// A streaming text-to-speech engine (Edge-TTS-style).
#[derive(Debug, Clone)]
pub struct TtsClient {
    pub endpoint: String,
    http: HttpClient,
}

impl TtsClient {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint, http: HttpClient::new() }
    }

    /// Synthesize `text` with `voice` and return raw audio bytes.
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, AppError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "text": text, "voice": voice }))
            .timeout(TTS_TIMEOUT)
            .send()
            .await?;

        if resp.status().is_client_error() {
            return Err(AppError::ProviderRejection(format!(
                "TTS engine returned {}",
                resp.status()
            )));
        }
        if !resp.status().is_success() {
            return Err(AppError::Transient(format!("TTS engine returned {}", resp.status())));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

/// Holds every configured LLM client plus the TTS engine, and hands out
/// bounded concurrency for fan-out jobs.
///
/// Chat clients (translation, interpretation) and the embedding client are
/// kept distinct: they are different upstream contracts with their own
/// credentials and rate limits, even though both speak through `LlmClient`.
pub struct ProviderPool {
    chat_clients: Vec<Arc<LlmClient>>,
    embedding_client: Arc<LlmClient>,
    tts: Arc<TtsClient>,
    semaphore: Arc<Semaphore>,
    next_chat_client: AtomicUsize,
}

impl ProviderPool {
    pub fn new(
        chat_clients: Vec<LlmClient>,
        embedding_client: LlmClient,
        tts: TtsClient,
        max_concurrency: usize,
    ) -> Self {
        Self {
            chat_clients: chat_clients.into_iter().map(Arc::new).collect(),
            embedding_client: Arc::new(embedding_client),
            tts: Arc::new(tts),
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            next_chat_client: AtomicUsize::new(0),
        }
    }

    /// Process-lifetime cached slice of every configured chat-completion
    /// client (`ClientsFor("chat")`).
    pub fn chat_clients(&self) -> &[Arc<LlmClient>] {
        &self.chat_clients
    }

    /// The next chat client in round-robin order. Returns `None` if no
    /// chat credentials are configured.
    pub fn next_chat_client(&self) -> Option<Arc<LlmClient>> {
        if self.chat_clients.is_empty() {
            return None;
        }
        let i = self.next_chat_client.fetch_add(1, Ordering::Relaxed) % self.chat_clients.len();
        Some(Arc::clone(&self.chat_clients[i]))
    }

    /// The dedicated embedding-endpoint client (`ClientsFor("embedding")`).
    pub fn embedding_client(&self) -> Arc<LlmClient> {
        Arc::clone(&self.embedding_client)
    }

    pub fn tts(&self) -> Arc<TtsClient> {
        Arc::clone(&self.tts)
    }

    pub fn semaphore(&self) -> Arc<Semaphore> {
        Arc::clone(&self.semaphore)
    }

    /// Split `items` into `n` groups whose sizes differ by at most one,
    /// preserving input order within each group. Used to fan work out
    /// round-robin across `chat_clients()`.
    pub fn distribute<T>(items: Vec<T>, n: usize) -> Vec<Vec<T>> {
        if n == 0 || items.is_empty() {
            return vec![items];
        }
        let mut groups: Vec<Vec<T>> = (0..n).map(|_| Vec::new()).collect();
        for (i, item) in items.into_iter().enumerate() {
            groups[i % n].push(item);
        }
        groups
    }

    /// Call an LLM chat completion with the standard retry policy (3
    /// attempts, 1s-2s base backoff capped at 30s).
    pub async fn chat_with_retry(
        &self,
        client: &LlmClient,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, AppError> {
        let _permit = self.semaphore.acquire().await.map_err(|e| AppError::Fatal(e.to_string()))?;
        with_retry(
            "llm_chat",
            3,
            Duration::from_secs(1),
            Duration::from_secs(30),
            |_attempt| client.chat(system, user, temperature),
        )
        .await
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribute_preserves_order_and_balances_sizes() {
        let items: Vec<i32> = (0..10).collect();
        let groups = ProviderPool::distribute(items, 3);
        assert_eq!(groups.iter().map(|g| g.len()).sum::<usize>(), 10);
        let max = groups.iter().map(|g| g.len()).max().expect("non-empty");
        let min = groups.iter().map(|g| g.len()).min().expect("non-empty");
        assert!(max - min <= 1);
        assert_eq!(groups[0], vec![0, 3, 6, 9]);
    }

    #[test]
    fn distribute_handles_empty_input() {
        let groups: Vec<Vec<i32>> = ProviderPool::distribute(Vec::new(), 3);
        assert_eq!(groups, vec![Vec::<i32>::new()]);
    }

    #[test]
    fn next_chat_client_cycles_round_robin() {
        let clients = vec![
            LlmClient::new("https://a".into(), "ka".into(), "m".into()),
            LlmClient::new("https://b".into(), "kb".into(), "m".into()),
        ];
        let embedding = LlmClient::new("https://e".into(), "ke".into(), "m".into());
        let pool = ProviderPool::new(clients, embedding, TtsClient::new("https://tts".into()), 4);

        let first = pool.next_chat_client().expect("client").base_url.clone();
        let second = pool.next_chat_client().expect("client").base_url.clone();
        let third = pool.next_chat_client().expect("client").base_url.clone();
        assert_eq!(first, "https://a");
        assert_eq!(second, "https://b");
        assert_eq!(third, "https://a");
    }

    #[test]
    fn next_chat_client_is_none_without_credentials() {
        let embedding = LlmClient::new("https://e".into(), "ke".into(), "m".into());
        let pool = ProviderPool::new(Vec::new(), embedding, TtsClient::new("https://tts".into()), 4);
        assert!(pool.next_chat_client().is_none());
    }
}
