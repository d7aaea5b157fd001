//! Text-generation collaborator: provider abstraction + file cache + daily limit.
//!
//! Components never talk to a provider directly. They hold a [`DynTextGenerator`]
//! and go through [`ask`], which checks availability first and applies the call
//! timeout. A missing credential yields a [`DisabledClient`], so "no collaborator"
//! is an ordinary, always-checked state rather than an error path.

use std::fs;
use std::future::Future;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::llm::LlmConfig;
use crate::error::LlmError;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

pub type LlmFuture<'a> = Pin<Box<dyn Future<Output = Result<String, LlmError>> + Send + 'a>>;

/// Trait object used by every component that needs text generation.
pub trait TextGenerator: Send + Sync {
    /// Send one prompt and return the raw, untrusted response text.
    fn complete<'a>(&'a self, prompt: &'a str) -> LlmFuture<'a>;
    /// `false` when no credential/provider is configured.
    fn is_available(&self) -> bool {
        true
    }
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynTextGenerator = Arc<dyn TextGenerator>;

/// Availability check + timeout around one call.
pub async fn ask(
    llm: &dyn TextGenerator,
    prompt: &str,
    timeout: Duration,
) -> Result<String, LlmError> {
    if !llm.is_available() {
        return Err(LlmError::Unavailable);
    }
    match tokio::time::timeout(timeout, llm.complete(prompt)).await {
        Ok(res) => res,
        Err(_) => Err(LlmError::Timeout(timeout)),
    }
}

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock client.
/// * Else if the config is disabled or has no key, returns a disabled client.
/// * Else builds the real provider wrapped with caching + daily limit.
pub fn build_client_from_config(config: &LlmConfig) -> DynTextGenerator {
    let cache_dir = config
        .cache_dir
        .clone()
        .unwrap_or_else(default_cache_dir);

    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        let mock = MockProvider {
            fixed: "Several topics are drawing attention at once (mock).".to_string(),
        };
        return Arc::new(CachingClient::new(mock, cache_dir, config.daily_limit));
    }

    if !config.enabled || config.api_key.trim().is_empty() {
        return Arc::new(DisabledClient);
    }

    let timeout = Duration::from_secs(config.timeout_secs.max(1));
    match config.provider.as_str() {
        "gemini" => {
            let provider = GeminiProvider::new(&config.api_key, config.model.as_deref(), timeout);
            Arc::new(CachingClient::new(provider, cache_dir, config.daily_limit))
        }
        "openai" => {
            let provider = OpenAiProvider::new(&config.api_key, config.model.as_deref(), timeout);
            Arc::new(CachingClient::new(provider, cache_dir, config.daily_limit))
        }
        other => {
            tracing::warn!(provider = other, "unknown text-generation provider, disabling");
            Arc::new(DisabledClient)
        }
    }
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider: does a *real* remote call. Separated so we can reuse the same
/// caching wrapper for production and tests.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(&'a self, prompt: &'a str) -> LlmFuture<'a>;
    fn name(&self) -> &'static str;
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("trend-aggregator/0.1")
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Gemini `generateContent` endpoint.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    /// `model_override`: defaults to gemini-2.0-flash.
    pub fn new(api_key: &str, model_override: Option<&str>, timeout: Duration) -> Self {
        Self {
            http: http_client(timeout),
            api_key: api_key.to_string(),
            model: model_override.unwrap_or("gemini-2.0-flash").to_string(),
        }
    }
}

impl Provider for GeminiProvider {
    fn fetch<'a>(&'a self, prompt: &'a str) -> LlmFuture<'a> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Part<'a> {
                text: &'a str,
            }
            #[derive(Serialize)]
            struct Content<'a> {
                parts: Vec<Part<'a>>,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                contents: Vec<Content<'a>>,
            }
            #[derive(Deserialize)]
            struct Resp {
                #[serde(default)]
                candidates: Vec<Candidate>,
            }
            #[derive(Deserialize)]
            struct Candidate {
                content: Option<RespContent>,
            }
            #[derive(Deserialize)]
            struct RespContent {
                #[serde(default)]
                parts: Vec<RespPart>,
            }
            #[derive(Deserialize)]
            struct RespPart {
                #[serde(default)]
                text: String,
            }

            let url = format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                self.model
            );
            let req = Req {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            };
            let resp = self
                .http
                .post(url)
                .query(&[("key", self.api_key.as_str())])
                .json(&req)
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(LlmError::Status(resp.status().as_u16()));
            }
            let body: Resp = resp.json().await?;
            let text: String = body
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .map(|c| c.parts.into_iter().map(|p| p.text).collect())
                .unwrap_or_default();
            non_empty(text)
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// OpenAI provider (Chat Completions API).
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    /// `model_override`: defaults to gpt-4o-mini.
    pub fn new(api_key: &str, model_override: Option<&str>, timeout: Duration) -> Self {
        Self {
            http: http_client(timeout),
            api_key: api_key.to_string(),
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
        }
    }
}

impl Provider for OpenAiProvider {
    fn fetch<'a>(&'a self, prompt: &'a str) -> LlmFuture<'a> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let req = Req {
                model: &self.model,
                messages: vec![Msg {
                    role: "user",
                    content: prompt,
                }],
                temperature: 0.2,
            };
            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(LlmError::Status(resp.status().as_u16()));
            }
            let body: Resp = resp.json().await?;
            let text = body
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .unwrap_or_default();
            non_empty(text)
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

fn non_empty(text: String) -> Result<String, LlmError> {
    let t = text.trim();
    if t.is_empty() {
        Err(LlmError::EmptyResponse)
    } else {
        Ok(t.to_string())
    }
}

/// Always unavailable; used when no credential is configured.
pub struct DisabledClient;

impl TextGenerator for DisabledClient {
    fn complete<'a>(&'a self, _prompt: &'a str) -> LlmFuture<'a> {
        Box::pin(async { Err(LlmError::Unavailable) })
    }
    fn is_available(&self) -> bool {
        false
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Simple mock provider for tests/local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl Provider for MockProvider {
    fn fetch<'a>(&'a self, _prompt: &'a str) -> LlmFuture<'a> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Caching client wrapper (file cache + daily limit)
// ------------------------------------------------------------

/// Counter state is guarded by a `Mutex`; cache files are written tmp + rename.
pub struct CachingClient<P: Provider> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

impl<P: Provider> CachingClient<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        let _ = fs::create_dir_all(&cache_dir); // best-effort
        let counter = Arc::new(Mutex::new(
            load_daily_counter(&cache_dir).unwrap_or_default(),
        ));
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    async fn complete_impl(&self, prompt: &str) -> Result<String, LlmError> {
        // 1) Daily limit. The slot is reserved under the same lock that checks
        //    it, so concurrent callers can never overshoot the limit.
        self.reserve_slot()?;

        // 2) Cache lookup. Hits do not count against the limit.
        let key = cache_key(prompt);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            tracing::debug!(target: "llm", key = %key, "cache hit");
            self.release_slot();
            return Ok(hit.text);
        }

        // 3) Real call; a failed call gives its slot back.
        let fresh = match self.inner.fetch(prompt).await {
            Ok(text) => text,
            Err(e) => {
                self.release_slot();
                return Err(e);
            }
        };
        let _ = write_cache_file(
            &self.cache_dir,
            &key,
            &CachedResponse {
                text: fresh.clone(),
            },
        );
        Ok(fresh)
    }

    fn reserve_slot(&self) -> Result<(), LlmError> {
        let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        if g.is_expired() {
            g.reset_to_today();
        }
        if g.count >= self.daily_limit_max {
            return Err(LlmError::DailyLimit(self.daily_limit_max));
        }
        g.count += 1;
        let _ = save_daily_counter(&self.cache_dir, &g);
        Ok(())
    }

    fn release_slot(&self) {
        let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        g.count = g.count.saturating_sub(1);
        let _ = save_daily_counter(&self.cache_dir, &g);
    }

    /// Calls counted against today's limit.
    pub fn used_today(&self) -> u32 {
        let g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        if g.is_expired() {
            0
        } else {
            g.count
        }
    }
}

impl<P: Provider> TextGenerator for CachingClient<P> {
    fn complete<'a>(&'a self, prompt: &'a str) -> LlmFuture<'a> {
        Box::pin(self.complete_impl(prompt))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedResponse {
    text: String,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/llm")
}

/// Short hex digest; also used to reference responses in logs without echoing them.
pub fn cache_key(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<CachedResponse> {
    let path = cache_path(dir, key);
    let mut file = fs::File::open(path).ok()?;
    let mut buf = String::new();
    file.read_to_string(&mut buf).ok()?;
    serde_json::from_str(&buf).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &CachedResponse) -> io::Result<()> {
    let path = cache_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let p = counter_path(dir);
    let tmp = p.with_extension("json.tmp");
    let s = serde_json::to_string(dc).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(s.as_bytes())?;
    fs::rename(tmp, p)?;
    Ok(())
}
