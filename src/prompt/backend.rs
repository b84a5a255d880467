use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;

pub const TEXT_ENDPOINT: &str = "https://text.pollinations.ai";

/// Tried in order until one produces a usable prompt.
pub const DEFAULT_TEXT_MODELS: [&str; 5] = ["gpt-4", "mistral", "llama-roblox", "qwen-coder", "openai"];

const TEXT_TIMEOUT: Duration = Duration::from_secs(30);
const MIN_PROMPT_CHARS: usize = 5;
const MAX_CJK_RATIO: f64 = 0.1;
const BOILERPLATE: [&str; 7] = ["以下是", "这是", "here is", "this is", "：", "。", "，"];

/// Why a backend did not yield a prompt. Either way the chain moves on.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("response rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait TextBackend: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, instruction: &str) -> Result<String, BackendError>;
}

/// One model served by the pollinations text endpoint.
pub struct PollinationsText {
    client: Client,
    endpoint: String,
    model: String,
}

impl PollinationsText {
    pub fn new(client: Client, endpoint: &str, model: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TextBackend for PollinationsText {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, instruction: &str) -> Result<String, BackendError> {
        let url = format!("{}/{}", self.endpoint, urlencoding::encode(instruction));
        let resp = self
            .client
            .get(url)
            .query(&[("model", self.model.as_str())])
            .timeout(TEXT_TIMEOUT)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        match resp.status() {
            StatusCode::PAYMENT_REQUIRED => {
                return Err(BackendError::Unavailable("payment required".to_string()))
            }
            status if !status.is_success() => {
                return Err(BackendError::Unavailable(format!("status {}", status)))
            }
            _ => {}
        }
        resp.text()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }
}

pub fn backends_for_models(client: &Client, endpoint: &str, models: &[String]) -> Vec<Arc<dyn TextBackend>> {
    models
        .iter()
        .map(|model| Arc::new(PollinationsText::new(client.clone(), endpoint, model)) as Arc<dyn TextBackend>)
        .collect()
}

/// Accepts a backend response as an image prompt, returning it trimmed.
pub fn validate_response(text: &str) -> Result<String, BackendError> {
    let trimmed = text.trim();
    let total = trimmed.chars().count();
    if total < MIN_PROMPT_CHARS {
        return Err(BackendError::Rejected(format!("too short ({} chars)", total)));
    }
    let cjk = trimmed.chars().filter(|c| ('\u{4e00}'..='\u{9fff}').contains(c)).count();
    if cjk as f64 > total as f64 * MAX_CJK_RATIO {
        return Err(BackendError::Rejected(format!("{} of {} chars are CJK", cjk, total)));
    }
    let lowered = trimmed.to_lowercase();
    if let Some(phrase) = BOILERPLATE.iter().find(|p| lowered.contains(**p)) {
        return Err(BackendError::Rejected(format!("contains boilerplate {:?}", phrase)));
    }
    Ok(trimmed.to_string())
}
