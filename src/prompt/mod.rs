//! Prompt generation: an ordered chain of text backends with a rule-based
//! fallback that cannot fail.

pub mod backend;
pub mod catalogue;
pub mod instruction;
pub mod rules;

use crate::mood::{Fingerprint, SolarHours, SolarModel};
use backend::{validate_response, BackendError, TextBackend};
use chrono::{Datelike, NaiveDateTime};
use log::{info, warn};
use std::sync::Arc;

/// Calendar and weather details fed into the prompt.
#[derive(Debug, Clone)]
pub struct CalendarContext {
    pub now: NaiveDateTime,
    pub weather_text: String,
    pub solar: SolarHours,
}

impl CalendarContext {
    pub fn new(now: NaiveDateTime, weather_text: &str, solar_model: SolarModel) -> Self {
        Self {
            now,
            weather_text: weather_text.to_string(),
            solar: solar_model(now.month()),
        }
    }
}

/// Always returns a usable prompt; backend failures only move down the chain.
pub async fn generate_prompt(
    fingerprint: Fingerprint,
    ctx: &CalendarContext,
    backends: &[Arc<dyn TextBackend>],
) -> String {
    let instruction = instruction::build_instruction(fingerprint, ctx);
    if let Some(prompt) = request_from_backends(&instruction, backends).await {
        return prompt;
    }
    info!("[prompt] all text backends failed, using rule-based prompt");
    rules::rule_based_prompt(fingerprint, ctx.solar.sunset)
}

/// First accepted response from the chain, if any.
pub async fn request_from_backends(
    instruction: &str,
    backends: &[Arc<dyn TextBackend>],
) -> Option<String> {
    for backend in backends {
        let outcome = match backend.complete(instruction).await {
            Ok(text) => validate_response(&text),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(prompt) => {
                info!("[prompt] using model {}", backend.name());
                return Some(prompt);
            }
            Err(BackendError::Unavailable(reason)) => {
                warn!("[prompt] model {} unavailable: {}", backend.name(), reason);
            }
            Err(BackendError::Rejected(reason)) => {
                warn!("[prompt] model {} output rejected: {}", backend.name(), reason);
            }
        }
    }
    None
}

#[cfg(test)]
pub(crate) mod testing {
    use super::backend::{BackendError, TextBackend};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub enum Reply {
        Text(&'static str),
        PaymentRequired,
    }

    /// Backend that replays a fixed reply and counts calls.
    pub struct ScriptedBackend {
        pub name: &'static str,
        pub reply: Reply,
        pub calls: AtomicUsize,
    }

    impl ScriptedBackend {
        pub fn new(name: &'static str, reply: Reply) -> Self {
            Self {
                name,
                reply,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextBackend for ScriptedBackend {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(&self, _instruction: &str) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::PaymentRequired => Err(BackendError::Unavailable("payment required".into())),
            }
        }
    }
}
