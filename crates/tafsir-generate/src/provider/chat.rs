//! OpenAI-compatible chat completion backends (DeepSeek, OpenRouter)

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tafsir_core::{ProviderError, http_client, post_json};

use super::{Provider, non_empty};
use crate::layer::{self, PromptContext, SYSTEM_PROMPT, Variant};

/// Per-call price ceiling, checked before any request is sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostCeiling {
    /// Maximum USD per call
    pub max_price: f64,
    /// USD per million prompt tokens
    pub prompt_per_million: f64,
    /// USD per million completion tokens
    pub completion_per_million: f64,
}

impl CostCeiling {
    /// Worst case: the completion uses its whole token budget.
    pub fn estimate(&self, prompt_chars: usize, max_tokens: u32) -> f64 {
        let prompt = approx_tokens(prompt_chars) as f64 * self.prompt_per_million;
        let completion = f64::from(max_tokens) * self.completion_per_million;
        (prompt + completion) / 1_000_000.0
    }
}

/// Roughly four characters per token.
fn approx_tokens(chars: usize) -> usize {
    chars.div_ceil(4)
}

/// Smallest completion budget a translation is given.
const MIN_TRANSLATION_TOKENS: u32 = 256;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub ceiling: Option<CostCeiling>,
}

impl ChatConfig {
    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.deepseek.com".into(),
            model: "deepseek-chat".into(),
            api_key: api_key.into(),
            max_tokens: 800,
            temperature: 0.7,
            request_timeout: Duration::from_secs(120),
            ceiling: None,
        }
    }

    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".into(),
            model: "deepseek/deepseek-chat".into(),
            ceiling: Some(CostCeiling {
                max_price: 0.002,
                prompt_per_million: 0.30,
                completion_per_million: 1.20,
            }),
            ..Self::deepseek(api_key)
        }
    }
}

pub struct ChatProvider {
    name: String,
    config: ChatConfig,
    client: reqwest::Client,
}

impl ChatProvider {
    pub fn new(name: impl Into<String>, config: ChatConfig) -> Result<Self, ProviderError> {
        let client = http_client(config.request_timeout)?;
        Ok(Self {
            name: name.into(),
            config,
            client,
        })
    }

    fn headers(&self) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|_| ProviderError::Fatal("API key contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Refuse calls the price ceiling would not cover.
    fn preflight(&self, system: &str, user: &str, max_tokens: u32) -> Result<(), ProviderError> {
        let Some(ceiling) = self.config.ceiling else {
            return Ok(());
        };
        let chars = system.chars().count() + user.chars().count();
        let cost = ceiling.estimate(chars, max_tokens);
        if cost > ceiling.max_price {
            return Err(ProviderError::Invalid(format!(
                "estimated cost ${cost:.5} exceeds max price ${:.5}",
                ceiling.max_price
            )));
        }
        Ok(())
    }

    /// Completion budget for translating `text`: twice its own token count,
    /// within `[MIN_TRANSLATION_TOKENS, 2 * max_tokens]`.
    fn translation_budget(&self, text: &str) -> u32 {
        let ceiling = self.config.max_tokens.saturating_mul(2);
        let wanted = u32::try_from(approx_tokens(text.chars().count()).saturating_mul(2))
            .unwrap_or(u32::MAX);
        wanted.clamp(MIN_TRANSLATION_TOKENS.min(ceiling), ceiling)
    }

    fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        self.preflight(system, user, max_tokens)?;
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "max_tokens": max_tokens,
            "temperature": self.config.temperature,
        });
        let resp = post_json(&self.client, &url, self.headers()?, &body)?;
        completion_text(&resp)
    }
}

/// `choices[0].message.content`, classified.
fn completion_text(resp: &Value) -> Result<String, ProviderError> {
    if let Some(err) = resp.get("error") {
        // some gateways report upstream failures with a 200
        let msg = err.get("message").and_then(Value::as_str).unwrap_or("unknown");
        return Err(ProviderError::Transient(format!("provider error: {msg}")));
    }
    let choice = resp
        .pointer("/choices/0")
        .ok_or_else(|| ProviderError::Transient("response has no choices".into()))?;
    if choice.get("finish_reason").and_then(Value::as_str) == Some("length") {
        log::debug!("completion hit max_tokens");
    }
    let content = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Transient("response has no message content".into()))?;
    non_empty(content, "completion")
}

impl Provider for ChatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, ctx: &PromptContext) -> Result<String, ProviderError> {
        let layer = layer::layer(ctx.layer)
            .ok_or_else(|| ProviderError::Invalid(format!("unknown layer {}", ctx.layer)))?;
        self.complete(SYSTEM_PROMPT, &layer.render(ctx), self.config.max_tokens)
    }

    fn translate(&self, text: &str, target: &Variant) -> Result<String, ProviderError> {
        self.complete(&translation_prompt(target), text, self.translation_budget(text))
    }
}

fn translation_prompt(target: &Variant) -> String {
    format!(
        "You are a professional translator of Islamic scholarly texts. Translate the user's \
         text from English into {}. Keep Arabic terms and Quranic references intact. \
         Reply with the translation only.",
        target.language
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openrouter() -> ChatProvider {
        ChatProvider::new("openrouter", ChatConfig::openrouter("sk-test")).unwrap()
    }

    #[test]
    fn cost_estimate() {
        let c = CostCeiling {
            max_price: 1.0,
            prompt_per_million: 1.0,
            completion_per_million: 2.0,
        };
        // 4000 chars ≈ 1000 tokens → 0.001; 500 completion tokens → 0.001
        assert!((c.estimate(4000, 500) - 0.002).abs() < 1e-12);
    }

    #[test]
    fn preflight_rejects_expensive_call_without_network() {
        let mut config = ChatConfig::openrouter("sk-test");
        config.ceiling = Some(CostCeiling {
            max_price: 0.0001,
            prompt_per_million: 0.30,
            completion_per_million: 1.20,
        });
        // unroutable address: a network attempt would fail as Transient instead
        config.base_url = "http://127.0.0.1:9".into();
        let p = ChatProvider::new("openrouter", config).unwrap();
        let err = p.complete("sys", "user", 800).unwrap_err();
        assert!(matches!(err, ProviderError::Invalid(ref m) if m.contains("max price")));
    }

    #[test]
    fn default_ceiling_admits_a_normal_prompt() {
        let p = openrouter();
        assert!(p.preflight(SYSTEM_PROMPT, &"x".repeat(2000), 800).is_ok());
    }

    #[test]
    fn default_ceiling_admits_a_normal_translation() {
        let p = openrouter();
        let fr = layer::variant("fr").unwrap();
        for words in [150, 350] {
            let text = "mercy ".repeat(words);
            let budget = p.translation_budget(&text);
            assert!(budget > approx_tokens(text.len()) as u32);
            assert!(p.preflight(&translation_prompt(fr), &text, budget).is_ok(), "{words} words");
        }
        let text = "The verse speaks of mercy and guidance for all people. ".repeat(40);
        assert_eq!(text.len(), 2200);
        assert!(p.preflight(&translation_prompt(fr), &text, p.translation_budget(&text)).is_ok());
    }

    #[test]
    fn translation_budget_bounds() {
        let p = openrouter();
        assert_eq!(p.translation_budget("Short."), MIN_TRANSLATION_TOKENS);
        assert_eq!(p.translation_budget(&"x".repeat(2000)), 1000);
        assert_eq!(p.translation_budget(&"x".repeat(20_000)), 1600);
    }

    #[test]
    fn unknown_layer_is_invalid() {
        let ctx = PromptContext {
            layer: 9,
            section_name: "Al-Faatiha".into(),
            section_number: 1,
            sub_unit: 1,
            source_text: String::new(),
            translation: String::new(),
        };
        assert!(matches!(openrouter().generate(&ctx), Err(ProviderError::Invalid(_))));
    }

    #[test]
    fn completion_text_extracts_content() {
        let resp = json!({
            "choices": [{"message": {"content": "  Commentary.  "}, "finish_reason": "stop"}]
        });
        assert_eq!(completion_text(&resp).unwrap(), "Commentary.");
    }

    #[test]
    fn malformed_or_empty_completion_is_transient() {
        assert!(matches!(
            completion_text(&json!({"choices": []})),
            Err(ProviderError::Transient(_))
        ));
        assert!(matches!(
            completion_text(&json!({"choices": [{"message": {"content": "   "}}]})),
            Err(ProviderError::Transient(_))
        ));
        assert!(matches!(
            completion_text(&json!({"error": {"message": "upstream overloaded"}})),
            Err(ProviderError::Transient(_))
        ));
    }
}
