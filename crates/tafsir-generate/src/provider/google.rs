//! Public Google Translate endpoint (translation only)

use std::time::Duration;

use serde_json::Value;
use tafsir_core::{ProviderError, get_json, http_client};

use super::{Provider, non_empty};
use crate::layer::{PromptContext, Variant};

/// Longest chunk sent in one GET; the query string carries the text.
const MAX_CHUNK_CHARS: usize = 1800;

pub struct GoogleTranslate {
    base_url: String,
    client: reqwest::Client,
}

impl GoogleTranslate {
    pub const DEFAULT_URL: &'static str = "https://translate.googleapis.com/translate_a/single";

    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: base_url.into(),
            client: http_client(request_timeout)?,
        })
    }

    fn translate_chunk(&self, chunk: &str, target: &str) -> Result<String, ProviderError> {
        let query = [
            ("client", "gtx"),
            ("sl", "en"),
            ("tl", target),
            ("dt", "t"),
            ("q", chunk),
        ];
        let resp = get_json(&self.client, &self.base_url, &query)?;
        let text = segments_text(&resp)?;
        non_empty(&text, "translation")
    }
}

/// Concatenate `[0][i][0]` of the gtx response.
fn segments_text(resp: &Value) -> Result<String, ProviderError> {
    let segments = resp
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Transient("unexpected translate response shape".into()))?;
    Ok(segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect())
}

/// Split on paragraph breaks, then sentence ends, keeping chunks under
/// `max` characters. A single oversized sentence becomes its own chunk.
fn chunk_text(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let pieces = text
        .split("\n\n")
        .flat_map(|para| para.split_inclusive(". ").chain(std::iter::once("\n\n")));
    for piece in pieces {
        if !current.is_empty() && current.chars().count() + piece.chars().count() > max {
            chunks.push(current.trim().to_string());
            current.clear();
        }
        current.push_str(piece);
    }
    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }
    chunks.retain(|c| !c.is_empty());
    chunks
}

impl Provider for GoogleTranslate {
    fn name(&self) -> &str {
        "google"
    }

    fn generate(&self, _ctx: &PromptContext) -> Result<String, ProviderError> {
        Err(ProviderError::Invalid(
            "google translate cannot generate commentary".into(),
        ))
    }

    fn translate(&self, text: &str, target: &Variant) -> Result<String, ProviderError> {
        let parts = chunk_text(text, MAX_CHUNK_CHARS)
            .iter()
            .map(|chunk| self.translate_chunk(chunk, target.target))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parts.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_segments() {
        let resp = json!([
            [["Bonjour. ", "Hello. ", null], ["Au revoir.", "Bye.", null]],
            null,
            "en"
        ]);
        assert_eq!(segments_text(&resp).unwrap(), "Bonjour. Au revoir.");
    }

    #[test]
    fn bad_shape_is_transient() {
        assert!(matches!(
            segments_text(&json!({"error": 1})),
            Err(ProviderError::Transient(_))
        ));
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_text("One. Two.", 100), vec!["One. Two."]);
    }

    #[test]
    fn long_text_splits_on_sentences() {
        let text = "Alpha beta gamma. ".repeat(10);
        let chunks = chunk_text(text.trim(), 40);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
        assert_eq!(chunks.join(" "), text.trim());
    }

    #[test]
    fn generate_is_invalid() {
        let g = GoogleTranslate::new(GoogleTranslate::DEFAULT_URL, Duration::from_secs(5)).unwrap();
        let ctx = PromptContext {
            layer: 1,
            section_name: "Al-Faatiha".into(),
            section_number: 1,
            sub_unit: 1,
            source_text: String::new(),
            translation: String::new(),
        };
        assert!(matches!(g.generate(&ctx), Err(ProviderError::Invalid(_))));
    }
}
