//! Generation and translation backends
//!
//! Every backend classifies its own failures into [`ProviderError`]; nothing
//! raw crosses this boundary.

mod chat;
mod google;

pub use chat::{ChatConfig, ChatProvider, CostCeiling};
pub use google::GoogleTranslate;

use tafsir_core::ProviderError;

use crate::layer::{PromptContext, Variant};

/// Capability interface the orchestrator drives.
pub trait Provider {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Write one commentary layer.
    fn generate(&self, ctx: &PromptContext) -> Result<String, ProviderError>;

    /// Translate English commentary into `target`.
    fn translate(&self, text: &str, target: &Variant) -> Result<String, ProviderError>;
}

impl<P: Provider + ?Sized> Provider for &P {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, ctx: &PromptContext) -> Result<String, ProviderError> {
        (**self).generate(ctx)
    }

    fn translate(&self, text: &str, target: &Variant) -> Result<String, ProviderError> {
        (**self).translate(text, target)
    }
}

impl<P: Provider + ?Sized> Provider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, ctx: &PromptContext) -> Result<String, ProviderError> {
        (**self).generate(ctx)
    }

    fn translate(&self, text: &str, target: &Variant) -> Result<String, ProviderError> {
        (**self).translate(text, target)
    }
}

/// Reject blank provider output as retryable.
pub(crate) fn non_empty(text: &str, what: &str) -> Result<String, ProviderError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::Transient(format!("empty {what}")));
    }
    Ok(text.to_string())
}
