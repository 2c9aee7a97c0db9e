//! API key resolution: config file, environment, then an interactive prompt

use std::io::IsTerminal;

use anyhow::{Context, Result, bail};
use inquire::{Password, PasswordDisplayMode};

pub const DEEPSEEK_ENV: &str = "DEEPSEEK_API_KEY";
pub const OPENROUTER_ENV: &str = "OPENROUTER_API_KEY";

/// Resolve a key before any work begins. Fails outside a terminal when
/// nothing is configured.
pub fn resolve_api_key(configured: Option<&str>, env_var: &str, provider: &str) -> Result<String> {
    if let Some(key) = non_blank(configured) {
        return Ok(key);
    }
    if let Some(key) = non_blank(std::env::var(env_var).ok().as_deref()) {
        return Ok(key);
    }
    if !std::io::stdin().is_terminal() {
        bail!("no {provider} API key: set {env_var} or api_key in the config file");
    }

    let key = Password::new(&format!("{provider} API key:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message(&format!("set {env_var} to skip this prompt"))
        .prompt()
        .with_context(|| format!("failed to read {provider} API key"))?;
    match non_blank(Some(&key)) {
        Some(key) => Ok(key),
        None => bail!("empty {provider} API key"),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
