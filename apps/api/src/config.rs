use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every value here is a default — the evaluation endpoints can be
/// overridden per request by the caller.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_base_url: String,
    /// May be empty when every caller supplies its own key.
    pub llm_api_key: String,
    pub llm_model: String,
    /// Model used by the policy-analysis stage when not overridden.
    pub policy_model: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            llm_base_url: env_or("OPENAI_BASE_URL", "https://api.chatfire.cn/v1"),
            llm_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            llm_model: env_or("OPENAI_MODEL", "deepseek-v3"),
            policy_model: env_or("POLICY_MODEL", "deepseek-r1-search-pro"),
            port: env_or("PORT", "4091")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
