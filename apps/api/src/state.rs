use reqwest::Client as HttpClient;

use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Shared HTTP client, built without a default timeout: evaluation calls
    /// may stream for minutes. The PDF fetch path sets its own 30s budget.
    pub http: HttpClient,
    pub config: Config,
}
