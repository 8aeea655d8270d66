//! Runtime configuration, built from environment variables.

use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Path to the local libSQL database file.
    pub db_path: String,
    /// Base URL of the WhatsApp Graph API (overridable for tests/staging).
    pub graph_api_base: String,
    /// Graph API version segment.
    pub graph_api_version: String,
    /// Token echoed back during the WhatsApp webhook verification handshake.
    pub whatsapp_verify_token: Option<String>,
    /// Upper bound on each outbound provider call.
    pub send_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: "./data/courier.db".to_string(),
            graph_api_base: "https://graph.facebook.com".to_string(),
            graph_api_version: "v19.0".to_string(),
            whatsapp_verify_token: None,
            send_timeout: Duration::from_secs(20),
        }
    }
}

impl AppConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port: u16 = std::env::var("COURIER_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let db_path =
            std::env::var("COURIER_DB_PATH").unwrap_or_else(|_| defaults.db_path.clone());

        let graph_api_base = std::env::var("COURIER_GRAPH_API_BASE")
            .unwrap_or_else(|_| defaults.graph_api_base.clone());

        let graph_api_version = std::env::var("COURIER_GRAPH_API_VERSION")
            .unwrap_or_else(|_| defaults.graph_api_version.clone());

        let whatsapp_verify_token = std::env::var("COURIER_WHATSAPP_VERIFY_TOKEN").ok();

        let send_timeout = std::env::var("COURIER_SEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.send_timeout);

        Self {
            port,
            db_path,
            graph_api_base,
            graph_api_version,
            whatsapp_verify_token,
            send_timeout,
        }
    }
}
