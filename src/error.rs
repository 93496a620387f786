use thiserror::Error;

/// Why a page could not be retrieved. Every variant means "no markup this cycle".
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// A notification that did not reach its recipient.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rejected by API: {description}")]
    Rejected { description: String },
}

/// Startup failures. These are the only fatal errors in the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },

    #[error("bot token is not set (BOT_TOKEN or PRICE_WATCH_BOT_TOKEN)")]
    MissingBotToken,
}
