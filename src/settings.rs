use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;

use crate::error::ConfigError;

const ENV_PREFIX: &str = "PRICE_WATCH";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bot_token: Option<String>,
    pub database_path: PathBuf,
    pub check_interval_secs: u64,
    pub initial_delay_secs: u64,
    pub fetch_timeout_secs: u64,
    pub notify_timeout_secs: u64,
    pub telegram_api_base: String,
}

impl Settings {
    /// Defaults, then `PRICE_WATCH_*` variables, then a bare `BOT_TOKEN`.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("database_path", "data/prices.sqlite")?
            .set_default("check_interval_secs", 600)?
            .set_default("initial_delay_secs", 30)?
            .set_default("fetch_timeout_secs", 20)?
            .set_default("notify_timeout_secs", 10)?
            .set_default("telegram_api_base", "https://api.telegram.org")?
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .set_override_option("bot_token", std::env::var("BOT_TOKEN").ok())?
            .build()?;

        let settings: Self = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Zero periods would spin the scheduler or time out every request.
    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("check_interval_secs", self.check_interval_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("notify_timeout_secs", self.notify_timeout_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero",
                });
            }
        }
        Ok(())
    }

    pub fn require_bot_token(&self) -> Result<&str, ConfigError> {
        self.bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingBotToken)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(token: Option<&str>) -> Settings {
        Settings {
            bot_token: token.map(String::from),
            database_path: PathBuf::from(":memory:"),
            check_interval_secs: 600,
            initial_delay_secs: 30,
            fetch_timeout_secs: 20,
            notify_timeout_secs: 10,
            telegram_api_base: "https://api.telegram.org".into(),
        }
    }

    #[test]
    fn missing_token_is_a_config_error() {
        assert!(matches!(
            settings(None).require_bot_token(),
            Err(ConfigError::MissingBotToken)
        ));
        assert!(matches!(
            settings(Some("   ")).require_bot_token(),
            Err(ConfigError::MissingBotToken)
        ));
    }

    #[test]
    fn defaults_are_valid() {
        settings(None).validate().unwrap();
    }

    #[test]
    fn zero_check_interval_rejected() {
        let mut s = settings(None);
        s.check_interval_secs = 0;
        assert!(matches!(
            s.validate(),
            Err(ConfigError::Invalid { field: "check_interval_secs", .. })
        ));
    }

    #[test]
    fn zero_fetch_timeout_rejected() {
        let mut s = settings(None);
        s.fetch_timeout_secs = 0;
        assert!(matches!(
            s.validate(),
            Err(ConfigError::Invalid { field: "fetch_timeout_secs", .. })
        ));
    }

    #[test]
    fn token_is_trimmed() {
        assert_eq!(settings(Some(" 123:abc\n")).require_bot_token().unwrap(), "123:abc");
    }

    #[test]
    fn durations() {
        let s = settings(None);
        assert_eq!(s.check_interval(), Duration::from_secs(600));
        assert_eq!(s.initial_delay(), Duration::from_secs(30));
        assert_eq!(s.fetch_timeout(), Duration::from_secs(20));
    }
}
