//! Runtime settings.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults,
//! 2. an optional `exam-entry.toml` in the working directory,
//! 3. `EXAM_ENTRY_*` environment variables (`EXAM_ENTRY_DATABASE__URL`,
//!    `EXAM_ENTRY_LOGGING__LEVEL`, ...), after `.env` is loaded.
//!
//! `DATABASE_URL` is used when no database URL is configured otherwise.

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            acquire_timeout_secs: 10,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl DatabaseSettings {
    pub fn url(&self) -> anyhow::Result<&str> {
        self.url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("exam-entry").required(false))
            .add_source(
                config::Environment::with_prefix("EXAM_ENTRY")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let mut settings = Self::from_builder(builder)?;
        if settings.database.url.is_none() {
            settings.database.url = std::env::var("DATABASE_URL").ok();
        }
        Ok(settings)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> anyhow::Result<Self> {
        let settings = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(source: &str) -> anyhow::Result<Settings> {
        Settings::from_builder(
            config::Config::builder()
                .add_source(config::File::from_str(source, config::FileFormat::Toml)),
        )
    }

    #[test]
    fn empty_source_uses_defaults() {
        let settings = from_toml("").unwrap();
        assert_eq!(settings.database.url, None);
        assert_eq!(settings.database.max_connections, 5);
        assert_eq!(settings.database.acquire_timeout_secs, 10);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn file_values_override_defaults() {
        let settings = from_toml(
            r#"
            [database]
            url = "postgres://localhost/exam_entry"
            max_connections = 12

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(
            settings.database.url().unwrap(),
            "postgres://localhost/exam_entry"
        );
        assert_eq!(settings.database.max_connections, 12);
        assert_eq!(settings.database.acquire_timeout_secs, 10);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn missing_url_is_an_error() {
        let settings = Settings::default();
        assert!(settings.database.url().is_err());
    }
}
