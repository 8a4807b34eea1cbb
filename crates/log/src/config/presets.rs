//! Configuration presets for common scenarios

use super::{Config, Format, Writer};

impl Config {
    /// Create configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        // Parse REKEY_LOG or RUST_LOG
        if let Some(level) = lookup("REKEY_LOG").or_else(|| lookup("RUST_LOG")) {
            config.level = level;
        }

        if let Some(format) = lookup("REKEY_LOG_FORMAT") {
            config.format = Format::parse(&format).unwrap_or_default();
        }
        if config.format == Format::Json {
            config.ansi = false;
        }

        config
    }

    /// Development configuration (pretty, debug level)
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: Format::Pretty,
            ..Self::default()
        }
    }

    /// Production configuration (JSON, info level)
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Json,
            ansi: false,
            ..Self::default()
        }
    }

    /// Test configuration (captured by libtest, everything from this workspace)
    #[must_use]
    pub fn test() -> Self {
        Self {
            level: "rekey_credential=trace,rekey_workflow=trace,warn".to_string(),
            format: Format::Compact,
            ansi: false,
            with_target: true,
            writer: Writer::Test,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn rekey_log_wins_over_rust_log() {
        let config = Config::from_lookup(lookup(&[("REKEY_LOG", "debug"), ("RUST_LOG", "warn")]));
        assert_eq!(config.level, "debug");

        let config = Config::from_lookup(lookup(&[("RUST_LOG", "warn")]));
        assert_eq!(config.level, "warn");

        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn format_from_env() {
        let config = Config::from_lookup(lookup(&[("REKEY_LOG_FORMAT", "JSON")]));
        assert_eq!(config.format, Format::Json);
        assert!(!config.ansi);

        let config = Config::from_lookup(lookup(&[("REKEY_LOG_FORMAT", "logfmt")]));
        assert_eq!(config.format, Format::Compact);
    }

    #[test]
    fn presets() {
        assert_eq!(Config::development().format, Format::Pretty);
        assert_eq!(Config::development().level, "debug");
        assert_eq!(Config::production().format, Format::Json);
        assert_eq!(Config::test().writer, Writer::Test);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: Config = serde_json::from_str(r#"{"level": "trace", "format": "pretty"}"#).unwrap();
        assert_eq!(config.level, "trace");
        assert_eq!(config.format, Format::Pretty);
        assert!(config.with_target);
    }
}
