//! Subscriber bootstrap for binaries embedding streamdecode.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How `init_tracing` filters and formats events.
///
/// Deserialises from partial input; missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base `EnvFilter` directive applied to every target.
    pub level: String,
    /// Per-target overrides. Dashes in crate names are accepted and mapped
    /// to the underscores used by `tracing` targets.
    pub components: BTreeMap<String, String>,
    /// One JSON object per event instead of the default text lines.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            components: BTreeMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Filter directives, e.g. `"info,streamdecode_pipeline=debug"`.
    pub fn directives(&self) -> String {
        let mut directives = self.level.clone();
        for (component, level) in &self.components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

/// Install the global subscriber described by `config`.
///
/// Only the first call in a process takes effect. Invalid directives fall
/// back to `info`.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_new(config.directives()).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    if let Err(e) = result {
        tracing::debug!("tracing already initialised: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_normalise_component_names() {
        let mut config = LogConfig::default();
        config
            .components
            .insert("streamdecode-pipeline".into(), "debug".into());
        config.components.insert("rayon_core".into(), "warn".into());
        assert_eq!(
            config.directives(),
            "info,rayon_core=warn,streamdecode_pipeline=debug"
        );
    }

    #[test]
    fn config_deserialises_with_defaults() {
        let config: LogConfig = serde_json::from_str(r#"{"json": true}"#).unwrap();
        assert_eq!(config.level, "info");
        assert!(config.components.is_empty());
        assert!(config.json);
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_tracing(&LogConfig::default());
        init_tracing(&LogConfig::default());
    }
}
