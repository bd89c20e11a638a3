//! Concurrent decoder configuration.

use serde::{Deserialize, Serialize};
use streamdecode_core::PipelineError;

/// What the producer does with a source failure after the first record has
/// already been handed to a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerErrorPolicy {
    /// Log the failure and end the stream; readers see a plain end of stream.
    #[default]
    Log,
    /// Log the failure and return it from every read once the queue drains.
    Surface,
}

/// Configuration for a `ConcurrentDecoder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Hand-off queue capacity and worker pool size.
    #[serde(default = "default_max_parallelism")]
    pub max_parallelism: usize,
    /// Prefix for thread names: `{name}-producer`, `{name}-worker-{i}`
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    #[serde(default)]
    pub on_producer_error: ProducerErrorPolicy,
}

fn default_max_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_thread_name() -> String {
    "streamdecode".into()
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_parallelism: default_max_parallelism(),
            thread_name: default_thread_name(),
            on_producer_error: ProducerErrorPolicy::default(),
        }
    }
}

impl DecoderConfig {
    /// Default config with the given parallelism.
    pub fn with_parallelism(max_parallelism: usize) -> Self {
        Self {
            max_parallelism,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let config: Self = serde_json::from_str(json).map_err(|e| PipelineError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_parallelism == 0 {
            return Err(PipelineError::InvalidConfig {
                reason: "max_parallelism must be at least 1".into(),
            });
        }
        if self.thread_name.is_empty() {
            return Err(PipelineError::InvalidConfig {
                reason: "thread_name must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config = DecoderConfig::from_json("{}").unwrap();
        assert!(config.max_parallelism >= 1);
        assert_eq!(config.thread_name, "streamdecode");
        assert_eq!(config.on_producer_error, ProducerErrorPolicy::Log);
    }

    #[test]
    fn json_overrides_every_field() {
        let config = DecoderConfig::from_json(
            r#"{"max_parallelism": 8, "thread_name": "csv", "on_producer_error": "surface"}"#,
        )
        .unwrap();
        assert_eq!(config.max_parallelism, 8);
        assert_eq!(config.thread_name, "csv");
        assert_eq!(config.on_producer_error, ProducerErrorPolicy::Surface);
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let err = DecoderConfig::from_json(r#"{"max_parallelism": 0}"#).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig { .. }));
        assert!(DecoderConfig::with_parallelism(0).validate().is_err());
        assert!(DecoderConfig::with_parallelism(1).validate().is_ok());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = DecoderConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig { .. }));
    }
}
