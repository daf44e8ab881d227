use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tuning knobs for a [`Translator`](crate::translator::Translator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TranslatorConfig {
    /// Minimum number of same-kind events in a batch before they are merged into one bulk event.
    pub bulk_threshold: usize,
    /// Maximum number of event-kind groups aggregated at once. `None` runs every group concurrently.
    pub group_concurrency: Option<usize>,
    /// Collapse a record create followed by an update of the same record into one create.
    pub merge_create_update: bool,
    /// Hand final events to the publisher. When false, events are only returned in the report.
    pub publish: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self { Self { bulk_threshold: 2, group_concurrency: None, merge_create_update: true, publish: true } }
}

impl TranslatorConfig {
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: TranslatorConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bulk_threshold < 2 {
            return Err(ConfigError::Invalid(format!("bulkThreshold must be at least 2, got {}", self.bulk_threshold)));
        }
        if self.group_concurrency == Some(0) {
            return Err(ConfigError::Invalid("groupConcurrency must be positive".to_string()));
        }
        Ok(())
    }

    pub fn dry_run(mut self) -> Self {
        self.publish = false;
        self
    }
}
