//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Settings for a [`Session`](crate::Session).
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Prefix of generated node ids.
    pub id_prefix: String,
    /// Counter value of the first generated id.
    pub first_id: u64,
    /// Maximum number of nodes under resolution at once during evaluation.
    /// `None` means unlimited.
    pub max_eval_depth: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            id_prefix: "N".to_string(),
            first_id: 1,
            max_eval_depth: None,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SessionConfig =
            serde_json::from_str(json).map_err(|e| GraphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id_prefix.is_empty() {
            return Err(GraphError::Config("id_prefix must not be empty".to_string()));
        }
        if self.max_eval_depth == Some(0) {
            return Err(GraphError::Config(
                "max_eval_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
