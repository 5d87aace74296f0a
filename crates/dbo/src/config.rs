//! Engine configuration.

use dbo_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::field::DeletePolicy;

/// Settings shared by every class registered in one [`Catalog`](crate::Catalog).
///
/// All fields have defaults, so a partial JSON document is enough:
///
/// ```
/// use dbo::DboConfig;
///
/// let config = DboConfig::from_json(r#"{ "unique_code_max_attempts": 50 }"#).unwrap();
/// assert_eq!(config.primary_key, "id");
/// assert_eq!(config.unique_code_max_attempts, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DboConfig {
    /// Primary key column of every table.
    pub primary_key: String,
    /// Key value treated as "not yet saved" by `save_record`.
    pub new_key_sentinel: String,
    /// Upper bound on candidates drawn by unique code generation.
    pub unique_code_max_attempts: usize,
    /// Delete policy for `line_items` fields that do not set one.
    pub default_delete_policy: DeletePolicy,
}

impl Default for DboConfig {
    fn default() -> Self {
        Self {
            primary_key: "id".to_string(),
            new_key_sentinel: "new".to_string(),
            unique_code_max_attempts: 1000,
            default_delete_policy: DeletePolicy::Manual,
        }
    }
}

impl DboConfig {
    /// Parse a JSON document. Missing keys take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| Error::config(format!("invalid DBO configuration: {e}")))?;
        if config.primary_key.is_empty() {
            return Err(Error::config("primary_key must not be empty"));
        }
        if config.unique_code_max_attempts == 0 {
            return Err(Error::config("unique_code_max_attempts must be at least 1"));
        }
        Ok(config)
    }
}
