//! Site statistic model, keyed by name rather than id.

use serde::{Deserialize, Serialize};

/// A key/value statistic shown on the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistic {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Statistic {
    /// Display label: the first underscore becomes a space.
    pub fn label(&self) -> String {
        self.key.replacen('_', " ", 1)
    }
}
