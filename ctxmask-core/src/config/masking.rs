//! Masking policy configuration.

use serde::{Deserialize, Serialize};

/// What the formula pipeline does with a quoted literal no stage recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralPolicy {
    /// Leave the literal as written.
    #[default]
    Preserve,
    /// Register the literal under the `OBJ` bucket.
    MaskAsOther,
}

/// Configuration for the masking registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaskingConfig {
    /// Treatment of uncategorised quoted literals inside formulas
    pub literal_policy: LiteralPolicy,
}

impl MaskingConfig {
    /// Creates the default masking configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the literal policy.
    pub fn with_literal_policy(mut self, policy: LiteralPolicy) -> Self {
        self.literal_policy = policy;
        self
    }
}
