//! Rendering and prompt configuration.

use serde::{Deserialize, Serialize};

/// Layout settings for the rendered INSERT script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Schema written in the `SET SEARCH_PATH` preamble
    pub search_path: String,
    /// Character budget of one compact line in a pretty row
    pub line_budget: usize,
    /// Column index from which pretty rows put one value per line
    pub vertical_start: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            search_path: "qe_config".to_string(),
            line_budget: 120,
            vertical_start: 5,
        }
    }
}

impl RenderConfig {
    /// Creates the default render configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the search path.
    pub fn with_search_path(mut self, search_path: impl Into<String>) -> Self {
        self.search_path = search_path.into();
        self
    }

    /// Builder method to set the pretty-row line budget.
    pub fn with_line_budget(mut self, line_budget: usize) -> Self {
        self.line_budget = line_budget;
        self
    }

    /// Validates render settings.
    ///
    /// # Errors
    /// Returns a configuration error for an empty search path or zero budget.
    pub fn validate(&self) -> crate::Result<()> {
        if self.search_path.trim().is_empty() {
            return Err(crate::error::ContextError::configuration(
                "search_path cannot be empty",
            ));
        }
        if self.line_budget == 0 {
            return Err(crate::error::ContextError::configuration(
                "line_budget must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Prompt budget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Token budget of the target model window
    pub max_tokens: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { max_tokens: 128_000 }
    }
}

impl PromptConfig {
    /// Builder method to set the token budget.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}
