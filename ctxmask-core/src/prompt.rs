//! Final prompt assembly and token estimation.
//!
//! Assembly is a fixed template and knows nothing about masking: callers
//! mask each field before handing it over.

/// Placeholder written when no configuration context was picked.
pub const NO_CONTEXT: &str = "No relevant context";

/// Counts tokens in a piece of text.
///
/// Implementations may be exact tokenizers or approximations; callers only
/// use the result to compare against a budget.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens `text` is expected to occupy.
    fn count_tokens(&self, text: &str) -> usize;
}

/// Word-split approximation: one token per 0.75 words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordEstimator;

impl TokenCounter for WordEstimator {
    fn count_tokens(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        // words / 0.75, truncated
        words.saturating_mul(4) / 3
    }
}

/// Builds final prompts from their parts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptGenerator;

impl PromptGenerator {
    /// Creates a generator.
    pub fn new() -> Self {
        Self
    }

    /// Concatenates the system prompt, the configuration context block
    /// labelled with the namespace, and the user query.
    ///
    /// An absent or blank `sql_context` renders as [`NO_CONTEXT`].
    ///
    /// # Example
    /// ```rust
    /// use ctxmask_core::prompt::PromptGenerator;
    ///
    /// let prompt = PromptGenerator::new().generate("Be brief.", "Count people", "AN", None);
    /// assert!(prompt.contains("(namespace: AN)"));
    /// assert!(prompt.ends_with("Count people"));
    /// ```
    pub fn generate(
        &self,
        system_prompt: &str,
        user_query: &str,
        namespace_label: &str,
        sql_context: Option<&str>,
    ) -> String {
        let context = sql_context
            .filter(|sql| !sql.trim().is_empty())
            .unwrap_or(NO_CONTEXT);

        format!(
            "-- System prompt:\n{}\n\n\
             -- Configuration context (namespace: {}):\n{}\n\n\
             -- User query:\n{}",
            system_prompt, namespace_label, context, user_query
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_template() {
        let prompt = PromptGenerator::new().generate(
            "You write SQL.",
            "How many ENT_1?",
            "AN",
            Some("SET SEARCH_PATH to qe_config;\n"),
        );
        assert_eq!(
            prompt,
            "-- System prompt:\nYou write SQL.\n\n\
             -- Configuration context (namespace: AN):\nSET SEARCH_PATH to qe_config;\n\n\n\
             -- User query:\nHow many ENT_1?"
        );
    }

    #[test]
    fn test_generate_without_context() {
        let generator = PromptGenerator::new();
        let absent = generator.generate("s", "q", "INS", None);
        let blank = generator.generate("s", "q", "INS", Some("  \n"));
        assert!(absent.contains(&format!("(namespace: INS):\n{}\n", NO_CONTEXT)));
        assert_eq!(absent, blank);
    }

    #[test]
    fn test_word_estimator() {
        let counter = WordEstimator;
        assert_eq!(counter.count_tokens(""), 0);
        assert_eq!(counter.count_tokens("one two three"), 4);
        assert_eq!(counter.count_tokens("a  b\n c\td e f"), 8);
    }
}
