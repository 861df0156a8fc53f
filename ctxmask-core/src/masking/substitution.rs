//! Single-pass, longest-match-first text substitution.
//!
//! All patterns compile into one regex alternation, longest first, so a
//! replacement is never re-scanned and a shorter pattern never wins over a
//! longer one starting at the same position.

use regex::{Captures, Regex, RegexBuilder};
use std::collections::HashMap;

/// Compiled-size ceiling for one substitution regex.
const SIZE_LIMIT: usize = 64 * 1024 * 1024;

/// Whether `c` counts as part of an identifier for boundary checks.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether a value consists only of identifier characters.
pub(crate) fn is_word(value: &str) -> bool {
    !value.is_empty() && value.chars().all(is_word_char)
}

/// A set of `pattern -> replacement` pairs applied in one left-to-right scan.
///
/// A bounded pattern gets `\b` on each end that is a word character, so it
/// never matches glued to further word characters.
#[derive(Debug, Default)]
pub(crate) struct SubstitutionTable {
    pairs: HashMap<String, (String, bool)>,
}

/// Compiled form of a [`SubstitutionTable`].
#[derive(Debug)]
pub(crate) struct Substitution {
    regex: Option<Regex>,
    replacements: HashMap<String, String>,
}

impl SubstitutionTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds one pair. Empty patterns are ignored; a repeated pattern keeps
    /// the last replacement.
    pub(crate) fn insert(&mut self, pattern: &str, replacement: &str, bounded: bool) {
        if pattern.is_empty() {
            return;
        }
        self.pairs
            .insert(pattern.to_string(), (replacement.to_string(), bounded));
    }

    fn alternative(pattern: &str, bounded: bool) -> String {
        let escaped = regex::escape(pattern);
        if !bounded {
            return escaped;
        }
        let left = if pattern.chars().next().is_some_and(is_word_char) {
            r"\b"
        } else {
            ""
        };
        let right = if pattern.chars().next_back().is_some_and(is_word_char) {
            r"\b"
        } else {
            ""
        };
        format!("{}{}{}", left, escaped, right)
    }

    /// Compiles every pair into one alternation, longest pattern first.
    ///
    /// # Errors
    /// Returns the regex error if the alternation exceeds the size limit.
    pub(crate) fn compile(self) -> Result<Substitution, regex::Error> {
        if self.pairs.is_empty() {
            return Ok(Substitution {
                regex: None,
                replacements: HashMap::new(),
            });
        }

        let mut patterns: Vec<(&String, bool)> = self
            .pairs
            .iter()
            .map(|(pattern, (_, bounded))| (pattern, *bounded))
            .collect();
        patterns.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let alternation = patterns
            .iter()
            .map(|(pattern, bounded)| Self::alternative(pattern, *bounded))
            .collect::<Vec<_>>()
            .join("|");
        let regex = RegexBuilder::new(&alternation)
            .size_limit(SIZE_LIMIT)
            .build()?;

        let replacements = self
            .pairs
            .into_iter()
            .map(|(pattern, (replacement, _))| (pattern, replacement))
            .collect();
        Ok(Substitution {
            regex: Some(regex),
            replacements,
        })
    }
}

impl Substitution {
    /// Applies every substitution in one pass.
    pub(crate) fn apply(&self, text: &str) -> String {
        let Some(regex) = &self.regex else {
            return text.to_string();
        };
        regex
            .replace_all(text, |caps: &Captures| {
                let matched = &caps[0];
                self.replacements
                    .get(matched)
                    .cloned()
                    .unwrap_or_else(|| matched.to_string())
            })
            .into_owned()
    }
}
