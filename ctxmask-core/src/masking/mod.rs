//! Reversible, category-scoped masking of sensitive identifiers.
//!
//! A [`ContextMasker`] issues stable synthetic identifiers (`ENT_1`, `P_3`,
//! `DB.TBL_2`, ...) per `(category, real value)` pair and applies them to
//! plain text, JSON trees and formula strings. One registry belongs to one
//! session; it is cleared before every independent resolution so numbering
//! is reproducible for a given selection.
//!
//! # Lifecycle
//! `new` -> `clear` before each pick/generate -> `register` / `mask_*` ->
//! `unmask_text` on the reply. The registry is never persisted except as an
//! explicit [`MaskEntry`] list (see [`ContextMasker::entries`] and
//! [`ContextMasker::restore`]).
//!
//! # Security
//! Real values are never logged. Only mask identifiers and counts are.

mod category;
mod formula;
mod json;
mod substitution;


pub use category::MaskCategory;

use crate::config::MaskingConfig;
use crate::{ContextError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use substitution::{SubstitutionTable, is_word};
use tracing::{debug, trace};

/// One issued mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskEntry {
    /// Category the value was registered under
    pub category: MaskCategory,
    /// Real value
    pub real: String,
    /// Synthetic identifier
    pub mask: String,
}

/// Bidirectional masking registry.
#[derive(Debug, Clone, Default)]
pub struct ContextMasker {
    config: MaskingConfig,
    scoped: HashMap<MaskCategory, HashMap<String, String>>,
    reverse: HashMap<String, String>,
    flat: HashMap<String, (MaskCategory, String)>,
    counters: HashMap<MaskCategory, u32>,
    entries: Vec<MaskEntry>,
    known_parameters: BTreeSet<String>,
}

impl ContextMasker {
    /// Creates an empty registry with the default masking policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with an explicit policy.
    pub fn with_config(config: MaskingConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Active masking configuration.
    pub fn config(&self) -> &MaskingConfig {
        &self.config
    }

    /// Returns the mask for `(real, category)`, issuing the next one if new.
    ///
    /// Registering the empty string is a no-op that returns an empty string
    /// and consumes no counter value.
    pub fn register(&mut self, real: &str, category: MaskCategory) -> String {
        if real.is_empty() {
            return String::new();
        }

        if let Some(existing) = self.scoped.get(&category).and_then(|s| s.get(real)) {
            return existing.clone();
        }

        let counter = self.counters.entry(category).or_insert(0);
        *counter = counter.saturating_add(1);
        let mask = category.mask_id(*counter);

        self.record(category, real, &mask);
        trace!("Issued mask {}", mask);
        mask
    }

    fn record(&mut self, category: MaskCategory, real: &str, mask: &str) {
        self.scoped
            .entry(category)
            .or_default()
            .insert(real.to_string(), mask.to_string());
        self.reverse.insert(mask.to_string(), real.to_string());

        let replace = match self.flat.get(real) {
            Some((held, _)) => category.priority_rank() < held.priority_rank(),
            None => true,
        };
        if replace {
            self.flat
                .insert(real.to_string(), (category, mask.to_string()));
        }

        self.entries.push(MaskEntry {
            category,
            real: real.to_string(),
            mask: mask.to_string(),
        });
    }

    /// Looks a value up in the given categories, first hit wins. Never allocates a mask.
    pub fn get_known_mask(&self, real: &str, categories: &[MaskCategory]) -> Option<&str> {
        categories.iter().find_map(|category| {
            self.scoped
                .get(category)
                .and_then(|scope| scope.get(real))
                .map(String::as_str)
        })
    }

    /// Mask currently holding the flat text slot for `real`.
    pub fn flat_mask(&self, real: &str) -> Option<&str> {
        self.flat.get(real).map(|(_, mask)| mask.as_str())
    }

    /// Real value behind an issued mask.
    pub fn real_value(&self, mask: &str) -> Option<&str> {
        self.reverse.get(mask).map(String::as_str)
    }

    /// Whether `value` is an issued mask.
    pub fn is_mask(&self, value: &str) -> bool {
        self.reverse.contains_key(value)
    }

    /// Replaces every known real value in free text with its flat mask.
    ///
    /// Values made only of identifier characters match on word boundaries;
    /// values with punctuation match as literal substrings. `{name}` tokens
    /// always use the parameter scope, whatever holds the flat slot.
    ///
    /// # Errors
    /// Returns a pattern error if the registry is too large to compile.
    pub fn mask_text(&self, text: &str) -> Result<String> {
        let mut table = SubstitutionTable::new();
        for (real, (_, mask)) in &self.flat {
            table.insert(real, mask, is_word(real));
        }
        if let Some(parameters) = self.scoped.get(&MaskCategory::Parameter) {
            for (real, mask) in parameters {
                table.insert(&format!("{{{}}}", real), &format!("{{{}}}", mask), false);
            }
        }
        let substitution = table
            .compile()
            .map_err(|e| ContextError::pattern("Mask substitution", e))?;
        Ok(substitution.apply(text))
    }

    /// Replaces every issued mask with its real value, longest mask first.
    ///
    /// # Errors
    /// Returns a pattern error if the registry is too large to compile.
    pub fn unmask_text(&self, text: &str) -> Result<String> {
        let mut table = SubstitutionTable::new();
        for (mask, real) in &self.reverse {
            table.insert(mask, real, true);
        }
        let substitution = table
            .compile()
            .map_err(|e| ContextError::pattern("Unmask substitution", e))?;
        Ok(substitution.apply(text))
    }

    /// Sets the parameter ids that formula masking recognises as bare words.
    pub fn set_known_parameters<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_parameters = ids.into_iter().map(Into::into).collect();
        debug!(
            "Formula masking knows {} parameter ids",
            self.known_parameters.len()
        );
    }

    /// Parameter ids recognised as bare words in formulas.
    pub fn known_parameters(&self) -> &BTreeSet<String> {
        &self.known_parameters
    }

    /// Issued masks in issue order.
    pub fn entries(&self) -> &[MaskEntry] {
        &self.entries
    }

    /// Rebuilds a registry from saved entries.
    ///
    /// Counters resume after the highest number seen per mask prefix, so a
    /// later `register` never reissues a restored mask even when the entry's
    /// category and prefix disagree. Entries whose mask is already issued
    /// are skipped.
    pub fn restore<I>(config: MaskingConfig, entries: I) -> Self
    where
        I: IntoIterator<Item = MaskEntry>,
    {
        let mut masker = Self::with_config(config);
        for entry in entries {
            if entry.real.is_empty() || masker.is_mask(&entry.mask) {
                continue;
            }
            if let Some((category, n)) = MaskCategory::parse_mask_id(&entry.mask) {
                let counter = masker.counters.entry(category).or_insert(0);
                *counter = (*counter).max(n);
            }
            masker.record(entry.category, &entry.real, &entry.mask);
        }
        debug!("Restored {} mask entries", masker.len());
        masker
    }

    /// Number of issued masks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no mask has been issued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets every mask and restarts all counters at 1.
    ///
    /// The masking policy is kept.
    pub fn clear(&mut self) {
        self.scoped.clear();
        self.reverse.clear();
        self.flat.clear();
        self.counters.clear();
        self.entries.clear();
        self.known_parameters.clear();
    }
}
