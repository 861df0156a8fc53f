//! Session orchestration: load a namespace, pick context, build prompts.
//!
//! A [`PromptSession`] owns one snapshot and one masking registry. It is
//! meant for a single interactive user; concurrent sessions each need
//! their own instance.

use crate::config::{MaskingConfig, PromptConfig, RenderConfig};
use crate::masking::{ContextMasker, MaskEntry};
use crate::prompt::{PromptGenerator, TokenCounter, WordEstimator};
use crate::render::OutputGenerator;
use crate::resolver::{ContextResolver, ResolvedContext};
use crate::snapshot::{NamespaceRows, Snapshot};
use crate::{ContextError, Result};
use serde::Serialize;
use tracing::{info, warn};

/// Result of picking context for a set of seeds.
#[derive(Debug, Clone, Serialize)]
pub struct PickedContext {
    /// Masked INSERT script
    pub sql: String,
    /// Masks issued while rendering, in issue order
    pub masks: Vec<MaskEntry>,
}

/// Masked and original prompts built from the same context.
#[derive(Debug, Clone, Serialize)]
pub struct FinalPrompts {
    /// Prompt safe to send to an external model
    pub masked: String,
    /// Same prompt with real identifiers, for review
    pub original: String,
    /// Unmasked INSERT script
    pub sql_original: String,
    /// Estimated token count of the masked prompt
    pub token_count: usize,
    /// Whether the estimate exceeds the configured budget
    pub over_budget: bool,
    /// Masks issued for this prompt, in issue order
    pub masks: Vec<MaskEntry>,
}

/// One interactive prompt-building session.
pub struct PromptSession {
    snapshot: Option<Snapshot>,
    masker: ContextMasker,
    render: RenderConfig,
    prompt: PromptConfig,
    counter: Box<dyn TokenCounter>,
}

impl std::fmt::Debug for PromptSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptSession")
            .field("loaded", &self.snapshot.is_some())
            .field("masks", &self.masker.len())
            .field("render", &self.render)
            .field("prompt", &self.prompt)
            .finish()
    }
}

impl Default for PromptSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptSession {
    /// Creates a session with default configuration and no snapshot.
    pub fn new() -> Self {
        Self {
            snapshot: None,
            masker: ContextMasker::new(),
            render: RenderConfig::default(),
            prompt: PromptConfig::default(),
            counter: Box::new(WordEstimator),
        }
    }

    /// Builder method to set the masking policy.
    ///
    /// Replaces the registry, so call it before picking context.
    pub fn with_masking(mut self, config: MaskingConfig) -> Self {
        self.masker = ContextMasker::with_config(config);
        self
    }

    /// Builder method to set the render configuration.
    pub fn with_render(mut self, config: RenderConfig) -> Self {
        self.render = config;
        self
    }

    /// Builder method to set the prompt budget.
    pub fn with_prompt(mut self, config: PromptConfig) -> Self {
        self.prompt = config;
        self
    }

    /// Builder method to substitute the token counter.
    pub fn with_token_counter(mut self, counter: impl TokenCounter + 'static) -> Self {
        self.counter = Box::new(counter);
        self
    }

    /// Indexes a namespace fetch, replacing any previous snapshot.
    pub fn load_snapshot(&mut self, rows: NamespaceRows) {
        let snapshot = Snapshot::from_rows(rows);
        info!("Loaded snapshot with {} records", snapshot.record_count());
        self.snapshot = Some(snapshot);
    }

    /// Loaded snapshot, if any.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Masking registry of the last pick or generation.
    pub fn masker(&self) -> &ContextMasker {
        &self.masker
    }

    /// Resolves the seeds and renders the masked context.
    ///
    /// The registry is cleared first, so mask numbering restarts at 1.
    ///
    /// # Errors
    /// Returns [`ContextError::SnapshotNotLoaded`] if no namespace is loaded.
    pub fn pick_context(
        &mut self,
        datasets: &[String],
        entities: &[String],
    ) -> Result<PickedContext> {
        info!(
            "Picking context: {} datasets, {} entities",
            datasets.len(),
            entities.len()
        );
        let snapshot = self.snapshot.as_ref().ok_or(ContextError::SnapshotNotLoaded)?;
        let mut context = resolve(snapshot, datasets, entities);

        self.masker.clear();
        let generator = OutputGenerator::new(snapshot, self.render.clone());
        let sql = generator.generate_sql(&mut context, Some(&mut self.masker));

        info!("Context picked: {} chars of SQL", sql.len());
        Ok(PickedContext {
            sql,
            masks: self.masker.entries().to_vec(),
        })
    }

    /// Builds the masked prompt for the model and the original prompt for
    /// review from the same resolved context.
    ///
    /// # Errors
    /// Returns [`ContextError::SnapshotNotLoaded`] if no namespace is loaded.
    pub fn generate_final_prompts(
        &mut self,
        namespace_label: &str,
        datasets: &[String],
        entities: &[String],
        system_prompt: &str,
        user_query: &str,
    ) -> Result<FinalPrompts> {
        info!("Generating final prompts for namespace {}", namespace_label);
        let snapshot = self.snapshot.as_ref().ok_or(ContextError::SnapshotNotLoaded)?;
        let mut context = resolve(snapshot, datasets, entities);

        self.masker.clear();
        let generator = OutputGenerator::new(snapshot, self.render.clone());
        let sql_masked = generator.generate_sql(&mut context, Some(&mut self.masker));
        let sql_original = generator.generate_sql(&mut context, None);

        let prompts = PromptGenerator::new();
        let masked = prompts.generate(
            &self.masker.mask_text(system_prompt)?,
            &self.masker.mask_text(user_query)?,
            namespace_label,
            Some(&sql_masked),
        );
        let original = prompts.generate(
            system_prompt,
            user_query,
            namespace_label,
            Some(&sql_original),
        );

        let token_count = self.counter.count_tokens(&masked);
        let over_budget = token_count > self.prompt.max_tokens;
        if over_budget {
            warn!(
                "Masked prompt is ~{} tokens, over the {} token budget",
                token_count, self.prompt.max_tokens
            );
        }

        Ok(FinalPrompts {
            masked,
            original,
            sql_original,
            token_count,
            over_budget,
            masks: self.masker.entries().to_vec(),
        })
    }

    /// Masks free text with the current registry.
    ///
    /// # Errors
    /// See [`ContextMasker::mask_text`].
    pub fn mask_text(&self, text: &str) -> Result<String> {
        self.masker.mask_text(text)
    }

    /// Restores real values in text produced from the current registry.
    ///
    /// # Errors
    /// See [`ContextMasker::unmask_text`].
    pub fn unmask_text(&self, text: &str) -> Result<String> {
        self.masker.unmask_text(text)
    }
}

fn resolve(snapshot: &Snapshot, datasets: &[String], entities: &[String]) -> ResolvedContext {
    let mut resolver = ContextResolver::new(snapshot);
    for dataset in datasets {
        if !resolver.resolve_by_dataset(dataset) {
            warn!("Dataset seed '{}' matched no rows", dataset);
        }
    }
    for entity in entities {
        if !resolver.resolve_by_entity(entity) {
            warn!("Entity seed '{}' matched no rows", entity);
        }
    }
    resolver.into_context()
}
