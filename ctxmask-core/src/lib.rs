//! Context resolution and reversible masking for LLM prompts.
//!
//! Given a snapshot of a query-engine configuration namespace, this crate
//! pulls out the rows relevant to a few seed datasets or entities, renders
//! them as an INSERT script, and replaces every business identifier with a
//! stable synthetic mask such as `ENT_1` or `P_3`. The same registry
//! restores real names in the model's reply.
//!
//! # Privacy Guarantees
//! - Real identifiers are replaced before a prompt leaves the process
//! - Mask dictionaries are never logged
//! - Row sources are read-only and redact connection strings
//!
//! # Architecture
//! - [`snapshot`]: primary-key index over fetched rows
//! - [`resolver`]: breadth-first dependency closure from seeds
//! - [`masking`]: bidirectional mask registry and formula pipeline
//! - [`render`]: INSERT rendering with per-column masking
//! - [`service`]: session orchestration over the above
//! - [`adapters`]: namespace row sources (JSON dumps, PostgreSQL)

pub mod adapters;
pub mod config;
pub mod error;
pub mod logging;
pub mod masking;
pub mod prompt;
pub mod render;
pub mod resolver;
pub mod schema;
pub mod service;
pub mod snapshot;

// Re-export commonly used types
pub use adapters::{NamespaceSource, create_source, create_source_with_config};
pub use config::{ConnectionConfig, LiteralPolicy, MaskingConfig, PromptConfig, RenderConfig};
pub use error::{ContextError, Result};
pub use masking::{ContextMasker, MaskCategory, MaskEntry};
pub use prompt::{PromptGenerator, TokenCounter, WordEstimator};
pub use render::OutputGenerator;
pub use resolver::{ContextResolver, ResolvedContext};
pub use schema::TableKind;
pub use service::{FinalPrompts, PickedContext, PromptSession};
pub use snapshot::{NamespaceRows, PrimaryKey, Row, Snapshot};
