//! Configuration types for row sources, masking, rendering and prompts.
//!
//! - `ConnectionConfig`: pooled row-source settings
//! - `MaskingConfig`: masking policy knobs
//! - `RenderConfig`: SQL rendering layout
//! - `PromptConfig`: prompt budget settings
//!
//! # Security
//! None of these structs store credentials. Connection strings are passed to
//! the row source separately and redacted before logging.

mod connection;
mod masking;
mod output;

pub use connection::ConnectionConfig;
pub use masking::{LiteralPolicy, MaskingConfig};
pub use output::{PromptConfig, RenderConfig};
