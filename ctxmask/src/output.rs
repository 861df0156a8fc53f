//! File output for picked context, prompts and mask dictionaries.

use ctxmask_core::{ContextError, FinalPrompts, MaskEntry, Result};
use std::path::Path;
use tracing::debug;

/// Writes text to a file.
pub async fn save_text(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|source| ContextError::Io {
            context: format!("Failed to write to {}", path.display()),
            source,
        })?;
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Writes a mask dictionary as pretty JSON.
pub async fn save_masks(path: &Path, masks: &[MaskEntry]) -> Result<()> {
    let json = serde_json::to_string_pretty(masks)
        .map_err(|e| ContextError::serialization("Mask dictionary", e))?;
    save_text(path, &json).await
}

/// Reads a mask dictionary written by [`save_masks`].
pub async fn load_masks(path: &Path) -> Result<Vec<MaskEntry>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ContextError::Io {
            context: format!("Failed to read masks from {}", path.display()),
            source,
        })?;
    serde_json::from_str(&content).map_err(|e| {
        ContextError::serialization(format!("Malformed mask dictionary {}", path.display()), e)
    })
}

/// Writes the four generation artifacts into a directory, creating it.
pub async fn save_prompts(dir: &Path, prompts: &FinalPrompts) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ContextError::Io {
            context: format!("Failed to create {}", dir.display()),
            source,
        })?;

    save_text(&dir.join("prompt.masked.txt"), &prompts.masked).await?;
    save_text(&dir.join("prompt.original.txt"), &prompts.original).await?;
    save_text(&dir.join("context.original.sql"), &prompts.sql_original).await?;
    save_masks(&dir.join("masks.json"), &prompts.masks).await
}
