//! INSERT-script rendering of a resolved context, with optional masking.
//!
//! Table blocks follow [`TableKind::RENDER_ORDER`] and rows within a block
//! follow primary-key order, so the same context always renders the same
//! script. A row that cannot be rendered is logged and skipped; it never
//! aborts the whole script.

mod values;


use crate::config::RenderConfig;
use crate::masking::{ContextMasker, MaskCategory};
use crate::resolver::{ResolvedContext, parse_array_literal};
use crate::schema::{ColumnAction, TableKind};
use crate::snapshot::{PrimaryKey, Snapshot, stringify};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, error, info};
use values::{format_row, format_row_pretty, format_value};

/// Categories an array-path element is looked up in, in order.
const PATH_CATEGORIES: [MaskCategory; 4] = [
    MaskCategory::Parameter,
    MaskCategory::Entity,
    MaskCategory::Property,
    MaskCategory::Table,
];

/// Failure to render one row. Logged and swallowed by the renderer.
#[derive(Debug, Error)]
enum RowRenderError {
    #[error("row is referenced by the context but missing from the snapshot")]
    MissingRow,

    #[error("column '{column}' could not be masked")]
    Masking {
        column: String,
        #[source]
        source: Box<crate::error::ContextError>,
    },

    #[error("column '{column}' could not be serialized")]
    Serialization {
        column: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Renders resolved contexts of one snapshot as INSERT statements.
#[derive(Debug, Clone)]
pub struct OutputGenerator<'a> {
    snapshot: &'a Snapshot,
    config: RenderConfig,
}

impl<'a> OutputGenerator<'a> {
    /// Creates a renderer over a snapshot.
    pub fn new(snapshot: &'a Snapshot, config: RenderConfig) -> Self {
        Self { snapshot, config }
    }

    /// Adds the tenant rows every rendered row refers to, plus the default
    /// (empty) tenant, when the snapshot defines them.
    pub fn ensure_tenants_exist(&self, context: &mut ResolvedContext) {
        let mut used: BTreeSet<String> = context
            .kinds()
            .filter(TableKind::is_tenant_scoped)
            .filter_map(|kind| context.get(kind))
            .flat_map(|keys| keys.iter())
            .map(|key| key.tenant().to_string())
            .filter(|tenant| !tenant.is_empty())
            .collect();
        used.insert(String::new());

        for tenant in used {
            let key = PrimaryKey::new([tenant]);
            if self.snapshot.contains(TableKind::Tenants, &key) {
                context.insert(TableKind::Tenants, key);
            }
        }
    }

    /// Teaches the masker every parameter id in the context and issues
    /// their masks up front, in sorted order.
    fn prefill_known_parameters(&self, context: &ResolvedContext, masker: &mut ContextMasker) {
        let ids: BTreeSet<String> = context
            .get(TableKind::Parameters)
            .into_iter()
            .flatten()
            .map(|key| key.part(2).to_string())
            .filter(|id| !id.is_empty())
            .collect();

        for id in &ids {
            masker.register(id, MaskCategory::Parameter);
        }
        masker.set_known_parameters(ids);
    }

    /// Renders the context as an INSERT script.
    ///
    /// The tenant catalogue is completed first. With a masker, every
    /// sensitive column is masked according to its [`ColumnAction`].
    pub fn generate_sql(
        &self,
        context: &mut ResolvedContext,
        mut masker: Option<&mut ContextMasker>,
    ) -> String {
        self.ensure_tenants_exist(context);
        if let Some(masker) = masker.as_deref_mut() {
            self.prefill_known_parameters(context, masker);
        }

        let mut lines = vec![format!("SET SEARCH_PATH to {};\n", self.config.search_path)];
        let mut rendered = 0usize;

        for kind in TableKind::RENDER_ORDER {
            let Some(keys) = context.get(kind) else {
                continue;
            };
            lines.push(format!("-- {} ({})", kind, keys.len()));

            let columns = self.columns(kind, keys);
            let mut rows = Vec::with_capacity(keys.len());
            for key in keys {
                match self.render_row(kind, key, &columns, masker.as_deref_mut()) {
                    Ok(row) => rows.push(row),
                    Err(e) => error!("Skipping {} row: {}", kind, e),
                }
            }

            if !rows.is_empty() {
                debug!("Rendered {} of {} rows for {}", rows.len(), keys.len(), kind);
                rendered = rendered.saturating_add(rows.len());
                lines.push(format!(
                    "INSERT INTO {} ({}) VALUES\n{};",
                    kind,
                    columns.join(", "),
                    rows.join(",\n")
                ));
            }
            lines.push(String::new());
        }

        info!("Rendered {} rows", rendered);
        lines.join("\n")
    }

    /// Column list of a table: the indexed column order, else the keys of
    /// the first present row.
    fn columns(&self, kind: TableKind, keys: &BTreeSet<PrimaryKey>) -> Vec<String> {
        let indexed = self.snapshot.columns(kind);
        if !indexed.is_empty() {
            return indexed.to_vec();
        }
        keys.iter()
            .find_map(|key| self.snapshot.get(kind, key))
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn render_row(
        &self,
        kind: TableKind,
        key: &PrimaryKey,
        columns: &[String],
        mut masker: Option<&mut ContextMasker>,
    ) -> Result<String, RowRenderError> {
        let row = self
            .snapshot
            .get(kind, key)
            .ok_or(RowRenderError::MissingRow)?;

        let mut values = Vec::with_capacity(columns.len());
        for column in columns {
            let value = row.get(column).unwrap_or(&Value::Null);
            let value = match (masker.as_deref_mut(), kind.column_action(column)) {
                (Some(masker), Some(action)) if !value.is_null() => {
                    Self::mask_value(action, column, value, masker)?
                }
                _ => value.clone(),
            };
            values.push(format_value(&value));
        }

        Ok(if kind.is_wide() {
            format_row_pretty(&values, &self.config)
        } else {
            format_row(&values)
        })
    }

    fn mask_value(
        action: ColumnAction,
        column: &str,
        value: &Value,
        masker: &mut ContextMasker,
    ) -> Result<Value, RowRenderError> {
        let serialize = |masked: &Value| {
            serde_json::to_string(masked).map_err(|source| RowRenderError::Serialization {
                column: column.to_string(),
                source,
            })
        };

        let masked = match (action, value) {
            (ColumnAction::Json, Value::String(text)) => {
                match serde_json::from_str::<Value>(text) {
                    Ok(parsed) => Value::String(serialize(&masker.mask_json(&parsed))?),
                    Err(_) => Value::String(masker.mask_text(text).map_err(|source| {
                        RowRenderError::Masking {
                            column: column.to_string(),
                            source: Box::new(source),
                        }
                    })?),
                }
            }
            (ColumnAction::Json, Value::Object(_) | Value::Array(_)) => {
                Value::String(serialize(&masker.mask_json(value))?)
            }
            (ColumnAction::Formula, Value::String(text)) => {
                Value::String(masker.mask_formula(text))
            }
            (ColumnAction::ArrayPath, _) => Value::Array(
                Self::path_items(value)
                    .into_iter()
                    .map(|item| {
                        let mask = match masker.get_known_mask(&item, &PATH_CATEGORIES) {
                            Some(known) => known.to_string(),
                            None => masker.register(&item, MaskCategory::Other),
                        };
                        Value::String(mask)
                    })
                    .collect(),
            ),
            (ColumnAction::Mask(category), Value::String(text)) if !text.is_empty() => {
                Value::String(masker.register(text, category))
            }
            _ => value.clone(),
        };
        Ok(masked)
    }

    /// Normalises a native list or a `{a,b}` literal into non-empty items.
    fn path_items(value: &Value) -> Vec<String> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| stringify(Some(item)))
                .filter(|item| !item.is_empty())
                .collect(),
            Value::String(text) => parse_array_literal(text),
            _ => Vec::new(),
        }
    }
}
