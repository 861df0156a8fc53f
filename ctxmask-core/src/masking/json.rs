//! Masking of JSON configuration trees.

use super::{ContextMasker, MaskCategory};
use serde_json::{Map, Value};

/// Category of the string value stored under a recognised key.
fn key_category(key: &str) -> Option<MaskCategory> {
    match key {
        "entity" | "entity_type" => Some(MaskCategory::Entity),
        "property" | "property_id" => Some(MaskCategory::Property),
        "parameter" => Some(MaskCategory::Parameter),
        "dataset" => Some(MaskCategory::Dataset),
        "table" => Some(MaskCategory::Table),
        "physical_name" => Some(MaskCategory::PhysicalTable),
        "aggregation" => Some(MaskCategory::Aggregation),
        "limitation" => Some(MaskCategory::Limitation),
        "ordering" => Some(MaskCategory::Ordering),
        _ => None,
    }
}

fn is_formula_key(key: &str) -> bool {
    matches!(key, "valueExpr" | "condition" | "expression")
}

impl ContextMasker {
    /// Returns a masked copy of a JSON tree.
    ///
    /// String values under identifier keys are registered in the matching
    /// category, formula keys go through [`ContextMasker::mask_formula`],
    /// and everything else is walked recursively. Key order is preserved.
    pub fn mask_json(&mut self, data: &Value) -> Value {
        match data {
            Value::Object(object) => {
                let mut masked = Map::with_capacity(object.len());
                for (key, value) in object {
                    let value = match (value, key_category(key)) {
                        (Value::String(s), Some(category)) => {
                            Value::String(self.register(s, category))
                        }
                        (Value::String(s), None) if is_formula_key(key) => {
                            Value::String(self.mask_formula(s))
                        }
                        (other, _) => self.mask_json(other),
                    };
                    masked.insert(key.clone(), value);
                }
                Value::Object(masked)
            }
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.mask_json(item)).collect())
            }
            scalar => scalar.clone(),
        }
    }
}
