//! Mask categories, their synthetic-identifier prefixes and flat-map priority.

use serde::{Deserialize, Serialize};

/// Category a masked value belongs to.
///
/// The declaration order is the flat text-map priority: when one real value
/// is registered under several categories, the earliest variant wins the
/// plain-text substitution slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskCategory {
    /// Entity type identifiers
    Entity,
    /// Entity property identifiers
    Property,
    /// Request parameter identifiers
    Parameter,
    /// Dataset identifiers
    Dataset,
    /// Logical table identifiers
    Table,
    /// Physical `schema.table` names
    PhysicalTable,
    /// Dictionary names and `schema.table`-looking literals
    Dictionary,
    /// Physical column names
    Column,
    /// Aggregation identifiers
    Aggregation,
    /// Limitation identifiers
    Limitation,
    /// Ordering identifiers
    Ordering,
    /// Tenant identifiers
    Tenant,
    /// Tenant display names
    TenantName,
    /// Entity display names
    EntityName,
    /// Request path segments
    Path,
    /// Anything recognised as sensitive but not otherwise categorised
    Other,
}

impl MaskCategory {
    /// Every category, highest flat-map priority first.
    pub const ALL: [MaskCategory; 16] = [
        MaskCategory::Entity,
        MaskCategory::Property,
        MaskCategory::Parameter,
        MaskCategory::Dataset,
        MaskCategory::Table,
        MaskCategory::PhysicalTable,
        MaskCategory::Dictionary,
        MaskCategory::Column,
        MaskCategory::Aggregation,
        MaskCategory::Limitation,
        MaskCategory::Ordering,
        MaskCategory::Tenant,
        MaskCategory::TenantName,
        MaskCategory::EntityName,
        MaskCategory::Path,
        MaskCategory::Other,
    ];

    /// Prefix of the synthetic identifiers issued for this category.
    pub fn prefix(&self) -> &'static str {
        match self {
            MaskCategory::Entity => "ENT",
            MaskCategory::Property => "P",
            MaskCategory::Parameter => "PARAM",
            MaskCategory::Dataset => "DS",
            MaskCategory::Table => "TBL",
            MaskCategory::PhysicalTable => "DB.TBL",
            MaskCategory::Dictionary => "DB.DICT",
            MaskCategory::Column => "COL",
            MaskCategory::Aggregation => "AGG",
            MaskCategory::Limitation => "LIM",
            MaskCategory::Ordering => "ORD",
            MaskCategory::Tenant => "TEN",
            MaskCategory::TenantName => "TEN_NAME",
            MaskCategory::EntityName => "ENT_NAME",
            MaskCategory::Path => "PATH",
            MaskCategory::Other => "OBJ",
        }
    }

    /// Lower rank means higher priority in the flat text map.
    pub fn priority_rank(&self) -> usize {
        *self as usize
    }

    /// Formats the `n`-th synthetic identifier of this category.
    pub fn mask_id(&self, n: u32) -> String {
        format!("{}_{}", self.prefix(), n)
    }

    /// Parses a synthetic identifier back into its category and counter.
    ///
    /// The longest matching prefix wins, so `TEN_NAME_2` is a tenant name
    /// rather than a tenant.
    pub fn parse_mask_id(mask: &str) -> Option<(MaskCategory, u32)> {
        let mut best: Option<(MaskCategory, u32)> = None;
        let mut best_len = 0;
        for category in Self::ALL {
            let prefix = category.prefix();
            let Some(rest) = mask
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('_'))
            else {
                continue;
            };
            if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if let Ok(n) = rest.parse::<u32>()
                && prefix.len() > best_len
            {
                best = Some((category, n));
                best_len = prefix.len();
            }
        }
        best
    }
}

impl std::fmt::Display for MaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MaskCategory::Entity => "entity",
            MaskCategory::Property => "property",
            MaskCategory::Parameter => "parameter",
            MaskCategory::Dataset => "dataset",
            MaskCategory::Table => "table",
            MaskCategory::PhysicalTable => "physical_table",
            MaskCategory::Dictionary => "dictionary",
            MaskCategory::Column => "column",
            MaskCategory::Aggregation => "aggregation",
            MaskCategory::Limitation => "limitation",
            MaskCategory::Ordering => "ordering",
            MaskCategory::Tenant => "tenant",
            MaskCategory::TenantName => "tenant_name",
            MaskCategory::EntityName => "entity_name",
            MaskCategory::Path => "path",
            MaskCategory::Other => "other",
        };
        write!(f, "{}", name)
    }
}
