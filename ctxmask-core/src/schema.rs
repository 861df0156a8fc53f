//! Static metadata for the configuration table kinds.
//!
//! Every known table kind carries its primary-key field list, the masking
//! action of each sensitive column, and whether it is rendered with the
//! multi-line row formatter. Variants are declared in render order, so the
//! derived `Ord` is the dependency-respecting insert order.

use crate::masking::MaskCategory;
use serde::{Deserialize, Serialize};

/// How the renderer treats one column when a masker is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAction {
    /// Replace a non-empty string with its mask in the given category
    Mask(MaskCategory),
    /// Parse as JSON, mask the tree, re-serialise
    Json,
    /// Run through the formula pipeline
    Formula,
    /// Normalise to a list and mask each element
    ArrayPath,
}

use ColumnAction::{ArrayPath, Formula, Json, Mask};
use MaskCategory as C;

/// A known configuration table kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Namespaces,
    Tenants,
    Clients,
    Parameters,
    Entities,
    ComposedEntities,
    EntityProperties,
    Tables,
    TableFields,
    Aggregation,
    Limitation,
    Ordering,
    GroupBy,
    OrderBy,
    Constraints,
    ComposedConstraints,
    Vertices,
    VertexFunctions,
    Edges,
    Filters,
    Datasets,
}

impl TableKind {
    /// Insert order of the rendered script.
    pub const RENDER_ORDER: [TableKind; 21] = [
        TableKind::Namespaces,
        TableKind::Tenants,
        TableKind::Clients,
        TableKind::Parameters,
        TableKind::Entities,
        TableKind::ComposedEntities,
        TableKind::EntityProperties,
        TableKind::Tables,
        TableKind::TableFields,
        TableKind::Aggregation,
        TableKind::Limitation,
        TableKind::Ordering,
        TableKind::GroupBy,
        TableKind::OrderBy,
        TableKind::Constraints,
        TableKind::ComposedConstraints,
        TableKind::Vertices,
        TableKind::VertexFunctions,
        TableKind::Edges,
        TableKind::Filters,
        TableKind::Datasets,
    ];

    /// Database table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Namespaces => "namespaces",
            TableKind::Tenants => "tenants",
            TableKind::Clients => "clients",
            TableKind::Parameters => "parameters",
            TableKind::Entities => "entities",
            TableKind::ComposedEntities => "composed_entities",
            TableKind::EntityProperties => "entity_properties",
            TableKind::Tables => "tables",
            TableKind::TableFields => "table_fields",
            TableKind::Aggregation => "aggregation",
            TableKind::Limitation => "limitation",
            TableKind::Ordering => "ordering",
            TableKind::GroupBy => "group_by",
            TableKind::OrderBy => "order_by",
            TableKind::Constraints => "constraints",
            TableKind::ComposedConstraints => "composed_constraints",
            TableKind::Vertices => "vertices",
            TableKind::VertexFunctions => "vertex_functions",
            TableKind::Edges => "edges",
            TableKind::Filters => "filters",
            TableKind::Datasets => "datasets",
        }
    }

    /// Looks up a table kind by its database table name.
    pub fn from_name(name: &str) -> Option<TableKind> {
        Self::RENDER_ORDER
            .into_iter()
            .find(|kind| kind.as_str() == name)
    }

    /// Ordered primary-key fields.
    pub fn primary_key_fields(&self) -> &'static [&'static str] {
        match self {
            TableKind::Namespaces => &["namespace_id"],
            TableKind::Tenants => &["tenant_id"],
            TableKind::Clients => &["service_id", "component_id"],
            TableKind::Parameters => &["namespace_id", "tenant_id", "parameter_id"],
            TableKind::Entities => &["namespace_id", "tenant_id", "entity_type"],
            TableKind::ComposedEntities => &[
                "namespace_id",
                "tenant_id",
                "composed_entity",
                "entity_type",
            ],
            TableKind::EntityProperties => {
                &["namespace_id", "tenant_id", "entity_type", "property_id"]
            }
            TableKind::Tables => &["namespace_id", "tenant_id", "table_id"],
            TableKind::TableFields => &[
                "namespace_id",
                "tenant_id",
                "table_id",
                "entity_type",
                "property_id",
            ],
            TableKind::Aggregation => &["namespace_id", "tenant_id", "aggregation_id"],
            TableKind::Limitation => &["namespace_id", "tenant_id", "limitation_id"],
            TableKind::Ordering => &["namespace_id", "tenant_id", "ordering_id"],
            TableKind::GroupBy => &["namespace_id", "tenant_id", "group_id", "index"],
            TableKind::OrderBy => &["namespace_id", "tenant_id", "order_id", "index"],
            TableKind::Constraints | TableKind::ComposedConstraints => {
                &["namespace_id", "tenant_id", "constraint_id"]
            }
            TableKind::Vertices => &["namespace_id", "tenant_id", "vertex_id"],
            TableKind::VertexFunctions => &[
                "namespace_id",
                "tenant_id",
                "vertex_id",
                "entity_type",
                "property_id",
            ],
            TableKind::Edges => &["namespace_id", "tenant_id", "edge_id"],
            TableKind::Filters => &["namespace_id", "tenant_id", "vertex_id", "index"],
            TableKind::Datasets => &["namespace_id", "tenant_id", "dataset_id"],
        }
    }

    /// Masking action per sensitive column; unlisted columns render as-is.
    pub fn column_actions(&self) -> &'static [(&'static str, ColumnAction)] {
        match self {
            TableKind::Namespaces | TableKind::Clients => &[],
            TableKind::Tenants => &[
                ("tenant_id", Mask(C::Tenant)),
                ("tenant_name", Mask(C::TenantName)),
            ],
            TableKind::Entities => &[
                ("tenant_id", Mask(C::Tenant)),
                ("entity_type", Mask(C::Entity)),
                ("entity_name", Mask(C::EntityName)),
            ],
            TableKind::ComposedEntities => &[
                ("tenant_id", Mask(C::Tenant)),
                ("composed_entity", Mask(C::Entity)),
                ("entity_type", Mask(C::Entity)),
            ],
            TableKind::EntityProperties => &[
                ("tenant_id", Mask(C::Tenant)),
                ("entity_type", Mask(C::Entity)),
                ("property_id", Mask(C::Property)),
                ("calculation_func", Formula),
                ("aggregation_func", Formula),
                ("conversion_func", Formula),
            ],
            TableKind::Parameters => &[
                ("tenant_id", Mask(C::Tenant)),
                ("parameter_id", Mask(C::Parameter)),
                ("request_path", ArrayPath),
            ],
            TableKind::Datasets => &[
                ("tenant_id", Mask(C::Tenant)),
                ("dataset_id", Mask(C::Dataset)),
                ("entity_type", Mask(C::Entity)),
                ("config", Json),
            ],
            TableKind::Tables => &[
                ("tenant_id", Mask(C::Tenant)),
                ("table_id", Mask(C::Table)),
                ("physical_name", Mask(C::PhysicalTable)),
            ],
            TableKind::TableFields => &[
                ("tenant_id", Mask(C::Tenant)),
                ("table_id", Mask(C::Table)),
                ("entity_type", Mask(C::Entity)),
                ("property_id", Mask(C::Property)),
                ("field_name", Mask(C::Column)),
            ],
            TableKind::Vertices => &[
                ("tenant_id", Mask(C::Tenant)),
                ("config", Json),
                ("constraints", Json),
            ],
            TableKind::Edges => &[
                ("tenant_id", Mask(C::Tenant)),
                ("condition", Formula),
                ("config", Json),
            ],
            TableKind::VertexFunctions => &[
                ("tenant_id", Mask(C::Tenant)),
                ("entity_type", Mask(C::Entity)),
                ("property_id", Mask(C::Property)),
                ("calculation_func", Formula),
                ("aggregation_func", Formula),
            ],
            TableKind::Constraints => &[
                ("tenant_id", Mask(C::Tenant)),
                ("entity_type", Mask(C::Entity)),
                ("property_id", Mask(C::Property)),
                ("config", Json),
                ("condition", Formula),
            ],
            TableKind::ComposedConstraints => {
                &[("tenant_id", Mask(C::Tenant)), ("condition", Formula)]
            }
            TableKind::Filters => &[("tenant_id", Mask(C::Tenant)), ("config", Json)],
            TableKind::Aggregation => &[
                ("tenant_id", Mask(C::Tenant)),
                ("aggregation_id", Mask(C::Aggregation)),
            ],
            TableKind::Limitation => &[
                ("tenant_id", Mask(C::Tenant)),
                ("limitation_id", Mask(C::Limitation)),
                ("total_limit", Formula),
            ],
            TableKind::Ordering => &[
                ("tenant_id", Mask(C::Tenant)),
                ("ordering_id", Mask(C::Ordering)),
            ],
            TableKind::GroupBy | TableKind::OrderBy => &[
                ("tenant_id", Mask(C::Tenant)),
                ("entity_type", Mask(C::Entity)),
                ("property_id", Mask(C::Property)),
            ],
        }
    }

    /// Masking action for one column, if any.
    pub fn column_action(&self, column: &str) -> Option<ColumnAction> {
        self.column_actions()
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, action)| *action)
    }

    /// Whether rows carry a `tenant_id` key part at position 1.
    ///
    /// Global kinds (namespaces, tenants, clients) do not.
    pub fn is_tenant_scoped(&self) -> bool {
        !matches!(
            self,
            TableKind::Namespaces | TableKind::Tenants | TableKind::Clients
        )
    }

    /// Whether a namespace fetch filters this kind by `namespace_id`.
    ///
    /// Tenants and clients are global catalogues without that column.
    pub fn is_namespaced(&self) -> bool {
        !matches!(self, TableKind::Tenants | TableKind::Clients)
    }

    /// Whether rows of this kind use the multi-line row formatter.
    pub fn is_wide(&self) -> bool {
        matches!(
            self,
            TableKind::EntityProperties | TableKind::VertexFunctions | TableKind::Limitation
        )
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_order_matches_ord() {
        let mut sorted = TableKind::RENDER_ORDER;
        sorted.sort();
        assert_eq!(sorted, TableKind::RENDER_ORDER);
        assert_eq!(TableKind::RENDER_ORDER.first(), Some(&TableKind::Namespaces));
        assert_eq!(TableKind::RENDER_ORDER.last(), Some(&TableKind::Datasets));
    }

    #[test]
    fn test_name_round_trip() {
        for kind in TableKind::RENDER_ORDER {
            assert_eq!(TableKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(TableKind::from_name("audit_log"), None);
    }

    #[test]
    fn test_primary_keys() {
        assert_eq!(
            TableKind::EntityProperties.primary_key_fields(),
            &["namespace_id", "tenant_id", "entity_type", "property_id"]
        );
        assert_eq!(TableKind::Tenants.primary_key_fields(), &["tenant_id"]);
        for kind in TableKind::RENDER_ORDER.into_iter().filter(|k| k.is_tenant_scoped()) {
            assert_eq!(kind.primary_key_fields().get(1), Some(&"tenant_id"));
        }
    }

    #[test]
    fn test_column_actions() {
        assert_eq!(
            TableKind::TableFields.column_action("field_name"),
            Some(ColumnAction::Mask(MaskCategory::Column))
        );
        assert_eq!(
            TableKind::Parameters.column_action("request_path"),
            Some(ColumnAction::ArrayPath)
        );
        assert_eq!(TableKind::Datasets.column_action("config"), Some(ColumnAction::Json));
        assert_eq!(TableKind::Namespaces.column_action("namespace_id"), None);
    }

    #[test]
    fn test_scoping_flags() {
        assert!(!TableKind::Tenants.is_namespaced());
        assert!(!TableKind::Clients.is_namespaced());
        assert!(TableKind::Namespaces.is_namespaced());
        assert!(TableKind::Limitation.is_wide());
        assert!(!TableKind::Edges.is_wide());
    }
}
