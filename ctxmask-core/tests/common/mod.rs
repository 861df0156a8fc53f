//! Shared fixtures for integration tests.

#![allow(dead_code)]

use ctxmask_core::{NamespaceRows, PrimaryKey, ResolvedContext, Snapshot, TableKind};
use serde_json::{Value, json};

/// Converts a `{ table: [row, ...] }` literal into fetch rows.
pub fn rows(tables: Value) -> NamespaceRows {
    serde_json::from_value(tables).expect("fixture must be a table map")
}

/// Builds a snapshot from a `{ table: [row, ...] }` literal.
pub fn snapshot(tables: Value) -> Snapshot {
    Snapshot::from_rows(rows(tables))
}

pub fn key(parts: &[&str]) -> PrimaryKey {
    PrimaryKey::new(parts.iter().copied())
}

/// Last key part of every row of one kind in the context, sorted.
pub fn ids(context: &ResolvedContext, kind: TableKind) -> Vec<String> {
    context
        .get(kind)
        .map(|keys| keys.iter().map(|k| k.last().to_string()).collect())
        .unwrap_or_default()
}

/// A small insurance-analytics namespace: one dataset over a person and a
/// policy vertex, a table-backed vertex, constraints and parameters.
pub fn insurance_rows() -> NamespaceRows {
    rows(json!({
        "tenants": [
            {"tenant_id": "", "tenant_name": "default"},
            {"tenant_id": "acme", "tenant_name": "Acme Insurance"}
        ],
        "namespaces": [{"namespace_id": "AN", "description": "analytics"}],
        "parameters": [
            {"namespace_id": "AN", "tenant_id": "", "parameter_id": "minAge",
             "request_path": "{minAge}"},
            {"namespace_id": "AN", "tenant_id": "", "parameter_id": "region",
             "request_path": ["region", "Person"]}
        ],
        "entities": [
            {"namespace_id": "AN", "tenant_id": "", "entity_type": "Person",
             "entity_name": "Insured person"},
            {"namespace_id": "AN", "tenant_id": "", "entity_type": "Policy",
             "entity_name": "Policy"},
            {"namespace_id": "AN", "tenant_id": "acme", "entity_type": "Policy",
             "entity_name": "Acme policy"}
        ],
        "entity_properties": [
            {"namespace_id": "AN", "tenant_id": "", "entity_type": "Person",
             "property_id": "age",
             "calculation_func": "dateDiff('year', Person.birth_date, today())",
             "aggregation_func": null},
            {"namespace_id": "AN", "tenant_id": "", "entity_type": "Person",
             "property_id": "birth_date", "calculation_func": null, "aggregation_func": null},
            {"namespace_id": "AN", "tenant_id": "", "entity_type": "Person",
             "property_id": "name", "calculation_func": null, "aggregation_func": null},
            {"namespace_id": "AN", "tenant_id": "acme", "entity_type": "Policy",
             "property_id": "premium", "calculation_func": null,
             "aggregation_func": "sum(Policy.premium)"}
        ],
        "tables": [
            {"namespace_id": "AN", "tenant_id": "", "table_id": "policies",
             "physical_name": "crm.policies"}
        ],
        "table_fields": [
            {"namespace_id": "AN", "tenant_id": "acme", "table_id": "policies",
             "entity_type": "Policy", "property_id": "premium", "field_name": "premium_amt"}
        ],
        "constraints": [
            {"namespace_id": "AN", "tenant_id": "", "constraint_id": 10,
             "entity_type": "Person", "property_id": "age", "config": null,
             "condition": "Person.age >= {minAge} and region = 'EU'"}
        ],
        "vertices": [
            {"namespace_id": "AN", "tenant_id": "", "vertex_id": "person",
             "vertex_type": "entity", "config": {"entity": "Person"}, "constraints": "{10}"},
            {"namespace_id": "AN", "tenant_id": "acme", "vertex_id": "policy",
             "vertex_type": "table", "config": "{\"table\": \"policies\"}", "constraints": null}
        ],
        "edges": [
            {"namespace_id": "AN", "tenant_id": "", "edge_id": "holds",
             "source_vertex": "person", "target_vertex": "policy", "constraints": null,
             "config": null, "condition": null}
        ],
        "datasets": [
            {"namespace_id": "AN", "tenant_id": "", "dataset_id": "policy_holders",
             "entity_type": "Person",
             "config": "{\"columns\": [{\"entity\": \"Person\", \"property\": \"name\"}]}",
             "edges": ["holds"]}
        ]
    }))
}

pub fn insurance_snapshot() -> Snapshot {
    Snapshot::from_rows(insurance_rows())
}
