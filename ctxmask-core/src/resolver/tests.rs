//! Unit tests for dependency resolution.

use super::*;
use crate::snapshot::NamespaceRows;
use serde_json::{Value, json};

fn snapshot(tables: Value) -> Snapshot {
    let mut data = NamespaceRows::new();
    if let Value::Object(tables) = tables {
        for (name, rows) in tables {
            let rows = match rows {
                Value::Array(rows) => rows
                    .into_iter()
                    .filter_map(|row| match row {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            data.insert(name, rows);
        }
    }
    Snapshot::from_rows(data)
}

fn key(parts: &[&str]) -> PrimaryKey {
    PrimaryKey::new(parts.iter().copied())
}

fn ids(context: &ResolvedContext, kind: TableKind) -> Vec<String> {
    context
        .get(kind)
        .map(|keys| keys.iter().map(|k| k.last().to_string()).collect())
        .unwrap_or_default()
}

fn graph_snapshot() -> Snapshot {
    snapshot(json!({
        "datasets": [
            {"namespace_id": "ns", "tenant_id": "", "dataset_id": "ds1",
             "config": "{\"filters\": [{\"parameter\": \"minAge\"}]}", "edges": ["e1"]},
            {"namespace_id": "ns", "tenant_id": "", "dataset_id": "ds2",
             "config": null, "edges": "{e2}"}
        ],
        "edges": [
            {"namespace_id": "ns", "tenant_id": "", "edge_id": "e1",
             "source_vertex": "v1", "target_vertex": "v2", "constraints": null,
             "config": null, "condition": null},
            {"namespace_id": "ns", "tenant_id": "", "edge_id": "e2",
             "source_vertex": "v3", "target_vertex": "missing", "constraints": [1],
             "config": "{broken", "condition": "region != null"}
        ],
        "vertices": [
            {"namespace_id": "ns", "tenant_id": "", "vertex_id": "v1",
             "vertex_type": "entity", "config": null, "constraints": null},
            {"namespace_id": "ns", "tenant_id": "", "vertex_id": "v2",
             "vertex_type": "entity", "config": null, "constraints": null},
            {"namespace_id": "ns", "tenant_id": "", "vertex_id": "v3",
             "vertex_type": "table", "config": {"table": "people"}, "constraints": null}
        ],
        "tables": [
            {"namespace_id": "ns", "tenant_id": "", "table_id": "people",
             "physical_name": "crm.people"}
        ],
        "table_fields": [
            {"namespace_id": "ns", "tenant_id": "", "table_id": "people",
             "entity_type": "Person", "property_id": "age", "field_name": "age_years"}
        ],
        "constraints": [
            {"namespace_id": "ns", "tenant_id": "", "constraint_id": "1",
             "entity_type": "Person", "property_id": "name", "config": null,
             "condition": "{maxAge} > 0"}
        ],
        "parameters": [
            {"namespace_id": "ns", "tenant_id": "", "parameter_id": "minAge"},
            {"namespace_id": "ns", "tenant_id": "", "parameter_id": "maxAge"},
            {"namespace_id": "ns", "tenant_id": "", "parameter_id": "region"}
        ],
        "entities": [
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "Person"}
        ],
        "entity_properties": [
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "Person",
             "property_id": "age", "calculation_func": null, "aggregation_func": null},
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "Person",
             "property_id": "name", "calculation_func": null, "aggregation_func": null}
        ]
    }))
}

#[test]
fn test_dataset_edge_vertices() {
    let snapshot = graph_snapshot();
    let mut resolver = ContextResolver::new(&snapshot);
    assert!(resolver.resolve_by_dataset("ds1"));

    let context = resolver.into_context();
    assert_eq!(ids(&context, TableKind::Datasets), ["ds1"]);
    assert_eq!(ids(&context, TableKind::Edges), ["e1"]);
    assert_eq!(ids(&context, TableKind::Vertices), ["v1", "v2"]);
    assert_eq!(ids(&context, TableKind::Parameters), ["minAge"]);
    assert!(context.get(TableKind::Tables).is_none());
}

#[test]
fn test_table_vertex_and_constraints() {
    let snapshot = graph_snapshot();
    let mut resolver = ContextResolver::new(&snapshot);
    assert!(resolver.resolve_by_dataset("ds2"));

    let context = resolver.context();
    assert_eq!(ids(context, TableKind::Edges), ["e2"]);
    // the dangling target vertex is dropped
    assert_eq!(ids(context, TableKind::Vertices), ["v3"]);
    assert_eq!(ids(context, TableKind::Tables), ["people"]);
    assert_eq!(context.table_len(TableKind::TableFields), 1);
    // constraint id 1 given as a number matches the string key
    assert_eq!(ids(context, TableKind::Constraints), ["1"]);
    assert_eq!(ids(context, TableKind::EntityProperties), ["age", "name"]);
    assert_eq!(ids(context, TableKind::Entities), ["Person"]);
    // {maxAge} from the constraint, bare `region` from the edge condition
    assert_eq!(ids(context, TableKind::Parameters), ["maxAge", "region"]);
}

#[test]
fn test_unknown_dataset_is_not_found() {
    let snapshot = graph_snapshot();
    let mut resolver = ContextResolver::new(&snapshot);
    assert!(!resolver.resolve_by_dataset("nope"));
    assert!(resolver.context().is_empty());
}

#[test]
fn test_resolution_is_idempotent() {
    let snapshot = graph_snapshot();
    let mut resolver = ContextResolver::new(&snapshot);
    resolver.resolve_by_dataset("ds2");
    let first = resolver.context().clone();

    resolver.clear();
    resolver.resolve_by_dataset("ds2");
    assert_eq!(resolver.context(), &first);

    // resolving again without clearing adds nothing
    resolver.resolve_by_dataset("ds2");
    assert_eq!(resolver.context(), &first);
}

#[test]
fn test_entity_pulls_all_properties() {
    let snapshot = snapshot(json!({
        "entities": [
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "Person"},
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "Account"}
        ],
        "entity_properties": [
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "Person",
             "property_id": "age"},
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "Person",
             "property_id": "name"},
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "Person",
             "property_id": "email"},
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "Account",
             "property_id": "id"}
        ]
    }));

    let mut resolver = ContextResolver::new(&snapshot);
    assert!(resolver.resolve_by_entity("Person"));
    let context = resolver.context();
    assert_eq!(ids(context, TableKind::Entities), ["Person"]);
    assert_eq!(ids(context, TableKind::EntityProperties), ["age", "email", "name"]);
}

#[test]
fn test_self_referencing_property_terminates() {
    let snapshot = snapshot(json!({
        "entities": [
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "A"}
        ],
        "entity_properties": [
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "A", "property_id": "x",
             "calculation_func": "A.x + A.y", "aggregation_func": null},
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "A", "property_id": "y",
             "calculation_func": "A.x * 2", "aggregation_func": null}
        ],
        "composed_entities": [
            {"namespace_id": "ns", "tenant_id": "", "composed_entity": "A", "entity_type": "A"}
        ]
    }));

    let mut resolver = ContextResolver::new(&snapshot);
    assert!(resolver.resolve_by_entity("A"));
    let context = resolver.context();
    assert_eq!(context.table_len(TableKind::Entities), 1);
    assert_eq!(context.table_len(TableKind::EntityProperties), 2);
    assert_eq!(context.table_len(TableKind::ComposedEntities), 1);
}

#[test]
fn test_composed_entity_pulls_parent() {
    let snapshot = snapshot(json!({
        "entities": [
            {"namespace_id": "ns", "tenant_id": "t1", "entity_type": "VipClient"},
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "Client"}
        ],
        "composed_entities": [
            {"namespace_id": "ns", "tenant_id": "t1", "composed_entity": "VipClient",
             "entity_type": "Client"}
        ],
        "entity_properties": [
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "Client", "property_id": "inn"}
        ]
    }));

    let mut resolver = ContextResolver::new(&snapshot);
    assert!(resolver.resolve_by_entity("VipClient"));
    let context = resolver.context();
    // the parent falls back to the global tenant
    assert!(context.contains(TableKind::Entities, &key(&["ns", "", "Client"])));
    assert!(context.contains(TableKind::Entities, &key(&["ns", "t1", "VipClient"])));
    assert_eq!(ids(context, TableKind::EntityProperties), ["inn"]);
}

#[test]
fn test_property_owner_falls_back_to_global_tenant() {
    let snapshot = snapshot(json!({
        "entities": [
            {"namespace_id": "ns", "tenant_id": "", "entity_type": "Person"}
        ],
        "entity_properties": [
            {"namespace_id": "ns", "tenant_id": "t9", "entity_type": "Person", "property_id": "age"}
        ],
        "vertices": [
            {"namespace_id": "ns", "tenant_id": "", "vertex_id": "v1", "vertex_type": "entity"}
        ],
        "vertex_functions": [
            {"namespace_id": "ns", "tenant_id": "", "vertex_id": "v1", "entity_type": "Person",
             "property_id": "age", "calculation_func": "sum(Person.age)", "aggregation_func": null}
        ],
        "filters": [
            {"namespace_id": "ns", "tenant_id": "", "vertex_id": "v1", "index": 0,
             "config": {"ordering": "by_age"}}
        ],
        "ordering": [
            {"namespace_id": "ns", "tenant_id": "", "ordering_id": "by_age"}
        ],
        "edges": [
            {"namespace_id": "ns", "tenant_id": "", "edge_id": "e1",
             "source_vertex": "v1", "target_vertex": "v1"}
        ],
        "datasets": [
            {"namespace_id": "ns", "tenant_id": "", "dataset_id": "d", "edges": ["e1"]}
        ]
    }));

    let mut resolver = ContextResolver::new(&snapshot);
    assert!(resolver.resolve_by_dataset("d"));
    let context = resolver.context();
    assert_eq!(context.table_len(TableKind::VertexFunctions), 1);
    assert_eq!(context.table_len(TableKind::Filters), 1);
    assert_eq!(ids(context, TableKind::Ordering), ["by_age"]);
    assert!(context.contains(TableKind::Entities, &key(&["ns", "", "Person"])));
}

#[test]
fn test_composed_constraint_expands_children() {
    let snapshot = snapshot(json!({
        "edges": [
            {"namespace_id": "ns", "tenant_id": "", "edge_id": "e1", "constraints": "{7}"}
        ],
        "composed_constraints": [
            {"namespace_id": "ns", "tenant_id": "", "constraint_id": 7,
             "constraints": [3], "condition": "c3 and c4"}
        ],
        "constraints": [
            {"namespace_id": "ns", "tenant_id": "", "constraint_id": 3,
             "config": {"limitation": "top10"}, "condition": null}
        ],
        "limitation": [
            {"namespace_id": "ns", "tenant_id": "", "limitation_id": "top10",
             "total_limit": "{limitRows}", "group_limit": null}
        ],
        "parameters": [
            {"namespace_id": "ns", "tenant_id": "", "parameter_id": "limitRows"}
        ],
        "datasets": [
            {"namespace_id": "ns", "tenant_id": "", "dataset_id": "d", "edges": ["e1"]}
        ]
    }));

    let mut resolver = ContextResolver::new(&snapshot);
    resolver.resolve_by_dataset("d");
    let context = resolver.context();
    assert_eq!(ids(context, TableKind::ComposedConstraints), ["7"]);
    assert_eq!(ids(context, TableKind::Constraints), ["3"]);
    assert_eq!(ids(context, TableKind::Limitation), ["top10"]);
    assert_eq!(ids(context, TableKind::Parameters), ["limitRows"]);
}

#[test]
fn test_nested_dataset_vertex() {
    let snapshot = snapshot(json!({
        "datasets": [
            {"namespace_id": "ns", "tenant_id": "", "dataset_id": "outer", "edges": ["e1"]},
            {"namespace_id": "ns", "tenant_id": "", "dataset_id": "inner", "edges": []}
        ],
        "edges": [
            {"namespace_id": "ns", "tenant_id": "", "edge_id": "e1", "source_vertex": "v1"}
        ],
        "vertices": [
            {"namespace_id": "ns", "tenant_id": "", "vertex_id": "v1", "vertex_type": "dataset",
             "config": "{\"dataset\": \"inner\"}"}
        ]
    }));

    let mut resolver = ContextResolver::new(&snapshot);
    resolver.resolve_by_dataset("outer");
    assert_eq!(ids(resolver.context(), TableKind::Datasets), ["inner", "outer"]);
}

#[test]
fn test_same_id() {
    assert!(same_id("1", "1"));
    assert!(same_id("01", "1"));
    assert!(!same_id("a", "b"));
    assert!(!same_id("1", "2"));
}
