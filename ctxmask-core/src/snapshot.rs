//! Primary-key index over one namespace's configuration rows.
//!
//! A [`Snapshot`] is built once per namespace load and is read-only after
//! that. Rows stay as insertion-ordered JSON maps because column sets are
//! defined by the data, not by this crate.

use crate::schema::TableKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One configuration row: column name to value, in source column order.
pub type Row = serde_json::Map<String, Value>;

/// Rows of one namespace fetch, keyed by table name.
pub type NamespaceRows = BTreeMap<String, Vec<Row>>;

/// Stringified primary-key tuple of a row.
///
/// Ordering is lexicographic over the parts, which is the order rows are
/// rendered and searched in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrimaryKey(Vec<String>);

impl PrimaryKey {
    /// Builds a key from already-stringified parts.
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Key part at `index`, or the empty string when the key is shorter.
    pub fn part(&self, index: usize) -> &str {
        self.0.get(index).map_or("", String::as_str)
    }

    /// Tenant component of a tenant-scoped key.
    pub fn tenant(&self) -> &str {
        self.part(1)
    }

    /// Last key part, the table-specific identifier for catalogue kinds.
    pub fn last(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// All key parts.
    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// Stringifies a scalar for key building and identifier comparison.
///
/// Strings are taken verbatim, null or missing values become the empty
/// string, and nested values use their compact JSON form.
pub fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Indexed rows of one table.
#[derive(Debug, Clone, Default)]
pub struct TableIndex {
    /// Column names captured from the first row seen
    pub columns: Vec<String>,
    /// Rows keyed by primary key
    pub rows: BTreeMap<PrimaryKey, Row>,
}

/// Primary-key index over every table of a namespace fetch.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    tables: BTreeMap<String, TableIndex>,
}

impl Snapshot {
    /// Indexes a namespace fetch.
    ///
    /// Known table kinds are keyed by their declared key fields. Unknown
    /// tables fall back to the tuple of all column values, which merges rows
    /// that differ only in a column absent from the first row. A later row
    /// with the same key replaces an earlier one.
    pub fn from_rows(data: NamespaceRows) -> Self {
        let mut tables = BTreeMap::new();
        let mut total = 0usize;

        for (table, rows) in data {
            let kind = TableKind::from_name(&table);
            let mut index = TableIndex::default();

            if let Some(first) = rows.first() {
                index.columns = first.keys().cloned().collect();
            }

            for row in rows {
                let key = match kind {
                    Some(kind) => Self::declared_key(kind, &row),
                    None => Self::fallback_key(&index.columns, &row),
                };
                index.rows.insert(key, row);
            }

            debug!("Indexed {} rows for table '{}'", index.rows.len(), table);
            total = total.saturating_add(index.rows.len());
            tables.insert(table, index);
        }

        info!("Indexed {} records across {} tables", total, tables.len());
        Self { tables }
    }

    fn declared_key(kind: TableKind, row: &Row) -> PrimaryKey {
        PrimaryKey::new(
            kind.primary_key_fields()
                .iter()
                .map(|field| stringify(row.get(*field))),
        )
    }

    fn fallback_key(columns: &[String], row: &Row) -> PrimaryKey {
        PrimaryKey::new(columns.iter().map(|column| stringify(row.get(column))))
    }

    /// Primary key a row of `kind` would be indexed under.
    pub fn key_of(kind: TableKind, row: &Row) -> PrimaryKey {
        Self::declared_key(kind, row)
    }

    /// Rows of a table kind in primary-key order.
    pub fn rows(&self, kind: TableKind) -> impl Iterator<Item = (&PrimaryKey, &Row)> {
        self.tables
            .get(kind.as_str())
            .into_iter()
            .flat_map(|index| index.rows.iter())
    }

    /// Looks up one row by exact primary key.
    pub fn get(&self, kind: TableKind, key: &PrimaryKey) -> Option<&Row> {
        self.tables
            .get(kind.as_str())
            .and_then(|index| index.rows.get(key))
    }

    /// Whether a row with this primary key exists.
    pub fn contains(&self, kind: TableKind, key: &PrimaryKey) -> bool {
        self.get(kind, key).is_some()
    }

    /// Column names of a table kind, in source order.
    pub fn columns(&self, kind: TableKind) -> &[String] {
        self.tables
            .get(kind.as_str())
            .map_or(&[], |index| index.columns.as_slice())
    }

    /// Raw index of any table, including unknown ones.
    pub fn table(&self, name: &str) -> Option<&TableIndex> {
        self.tables.get(name)
    }

    /// Names of every indexed table.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Total number of indexed rows.
    pub fn record_count(&self) -> usize {
        self.tables.values().map(|index| index.rows.len()).sum()
    }

    /// Whether no rows are indexed.
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture rows must be objects"),
        }
    }

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(stringify(Some(&json!("abc"))), "abc");
        assert_eq!(stringify(Some(&json!(42))), "42");
        assert_eq!(stringify(Some(&json!(true))), "true");
        assert_eq!(stringify(Some(&Value::Null)), "");
        assert_eq!(stringify(None), "");
        assert_eq!(stringify(Some(&json!({"a": 1}))), r#"{"a":1}"#);
    }

    #[test]
    fn test_declared_key_indexing() {
        let mut data = NamespaceRows::new();
        data.insert(
            "entity_properties".to_string(),
            vec![row(json!({
                "namespace_id": "ns",
                "tenant_id": "",
                "entity_type": "Person",
                "property_id": "age",
                "calculation_func": null
            }))],
        );

        let snapshot = Snapshot::from_rows(data);
        let key = PrimaryKey::new(["ns", "", "Person", "age"]);
        assert!(snapshot.contains(TableKind::EntityProperties, &key));
        assert_eq!(
            snapshot.columns(TableKind::EntityProperties).first().map(String::as_str),
            Some("namespace_id")
        );
        assert_eq!(snapshot.record_count(), 1);
    }

    #[test]
    fn test_missing_key_field_collides_on_empty_string() {
        let mut data = NamespaceRows::new();
        data.insert(
            "datasets".to_string(),
            vec![
                row(json!({"namespace_id": "ns", "dataset_id": "a", "note": 1})),
                row(json!({"namespace_id": "ns", "dataset_id": "a", "note": 2})),
            ],
        );

        let snapshot = Snapshot::from_rows(data);
        let key = PrimaryKey::new(["ns", "", "a"]);
        let stored = snapshot.get(TableKind::Datasets, &key).unwrap();
        assert_eq!(stored.get("note"), Some(&json!(2)));
        assert_eq!(snapshot.record_count(), 1);
    }

    #[test]
    fn test_unknown_table_uses_all_values() {
        let mut data = NamespaceRows::new();
        data.insert(
            "audit_log".to_string(),
            vec![
                row(json!({"who": "alice", "what": "login"})),
                row(json!({"who": "alice", "what": "logout"})),
                row(json!({"who": "alice", "what": "login"})),
            ],
        );

        let snapshot = Snapshot::from_rows(data);
        let index = snapshot.table("audit_log").unwrap();
        assert_eq!(index.rows.len(), 2);
        assert!(
            index
                .rows
                .contains_key(&PrimaryKey::new(["alice", "logout"]))
        );
    }

    #[test]
    fn test_primary_key_accessors() {
        let key = PrimaryKey::new(["ns", "t1", "Person"]);
        assert_eq!(key.tenant(), "t1");
        assert_eq!(key.last(), "Person");
        assert_eq!(key.part(7), "");
        assert_eq!(key.to_string(), "(ns, t1, Person)");
    }
}
