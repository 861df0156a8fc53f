//! Dependency closure over a namespace snapshot.
//!
//! Starting from dataset or entity seeds, the resolver pulls in every row
//! transitively referenced through id columns, JSON configs and formulas.
//! It is a breadth-first work queue keyed by `(TableKind, PrimaryKey)`; the
//! growing [`ResolvedContext`] doubles as the visited set, which is what
//! makes resolution terminate on cyclic configurations and idempotent.
//!
//! References to rows that do not exist are dropped silently. Configuration
//! data may be incomplete or ahead of the code reading it.

mod scan;

#[cfg(test)]
mod tests;

pub(crate) use scan::parse_array_literal;

use crate::schema::TableKind;
use crate::snapshot::{PrimaryKey, Row, Snapshot, stringify};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, trace};

/// Matched primary keys per table kind. Only ever grows during a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedContext {
    tables: BTreeMap<TableKind, BTreeSet<PrimaryKey>>,
}

impl ResolvedContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key; returns `true` if it was not present yet.
    pub fn insert(&mut self, kind: TableKind, key: PrimaryKey) -> bool {
        self.tables.entry(kind).or_default().insert(key)
    }

    /// Whether a key is present.
    pub fn contains(&self, kind: TableKind, key: &PrimaryKey) -> bool {
        self.tables.get(&kind).is_some_and(|keys| keys.contains(key))
    }

    /// Keys of one table kind, if any were matched.
    pub fn get(&self, kind: TableKind) -> Option<&BTreeSet<PrimaryKey>> {
        self.tables.get(&kind).filter(|keys| !keys.is_empty())
    }

    /// Number of matched keys of one table kind.
    pub fn table_len(&self, kind: TableKind) -> usize {
        self.tables.get(&kind).map_or(0, BTreeSet::len)
    }

    /// Table kinds with at least one key, in render order.
    pub fn kinds(&self) -> impl Iterator<Item = TableKind> + '_ {
        self.tables
            .iter()
            .filter(|(_, keys)| !keys.is_empty())
            .map(|(kind, _)| *kind)
    }

    /// Total number of matched keys.
    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeSet::len).sum()
    }

    /// Whether nothing was matched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every key.
    pub fn clear(&mut self) {
        self.tables.clear();
    }
}

/// A reference found in a row, not yet matched against the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reference {
    /// Every dataset row with this id
    Dataset(String),
    /// First edge row with this id
    Edge(String),
    /// First vertex row with this id
    Vertex(String),
    /// First table row with this id
    Table(String),
    /// Every parameter row with this id
    Parameter(String),
    /// Every property row declared as `entity.property`
    Property { entity: String, property: String },
    /// Every property row of an entity type
    EntityProperties(String),
    /// A constraint id, looked up in constraints then composed constraints
    Constraint(String),
    /// Every catalogue row (aggregation, limitation, ordering) with this id
    Catalog(TableKind, String),
    /// The entity owning a property: exact tenant, else the global variant
    OwningEntity {
        namespace: String,
        tenant: String,
        entity_type: String,
    },
    /// Every composed-entity row deriving from this entity type
    Compositions(String),
    /// Parent of a composed entity and all of its properties
    ComposedParent {
        namespace: String,
        tenant: String,
        entity_type: String,
    },
    /// Every table-field row of a table id
    TableFields(String),
    /// Every vertex-function and filter row of a vertex id
    VertexMembers(String),
}

/// Compares ids as integers when both parse, else as strings.
fn same_id(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    matches!(
        (a.trim().parse::<i64>(), b.trim().parse::<i64>()),
        (Ok(x), Ok(y)) if x == y
    )
}

/// Breadth-first dependency resolver over one snapshot.
///
/// # Example
/// ```rust
/// use ctxmask_core::resolver::ContextResolver;
/// use ctxmask_core::snapshot::{NamespaceRows, Snapshot};
///
/// let snapshot = Snapshot::from_rows(NamespaceRows::new());
/// let mut resolver = ContextResolver::new(&snapshot);
/// assert!(!resolver.resolve_by_dataset("missing"));
/// assert!(resolver.context().is_empty());
/// ```
#[derive(Debug)]
pub struct ContextResolver<'a> {
    snapshot: &'a Snapshot,
    context: ResolvedContext,
    queue: VecDeque<(TableKind, PrimaryKey)>,
}

impl<'a> ContextResolver<'a> {
    /// Creates a resolver with an empty context.
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            context: ResolvedContext::new(),
            queue: VecDeque::new(),
        }
    }

    /// Context accumulated so far.
    pub fn context(&self) -> &ResolvedContext {
        &self.context
    }

    /// Consumes the resolver, returning its context.
    pub fn into_context(self) -> ResolvedContext {
        self.context
    }

    /// Empties the context so the next seed starts from scratch.
    pub fn clear(&mut self) {
        self.context.clear();
        self.queue.clear();
    }

    /// Pulls in every dataset row with this id and its closure.
    ///
    /// Returns whether any dataset row matched.
    pub fn resolve_by_dataset(&mut self, dataset_id: &str) -> bool {
        let found = self.follow_dataset(dataset_id);
        self.drain();
        debug!(
            "Dataset seed matched: {}; context holds {} rows",
            found,
            self.context.len()
        );
        found
    }

    /// Pulls in every entity row of this type, all of its declared
    /// properties, and their closure.
    ///
    /// Returns whether any entity row matched.
    pub fn resolve_by_entity(&mut self, entity_type: &str) -> bool {
        let matches: Vec<PrimaryKey> = self
            .snapshot
            .rows(TableKind::Entities)
            .filter(|(key, _)| key.part(2) == entity_type)
            .map(|(key, _)| key.clone())
            .collect();

        let found = !matches.is_empty();
        for key in matches {
            self.add(TableKind::Entities, key);
        }
        if found {
            self.follow(Reference::EntityProperties(entity_type.to_string()));
        }
        self.drain();
        debug!(
            "Entity seed matched: {}; context holds {} rows",
            found,
            self.context.len()
        );
        found
    }

    fn add(&mut self, kind: TableKind, key: PrimaryKey) {
        if self.context.insert(kind, key.clone()) {
            self.queue.push_back((kind, key));
        }
    }

    fn drain(&mut self) {
        while let Some((kind, key)) = self.queue.pop_front() {
            let Some(row) = self.snapshot.get(kind, &key) else {
                continue;
            };
            let mut references = Vec::new();
            Self::expand(kind, &key, row, &mut references);
            trace!(
                "Expanded {} row into {} references",
                kind,
                references.len()
            );
            for reference in references {
                self.follow(reference);
            }
        }
    }

    /// References one row contributes, per table kind.
    fn expand(kind: TableKind, key: &PrimaryKey, row: &Row, out: &mut Vec<Reference>) {
        match kind {
            TableKind::Datasets => {
                scan::json_references(row.get("config"), out);
                out.extend(scan::id_list(row.get("edges")).into_iter().map(Reference::Edge));
            }
            TableKind::Edges => {
                for column in ["source_vertex", "target_vertex"] {
                    let id = stringify(row.get(column));
                    if !id.is_empty() {
                        out.push(Reference::Vertex(id));
                    }
                }
                Self::constraint_list(row, out);
                scan::json_references(row.get("config"), out);
                scan::formula_references(row.get("condition"), out);
            }
            TableKind::Vertices => {
                let vertex_type = stringify(row.get("vertex_type"));
                if let Some(config) = scan::as_json(row.get("config")) {
                    match vertex_type.as_str() {
                        "dataset" => {
                            if let Some(id) = config.get("dataset") {
                                out.push(Reference::Dataset(stringify(Some(id))));
                            }
                        }
                        "table" => {
                            if let Some(id) = config.get("table") {
                                out.push(Reference::Table(stringify(Some(id))));
                            }
                        }
                        _ => {}
                    }
                }
                Self::constraint_list(row, out);
                scan::json_references(row.get("config"), out);
                out.push(Reference::VertexMembers(key.part(2).to_string()));
            }
            TableKind::VertexFunctions => {
                scan::formula_references(row.get("calculation_func"), out);
                scan::formula_references(row.get("aggregation_func"), out);
                out.push(Reference::Property {
                    entity: key.part(3).to_string(),
                    property: key.part(4).to_string(),
                });
            }
            TableKind::Filters => {
                scan::json_references(row.get("config"), out);
            }
            TableKind::TableFields => {
                out.push(Reference::Property {
                    entity: key.part(3).to_string(),
                    property: key.part(4).to_string(),
                });
            }
            TableKind::Constraints => {
                scan::json_references(row.get("config"), out);
                scan::formula_references(row.get("condition"), out);
                let entity = stringify(row.get("entity_type"));
                let property = stringify(row.get("property_id"));
                if !entity.is_empty() && !property.is_empty() {
                    out.push(Reference::Property { entity, property });
                }
            }
            TableKind::ComposedConstraints => {
                Self::constraint_list(row, out);
                scan::json_references(row.get("config"), out);
                scan::formula_references(row.get("condition"), out);
            }
            TableKind::EntityProperties => {
                out.push(Reference::OwningEntity {
                    namespace: key.part(0).to_string(),
                    tenant: key.part(1).to_string(),
                    entity_type: key.part(2).to_string(),
                });
                scan::formula_references(row.get("calculation_func"), out);
                scan::formula_references(row.get("aggregation_func"), out);
            }
            TableKind::Entities => {
                out.push(Reference::Compositions(key.part(2).to_string()));
            }
            TableKind::ComposedEntities => {
                out.push(Reference::ComposedParent {
                    namespace: key.part(0).to_string(),
                    tenant: key.part(1).to_string(),
                    entity_type: key.part(3).to_string(),
                });
            }
            TableKind::Tables => {
                out.push(Reference::TableFields(key.part(2).to_string()));
            }
            TableKind::Limitation => {
                scan::formula_references(row.get("total_limit"), out);
                scan::formula_references(row.get("group_limit"), out);
            }
            TableKind::Namespaces
            | TableKind::Tenants
            | TableKind::Clients
            | TableKind::Parameters
            | TableKind::Aggregation
            | TableKind::Ordering
            | TableKind::GroupBy
            | TableKind::OrderBy => {}
        }
    }

    fn constraint_list(row: &Row, out: &mut Vec<Reference>) {
        out.extend(
            scan::id_list(row.get("constraints"))
                .into_iter()
                .map(Reference::Constraint),
        );
    }

    /// Matches one reference against the snapshot and enqueues new rows.
    fn follow(&mut self, reference: Reference) {
        let snapshot = self.snapshot;
        match reference {
            Reference::Dataset(id) => {
                self.follow_dataset(&id);
            }
            Reference::Edge(id) => self.add_first(TableKind::Edges, |key| key.part(2) == id),
            Reference::Vertex(id) => self.add_first(TableKind::Vertices, |key| key.part(2) == id),
            Reference::Table(id) => self.add_first(TableKind::Tables, |key| key.part(2) == id),
            Reference::TableFields(id) => {
                self.add_all(TableKind::TableFields, |key| key.part(2) == id);
            }
            Reference::VertexMembers(id) => {
                self.add_all(TableKind::VertexFunctions, |key| key.part(2) == id);
                self.add_all(TableKind::Filters, |key| key.part(2) == id);
            }
            Reference::Parameter(id) => {
                self.add_all(TableKind::Parameters, |key| key.part(2) == id);
            }
            Reference::Property { entity, property } => {
                self.add_all(TableKind::EntityProperties, |key| {
                    key.part(2) == entity && key.part(3) == property
                });
            }
            Reference::EntityProperties(entity_type) => {
                self.add_all(TableKind::EntityProperties, |key| key.part(2) == entity_type);
            }
            Reference::Constraint(id) => {
                for kind in [TableKind::Constraints, TableKind::ComposedConstraints] {
                    let found = Self::first_key(snapshot, kind, |key| same_id(key.part(2), &id));
                    if let Some(key) = found {
                        self.add(kind, key);
                        return;
                    }
                }
            }
            Reference::Catalog(kind, id) => {
                self.add_all(kind, |key| key.last() == id);
            }
            Reference::OwningEntity {
                namespace,
                tenant,
                entity_type,
            } => {
                if let Some(key) = Self::entity_key(snapshot, &namespace, &tenant, &entity_type) {
                    self.add(TableKind::Entities, key);
                }
            }
            Reference::Compositions(entity_type) => {
                self.add_all(TableKind::ComposedEntities, |key| key.part(2) == entity_type);
            }
            Reference::ComposedParent {
                namespace,
                tenant,
                entity_type,
            } => {
                if let Some(key) = Self::entity_key(snapshot, &namespace, &tenant, &entity_type) {
                    self.add(TableKind::Entities, key);
                    self.follow(Reference::EntityProperties(entity_type));
                }
            }
        }
    }

    fn follow_dataset(&mut self, dataset_id: &str) -> bool {
        self.add_all(TableKind::Datasets, |key| key.part(2) == dataset_id) > 0
    }

    /// Entity key for a tenant, falling back to the global (empty) tenant.
    fn entity_key(
        snapshot: &Snapshot,
        namespace: &str,
        tenant: &str,
        entity_type: &str,
    ) -> Option<PrimaryKey> {
        let exact = PrimaryKey::new([namespace, tenant, entity_type]);
        if snapshot.contains(TableKind::Entities, &exact) {
            return Some(exact);
        }
        if tenant.is_empty() {
            return None;
        }
        let global = PrimaryKey::new([namespace, "", entity_type]);
        snapshot
            .contains(TableKind::Entities, &global)
            .then_some(global)
    }

    fn first_key<F>(snapshot: &Snapshot, kind: TableKind, predicate: F) -> Option<PrimaryKey>
    where
        F: Fn(&PrimaryKey) -> bool,
    {
        snapshot
            .rows(kind)
            .map(|(key, _)| key)
            .find(|key| predicate(key))
            .cloned()
    }

    fn add_first<F>(&mut self, kind: TableKind, predicate: F)
    where
        F: Fn(&PrimaryKey) -> bool,
    {
        if let Some(key) = Self::first_key(self.snapshot, kind, predicate) {
            self.add(kind, key);
        }
    }

    /// Adds every matching row; returns how many matched.
    fn add_all<F>(&mut self, kind: TableKind, predicate: F) -> usize
    where
        F: Fn(&PrimaryKey) -> bool,
    {
        let matches: Vec<PrimaryKey> = self
            .snapshot
            .rows(kind)
            .map(|(key, _)| key)
            .filter(|key| predicate(key))
            .cloned()
            .collect();
        let count = matches.len();
        for key in matches {
            self.add(kind, key);
        }
        count
    }
}
