//! Catalog metadata for relq: column types, relation schemas, and the lookup
//! interface the planner validates statements against.
//!
//! The planner only ever reads through [`Catalog`]. Implementations hand out
//! owned [`Relation`] snapshots, so nothing the planner does can mutate the
//! backing store. [`MemoryCatalog`] is the in-process implementation used by
//! the CLI and tests; it deserializes from
//! `{"relations": [{"name": .., "columns": [{"name": .., "type": ..}]}]}`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use relq_error::{RelqError, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum DataType {
    #[default]
    Null,
    Text,
    Real,
    Integer,
    Datetime,
    Boolean,
    Blob,
}

impl DataType {
    pub const ALL: [Self; 7] = [
        Self::Null,
        Self::Text,
        Self::Real,
        Self::Integer,
        Self::Datetime,
        Self::Boolean,
        Self::Blob,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Integer => "INTEGER",
            Self::Datetime => "DATETIME",
            Self::Boolean => "BOOLEAN",
            Self::Blob => "BLOB",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = RelqError;

    /// Case-insensitive match on the type name.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RelqError::config(format!("unknown data type: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Columns and relations
// ---------------------------------------------------------------------------

/// Metadata about one column of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: DataType,
    /// Opaque storage hint owned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            location: None,
        }
    }
}

/// A named relation and its schema, keyed by column name.
///
/// Serialized as `{"name", "location"?, "columns": [..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RelationDef", into = "RelationDef")]
pub struct Relation {
    pub name: String,
    pub location: Option<String>,
    pub schema: BTreeMap<String, Column>,
}

impl Relation {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
            schema: BTreeMap::new(),
        }
    }

    /// Builder-style column registration. A repeated name replaces the
    /// earlier column.
    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    pub fn add_column(&mut self, column: Column) {
        self.schema.insert(column.name.clone(), column);
    }

    /// Exact-match column lookup.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.schema.get(name)
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.schema.contains_key(name)
    }

    /// Columns ordered by name.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.schema.values()
    }
}

#[derive(Serialize, Deserialize)]
struct RelationDef {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(default)]
    columns: Vec<Column>,
}

impl From<RelationDef> for Relation {
    fn from(def: RelationDef) -> Self {
        let mut relation = Self::new(def.name);
        relation.location = def.location;
        for column in def.columns {
            relation.add_column(column);
        }
        relation
    }
}

impl From<Relation> for RelationDef {
    fn from(rel: Relation) -> Self {
        Self {
            name: rel.name,
            location: rel.location,
            columns: rel.schema.into_values().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog interface
// ---------------------------------------------------------------------------

/// Read-only metadata lookup used during planning.
pub trait Catalog {
    /// Snapshot of a relation, or [`RelqError::NoSuchRelation`].
    fn get_relation(&self, name: &str) -> Result<Relation>;

    /// Whether any relation in the catalog has a column of this name.
    fn has_column(&self, name: &str) -> bool;
}

impl<C: Catalog + ?Sized> Catalog for &C {
    fn get_relation(&self, name: &str) -> Result<Relation> {
        (**self).get_relation(name)
    }

    fn has_column(&self, name: &str) -> bool {
        (**self).has_column(name)
    }
}

/// In-memory catalog keyed by relation name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CatalogDef", into = "CatalogDef")]
pub struct MemoryCatalog {
    relations: BTreeMap<String, Relation>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation, replacing any relation of the same name.
    pub fn add_relation(&mut self, relation: Relation) {
        if let Some(old) = self.relations.insert(relation.name.clone(), relation) {
            tracing::debug!(
                target: "relq.catalog",
                relation = %old.name,
                "relation definition replaced"
            );
        }
    }

    #[must_use]
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.add_relation(relation);
        self
    }

    /// Borrowing lookup, for callers that do not need a snapshot.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

impl FromIterator<Relation> for MemoryCatalog {
    fn from_iter<I: IntoIterator<Item = Relation>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for relation in iter {
            catalog.add_relation(relation);
        }
        catalog
    }
}

impl Catalog for MemoryCatalog {
    fn get_relation(&self, name: &str) -> Result<Relation> {
        self.relations
            .get(name)
            .cloned()
            .ok_or_else(|| RelqError::no_such_relation(name))
    }

    /// Accepts a bare column name (matched against every relation) or a
    /// `relation.column` name (matched against that relation only).
    fn has_column(&self, name: &str) -> bool {
        if self.relations.values().any(|r| r.has_column(name)) {
            return true;
        }
        name.rsplit_once('.').is_some_and(|(rel, col)| {
            self.relations.get(rel).is_some_and(|r| r.has_column(col))
        })
    }
}

#[derive(Serialize, Deserialize)]
struct CatalogDef {
    #[serde(default)]
    relations: Vec<Relation>,
}

impl From<CatalogDef> for MemoryCatalog {
    fn from(def: CatalogDef) -> Self {
        def.relations.into_iter().collect()
    }
}

impl From<MemoryCatalog> for CatalogDef {
    fn from(catalog: MemoryCatalog) -> Self {
        Self {
            relations: catalog.relations.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Relation {
        Relation::new("users")
            .with_column(Column::new("id", DataType::Integer))
            .with_column(Column::new("name", DataType::Text))
    }

    fn orders() -> Relation {
        Relation::new("orders")
            .with_column(Column::new("id", DataType::Integer))
            .with_column(Column::new("total", DataType::Real))
    }

    #[test]
    fn test_data_type_display_and_parse() {
        for ty in DataType::ALL {
            assert_eq!(ty.to_string().parse::<DataType>().ok(), Some(ty));
        }
        assert_eq!("datetime".parse::<DataType>().ok(), Some(DataType::Datetime));
        let err = "VARCHAR".parse::<DataType>().expect_err("not a relq type");
        assert_eq!(err.to_string(), "configuration error: unknown data type: VARCHAR");
    }

    #[test]
    fn test_relation_has_column_is_exact() {
        let rel = users();
        assert!(rel.has_column("name"));
        assert!(!rel.has_column("NAME"));
        assert!(!rel.has_column("users.name"));
        assert_eq!(rel.column("id").map(|c| c.data_type), Some(DataType::Integer));
    }

    #[test]
    fn test_get_relation_returns_snapshot() {
        let catalog = MemoryCatalog::new().with_relation(users());
        let mut snapshot = catalog.get_relation("users").expect("registered");
        snapshot.add_column(Column::new("email", DataType::Text));
        assert!(!catalog.has_column("email"));
    }

    #[test]
    fn test_get_relation_missing() {
        let catalog = MemoryCatalog::new();
        let err = catalog.get_relation("ghost").expect_err("empty catalog");
        assert!(matches!(err, RelqError::NoSuchRelation { ref name } if name == "ghost"));
    }

    #[test]
    fn test_catalog_has_column_bare_and_qualified() {
        let catalog: MemoryCatalog = [users(), orders()].into_iter().collect();
        assert!(catalog.has_column("total"));
        assert!(catalog.has_column("orders.total"));
        assert!(!catalog.has_column("users.total"));
        assert!(!catalog.has_column("ghost.id"));
        assert!(!catalog.has_column("missing"));
    }

    #[test]
    fn test_add_relation_replaces_by_name() {
        let mut catalog = MemoryCatalog::new().with_relation(users());
        catalog.add_relation(Relation::new("users"));
        assert_eq!(catalog.len(), 1);
        assert!(!catalog.has_column("name"));
    }

    #[test]
    fn test_catalog_through_reference_and_trait_object() {
        let catalog = MemoryCatalog::new().with_relation(orders());
        let dyn_ref: &dyn Catalog = &catalog;
        assert!(dyn_ref.has_column("total"));
        assert!((&catalog).get_relation("orders").is_ok());
    }

    #[test]
    fn test_catalog_deserialize() {
        let json = r#"{
            "relations": [
                {"name": "t1", "columns": [
                    {"name": "a", "type": "INTEGER"},
                    {"name": "b", "type": "TEXT", "location": "heap:3"}
                ]},
                {"name": "t2", "location": "file:t2.dat", "columns": [{"name": "c"}]}
            ]
        }"#;
        let catalog: MemoryCatalog = serde_json::from_str(json).expect("valid catalog");
        assert_eq!(catalog.len(), 2);

        let t1 = catalog.relation("t1").expect("t1");
        assert_eq!(t1.column("b").and_then(|c| c.location.as_deref()), Some("heap:3"));
        let t2 = catalog.relation("t2").expect("t2");
        assert_eq!(t2.location.as_deref(), Some("file:t2.dat"));
        assert_eq!(t2.column("c").map(|c| c.data_type), Some(DataType::Null));
    }

    #[test]
    fn test_catalog_serialize_round_trip() {
        let catalog: MemoryCatalog = [users(), orders()].into_iter().collect();
        let json = serde_json::to_string(&catalog).expect("serializable");
        assert!(json.contains(r#""type":"INTEGER""#));
        let back: MemoryCatalog = serde_json::from_str(&json).expect("round trip");
        assert_eq!(back, catalog);
    }

    #[test]
    fn test_unknown_type_rejected_by_serde() {
        let json = r#"{"relations": [{"name": "t", "columns": [{"name": "a", "type": "UUID"}]}]}"#;
        assert!(serde_json::from_str::<MemoryCatalog>(json).is_err());
    }
}
