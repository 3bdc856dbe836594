//! The entity arena.
//!
//! Entities never own each other. Every entity of one normalization lives in
//! an [`EntityGraph`], and references between them are [`EntityId`]s, so
//! self and mutual references need no reference counting.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use loom_sql_core::SqlValue;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Position of an entity in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(usize);

impl EntityId {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A decoded record of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    table: String,
    key: String,
    fields: Vec<(String, SqlValue)>,
    refs: BTreeMap<String, Option<EntityId>>,
    reverse: BTreeMap<String, Vec<EntityId>>,
}

impl Entity {
    pub(crate) fn new(table: &str, key: String, fields: Vec<(String, SqlValue)>) -> Self {
        Self {
            table: String::from(table),
            key,
            fields,
            refs: BTreeMap::new(),
            reverse: BTreeMap::new(),
        }
    }

    pub(crate) fn set_reference(&mut self, alias: &str, target: Option<EntityId>) {
        self.refs.insert(String::from(alias), target);
    }

    pub(crate) fn set_reverse(&mut self, alias: &str, referrers: Vec<EntityId>) {
        self.reverse.insert(String::from(alias), referrers);
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the `"table:pk"` key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&SqlValue> {
        self.fields
            .iter()
            .find_map(|(name, value)| (name == field).then_some(value))
    }

    /// Returns the decoded fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[(String, SqlValue)] {
        &self.fields
    }
}

/// All entities of one normalization, indexed by key.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    entities: Vec<Entity>,
    index: HashMap<String, EntityId>,
    by_table: HashMap<String, Vec<EntityId>>,
}

impl EntityGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores an entity unless its key is already present. First write wins.
    pub(crate) fn insert(&mut self, entity: Entity) -> EntityId {
        if let Some(id) = self.index.get(&entity.key) {
            return *id;
        }
        let id = EntityId(self.entities.len());
        self.index.insert(entity.key.clone(), id);
        self.by_table
            .entry(entity.table.clone())
            .or_default()
            .push(id);
        self.entities.push(entity);
        id
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0]
    }

    pub(crate) fn id_of(&self, key: &str) -> Option<EntityId> {
        self.index.get(key).copied()
    }

    /// Returns the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` when the graph holds no entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Looks an entity up by its `"table:pk"` key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<EntityRef<'_>> {
        self.id_of(key).map(|id| self.entity(id))
    }

    /// Returns a handle to an entity.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not come from this graph.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> EntityRef<'_> {
        assert!(id.0 < self.entities.len(), "entity id out of range");
        EntityRef { graph: self, id }
    }

    /// Returns the ids of a table's entities, in first-seen order.
    #[must_use]
    pub fn ids_of(&self, table: &str) -> &[EntityId] {
        self.by_table.get(table).map_or(&[], Vec::as_slice)
    }

    /// Iterates over a table's entities, in first-seen order.
    pub fn entities_of<'g>(&'g self, table: &str) -> impl Iterator<Item = EntityRef<'g>> + 'g {
        self.ids_of(table).iter().map(move |id| self.entity(*id))
    }
}

/// A borrowed handle to one entity of a graph.
///
/// Two handles are equal when they point at the same entity of the same
/// graph.
#[derive(Clone, Copy)]
pub struct EntityRef<'g> {
    graph: &'g EntityGraph,
    id: EntityId,
}

impl<'g> EntityRef<'g> {
    fn raw(&self) -> &'g Entity {
        &self.graph.entities[self.id.0]
    }

    /// Returns the entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the table name.
    #[must_use]
    pub fn table(&self) -> &'g str {
        &self.raw().table
    }

    /// Returns the `"table:pk"` key.
    #[must_use]
    pub fn key(&self) -> &'g str {
        &self.raw().key
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&'g SqlValue> {
        self.raw().get(field)
    }

    /// Returns the decoded fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &'g [(String, SqlValue)] {
        &self.raw().fields
    }

    /// Follows a forward reference. `None` when the alias is unknown or the
    /// reference is null.
    #[must_use]
    pub fn reference(&self, alias: &str) -> Option<Self> {
        self.raw()
            .refs
            .get(alias)
            .copied()
            .flatten()
            .map(|id| self.graph.entity(id))
    }

    /// Returns `true` when the forward alias was resolved (possibly to
    /// null) for this entity.
    #[must_use]
    pub fn has_reference(&self, alias: &str) -> bool {
        self.raw().refs.contains_key(alias)
    }

    /// Returns the entities referring to this one through a reverse alias.
    #[must_use]
    pub fn reverse(&self, alias: &str) -> Vec<Self> {
        self.raw()
            .reverse
            .get(alias)
            .map(|ids| ids.iter().map(|id| self.graph.entity(*id)).collect())
            .unwrap_or_default()
    }
}

impl PartialEq for EntityRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.id == other.id
    }
}

impl Eq for EntityRef<'_> {}

impl fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("key", &self.key())
            .field("fields", &self.fields())
            .finish_non_exhaustive()
    }
}

/// Entities already being written, innermost last.
struct Path<'p> {
    id: EntityId,
    parent: Option<&'p Path<'p>>,
}

impl Path<'_> {
    fn contains(&self, id: EntityId) -> bool {
        let mut node = Some(self);
        while let Some(path) = node {
            if path.id == id {
                return true;
            }
            node = path.parent;
        }
        false
    }
}

struct SerializeEntity<'g, 'p> {
    entity: EntityRef<'g>,
    path: Option<&'p Path<'p>>,
}

impl Serialize for SerializeEntity<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = self.entity.raw();
        let here = Path {
            id: self.entity.id,
            parent: self.path,
        };
        let mut map = serializer.serialize_map(Some(raw.fields.len() + raw.refs.len()))?;
        for (name, value) in &raw.fields {
            map.serialize_entry(name, value)?;
        }
        // Reverse collections are never written.
        for (alias, target) in &raw.refs {
            match target {
                None => map.serialize_entry(alias, &())?,
                Some(id) if here.contains(*id) => {
                    map.serialize_entry(alias, self.entity.graph.entity(*id).key())?;
                }
                Some(id) => map.serialize_entry(
                    alias,
                    &SerializeEntity {
                        entity: self.entity.graph.entity(*id),
                        path: Some(&here),
                    },
                )?,
            }
        }
        map.end()
    }
}

impl Serialize for EntityRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SerializeEntity {
            entity: *self,
            path: None,
        }
        .serialize(serializer)
    }
}

/// The outcome of a normalization: the graph plus the main-table entities
/// in first-seen row order.
#[derive(Debug, Clone)]
pub struct Normalized {
    graph: EntityGraph,
    results: Vec<EntityId>,
}

impl Normalized {
    pub(crate) const fn new(graph: EntityGraph, results: Vec<EntityId>) -> Self {
        Self { graph, results }
    }

    /// Returns the graph holding every entity.
    #[must_use]
    pub const fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    /// Returns the main-table entity ids.
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.results
    }

    /// Iterates over the main-table entities.
    pub fn results(&self) -> impl Iterator<Item = EntityRef<'_>> {
        self.results.iter().map(|id| self.graph.entity(*id))
    }

    /// Returns the result at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<EntityRef<'_>> {
        self.results.get(index).map(|id| self.graph.entity(*id))
    }

    /// Returns the number of results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` when there are no results.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl Serialize for Normalized {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.results.len()))?;
        for entity in self.results() {
            seq.serialize_element(&entity)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(String::from(s))
    }

    fn node(key: &str) -> Entity {
        Entity::new(
            "nodes",
            format!("nodes:{key}"),
            vec![(String::from("id"), text(key))],
        )
    }

    #[test]
    fn test_first_insert_wins() {
        let mut graph = EntityGraph::new();
        let a = graph.insert(node("a"));
        let mut dup = node("a");
        dup.fields[0].1 = text("changed");
        assert_eq!(graph.insert(dup), a);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.entity(a).get("id"), Some(&text("a")));
    }

    #[test]
    fn test_cycle_serializes_as_key() {
        let mut graph = EntityGraph::new();
        let a = graph.insert(node("a"));
        let b = graph.insert(node("b"));
        graph.entity_mut(a).set_reference("next", Some(b));
        graph.entity_mut(b).set_reference("next", Some(a));
        graph.entity_mut(a).set_reverse("prev", vec![b]);

        let json = serde_json::to_value(graph.entity(a)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "a", "next": {"id": "b", "next": "nodes:a"}})
        );
    }

    #[test]
    fn test_refs_compare_by_identity() {
        let mut graph = EntityGraph::new();
        let a = graph.insert(node("a"));
        let b = graph.insert(node("b"));
        assert_eq!(graph.entity(a), graph.get("nodes:a").unwrap());
        assert_ne!(graph.entity(a), graph.entity(b));
        assert_eq!(graph.ids_of("nodes"), [a, b]);
        assert!(graph.ids_of("other").is_empty());
    }
}
