//! Flat rows to entity graph.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use loom_sql_core::schema::TableMetadata;
use loom_sql_core::{Row, SqlValue};
use tracing::debug;

use crate::decode::decode_entity;
use crate::entity::{Entity, EntityGraph, EntityId, Normalized};
use crate::error::{OrmError, Result};

/// What to do with a non-null foreign key whose target is not in the rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// Leave the reference null. Suits partial joins.
    #[default]
    Lenient,
    /// Fail with [`OrmError::DanglingReference`].
    Strict,
}

/// Normalization options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Handling of unresolvable forward references.
    pub references: ReferencePolicy,
}

/// Normalizes rows with the default (lenient) options.
///
/// The first table is the main table; its entities are the results.
pub fn normalize(rows: &[Row], tables: &[&TableMetadata]) -> Result<Normalized> {
    normalize_with(rows, tables, NormalizeOptions::default())
}

/// Normalizes rows.
pub fn normalize_with(
    rows: &[Row],
    tables: &[&TableMetadata],
    options: NormalizeOptions,
) -> Result<Normalized> {
    let Some(main) = tables.first() else {
        return Err(OrmError::NoTables);
    };
    check_registered(rows, tables)?;

    // Pass 1: one entity per key, first sighting wins.
    let mut graph = EntityGraph::new();
    let mut main_ids = Vec::with_capacity(rows.len());
    for row in rows {
        let mut main_id = None;
        for (i, table) in tables.iter().enumerate() {
            let Some(sub) = extract(row, table.name()) else {
                continue;
            };
            let Some(key) = entity_key(table, &sub) else {
                continue;
            };
            let id = match graph.id_of(&key) {
                Some(id) => id,
                None => {
                    let fields = decode_entity(table, &key, sub)?;
                    graph.insert(Entity::new(table.name(), key, fields))
                }
            };
            if i == 0 {
                main_id = Some(id);
            }
        }
        main_ids.push(main_id);
    }

    // Pass 2: references are flat lookups, never recursive.
    resolve_forward(&mut graph, tables, options)?;
    resolve_reverse(&mut graph, tables);

    // Pass 3: main-table entities in input order.
    let mut seen = HashSet::new();
    let results: Vec<EntityId> = main_ids
        .into_iter()
        .flatten()
        .filter(|id| seen.insert(*id))
        .collect();

    debug!(
        table = %main.name(),
        rows = rows.len(),
        entities = graph.len(),
        results = results.len(),
        "normalized rows"
    );
    Ok(Normalized::new(graph, results))
}

fn check_registered(rows: &[Row], tables: &[&TableMetadata]) -> Result<()> {
    let known: HashSet<&str> = tables.iter().map(|t| t.name()).collect();
    let unknown: BTreeSet<&str> = rows
        .iter()
        .flat_map(BTreeMap::keys)
        .filter_map(|key| key.split_once('.').map(|(prefix, _)| prefix))
        .filter(|prefix| !known.contains(prefix))
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(OrmError::UnregisteredTables(
            unknown.into_iter().map(String::from).collect(),
        ))
    }
}

/// Strips `"table."` from the row's matching columns. `None` when every
/// extracted value is null, which is how an unmatched outer join shows up.
fn extract(row: &Row, table: &str) -> Option<BTreeMap<String, SqlValue>> {
    let prefix = format!("{table}.");
    let sub: BTreeMap<String, SqlValue> = row
        .range(prefix.clone()..)
        .take_while(|(key, _)| key.starts_with(&prefix))
        .map(|(key, value)| (String::from(&key[prefix.len()..]), value.clone()))
        .collect();
    sub.values().any(|v| !v.is_null()).then_some(sub)
}

/// Builds `"table:pk"`. Compound keys join their parts with `,`.
fn entity_key(table: &TableMetadata, sub: &BTreeMap<String, SqlValue>) -> Option<String> {
    let columns = table.primary_key().columns();
    if columns.is_empty() {
        return None;
    }
    let mut parts = Vec::with_capacity(columns.len());
    for column in columns {
        match sub.get(column) {
            Some(value) if !value.is_null() => parts.push(value.key_fragment()),
            _ => return None,
        }
    }
    Some(format!("{}:{}", table.name(), parts.join(",")))
}

/// Indexes a table's entities by the text of one field.
fn field_index(graph: &EntityGraph, table: &str, field: &str) -> HashMap<String, Vec<EntityId>> {
    let mut index: HashMap<String, Vec<EntityId>> = HashMap::new();
    for entity in graph.entities_of(table) {
        if let Some(value) = entity.get(field).filter(|v| !v.is_null()) {
            index.entry(value.key_fragment()).or_default().push(entity.id());
        }
    }
    index
}

fn resolve_forward(
    graph: &mut EntityGraph,
    tables: &[&TableMetadata],
    options: NormalizeOptions,
) -> Result<()> {
    let registered: HashSet<&str> = tables.iter().map(|t| t.name()).collect();
    let mut targets: HashMap<(String, String), HashMap<String, Vec<EntityId>>> = HashMap::new();

    for table in tables {
        for (field, reference) in table.references() {
            let lookup = targets
                .entry((reference.table.clone(), reference.field.clone()))
                .or_insert_with(|| field_index(graph, &reference.table, &reference.field));

            let mut resolved = Vec::with_capacity(graph.ids_of(table.name()).len());
            for entity in graph.entities_of(table.name()) {
                let fk = entity.get(&field.name).filter(|v| !v.is_null());
                let target = match fk {
                    None => None,
                    Some(value) => {
                        let found = lookup
                            .get(&value.key_fragment())
                            .and_then(|ids| ids.first().copied());
                        if found.is_none() {
                            let key = format!("{}:{}", reference.table, value.key_fragment());
                            let strict = options.references == ReferencePolicy::Strict
                                && registered.contains(reference.table.as_str());
                            if strict {
                                return Err(OrmError::DanglingReference {
                                    table: String::from(table.name()),
                                    alias: reference.alias.clone(),
                                    key,
                                });
                            }
                            debug!(
                                entity = %entity.key(),
                                alias = %reference.alias,
                                target = %key,
                                "reference target not in result set"
                            );
                        }
                        found
                    }
                };
                resolved.push((entity.id(), target));
            }
            for (id, target) in resolved {
                graph.entity_mut(id).set_reference(&reference.alias, target);
            }
        }
    }
    Ok(())
}

fn resolve_reverse(graph: &mut EntityGraph, tables: &[&TableMetadata]) {
    for table in tables {
        for (field, reference) in table.references() {
            let Some(alias) = &reference.reverse_alias else {
                continue;
            };
            // referrers grouped by foreign key value, in one pass
            let referrers = field_index(graph, table.name(), &field.name);
            let mut attached = Vec::new();
            for target in graph.entities_of(&reference.table) {
                let list = target
                    .get(&reference.field)
                    .and_then(|value| referrers.get(&value.key_fragment()))
                    .cloned()
                    .unwrap_or_default();
                attached.push((target.id(), list));
            }
            for (id, list) in attached {
                graph.entity_mut(id).set_reverse(alias, list);
            }
        }
    }
}
