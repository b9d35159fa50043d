//! `CacheSource` over the SQLite cache.
//!
//! `lookup` replays a bounded expansion against the cached relationship
//! table with the same frontier depth rules as the live crawler, so a warm
//! cache answers exactly the shape the crawler would have produced.
//! `store` upserts and never deletes; stale rows age out only through
//! explicit maintenance, not through normal traffic.

use super::db::CacheDb;
use super::schema;
use crate::error::{AncestaError, Result};
use crate::model::{Individual, Property, RelationGraph, Relationship, StrataMap, Stratum};
use crate::source::{CacheRequest, CacheSource};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

pub struct SqliteCache {
    db: Arc<CacheDb>,
    strata: StrataMap,
}

impl SqliteCache {
    /// Open (or create) the cache database and apply the schema.
    pub async fn open<P: AsRef<Path>>(path: P, strata: StrataMap) -> Result<Self> {
        let db = Arc::new(CacheDb::new(path));
        db.with_connection(|conn| schema::ensure_schema(conn)).await?;
        Ok(Self { db, strata })
    }
}

#[async_trait]
impl CacheSource for SqliteCache {
    async fn lookup(&self, request: &CacheRequest) -> Result<RelationGraph> {
        let request = request.clone();
        let strata = self.strata.clone();
        self.db
            .with_connection(move |conn| lookup_bounded(conn, &request, &strata))
            .await
    }

    async fn store(&self, graph: &RelationGraph) -> Result<()> {
        let graph = graph.clone();
        self.db
            .with_connection(move |conn| upsert_graph(conn, &graph))
            .await
    }
}

/// Bounded BFS over the cached edges, mirroring the crawler: homostratal
/// neighbors inherit the frontier depth, heterostratal neighbors get one
/// more, nothing beyond the requested depth is resolved. When `all_spouses`
/// is off, homostratal hops are taken from the root only.
fn lookup_bounded(
    conn: &Connection,
    request: &CacheRequest,
    strata: &StrataMap,
) -> Result<RelationGraph> {
    let mut graph = RelationGraph::new();
    let mut visited: HashSet<String> = request.visited.iter().cloned().collect();
    let mut frontier: HashMap<String, usize> = HashMap::from([(request.person_id.clone(), 0)]);
    let mut first_round = true;

    while !frontier.is_empty() {
        let ids: Vec<String> = frontier.keys().cloned().collect();

        let mut resolved_any = false;
        for id in &ids {
            if let Some(person) = load_individual(conn, id)? {
                resolved_any = true;
                if first_round {
                    graph.targets.push(person.clone());
                }
                graph.insert_individual(person);
            }
        }
        // A root the cache has never seen is a miss, not a partial hit.
        if first_round && !resolved_any {
            return Ok(RelationGraph::new());
        }
        first_round = false;

        visited.extend(frontier.keys().cloned());

        let edges = load_edges(conn, &ids, strata)?;
        let mut next: HashMap<String, usize> = HashMap::new();
        for rel in &edges {
            if visited.contains(&rel.object) {
                continue;
            }
            let depth = match frontier.get(&rel.subject) {
                Some(&d) => d,
                None => continue,
            };
            let candidate = match strata.classify(&rel.type_id) {
                Some(Stratum::Homostratal) => {
                    if !request.all_spouses && rel.subject != request.person_id {
                        continue;
                    }
                    depth
                }
                Some(Stratum::Heterostratal) => depth + 1,
                None => continue,
            };
            if candidate <= request.depth {
                next.entry(rel.object.clone())
                    .and_modify(|d| *d = (*d).min(candidate))
                    .or_insert(candidate);
            }
        }

        for rel in edges {
            if visited.contains(&rel.object) || next.contains_key(&rel.object) {
                graph.insert_relationship(rel);
            }
        }

        frontier = next;
    }

    Ok(graph)
}

fn load_individual(conn: &Connection, id: &str) -> Result<Option<Individual>> {
    let mut stmt =
        conn.prepare_cached("SELECT id, name, description, alias FROM individuals WHERE id = ?1")?;
    let mut rows = stmt.query(params![id])?;
    let row = match rows.next()? {
        Some(row) => row,
        None => return Ok(None),
    };

    let mut person = Individual::new(&row.get::<_, String>(0)?, &row.get::<_, String>(1)?);
    person.description = row.get::<_, Option<String>>(2)?.unwrap_or_default();
    person.alias = row.get(3)?;

    let mut stmt = conn.prepare_cached(
        "SELECT property_id, label, value, value_hash, qualifiers \
         FROM properties WHERE individual_id = ?1",
    )?;
    let properties = stmt
        .query_map(params![id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    for (property_id, label, value, value_hash, qualifiers) in properties {
        let mut property = Property::new(&property_id, &label, &value);
        property.value_hash = value_hash;
        property.qualifiers = serde_json::from_str(&qualifiers)?;
        person.properties.push(property);
    }

    Ok(Some(person))
}

fn load_edges(conn: &Connection, subjects: &[String], strata: &StrataMap) -> Result<Vec<Relationship>> {
    let mut edges = Vec::new();
    let mut stmt = conn.prepare_cached(
        "SELECT subject_id, object_id, kind, type_id FROM relationships WHERE subject_id = ?1",
    )?;
    for id in subjects {
        let rows = stmt
            .query_map(params![id], |row| {
                Ok(Relationship::new(
                    &row.get::<_, String>(0)?,
                    &row.get::<_, String>(1)?,
                    &row.get::<_, String>(2)?,
                    &row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        edges.extend(rows.into_iter().filter(|r| strata.classify(&r.type_id).is_some()));
    }
    Ok(edges)
}

fn upsert_graph(conn: &mut Connection, graph: &RelationGraph) -> Result<()> {
    let tx = conn.transaction()?;
    for person in graph.items.values() {
        tx.execute(
            "INSERT INTO individuals (id, name, description, alias) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET name = ?2, description = ?3, alias = ?4",
            params![person.id, person.name, person.description, person.alias],
        )?;
        for property in &person.properties {
            let qualifiers = serde_json::to_string(&property.qualifiers)?;
            tx.execute(
                "INSERT OR IGNORE INTO properties \
                 (individual_id, property_id, label, value, value_hash, qualifiers) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    person.id,
                    property.property_id,
                    property.label,
                    property.value,
                    property.value_hash,
                    qualifiers
                ],
            )?;
        }
    }
    let mut dangling = 0usize;
    for rel in graph.all_relationships() {
        // Foreign keys reject edges to individuals the delta never carried.
        if !graph.items.contains_key(&rel.subject) || !graph.items.contains_key(&rel.object) {
            dangling += 1;
            continue;
        }
        tx.execute(
            "INSERT OR IGNORE INTO relationships (subject_id, object_id, kind, type_id) \
             VALUES (?1, ?2, ?3, ?4)",
            params![rel.subject, rel.object, rel.kind, rel.type_id],
        )?;
    }
    if dangling > 0 {
        log::debug!("cache store: skipped {} dangling relationships", dangling);
    }
    tx.commit().map_err(AncestaError::Database)?;
    Ok(())
}
