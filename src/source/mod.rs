//! Interfaces to the external knowledge-graph source and the relationship
//! cache.
//!
//! The query protocol and row normalization live behind these traits; the
//! engine only ever sees typed `Individual` and `Relationship` values.

mod memory;

pub use memory::{MemoryCache, MemorySource};

use crate::error::Result;
use crate::model::{Individual, RelationGraph, Relationship, StrataMap};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Relationship edges touching a queried id set, with newly discovered
/// neighbors split by stratum.
///
/// Neighbor maps are keyed by the discovered individual's id; the values are
/// the queried ids it is known related to. An id reachable through both a
/// homostratal and a heterostratal edge counts as homostratal only (the
/// same-generation reading wins for depth computation).
#[derive(Debug, Default, Clone)]
pub struct RelationBatch {
    pub relations: HashSet<Relationship>,
    pub homostratal_neighbors: HashMap<String, Vec<String>>,
    pub heterostratal_neighbors: HashMap<String, Vec<String>>,
}

impl RelationBatch {
    /// Classify a set of edges into a batch, given the queried ids.
    pub fn from_relations(
        relations: HashSet<Relationship>,
        strata: &StrataMap,
    ) -> Self {
        let mut homo: HashMap<String, Vec<String>> = HashMap::new();
        let mut hetero: HashMap<String, Vec<String>> = HashMap::new();
        for rel in &relations {
            let bucket = if strata.is_homostratal(&rel.type_id) {
                &mut homo
            } else {
                &mut hetero
            };
            bucket
                .entry(rel.object.clone())
                .or_default()
                .push(rel.subject.clone());
        }
        // Homostratal reading wins for depth purposes.
        hetero.retain(|id, _| !homo.contains_key(id));
        Self {
            relations,
            homostratal_neighbors: homo,
            heterostratal_neighbors: hetero,
        }
    }
}

/// Live knowledge-graph source. Authoritative but slow and rate-limited.
#[async_trait]
pub trait LiveSource: Send + Sync {
    /// Fetch full records for a set of ids. Unknown ids are skipped.
    async fn fetch_individuals(&self, ids: &[String]) -> Result<Vec<Individual>>;

    /// Fetch all relationship edges whose subject is one of `ids`, limited
    /// to the relation types in `strata`.
    async fn fetch_relations(&self, ids: &[String], strata: &StrataMap) -> Result<RelationBatch>;

    /// Resolve a partial name to candidate individuals.
    async fn search_by_name(&self, partial_name: &str) -> Result<Vec<Individual>>;
}

/// Parameters of a cache lookup.
#[derive(Debug, Clone)]
pub struct CacheRequest {
    pub person_id: String,
    pub depth: usize,
    /// Expand spouses of every frontier node, not only blood relatives.
    pub all_spouses: bool,
    /// Ids the session has already expanded; the cache skips re-expanding them.
    pub visited: Vec<String>,
}

/// Cache of previously crawled graph data. Fast but possibly stale.
#[async_trait]
pub trait CacheSource: Send + Sync {
    /// Look up a graph delta around `person_id`. An empty graph means a miss.
    async fn lookup(&self, request: &CacheRequest) -> Result<RelationGraph>;

    /// Write crawled data back so later sessions start warm. Never deletes.
    async fn store(&self, graph: &RelationGraph) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_classification() {
        let strata = StrataMap::default();
        let mut relations = HashSet::new();
        relations.insert(Relationship::new("WD-Q1", "WD-Q2", "father", "WD-P22"));
        relations.insert(Relationship::new("WD-Q1", "WD-Q3", "spouse", "WD-P26"));

        let batch = RelationBatch::from_relations(relations, &strata);
        assert!(batch.heterostratal_neighbors.contains_key("WD-Q2"));
        assert!(batch.homostratal_neighbors.contains_key("WD-Q3"));
        assert_eq!(batch.heterostratal_neighbors["WD-Q2"], vec!["WD-Q1"]);
    }

    #[test]
    fn test_homostratal_reading_wins() {
        let strata = StrataMap::default();
        let mut relations = HashSet::new();
        // Q2 reachable both as spouse and as child of Q1.
        relations.insert(Relationship::new("WD-Q1", "WD-Q2", "spouse", "WD-P26"));
        relations.insert(Relationship::new("WD-Q1", "WD-Q2", "child", "WD-P40"));

        let batch = RelationBatch::from_relations(relations, &strata);
        assert!(batch.homostratal_neighbors.contains_key("WD-Q2"));
        assert!(!batch.heterostratal_neighbors.contains_key("WD-Q2"));
        assert_eq!(batch.relations.len(), 2);
    }
}
