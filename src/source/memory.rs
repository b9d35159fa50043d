//! In-memory source and cache implementations.
//!
//! Back the demo binaries and the engine tests with explicit individual and
//! edge tables, with optional artificial latency and failure injection to
//! exercise the reconciliation paths.

use super::{CacheRequest, CacheSource, LiveSource, RelationBatch};
use crate::error::{AncestaError, Result};
use crate::model::{Individual, RelationGraph, Relationship, StrataMap};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A `LiveSource` over fixed tables.
#[derive(Debug, Default)]
pub struct MemorySource {
    individuals: HashMap<String, Individual>,
    edges: Vec<Relationship>,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn add_individual(&mut self, individual: Individual) {
        self.individuals.insert(individual.id.clone(), individual);
    }

    pub fn add_edge(&mut self, subject: &str, object: &str, kind: &str, type_id: &str) {
        self.edges
            .push(Relationship::new(subject, object, kind, type_id));
    }

    /// Make every subsequent call fail with a source error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn gate(&self) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AncestaError::Source("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LiveSource for MemorySource {
    async fn fetch_individuals(&self, ids: &[String]) -> Result<Vec<Individual>> {
        self.gate().await?;
        Ok(ids
            .iter()
            .filter_map(|id| self.individuals.get(id).cloned())
            .collect())
    }

    async fn fetch_relations(&self, ids: &[String], strata: &StrataMap) -> Result<RelationBatch> {
        self.gate().await?;
        let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let relations: HashSet<Relationship> = self
            .edges
            .iter()
            .filter(|r| id_set.contains(r.subject.as_str()) && strata.classify(&r.type_id).is_some())
            .cloned()
            .collect();
        Ok(RelationBatch::from_relations(relations, strata))
    }

    async fn search_by_name(&self, partial_name: &str) -> Result<Vec<Individual>> {
        self.gate().await?;
        let needle = partial_name.to_lowercase();
        let mut matches: Vec<Individual> = self
            .individuals
            .values()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.alias
                        .as_deref()
                        .is_some_and(|a| a.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }
}

/// A `CacheSource` holding one pre-seeded graph delta.
#[derive(Debug, Default)]
pub struct MemoryCache {
    graph: Mutex<RelationGraph>,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(graph: RelationGraph) -> Self {
        Self {
            graph: Mutex::new(graph),
            failing: AtomicBool::new(false),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of the cached graph, for assertions.
    pub fn contents(&self) -> RelationGraph {
        self.graph.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheSource for MemoryCache {
    async fn lookup(&self, _request: &CacheRequest) -> Result<RelationGraph> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AncestaError::Source("simulated cache outage".to_string()));
        }
        Ok(self.graph.lock().unwrap().clone())
    }

    async fn store(&self, graph: &RelationGraph) -> Result<()> {
        let mut cached = self.graph.lock().unwrap();
        crate::store::merge(&mut cached, graph.clone());
        Ok(())
    }
}
