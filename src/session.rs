//! Session: the single owner of the accumulated graph and filter model.
//!
//! Every mutation of the graph goes through the session's mutex, so the
//! reconciler's racing sources and caller-driven prunes can never interleave
//! destructively. Reads hand out cloned snapshots rather than references
//! into a graph that might be mid-merge.

use crate::config::CrawlConfig;
use crate::error::{AncestaError, Result};
use crate::filter::{self, FilterModel, VisibleGraph};
use crate::kinship::{self, KinshipPath};
use crate::model::{RelationGraph, StrataMap};
use crate::reconcile::{self, DeltaEvent, ReconcileRequest};
use crate::source::{CacheSource, LiveSource};
use crate::store;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;

/// Result of one expansion request.
#[derive(Debug)]
pub enum ExpandOutcome {
    /// New data was merged into the graph.
    Applied,
    /// A strictly larger live delta is held back, waiting for the caller to
    /// apply it explicitly.
    MoreDataAvailable(RelationGraph),
    /// An expansion for this node is already in flight.
    AlreadyLoading,
    /// This node is known to be fully expanded; no query was issued.
    NothingNew,
}

pub struct Session {
    root_id: String,
    graph: Arc<Mutex<RelationGraph>>,
    filters: StdMutex<FilterModel>,
    live: Arc<dyn LiveSource>,
    cache: Arc<dyn CacheSource>,
    strata: Arc<StrataMap>,
    crawl: CrawlConfig,
    pending: StdMutex<HashSet<String>>,
    extend_impossible: StdMutex<HashSet<String>>,
}

impl Session {
    pub fn new(
        root_id: &str,
        live: Arc<dyn LiveSource>,
        cache: Arc<dyn CacheSource>,
        strata: StrataMap,
        crawl: CrawlConfig,
    ) -> Self {
        Self {
            root_id: root_id.to_string(),
            graph: Arc::new(Mutex::new(RelationGraph::new())),
            filters: StdMutex::new(FilterModel::new()),
            live,
            cache,
            strata: Arc::new(strata),
            crawl,
            pending: StdMutex::new(HashSet::new()),
            extend_impossible: StdMutex::new(HashSet::new()),
        }
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// Initial load of the session root at the configured depth.
    ///
    /// The one case where an empty result is an error: a root the sources
    /// have never heard of surfaces as `PersonNotFound`.
    pub async fn load_root(&self) -> Result<ExpandOutcome> {
        let outcome = self.expand(&self.root_id.clone(), self.crawl.initial_depth).await?;
        let graph = self.graph.lock().await;
        if !graph.items.contains_key(&self.root_id) {
            return Err(AncestaError::PersonNotFound(self.root_id.clone()));
        }
        Ok(outcome)
    }

    /// Extend the graph around an already-displayed node.
    pub async fn extend(&self, person_id: &str) -> Result<ExpandOutcome> {
        self.expand(person_id, self.crawl.extension_depth).await
    }

    async fn expand(&self, person_id: &str, depth: usize) -> Result<ExpandOutcome> {
        if self
            .extend_impossible
            .lock()
            .map_err(|_| AncestaError::InvalidInput("session state poisoned".to_string()))?
            .contains(person_id)
        {
            log::debug!("expand {}: known exhausted, skipping", person_id);
            return Ok(ExpandOutcome::NothingNew);
        }
        {
            let mut pending = self
                .pending
                .lock()
                .map_err(|_| AncestaError::InvalidInput("session state poisoned".to_string()))?;
            if !pending.insert(person_id.to_string()) {
                log::debug!("expand {}: already in flight", person_id);
                return Ok(ExpandOutcome::AlreadyLoading);
            }
        }

        let outcome = self.expand_inner(person_id, depth).await;

        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(person_id);
        }
        outcome
    }

    async fn expand_inner(&self, person_id: &str, depth: usize) -> Result<ExpandOutcome> {
        let (before_people, before_edges, visited) = {
            let graph = self.graph.lock().await;
            let visited = graph
                .items
                .keys()
                .filter(|id| id.as_str() != person_id)
                .cloned()
                .collect();
            (graph.individual_count(), graph.relationship_count(), visited)
        };

        let request = ReconcileRequest {
            person_id: person_id.to_string(),
            depth,
            all_spouses: true,
            visited,
        };
        let mut events = reconcile::fetch_reconciled(
            Arc::clone(&self.graph),
            Arc::clone(&self.cache),
            Arc::clone(&self.live),
            Arc::clone(&self.strata),
            request,
        );

        let mut held_back: Option<RelationGraph> = None;
        while let Some(event) = events.recv().await {
            if let DeltaEvent::MoreDataAvailable { delta } = event {
                held_back = Some(delta);
            }
        }
        if let Some(delta) = held_back {
            return Ok(ExpandOutcome::MoreDataAvailable(delta));
        }

        let graph = self.graph.lock().await;
        let grew = graph.individual_count() > before_people
            || graph.relationship_count() > before_edges;
        drop(graph);

        if grew {
            Ok(ExpandOutcome::Applied)
        } else {
            if let Ok(mut exhausted) = self.extend_impossible.lock() {
                exhausted.insert(person_id.to_string());
            }
            log::info!("expand {}: nothing new, marking exhausted", person_id);
            Ok(ExpandOutcome::NothingNew)
        }
    }

    /// Merge a held-back delta (from [`ExpandOutcome::MoreDataAvailable`]).
    pub async fn apply_delta(&self, delta: RelationGraph) {
        let mut graph = self.graph.lock().await;
        store::merge(&mut graph, delta);
    }

    /// Consistent clone of the accumulated graph.
    pub async fn snapshot(&self) -> RelationGraph {
        self.graph.lock().await.clone()
    }

    pub fn filters(&self) -> FilterModel {
        match self.filters.lock() {
            Ok(filters) => filters.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update_filters<F: FnOnce(&mut FilterModel)>(&self, update: F) {
        if let Ok(mut filters) = self.filters.lock() {
            update(&mut filters);
        }
    }

    /// Refresh each text filter's offered choices from the current graph.
    pub async fn refresh_filter_options(&self, property_ids: &[String]) {
        let snapshot = self.snapshot().await;
        if let Ok(mut filters) = self.filters.lock() {
            filters.collect_options(&snapshot, property_ids);
        }
    }

    /// The accumulated graph through the session's filter model.
    pub async fn visible_graph(&self) -> VisibleGraph {
        let snapshot = self.snapshot().await;
        let filters = self.filters();
        filter::apply_filters(&snapshot, &filters, &self.root_id)
    }

    /// Drop everything the current filters exclude. The root survives
    /// regardless; exhaustion marks for dropped nodes are cleared so they
    /// can be re-expanded if they come back.
    pub async fn prune_to_visible(&self) {
        let visible = self.visible_graph().await;
        let keep: HashSet<String> = visible.graph.items.keys().cloned().collect();
        let mut graph = self.graph.lock().await;
        store::prune(&mut graph, |person| keep.contains(&person.id), &self.root_id);
        let remaining: HashSet<String> = graph.items.keys().cloned().collect();
        drop(graph);
        if let Ok(mut exhausted) = self.extend_impossible.lock() {
            exhausted.retain(|id| remaining.contains(id));
        }
    }

    /// Kinship labels from the session root over the current snapshot.
    pub async fn resolve_kinships(&self) -> HashMap<String, Vec<KinshipPath>> {
        let snapshot = self.snapshot().await;
        kinship::resolve(&self.root_id, &snapshot)
    }
}
