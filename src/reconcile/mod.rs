//! Dual-source reconciliation: race the relationship cache against the live
//! knowledge-graph source for the same expansion request.
//!
//! The cache is fast but possibly stale; the live source is authoritative
//! but slow and rate-limited. A non-empty cache delta is applied
//! optimistically as soon as it arrives. The live delta then either applies
//! (if it came first) or silently enriches individual records; when it
//! strictly dominates what the cache delivered it instead raises a "more
//! data available" signal and leaves the applied graph untouched.

use crate::crawler;
use crate::model::{RelationGraph, StrataMap};
use crate::source::{CacheRequest, CacheSource, LiveSource};
use crate::store;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// What a reconciliation run did, observable as at most two events.
#[derive(Debug)]
pub enum DeltaEvent {
    /// A delta was merged into the session graph.
    Applied {
        origin: Origin,
        /// Live data arriving before the cache is authoritative for the
        /// request; later cache data is ignored.
        authoritative: bool,
    },
    /// Individual records from the live delta were unioned in, but no
    /// relationships changed.
    Enriched,
    /// The live delta strictly dominates the applied cache delta; it was
    /// not merged, the caller decides when to apply it.
    MoreDataAvailable { delta: RelationGraph },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Live,
}

/// Reconciliation state machine, per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconcileState {
    AwaitingBoth,
    CacheApplied,
}

/// Parameters of one reconciled expansion.
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub person_id: String,
    pub depth: usize,
    pub all_spouses: bool,
    pub visited: Vec<String>,
}

/// Issue the cache lookup and the live crawl concurrently, merging results
/// into `graph` as they arrive. Returns a receiver of at most two
/// [`DeltaEvent`]s; the channel closes when the request is resolved.
///
/// All graph mutation happens behind the supplied mutex, so the two arrival
/// orders can never race destructively.
pub fn fetch_reconciled(
    graph: Arc<Mutex<RelationGraph>>,
    cache: Arc<dyn CacheSource>,
    live: Arc<dyn LiveSource>,
    strata: Arc<StrataMap>,
    request: ReconcileRequest,
) -> mpsc::Receiver<DeltaEvent> {
    let (tx, rx) = mpsc::channel(2);

    tokio::spawn(async move {
        run_reconcile(graph, cache, live, strata, request, tx).await;
    });

    rx
}

async fn run_reconcile(
    graph: Arc<Mutex<RelationGraph>>,
    cache: Arc<dyn CacheSource>,
    live: Arc<dyn LiveSource>,
    strata: Arc<StrataMap>,
    request: ReconcileRequest,
    tx: mpsc::Sender<DeltaEvent>,
) {
    let cache_request = CacheRequest {
        person_id: request.person_id.clone(),
        depth: request.depth,
        all_spouses: request.all_spouses,
        visited: request.visited.clone(),
    };
    let mut cache_task = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.lookup(&cache_request).await })
    };
    let mut live_task = {
        let live = Arc::clone(&live);
        let strata = Arc::clone(&strata);
        let visited: HashSet<String> = request.visited.iter().cloned().collect();
        let person_id = request.person_id.clone();
        let depth = request.depth;
        tokio::spawn(async move {
            crawler::expand(live.as_ref(), &person_id, depth, &visited, &strata)
                .await
                .graph
        })
    };

    let mut state = ReconcileState::AwaitingBoth;
    let mut cache_delta: Option<RelationGraph> = None;
    let mut cache_pending = true;

    loop {
        tokio::select! {
            cache_res = &mut cache_task, if cache_pending => {
                cache_pending = false;
                let delta = match cache_res {
                    Ok(Ok(delta)) => delta,
                    Ok(Err(e)) => {
                        log::warn!("cache lookup for {} failed: {}", request.person_id, e);
                        RelationGraph::new()
                    }
                    Err(e) => {
                        log::warn!("cache task for {} panicked: {}", request.person_id, e);
                        RelationGraph::new()
                    }
                };
                // Only a non-empty cache delta is worth applying optimistically;
                // an empty one keeps us awaiting the live source.
                if !delta.is_empty() {
                    let mut locked = graph.lock().await;
                    store::merge(&mut locked, delta.clone());
                    drop(locked);
                    state = ReconcileState::CacheApplied;
                    let _ = tx.send(DeltaEvent::Applied { origin: Origin::Cache, authoritative: false }).await;
                }
                cache_delta = Some(delta);
            }
            live_res = &mut live_task => {
                let delta = match live_res {
                    Ok(delta) => delta,
                    Err(e) => {
                        log::warn!("live crawl task for {} panicked: {}", request.person_id, e);
                        RelationGraph::new()
                    }
                };
                resolve_live(&graph, &cache, &tx, state, cache_delta.as_ref(), delta).await;
                // Live arrival resolves the request; a cache delta landing
                // after this point is ignored.
                return;
            }
        }
    }
}

async fn resolve_live(
    graph: &Arc<Mutex<RelationGraph>>,
    cache: &Arc<dyn CacheSource>,
    tx: &mpsc::Sender<DeltaEvent>,
    state: ReconcileState,
    cache_delta: Option<&RelationGraph>,
    delta: RelationGraph,
) {
    // Warm the cache for later sessions, best effort.
    if !delta.is_empty() {
        if let Err(e) = cache.store(&delta).await {
            log::warn!("cache write-back failed: {}", e);
        }
    }

    match state {
        ReconcileState::AwaitingBoth => {
            let mut locked = graph.lock().await;
            store::merge(&mut locked, delta);
            drop(locked);
            let _ = tx
                .send(DeltaEvent::Applied {
                    origin: Origin::Live,
                    authoritative: true,
                })
                .await;
        }
        ReconcileState::CacheApplied => {
            let empty = RelationGraph::new();
            let applied = cache_delta.unwrap_or(&empty);
            if delta.contains_more_data(applied) {
                let _ = tx.send(DeltaEvent::MoreDataAvailable { delta }).await;
            } else {
                // The live result adds nothing structural; union its records
                // as refreshed attributes without touching relationships.
                let mut locked = graph.lock().await;
                store::enrich_individuals(&mut locked, delta);
                drop(locked);
                let _ = tx.send(DeltaEvent::Enriched).await;
            }
        }
    }
}
