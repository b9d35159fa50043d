//! Bounded breadth-first crawler over the live knowledge-graph source.
//!
//! Expands a person's relationship graph by generational strata: same-
//! generation (homostratal) hops keep the current depth, adjacent-generation
//! (heterostratal) hops increase it by one. The crawl stops at the depth
//! limit and treats source failures within a round as empty results, so a
//! partial graph is an expected outcome, never an error.

use crate::model::{RelationGraph, StrataMap};
use crate::source::{LiveSource, RelationBatch};
use std::collections::{HashMap, HashSet};

/// Output of one bounded expansion.
#[derive(Debug, Default)]
pub struct CrawlResult {
    /// Newly discovered individuals and relationships, as a mergeable delta.
    pub graph: RelationGraph,
    /// Generational depth per resolved individual.
    pub depths: HashMap<String, usize>,
}

/// Expand the graph around `root_id` up to `depth_limit` generations.
///
/// `already_visited` ids are never re-expanded. A relationship is kept only
/// when its discovered endpoint will itself be resolved (is visited or in
/// the next frontier), so the delta never contains fragments with no path
/// back to the root.
pub async fn expand(
    source: &dyn LiveSource,
    root_id: &str,
    depth_limit: usize,
    already_visited: &HashSet<String>,
    strata: &StrataMap,
) -> CrawlResult {
    let mut visited = already_visited.clone();
    let mut frontier: HashMap<String, usize> = HashMap::from([(root_id.to_string(), 0)]);
    let mut result = CrawlResult::default();
    let mut first_round = true;

    while !frontier.is_empty() {
        let ids: Vec<String> = frontier.keys().cloned().collect();

        // Individual records and relationship edges are independent reads.
        let (people, batch) = tokio::join!(
            source.fetch_individuals(&ids),
            source.fetch_relations(&ids, strata),
        );

        let people = people.unwrap_or_else(|e| {
            log::warn!("crawl round: individual fetch failed, continuing without: {}", e);
            Vec::new()
        });
        let batch = batch.unwrap_or_else(|e| {
            log::warn!("crawl round: relation fetch failed, continuing without: {}", e);
            RelationBatch::default()
        });

        for person in people {
            if let Some(&depth) = frontier.get(&person.id) {
                result.depths.insert(person.id.clone(), depth);
            }
            if first_round {
                result.graph.targets.push(person.clone());
            }
            result.graph.insert_individual(person);
        }
        first_round = false;

        // Every frontier id counts as expanded now, resolved or not.
        visited.extend(frontier.keys().cloned());

        let next_frontier = next_frontier(&frontier, &batch, &visited, depth_limit);

        // The subject of every fetched edge was just expanded; retention
        // hinges on whether the discovered endpoint will ever be resolved.
        for rel in batch.relations {
            if visited.contains(&rel.object) || next_frontier.contains_key(&rel.object) {
                result.graph.insert_relationship(rel);
            }
        }

        frontier = next_frontier;
    }

    log::debug!(
        "crawl from {} (limit {}): {} individuals, {} relationships",
        root_id,
        depth_limit,
        result.graph.individual_count(),
        result.graph.relationship_count()
    );
    result
}

/// Candidate depth rules: a homostratal neighbor inherits the minimum depth
/// of the frontier nodes it touches; a heterostratal neighbor gets that
/// minimum plus one. Visited and over-limit candidates are dropped.
fn next_frontier(
    frontier: &HashMap<String, usize>,
    batch: &RelationBatch,
    visited: &HashSet<String>,
    depth_limit: usize,
) -> HashMap<String, usize> {
    let mut next = HashMap::new();

    let mut admit = |id: &String, neighbors: &Vec<String>, bump: usize| {
        if visited.contains(id) {
            return;
        }
        let min_depth = neighbors
            .iter()
            .filter_map(|n| frontier.get(n))
            .min()
            .copied();
        if let Some(depth) = min_depth {
            let candidate = depth + bump;
            if candidate <= depth_limit {
                next.entry(id.clone())
                    .and_modify(|d: &mut usize| *d = (*d).min(candidate))
                    .or_insert(candidate);
            }
        }
    };

    for (id, neighbors) in &batch.homostratal_neighbors {
        admit(id, neighbors, 0);
    }
    for (id, neighbors) in &batch.heterostratal_neighbors {
        admit(id, neighbors, 1);
    }

    next
}
