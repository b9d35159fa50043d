//! Relationship store merger: the only mutators of the accumulated graph.
//!
//! `merge` unions a delta into the session graph (idempotent, additive);
//! `prune` is the single legal deletion path.

use crate::model::{strata, Individual, RelationGraph, Relationship};

/// Merge a delta into the accumulated graph.
///
/// Individuals union by id, right-biased: the delta's record wins on field
/// collisions, but properties already known are retained. Relationships
/// union as edge-tuple sets. Edges referencing an individual absent from the
/// merged graph (e.g. from a stale cache) are dropped rather than failing
/// the merge. Missing reciprocal edges are synthesized before returning.
pub fn merge(graph: &mut RelationGraph, delta: RelationGraph) {
    if graph.targets.is_empty() {
        graph.targets = delta.targets;
    }

    for (id, incoming) in delta.items {
        match graph.items.remove(&id) {
            Some(existing) => {
                let mut merged = incoming;
                merged.absorb_properties(&existing.properties);
                graph.items.insert(id, merged);
            }
            None => {
                graph.items.insert(id, incoming);
            }
        }
    }

    let mut dropped = 0usize;
    for rel in delta.relations.into_values().flatten() {
        if graph.items.contains_key(&rel.subject) && graph.items.contains_key(&rel.object) {
            graph.insert_relationship(rel);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        log::debug!("merge: dropped {} dangling relationships", dropped);
    }

    synthesize_reciprocals(graph);
}

/// Assert the inverse of every heterostratal edge (and symmetric spouse
/// edges) that is not already present.
pub fn synthesize_reciprocals(graph: &mut RelationGraph) {
    let candidates: Vec<Relationship> = graph
        .all_relationships()
        .filter(|rel| !strata::has_reciprocal(rel, graph.relations_of(&rel.object)))
        .cloned()
        .collect();

    for rel in candidates {
        let subject = graph.items.get(&rel.subject);
        if let Some(inverse) = strata::reciprocal(&rel, subject) {
            graph.insert_relationship(inverse);
        }
    }
}

/// Union the delta's individual records only, leaving relationships alone.
///
/// Used when a live result adds no structure over what is already applied
/// but may carry fresher names, descriptions, or properties.
pub fn enrich_individuals(graph: &mut RelationGraph, delta: RelationGraph) {
    for (id, incoming) in delta.items {
        if let Some(existing) = graph.items.remove(&id) {
            let mut merged = incoming;
            merged.absorb_properties(&existing.properties);
            graph.items.insert(id, merged);
        }
    }
}

/// Remove every individual failing `keep` (the root is never removable) and
/// every relationship left with a missing endpoint.
pub fn prune<F>(graph: &mut RelationGraph, keep: F, root: &str)
where
    F: Fn(&Individual) -> bool,
{
    let before = graph.individual_count();
    graph.items.retain(|id, person| id == root || keep(person));
    let items = &graph.items;
    graph.relations.retain(|subject, _| items.contains_key(subject));
    for edges in graph.relations.values_mut() {
        edges.retain(|rel| items.contains_key(&rel.object));
    }
    graph.relations.retain(|_, edges| !edges.is_empty());
    log::info!(
        "prune: {} -> {} individuals",
        before,
        graph.individual_count()
    );
}
