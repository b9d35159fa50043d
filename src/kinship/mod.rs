//! Kinship resolver: shortest relation paths from a root to every
//! reachable individual, rendered as human-readable labels.

use crate::model::RelationGraph;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// One shortest path of typed edges from the root to a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KinshipPath {
    /// Relationship type ids along the path, root first.
    pub path: Vec<String>,
    /// Human labels along the path, root first.
    pub relation: Vec<String>,
}

/// Compute every shortest relation path from `root_id`.
///
/// BFS over the relationship set as a directionally-labeled multigraph.
/// Because reciprocal edges are synthesized at merge time, following
/// subject-to-object edges reaches everything reachable. All equal-length
/// shortest paths are preserved (ambiguous kinship is legitimate output),
/// deduplicated by their type-id sequence. Edges to individuals missing
/// from the graph are skipped, not errors. Iteration order over the
/// relation map is deterministic, so tie-break order is stable.
pub fn resolve(root_id: &str, graph: &RelationGraph) -> HashMap<String, Vec<KinshipPath>> {
    let mut paths: HashMap<String, Vec<KinshipPath>> = HashMap::new();
    let mut dist: HashMap<String, usize> = HashMap::from([(root_id.to_string(), 0)]);
    let mut queue: VecDeque<String> = VecDeque::from([root_id.to_string()]);

    while let Some(current) = queue.pop_front() {
        let current_dist = dist[&current];
        let current_paths: Vec<KinshipPath> = match paths.get(&current) {
            Some(p) => p.clone(),
            None => vec![KinshipPath {
                path: Vec::new(),
                relation: Vec::new(),
            }],
        };

        for rel in graph.relations_of(&current) {
            let next = &rel.object;
            if next == root_id || !graph.items.contains_key(next) {
                continue;
            }
            let next_dist = current_dist + 1;
            match dist.get(next) {
                None => {
                    dist.insert(next.clone(), next_dist);
                    queue.push_back(next.clone());
                }
                Some(&d) if d == next_dist => {}
                // Already reached by a strictly shorter route.
                Some(_) => continue,
            }

            let entry = paths.entry(next.clone()).or_default();
            for base in &current_paths {
                let mut extended = base.clone();
                extended.path.push(rel.type_id.clone());
                extended.relation.push(rel.kind.clone());
                let duplicate = entry.iter().any(|p| p.path == extended.path);
                if !duplicate {
                    entry.push(extended);
                }
            }
        }
    }

    paths
}

/// Render a path as a target's-eye label: labels reversed and joined with
/// a connective, so `["father", "father"]` becomes "father of the father".
pub fn render_label(path: &KinshipPath) -> String {
    let mut labels: Vec<&str> = path.relation.iter().map(String::as_str).collect();
    labels.reverse();
    labels.join(" of the ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Individual, Relationship};
    use crate::store::merge;

    fn graph_of(people: &[&str], edges: &[(&str, &str, &str, &str)]) -> RelationGraph {
        let mut delta = RelationGraph::new();
        for id in people {
            delta.insert_individual(Individual::new(id, id));
        }
        for (s, o, kind, type_id) in edges {
            delta.insert_relationship(Relationship::new(s, o, kind, type_id));
        }
        let mut graph = RelationGraph::new();
        merge(&mut graph, delta);
        graph
    }

    #[test]
    fn test_grandfather_path_and_label() {
        let graph = graph_of(
            &["R", "F", "G"],
            &[
                ("R", "F", "father", "WD-P22"),
                ("F", "G", "father", "WD-P22"),
            ],
        );
        let kinships = resolve("R", &graph);
        let to_g = &kinships["G"];
        assert_eq!(to_g.len(), 1);
        assert_eq!(to_g[0].relation, vec!["father", "father"]);
        assert_eq!(render_label(&to_g[0]), "father of the father");
    }

    #[test]
    fn test_multiple_shortest_paths_preserved() {
        // Both the father and the mother lead to the same ancestor.
        let graph = graph_of(
            &["R", "F", "M", "G"],
            &[
                ("R", "F", "father", "WD-P22"),
                ("R", "M", "mother", "WD-P25"),
                ("F", "G", "father", "WD-P22"),
                ("M", "G", "father", "WD-P22"),
            ],
        );
        let kinships = resolve("R", &graph);
        let to_g = &kinships["G"];
        assert_eq!(to_g.len(), 2);
        let labels: Vec<String> = to_g.iter().map(render_label).collect();
        assert!(labels.contains(&"father of the father".to_string()));
        assert!(labels.contains(&"father of the mother".to_string()));
    }

    #[test]
    fn test_longer_paths_not_reported() {
        let graph = graph_of(
            &["R", "F", "G"],
            &[
                ("R", "F", "father", "WD-P22"),
                ("F", "G", "father", "WD-P22"),
                // Direct shortcut: G is also recorded as R's father.
                ("R", "G", "father", "WD-P22"),
            ],
        );
        let kinships = resolve("R", &graph);
        let to_g = &kinships["G"];
        assert!(to_g.iter().all(|p| p.path.len() == 1));
    }

    #[test]
    fn test_monotone_under_growth() {
        let mut graph = graph_of(
            &["R", "F", "G"],
            &[
                ("R", "F", "father", "WD-P22"),
                ("F", "G", "father", "WD-P22"),
            ],
        );
        let before = resolve("R", &graph);
        assert_eq!(before["G"][0].path.len(), 2);

        // Growth adds a strictly shorter route to G.
        let mut delta = RelationGraph::new();
        delta.insert_individual(Individual::new("R", "R"));
        delta.insert_individual(Individual::new("G", "G"));
        delta.insert_relationship(Relationship::new("R", "G", "father", "WD-P22"));
        merge(&mut graph, delta);

        let after = resolve("R", &graph);
        assert!(after["G"][0].path.len() <= before["G"][0].path.len());
        assert_eq!(after["G"][0].path.len(), 1);
    }

    #[test]
    fn test_dangling_endpoint_skipped() {
        let mut graph = graph_of(&["R", "F"], &[("R", "F", "father", "WD-P22")]);
        // Inject a stale edge pointing outside the graph.
        graph
            .relations
            .entry("F".to_string())
            .or_default()
            .push(Relationship::new("F", "GONE", "father", "WD-P22"));

        let kinships = resolve("R", &graph);
        assert!(kinships.contains_key("F"));
        assert!(!kinships.contains_key("GONE"));
    }

    #[test]
    fn test_unreachable_absent_from_result() {
        let graph = graph_of(&["R", "X"], &[]);
        let kinships = resolve("R", &graph);
        assert!(!kinships.contains_key("X"));
        assert!(!kinships.contains_key("R"));
    }
}
