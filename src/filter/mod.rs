//! Visibility filter engine.
//!
//! Derives a displayable subgraph from the accumulated graph and the active
//! filter predicates, keeping "outlier" in-laws that bridge two included
//! branches so the visible graph stays connected. Pure: same graph and
//! filters always produce the same output.

mod model;

pub use model::{FilterModel, TextFilter};

use crate::model::{props, Individual, RelationGraph};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Rendering emphasis for a visible individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Normal,
    /// Included only to preserve connectivity; rendered dimmed.
    Outlier,
    /// Excluded but kept in the graph for dimmed rendering.
    Hidden,
}

/// A filtered view over the accumulated graph.
#[derive(Debug, Clone)]
pub struct VisibleGraph {
    pub graph: RelationGraph,
    pub visibility: HashMap<String, Visibility>,
}

impl VisibleGraph {
    pub fn visibility_of(&self, id: &str) -> Option<Visibility> {
        self.visibility.get(id).copied()
    }
}

/// Derive the visible subgraph for `root` under the given filters.
pub fn apply_filters(graph: &RelationGraph, filters: &FilterModel, root: &str) -> VisibleGraph {
    if !filters.is_active() {
        let visibility = graph
            .items
            .keys()
            .map(|id| (id.clone(), Visibility::Normal))
            .collect();
        return VisibleGraph {
            graph: graph.clone(),
            visibility,
        };
    }

    // BTreeMap so the outlier closure walks in a stable order.
    let mut included: BTreeMap<String, Visibility> = BTreeMap::new();
    included.insert(root.to_string(), Visibility::Normal);

    if filters.bloodline {
        bloodline_walk(graph, root, &mut included);
    } else {
        for id in graph.items.keys() {
            included.insert(id.clone(), Visibility::Normal);
        }
    }

    if filters.filter_by_family {
        family_extension_filter(graph, filters, &mut included);
    } else {
        for (pid, filter) in &filters.text_filters {
            if filter.is_active() {
                included.retain(|id, _| {
                    graph
                        .items
                        .get(id)
                        .map(|p| p.property_values(pid).any(|v| filter.choice.contains(v)))
                        .unwrap_or(false)
                });
            }
        }
    }

    // Birth-year range: an individual without a date of birth fails.
    if filters.from_year.is_some() || filters.to_year.is_some() {
        included.retain(|id, _| {
            let Some(year) = graph.items.get(id).and_then(Individual::birth_year) else {
                return false;
            };
            filters.from_year.map_or(true, |from| year >= from)
                && filters.to_year.map_or(true, |to| year <= to)
        });
    }

    for id in &filters.always_shown_people {
        included.insert(id.clone(), Visibility::Normal);
    }

    outlier_closure(graph, &mut included);

    if filters.remove_hidden_people {
        for id in &filters.hidden_people {
            included.remove(id);
        }
    } else {
        for id in &filters.hidden_people {
            included.insert(id.clone(), Visibility::Hidden);
        }
    }

    assemble(graph, included)
}

/// Two-queue bloodline walk: ancestors are explored level by level before
/// descendants, so blood relatives come out `Normal` while parents reached
/// only through a descendant are tagged `Outlier`.
fn bloodline_walk(graph: &RelationGraph, root: &str, included: &mut BTreeMap<String, Visibility>) {
    let mut ancestors: VecDeque<String> = VecDeque::from([root.to_string()]);
    let mut descendants: VecDeque<String> = VecDeque::new();

    loop {
        if let Some(current) = ancestors.pop_front() {
            for rel in graph.relations_of(&current) {
                if rel.kind == "spouse" || included.get(&rel.object) == Some(&Visibility::Normal) {
                    continue;
                }
                included.insert(rel.object.clone(), Visibility::Normal);
                if rel.kind == "child" {
                    descendants.push_back(rel.object.clone());
                } else {
                    ancestors.push_back(rel.object.clone());
                }
            }
        } else if let Some(current) = descendants.pop_front() {
            for rel in graph.relations_of(&current) {
                if rel.kind != "child" || included.get(&rel.object) == Some(&Visibility::Normal) {
                    continue;
                }
                included.insert(rel.object.clone(), Visibility::Normal);
                descendants.push_back(rel.object.clone());
            }
            // A descendant's other parent is kept for context, dimmed.
            for rel in graph.relations_of(&current) {
                if (rel.kind == "father" || rel.kind == "mother")
                    && !included.contains_key(&rel.object)
                {
                    included.insert(rel.object.clone(), Visibility::Outlier);
                }
            }
        } else {
            break;
        }
    }
}

/// Family-extension semantics: the families of everyone passing the active
/// text filters extend the family criterion, then membership in one of those
/// families (or having no family at all, when no text choice is active)
/// decides inclusion.
fn family_extension_filter(
    graph: &RelationGraph,
    filters: &FilterModel,
    included: &mut BTreeMap<String, Visibility>,
) {
    let mut matched_families: BTreeSet<String> = BTreeSet::new();
    let mut no_active_choice = true;

    for id in included.keys() {
        let Some(person) = graph.items.get(id) else {
            continue;
        };
        let mut satisfied = true;
        for (pid, filter) in &filters.text_filters {
            if filter.is_active() {
                no_active_choice = false;
                if !person.property_values(pid).any(|v| filter.choice.contains(v)) {
                    satisfied = false;
                    break;
                }
            }
        }
        if satisfied {
            for family in person.property_values(props::FAMILY) {
                matched_families.insert(family.to_string());
            }
        }
    }

    if matched_families.is_empty() {
        return;
    }

    included.retain(|id, _| {
        let Some(person) = graph.items.get(id) else {
            return false;
        };
        let mut families = person.property_values(props::FAMILY).peekable();
        if families.peek().is_none() {
            return no_active_choice;
        }
        families.any(|f| matched_families.contains(f))
    });
}

/// Outlier closure: repeatedly admit anyone who has both a qualifying
/// parent edge and a qualifying spouse edge into the included set, tagged
/// `Outlier`, so chains of in-laws bridging two included branches stay
/// visible. Each pass only adds nodes bridging already-included nodes, so
/// the iteration terminates.
fn outlier_closure(graph: &RelationGraph, included: &mut BTreeMap<String, Visibility>) {
    let mut frontier: BTreeSet<String> = included.keys().cloned().collect();

    loop {
        let mut parent_candidates: BTreeSet<String> = BTreeSet::new();
        let mut spouse_candidates: BTreeSet<String> = BTreeSet::new();
        let mut exhausted: Vec<String> = Vec::new();

        for id in &frontier {
            let fresh: Vec<_> = graph
                .relations_of(id)
                .iter()
                .filter(|r| r.kind != "child" && !included.contains_key(&r.object))
                .collect();
            if fresh.is_empty() {
                exhausted.push(id.clone());
                continue;
            }
            for rel in fresh {
                if rel.kind == "spouse" {
                    spouse_candidates.insert(rel.object.clone());
                } else {
                    parent_candidates.insert(rel.object.clone());
                }
            }
        }

        for id in exhausted {
            frontier.remove(&id);
        }

        let bridges: BTreeSet<String> = parent_candidates
            .intersection(&spouse_candidates)
            .cloned()
            .collect();
        if bridges.is_empty() || frontier.is_empty() {
            break;
        }
        for id in bridges {
            included
                .entry(id.clone())
                .or_insert(Visibility::Outlier);
            frontier.insert(id);
        }
    }
}

fn assemble(graph: &RelationGraph, included: BTreeMap<String, Visibility>) -> VisibleGraph {
    let mut visible = RelationGraph::new();
    visible.targets = graph.targets.clone();
    let mut visibility = HashMap::new();

    for (id, tag) in &included {
        if let Some(person) = graph.items.get(id) {
            visible.insert_individual(person.clone());
            visibility.insert(id.clone(), *tag);
        }
    }
    for (id, _) in &included {
        for rel in graph.relations_of(id) {
            if visibility.contains_key(&rel.object) && visibility.contains_key(&rel.subject) {
                visible.insert_relationship(rel.clone());
            }
        }
    }

    VisibleGraph {
        graph: visible,
        visibility,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Property, Relationship};
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

    fn add_property(graph: &mut RelationGraph, id: &str, pid: &str, label: &str, value: &str) {
        graph
            .items
            .get_mut(id)
            .unwrap()
            .properties
            .push(Property::new(pid, label, value));
    }

    #[test]
    fn test_no_active_filter_is_identity() {
        let graph = graph_of(&["R", "F"], &[("R", "F", "father", "WD-P22")]);
        let visible = apply_filters(&graph, &FilterModel::new(), "R");
        assert_eq!(visible.graph, graph);
        assert!(visible
            .visibility
            .values()
            .all(|&v| v == Visibility::Normal));
    }

    #[test]
    fn test_pure_function() {
        let graph = graph_of(&["R", "F"], &[("R", "F", "father", "WD-P22")]);
        let mut filters = FilterModel::new();
        filters.bloodline = true;
        let a = apply_filters(&graph, &filters, "R");
        let b = apply_filters(&graph, &filters, "R");
        assert_eq!(a.graph, b.graph);
        assert_eq!(
            a.visibility.get("F").copied(),
            b.visibility.get("F").copied()
        );
    }

    #[test]
    fn test_bloodline_excludes_unrelated_spouse_branch() {
        // R's spouse S is not blood; S's father X certainly not.
        let graph = graph_of(
            &["R", "F", "S", "X"],
            &[
                ("R", "F", "father", "WD-P22"),
                ("R", "S", "spouse", "WD-P26"),
                ("S", "X", "father", "WD-P22"),
            ],
        );
        let mut filters = FilterModel::new();
        filters.bloodline = true;
        let visible = apply_filters(&graph, &filters, "R");
        assert!(visible.visibility.contains_key("F"));
        assert!(!visible.visibility.contains_key("X"));
    }

    #[test]
    fn test_bloodline_descendant_other_parent_is_outlier() {
        // R's child C has another parent M; M is context, not bloodline.
        let graph = graph_of(
            &["R", "C", "M"],
            &[
                ("R", "C", "child", "WD-P40"),
                ("C", "M", "mother", "WD-P25"),
            ],
        );
        let mut filters = FilterModel::new();
        filters.bloodline = true;
        let visible = apply_filters(&graph, &filters, "R");
        assert_eq!(visible.visibility_of("C"), Some(Visibility::Normal));
        assert_eq!(visible.visibility_of("M"), Some(Visibility::Outlier));
    }

    #[test]
    fn test_outlier_bridge_spouse_included_iff_bridging() {
        // S bridges R (spouse) and G (parent edge S->G is "father" of S?
        // here: S is spouse of R and has a parent edge to included C).
        let graph = graph_of(
            &["R", "C", "S"],
            &[
                ("R", "C", "child", "WD-P40"),
                ("R", "S", "spouse", "WD-P26"),
                ("C", "S", "mother", "WD-P25"),
            ],
        );
        let mut filters = FilterModel::new();
        filters.bloodline = true;
        let visible = apply_filters(&graph, &filters, "R");
        // S is reached as C's other parent and as R's spouse.
        assert_eq!(visible.visibility_of("S"), Some(Visibility::Outlier));

        // Remove the grandchild bridge: S no longer qualifies.
        let graph2 = graph_of(
            &["R", "S", "F"],
            &[
                ("R", "S", "spouse", "WD-P26"),
                ("R", "F", "father", "WD-P22"),
            ],
        );
        let visible2 = apply_filters(&graph2, &filters, "R");
        assert_eq!(visible2.visibility_of("S"), None);
    }

    #[test]
    fn test_year_filter_missing_dob_fails() {
        let mut graph = graph_of(&["R", "A", "B"], &[]);
        add_property(
            &mut graph,
            "A",
            props::DATE_OF_BIRTH,
            "date of birth",
            "1850-01-01T00:00:00Z",
        );
        add_property(
            &mut graph,
            "B",
            props::DATE_OF_BIRTH,
            "date of birth",
            "1700-01-01T00:00:00Z",
        );
        let mut filters = FilterModel::new();
        filters.from_year = Some(1800);
        let visible = apply_filters(&graph, &filters, "R");
        assert!(visible.visibility.contains_key("A"));
        assert!(!visible.visibility.contains_key("B"));
        // R has no date of birth: excluded, not vacuously passing. The root
        // stays in `included` initially but fails the year check.
        assert!(!visible.visibility.contains_key("R"));
    }

    #[test]
    fn test_text_filter_membership() {
        let mut graph = graph_of(&["R", "A", "B"], &[]);
        add_property(&mut graph, "A", props::OCCUPATION, "occupation", "painter");
        add_property(&mut graph, "B", props::OCCUPATION, "occupation", "baker");
        let mut filters = FilterModel::new();
        filters
            .text_filters
            .entry(props::OCCUPATION.to_string())
            .or_default()
            .choice
            .insert("painter".to_string());
        let visible = apply_filters(&graph, &filters, "R");
        assert!(visible.visibility.contains_key("A"));
        assert!(!visible.visibility.contains_key("B"));
        assert!(!visible.visibility.contains_key("R")); // no occupation at all
    }

    #[test]
    fn test_family_extension() {
        let mut graph = graph_of(&["R", "A", "B", "C"], &[]);
        add_property(&mut graph, "A", props::OCCUPATION, "occupation", "painter");
        add_property(&mut graph, "A", props::FAMILY, "family", "House A");
        add_property(&mut graph, "B", props::FAMILY, "family", "House A");
        add_property(&mut graph, "C", props::FAMILY, "family", "House B");

        let mut filters = FilterModel::new();
        filters.filter_by_family = true;
        filters
            .text_filters
            .entry(props::OCCUPATION.to_string())
            .or_default()
            .choice
            .insert("painter".to_string());

        let visible = apply_filters(&graph, &filters, "R");
        // A matches the occupation; B shares A's family; C does not.
        assert!(visible.visibility.contains_key("A"));
        assert!(visible.visibility.contains_key("B"));
        assert!(!visible.visibility.contains_key("C"));
        // R has no family and a text choice is active: excluded.
        assert!(!visible.visibility.contains_key("R"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut graph = graph_of(&["R", "A", "B"], &[]);
        add_property(&mut graph, "A", props::OCCUPATION, "occupation", "painter");
        add_property(&mut graph, "B", props::OCCUPATION, "occupation", "painter");

        let mut filters = FilterModel::new();
        filters
            .text_filters
            .entry(props::OCCUPATION.to_string())
            .or_default()
            .choice
            .insert("painter".to_string());
        // R fails the text filter but is pinned; B passes but is hidden.
        filters.always_shown_people.insert("R".to_string());
        filters.hidden_people.insert("B".to_string());

        let visible = apply_filters(&graph, &filters, "R");
        assert_eq!(visible.visibility_of("R"), Some(Visibility::Normal));
        assert_eq!(visible.visibility_of("B"), Some(Visibility::Hidden));

        filters.remove_hidden_people = true;
        let visible = apply_filters(&graph, &filters, "R");
        assert!(!visible.visibility.contains_key("B"));
        assert!(visible
            .graph
            .all_relationships()
            .all(|r| r.object != "B" && r.subject != "B"));
    }

    #[test]
    fn test_filter_exhaustion_yields_empty_graph() {
        let graph = graph_of(&["R", "A"], &[]);
        let mut filters = FilterModel::new();
        filters
            .text_filters
            .entry(props::OCCUPATION.to_string())
            .or_default()
            .choice
            .insert("astronaut".to_string());
        let visible = apply_filters(&graph, &filters, "R");
        assert!(visible.graph.items.is_empty());
    }
}
