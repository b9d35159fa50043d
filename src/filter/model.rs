//! Serializable filter model.

use crate::model::RelationGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One attribute-membership filter: the selected values and the full set of
/// values present in the graph (offered as choices).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFilter {
    #[serde(default)]
    pub choice: BTreeSet<String>,
    #[serde(default)]
    pub all: BTreeSet<String>,
}

impl TextFilter {
    pub fn is_active(&self) -> bool {
        !self.choice.is_empty()
    }
}

/// The set of independent filter predicates for a session.
///
/// Rebuilt views derive from this model and the accumulated graph; the
/// model itself is what gets persisted between sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterModel {
    #[serde(default)]
    pub bloodline: bool,
    #[serde(default)]
    pub filter_by_family: bool,
    #[serde(default)]
    pub remove_hidden_people: bool,
    #[serde(default)]
    pub from_year: Option<i32>,
    #[serde(default)]
    pub to_year: Option<i32>,
    #[serde(default)]
    pub hidden_people: BTreeSet<String>,
    #[serde(default)]
    pub always_shown_people: BTreeSet<String>,
    /// Keyed by property id (e.g. family, occupation).
    #[serde(default)]
    pub text_filters: BTreeMap<String, TextFilter>,
}

impl FilterModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any predicate is active. When nothing is active the visible
    /// graph is the full graph.
    pub fn is_active(&self) -> bool {
        self.bloodline
            || self.from_year.is_some()
            || self.to_year.is_some()
            || self.remove_hidden_people
            || self.text_filters.values().any(TextFilter::is_active)
    }

    /// Refresh the offered choice sets from the accumulated graph, creating
    /// entries for any configured property id not seen yet. Selections are
    /// left untouched.
    pub fn collect_options(&mut self, graph: &RelationGraph, property_ids: &[String]) {
        for pid in property_ids {
            self.text_filters.entry(pid.clone()).or_default();
        }
        for person in graph.items.values() {
            for (pid, filter) in self.text_filters.iter_mut() {
                for value in person.property_values(pid) {
                    filter.all.insert(value.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{props, Individual, Property};

    #[test]
    fn test_inactive_by_default() {
        assert!(!FilterModel::new().is_active());
    }

    #[test]
    fn test_hidden_set_alone_is_inactive() {
        // Tagging someone hidden only matters once a predicate runs; the
        // untouched full graph stays the fast path.
        let mut filters = FilterModel::new();
        filters.hidden_people.insert("WD-Q1".to_string());
        assert!(!filters.is_active());
        filters.remove_hidden_people = true;
        assert!(filters.is_active());
    }

    #[test]
    fn test_text_choice_activates() {
        let mut filters = FilterModel::new();
        filters
            .text_filters
            .entry(props::FAMILY.to_string())
            .or_default()
            .choice
            .insert("House A".to_string());
        assert!(filters.is_active());
    }

    #[test]
    fn test_collect_options() {
        let mut graph = RelationGraph::new();
        let mut p = Individual::new("WD-Q1", "a");
        p.properties
            .push(Property::new(props::FAMILY, "family", "House A"));
        graph.insert_individual(p);

        let mut filters = FilterModel::new();
        filters.collect_options(&graph, &[props::FAMILY.to_string()]);
        assert!(filters.text_filters[props::FAMILY]
            .all
            .contains("House A"));
        assert!(!filters.text_filters[props::FAMILY].is_active());
    }

    #[test]
    fn test_serialized_shape() {
        let mut filters = FilterModel::new();
        filters.bloodline = true;
        filters.hidden_people.insert("WD-Q1".to_string());
        let json = serde_json::to_value(&filters).unwrap();
        assert_eq!(json["bloodline"], true);
        assert!(json["hiddenPeople"].is_array());
        assert!(json["alwaysShownPeople"].is_array());
        assert!(json["textFilters"].is_object());
    }
}
