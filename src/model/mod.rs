//! Typed records for the relationship graph.
//!
//! The external knowledge-graph normalizer produces `Individual` and
//! `Relationship` values with a fixed schema; the engine never inspects
//! raw source rows.

pub mod strata;

pub use strata::{StrataMap, Stratum};

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Well-known property ids from the knowledge-graph source.
pub mod props {
    pub const DATE_OF_BIRTH: &str = "WD-P569";
    pub const DATE_OF_DEATH: &str = "WD-P570";
    pub const GENDER: &str = "WD-P21";
    pub const FAMILY: &str = "WD-P53";
    pub const OCCUPATION: &str = "WD-P106";
    /// Synthesized "place of birth, country" property.
    pub const PLACE_OF_BIRTH: &str = "SW-P2";
    /// Synthesized "place of death, country" property.
    pub const PLACE_OF_DEATH: &str = "SW-P3";
}

/// A qualifier refining a property value (e.g. series ordinal, object role).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualifier {
    #[serde(rename = "qualifierId")]
    pub qualifier_id: String,
    pub label: String,
    pub value: String,
}

/// A typed additional attribute of an individual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "propertyId")]
    pub property_id: String,
    pub label: String,
    pub value: String,
    /// Statement hash from the source, when available.
    #[serde(rename = "valueHash", default, skip_serializing_if = "Option::is_none")]
    pub value_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<Qualifier>,
}

impl Property {
    pub fn new(property_id: &str, label: &str, value: &str) -> Self {
        Self {
            property_id: property_id.to_string(),
            label: label.to_string(),
            value: value.to_string(),
            value_hash: None,
            qualifiers: Vec::new(),
        }
    }
}

/// A person in the relationship graph.
///
/// Identity is the source-qualified id (e.g. `WD-Q9682`). Property growth is
/// additive: merges may add properties but never remove known facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(rename = "additionalProperties", default)]
    pub properties: Vec<Property>,
}

impl Individual {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            alias: None,
            properties: Vec::new(),
        }
    }

    /// All values of a given property id.
    pub fn property_values<'a>(&'a self, property_id: &'a str) -> impl Iterator<Item = &'a str> {
        self.properties
            .iter()
            .filter(move |p| p.property_id == property_id)
            .map(|p| p.value.as_str())
    }

    /// Gender value, when known.
    pub fn gender(&self) -> Option<&str> {
        self.property_values(props::GENDER).next()
    }

    /// Birth year parsed from the date-of-birth property.
    ///
    /// Source dates look like `1452-04-15T00:00:00Z`; proleptic years are
    /// negative (`-0600-01-01T...`).
    pub fn birth_year(&self) -> Option<i32> {
        let raw = self.property_values(props::DATE_OF_BIRTH).next()?;
        parse_year(raw)
    }

    /// Add properties from another record, keeping every fact already known.
    /// Incoming duplicates (same property id and value) are ignored.
    pub fn absorb_properties(&mut self, incoming: &[Property]) {
        for prop in incoming {
            let known = self
                .properties
                .iter()
                .any(|p| p.property_id == prop.property_id && p.value == prop.value);
            if !known {
                self.properties.push(prop.clone());
            }
        }
    }
}

/// Parse the year out of a source date value.
fn parse_year(raw: &str) -> Option<i32> {
    let date_part = raw.split('T').next()?;
    chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(|d| d.year())
        .ok()
}

/// A directed typed edge: `subject`'s `kind` is `object`
/// (e.g. subject=child, object=parent, kind="father").
///
/// Equality and hashing cover the full tuple, so relationship collections
/// behave as sets and repeated insertion is idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "item2Id")]
    pub subject: String,
    #[serde(rename = "item1Id")]
    pub object: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "typeId")]
    pub type_id: String,
}

impl Relationship {
    pub fn new(subject: &str, object: &str, kind: &str, type_id: &str) -> Self {
        Self {
            subject: subject.to_string(),
            object: object.to_string(),
            kind: kind.to_string(),
            type_id: type_id.to_string(),
        }
    }
}

/// The accumulated relationship graph for a session.
///
/// Monotonically grows under merge; facts are only removed by an explicit
/// prune. Relations are keyed by subject id in a `BTreeMap` so iteration
/// order (and therefore kinship tie-breaking) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationGraph {
    /// Individuals returned for the root lookup itself.
    #[serde(default)]
    pub targets: Vec<Individual>,
    #[serde(default)]
    pub items: HashMap<String, Individual>,
    #[serde(default)]
    pub relations: BTreeMap<String, Vec<Relationship>>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.relations.is_empty()
    }

    pub fn individual_count(&self) -> usize {
        self.items.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relations.values().map(Vec::len).sum()
    }

    /// Insert an edge, idempotently.
    pub fn insert_relationship(&mut self, rel: Relationship) {
        let edges = self.relations.entry(rel.subject.clone()).or_default();
        if !edges.contains(&rel) {
            edges.push(rel);
        }
    }

    /// Edges whose subject is `id`.
    pub fn relations_of(&self, id: &str) -> &[Relationship] {
        self.relations.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn insert_individual(&mut self, individual: Individual) {
        self.items.insert(individual.id.clone(), individual);
    }

    /// Strict size domination: more individuals AND more relationships.
    pub fn contains_more_data(&self, other: &RelationGraph) -> bool {
        self.individual_count() > other.individual_count()
            && self.relationship_count() > other.relationship_count()
    }

    /// Flat view of every edge in the graph.
    pub fn all_relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relations.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_with_dob(id: &str, dob: &str) -> Individual {
        let mut p = Individual::new(id, id);
        p.properties
            .push(Property::new(props::DATE_OF_BIRTH, "date of birth", dob));
        p
    }

    #[test]
    fn test_birth_year_parsing() {
        let p = person_with_dob("WD-Q1", "1452-04-15T00:00:00Z");
        assert_eq!(p.birth_year(), Some(1452));
    }

    #[test]
    fn test_birth_year_negative() {
        let p = person_with_dob("WD-Q2", "-0600-01-01T00:00:00Z");
        assert_eq!(p.birth_year(), Some(-600));
    }

    #[test]
    fn test_birth_year_missing() {
        let p = Individual::new("WD-Q3", "nobody");
        assert_eq!(p.birth_year(), None);
    }

    #[test]
    fn test_absorb_properties_is_additive() {
        let mut p = Individual::new("WD-Q1", "a");
        p.properties
            .push(Property::new(props::OCCUPATION, "occupation", "painter"));
        p.absorb_properties(&[
            Property::new(props::OCCUPATION, "occupation", "painter"),
            Property::new(props::OCCUPATION, "occupation", "engineer"),
        ]);
        let values: Vec<_> = p.property_values(props::OCCUPATION).collect();
        assert_eq!(values, vec!["painter", "engineer"]);
    }

    #[test]
    fn test_insert_relationship_idempotent() {
        let mut graph = RelationGraph::new();
        let rel = Relationship::new("WD-Q1", "WD-Q2", "father", "WD-P22");
        graph.insert_relationship(rel.clone());
        graph.insert_relationship(rel);
        assert_eq!(graph.relationship_count(), 1);
    }

    #[test]
    fn test_contains_more_data_requires_strict_domination() {
        let mut small = RelationGraph::new();
        small.insert_individual(Individual::new("WD-Q1", "a"));
        small.insert_individual(Individual::new("WD-Q2", "b"));
        small.insert_relationship(Relationship::new("WD-Q1", "WD-Q2", "spouse", "WD-P26"));

        let mut big = small.clone();
        big.insert_individual(Individual::new("WD-Q3", "c"));
        big.insert_relationship(Relationship::new("WD-Q1", "WD-Q3", "child", "WD-P40"));

        assert!(big.contains_more_data(&small));
        assert!(!small.contains_more_data(&big));

        // More individuals but equal relationships: no domination.
        let mut wider = small.clone();
        wider.insert_individual(Individual::new("WD-Q4", "d"));
        assert!(!wider.contains_more_data(&small));
    }

    #[test]
    fn test_relationship_serde_wire_shape() {
        let rel = Relationship::new("WD-Q1", "WD-Q2", "father", "WD-P22");
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["item2Id"], "WD-Q1");
        assert_eq!(json["item1Id"], "WD-Q2");
        assert_eq!(json["type"], "father");
        assert_eq!(json["typeId"], "WD-P22");
    }
}
