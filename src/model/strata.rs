//! Stratum classification of relationship types.
//!
//! Every relationship type is either homostratal (same generation, e.g.
//! spouse) or heterostratal (adjacent generation, e.g. father, mother,
//! child). The crawler uses this to compute generational depth, and the
//! merger uses the reciprocal table to synthesize inverse edges.

use super::{props, Individual, Relationship};
use std::collections::HashMap;

pub const TYPE_SPOUSE: &str = "WD-P26";
pub const TYPE_FATHER: &str = "WD-P22";
pub const TYPE_MOTHER: &str = "WD-P25";
pub const TYPE_CHILD: &str = "WD-P40";

/// Same-generation or adjacent-generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stratum {
    Homostratal,
    Heterostratal,
}

/// Map from relationship type id to its stratum and human label.
#[derive(Debug, Clone)]
pub struct StrataMap {
    entries: HashMap<String, (Stratum, String)>,
}

impl StrataMap {
    /// Build from explicit id lists, taking labels from the built-in table
    /// where known and falling back to the raw id.
    pub fn from_ids(homo: &[String], hetero: &[String]) -> Self {
        let mut entries = HashMap::new();
        for id in homo {
            entries.insert(id.clone(), (Stratum::Homostratal, known_label(id)));
        }
        for id in hetero {
            // Homostratal wins when an id is listed in both.
            entries
                .entry(id.clone())
                .or_insert((Stratum::Heterostratal, known_label(id)));
        }
        Self { entries }
    }

    pub fn classify(&self, type_id: &str) -> Option<Stratum> {
        self.entries.get(type_id).map(|(s, _)| *s)
    }

    /// Human label for a type id, for rendering edges of this type.
    pub fn label(&self, type_id: &str) -> Option<&str> {
        self.entries.get(type_id).map(|(_, l)| l.as_str())
    }

    pub fn is_homostratal(&self, type_id: &str) -> bool {
        matches!(self.classify(type_id), Some(Stratum::Homostratal))
    }
}

impl Default for StrataMap {
    /// The family-tree classification: spouse same-generation; father,
    /// mother and child adjacent-generation.
    fn default() -> Self {
        Self::from_ids(
            &[TYPE_SPOUSE.to_string()],
            &[
                TYPE_FATHER.to_string(),
                TYPE_MOTHER.to_string(),
                TYPE_CHILD.to_string(),
            ],
        )
    }
}

fn known_label(type_id: &str) -> String {
    match type_id {
        TYPE_SPOUSE => "spouse",
        TYPE_FATHER => "father",
        TYPE_MOTHER => "mother",
        TYPE_CHILD => "child",
        other => other,
    }
    .to_string()
}

/// The inverse edge implied by `rel`, if any.
///
/// `subject` must be the record for `rel.subject`, consulted for gender when
/// inverting a `child` edge; when the parent's gender is unknown no parent
/// edge can be synthesized and `None` is returned.
pub fn reciprocal(rel: &Relationship, subject: Option<&Individual>) -> Option<Relationship> {
    match rel.kind.as_str() {
        "spouse" => Some(Relationship::new(
            &rel.object,
            &rel.subject,
            "spouse",
            TYPE_SPOUSE,
        )),
        "father" | "mother" => Some(Relationship::new(
            &rel.object,
            &rel.subject,
            "child",
            TYPE_CHILD,
        )),
        "child" => {
            let gender = subject.and_then(Individual::gender)?;
            match gender {
                "male" => Some(Relationship::new(
                    &rel.object,
                    &rel.subject,
                    "father",
                    TYPE_FATHER,
                )),
                "female" => Some(Relationship::new(
                    &rel.object,
                    &rel.subject,
                    "mother",
                    TYPE_MOTHER,
                )),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Whether the reciprocal of `rel` is already asserted in `edges`.
pub fn has_reciprocal(rel: &Relationship, edges: &[Relationship]) -> bool {
    match rel.kind.as_str() {
        "spouse" => edges
            .iter()
            .any(|r| r.kind == "spouse" && r.object == rel.subject),
        "father" | "mother" => edges
            .iter()
            .any(|r| r.kind == "child" && r.object == rel.subject),
        "child" => edges
            .iter()
            .any(|r| (r.kind == "father" || r.kind == "mother") && r.object == rel.subject),
        _ => true,
    }
}
