use crate::error::Result;
use rusqlite::Connection;

/// Cache schema, applied idempotently on open.
///
/// Qualifiers are stored as a JSON blob per property row; the cache never
/// queries inside them.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS individuals (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    alias       TEXT
);

CREATE TABLE IF NOT EXISTS properties (
    individual_id TEXT NOT NULL REFERENCES individuals(id),
    property_id   TEXT NOT NULL,
    label         TEXT NOT NULL,
    value         TEXT NOT NULL,
    value_hash    TEXT,
    qualifiers    TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (individual_id, property_id, value)
);

CREATE TABLE IF NOT EXISTS relationships (
    subject_id TEXT NOT NULL REFERENCES individuals(id),
    object_id  TEXT NOT NULL REFERENCES individuals(id),
    kind       TEXT NOT NULL,
    type_id    TEXT NOT NULL,
    PRIMARY KEY (subject_id, object_id, kind, type_id)
);

CREATE INDEX IF NOT EXISTS idx_relationships_subject ON relationships(subject_id);
CREATE INDEX IF NOT EXISTS idx_relationships_object ON relationships(object_id);
CREATE INDEX IF NOT EXISTS idx_properties_individual ON properties(individual_id);
";

pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// True when every cache table is present, for startup verification.
pub fn schema_ok(conn: &Connection) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(["individuals", "properties", "relationships"]
        .iter()
        .all(|t| tables.iter().any(|name| name == t)))
}
