//! Dotted-path access into module metadata documents.
//!
//! Metadata is an arbitrary JSON document. Paths address nested object
//! members with dots: `"billing.provider"` reads `{"billing": {"provider": …}}`.
//! `set` creates intermediate objects as needed and replaces any non-object
//! value standing in the way.

use serde_json::{Map, Value};

/// Read a value at `path`. Returns `None` for a missing document, a missing
/// member, or a path that descends into a non-object.
pub fn get<'a>(doc: Option<&'a Value>, path: &str) -> Option<&'a Value> {
    let mut current = doc?;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at `path`, creating the document and any intermediate
/// objects along the way.
pub fn set(doc: &mut Option<Value>, path: &str, value: Value) {
    let root = doc.get_or_insert_with(|| Value::Object(Map::new()));
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }

    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        // The cursor is coerced to an object before every descent.
        let Some(map) = current.as_object_mut() else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        let entry = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry;
    }
}
