//! Record and batch types
//!
//! A record is an opaque map of fields; the pipeline never inspects its
//! contents beyond measuring serialized size.

use serde_json::{Map, Value};

/// Atomic unit of ingestion; immutable once produced by a source
pub type Record = Map<String, Value>;

/// Serialized size of a record in bytes (its JSON wire representation)
pub fn serialized_size(record: &Record) -> usize {
    serde_json::to_string(record).map(|s| s.len()).unwrap_or(0)
}
