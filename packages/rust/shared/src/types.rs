//! Core domain types for trámite ingestion and retrieval.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw-record field holding the source URL. Two raw records describe the same
/// trámite iff this field compares equal as a case-sensitive string.
pub const IDENTITY_KEY: &str = "URL_Fuente";

// ---------------------------------------------------------------------------
// RawRecord
// ---------------------------------------------------------------------------

/// One scraped trámite record as produced by the external scraper.
///
/// The field set is open: the scraper's output schema drifts over time, so
/// callers must tolerate missing keys and must not assume a closed set.
/// Records are ephemeral — read from a batch, assembled once, discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    /// Accept a batch element as a record. Returns `None` for anything that
    /// is not a JSON object (scalars, arrays, null entries in the batch).
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Look up a field by key. Missing keys are simply absent values.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The identity key, if this record carries a usable one.
    ///
    /// Absent, null, non-string, and empty-string values all disqualify the
    /// record: without a source URL there is nothing to deduplicate on.
    pub fn source_url(&self) -> Option<&str> {
        match self.0.get(IDENTITY_KEY) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ---------------------------------------------------------------------------
// TramiteDoc
// ---------------------------------------------------------------------------

/// Citation/filtering metadata attached to a canonical document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocMetadata {
    /// Normalized source URL of the trámite page.
    #[serde(default)]
    pub source: String,
    /// Normalized trámite name.
    #[serde(default)]
    pub title: String,
}

/// The canonical, rendered representation of one trámite.
///
/// `body` is a single text blob with a fixed section layout (every section
/// header present, placeholders for absent values) so downstream chunking
/// and embedding behave uniformly. Constructed once per run and handed to
/// the index publisher; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TramiteDoc {
    /// Formatted section text used for embedding and retrieval.
    pub body: String,
    /// Citation metadata — not used for ranking.
    pub metadata: DocMetadata,
}
