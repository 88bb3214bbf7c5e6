//! Multi-source merge: read raw batches, deduplicate by source URL, assemble.
//!
//! Per-record and per-batch problems are absorbed here — skipped, logged,
//! and counted — so one bad scraper export never sinks a run. Only an empty
//! end result is fatal: there is nothing meaningful to index.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use tramitero_shared::{RawRecord, Result, TramiteDoc, TramiteroError};

use crate::assembler;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One raw batch: a label for diagnostics plus its undecoded entries.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Where the batch came from (file path or caller-supplied label).
    pub source: String,
    /// Raw array elements; validated per-entry during the merge.
    pub entries: Vec<Value>,
}

/// Counters accumulated across a merge run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MergeStats {
    /// Batches whose entries entered the merge.
    pub batches_read: usize,
    /// Batch files that could not be read or parsed at all.
    pub batches_skipped: usize,
    /// Total entries examined, valid or not.
    pub records_seen: usize,
    /// Entries that were not objects or lacked a usable identity key.
    pub invalid_records: usize,
    /// Later occurrences of an already-seen identity key.
    pub duplicates: usize,
    /// Unique records that survived and were assembled.
    pub retained: usize,
}

/// A successful merge: assembled documents in first-seen order, plus stats.
#[derive(Debug)]
pub struct MergeOutcome {
    pub documents: Vec<TramiteDoc>,
    pub stats: MergeStats,
}

// ---------------------------------------------------------------------------
// Batch reading
// ---------------------------------------------------------------------------

/// Read one batch file: UTF-8 JSON, top-level array.
///
/// Array elements are *not* validated here — a batch with garbage entries
/// still reads successfully and gets filtered element-by-element in
/// [`merge`]. Only an unreadable file or a non-array top level fails.
pub fn read_batch(path: &Path) -> Result<Batch> {
    let content = std::fs::read_to_string(path).map_err(|e| TramiteroError::io(path, e))?;

    let entries: Vec<Value> = serde_json::from_str(&content)
        .map_err(|e| TramiteroError::parse(format!("{}: {e}", path.display())))?;

    debug!(path = %path.display(), entries = entries.len(), "batch read");

    Ok(Batch {
        source: path.display().to_string(),
        entries,
    })
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge batches into a deduplicated, assembled document sequence.
///
/// Batches are processed in caller order, entries in array order, and the
/// first record seen for an identity key is authoritative — later duplicates
/// are dropped whole, never merged field-by-field. Retained records keep
/// their first-seen positions in the output (array-backed, so the sequence
/// never depends on hash iteration order).
///
/// Fails only with [`TramiteroError::EmptyIngest`] when nothing survives.
pub fn merge(batches: Vec<Batch>) -> Result<MergeOutcome> {
    let mut stats = MergeStats::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut retained: Vec<RawRecord> = Vec::new();

    for batch in batches {
        let Batch { source, entries } = batch;
        stats.batches_read += 1;

        for (pos, entry) in entries.into_iter().enumerate() {
            stats.records_seen += 1;

            let Some(record) = RawRecord::from_value(entry) else {
                warn!(batch = %source, pos, "skipping entry: not a record object");
                stats.invalid_records += 1;
                continue;
            };

            let Some(url) = record.source_url() else {
                warn!(batch = %source, pos, "skipping record: no usable identity key");
                stats.invalid_records += 1;
                continue;
            };

            if seen.contains(url) {
                debug!(batch = %source, url, "duplicate identity key, first occurrence wins");
                stats.duplicates += 1;
                continue;
            }

            seen.insert(url.to_string());
            retained.push(record);
        }
    }

    if retained.is_empty() {
        return Err(TramiteroError::EmptyIngest);
    }

    stats.retained = retained.len();

    let documents = retained.iter().map(assembler::assemble).collect();

    Ok(MergeOutcome { documents, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture_path(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    fn batch(source: &str, entries: Vec<Value>) -> Batch {
        Batch {
            source: source.into(),
            entries,
        }
    }

    fn rec(url: &str, nombre: &str) -> Value {
        json!({"URL_Fuente": url, "Nombre_Tramite": nombre})
    }

    // --- Deduplication semantics ---

    #[test]
    fn one_document_per_distinct_identity_key() {
        let batches = vec![
            batch("a", vec![rec("https://x/1", "Uno"), rec("https://x/2", "Dos")]),
            batch("b", vec![rec("https://x/2", "Dos bis"), rec("https://x/3", "Tres")]),
        ];

        let outcome = merge(batches).unwrap();
        assert_eq!(outcome.documents.len(), 3);
        assert_eq!(outcome.stats.retained, 3);
        assert_eq!(outcome.stats.duplicates, 1);
    }

    #[test]
    fn first_seen_wins_across_batches() {
        let batches = vec![
            batch("a", vec![rec("https://x/1", "versión A")]),
            batch("b", vec![rec("https://x/1", "versión B")]),
        ];

        let outcome = merge(batches).unwrap();
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].metadata.title, "versión A");
    }

    #[test]
    fn first_seen_wins_within_a_batch() {
        let batches = vec![batch(
            "a",
            vec![rec("https://x/1", "primera"), rec("https://x/1", "segunda")],
        )];

        let outcome = merge(batches).unwrap();
        assert_eq!(outcome.documents[0].metadata.title, "primera");
        assert_eq!(outcome.stats.duplicates, 1);
    }

    #[test]
    fn merging_a_batch_twice_equals_merging_it_once() {
        let entries = vec![rec("https://x/1", "Uno"), rec("https://x/2", "Dos")];

        let once = merge(vec![batch("a", entries.clone())]).unwrap();
        let twice = merge(vec![batch("a", entries.clone()), batch("a-again", entries)]).unwrap();

        assert_eq!(once.documents, twice.documents);
        assert_eq!(twice.stats.duplicates, 2);
    }

    #[test]
    fn output_preserves_first_seen_order() {
        let batches = vec![
            batch("a", vec![rec("https://x/3", "Tres"), rec("https://x/1", "Uno")]),
            batch("b", vec![rec("https://x/2", "Dos"), rec("https://x/3", "repetido")]),
        ];

        let outcome = merge(batches).unwrap();
        let titles: Vec<&str> = outcome
            .documents
            .iter()
            .map(|d| d.metadata.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Tres", "Uno", "Dos"]);
    }

    #[test]
    fn merge_is_deterministic() {
        let make = || {
            vec![
                batch("a", vec![rec("https://x/2", "Dos"), rec("https://x/1", "Uno")]),
                batch("b", vec![rec("https://x/3", "Tres")]),
            ]
        };

        let first = merge(make()).unwrap();
        let second = merge(make()).unwrap();
        assert_eq!(first.documents, second.documents);
        assert_eq!(first.stats, second.stats);
    }

    // --- Malformed input ---

    #[test]
    fn non_object_entries_are_skipped_not_fatal() {
        let batches = vec![batch(
            "a",
            vec![
                rec("https://x/1", "Uno"),
                json!("not-a-record"),
                rec("https://x/2", "Dos"),
            ],
        )];

        let outcome = merge(batches).unwrap();
        assert_eq!(outcome.documents.len(), 2);
        assert_eq!(outcome.stats.invalid_records, 1);
        assert_eq!(outcome.stats.records_seen, 3);
    }

    #[test]
    fn records_without_identity_key_are_skipped() {
        let batches = vec![batch(
            "a",
            vec![
                json!({"Nombre_Tramite": "sin URL"}),
                json!({"URL_Fuente": "", "Nombre_Tramite": "URL vacía"}),
                json!({"URL_Fuente": null, "Nombre_Tramite": "URL nula"}),
                rec("https://x/1", "válido"),
            ],
        )];

        let outcome = merge(batches).unwrap();
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.stats.invalid_records, 3);
    }

    #[test]
    fn identity_key_comparison_is_case_sensitive() {
        let batches = vec![batch(
            "a",
            vec![rec("https://x/Tramite", "mayúscula"), rec("https://x/tramite", "minúscula")],
        )];

        let outcome = merge(batches).unwrap();
        assert_eq!(outcome.documents.len(), 2);
    }

    #[test]
    fn nothing_retained_is_fatal() {
        let batches = vec![batch("a", vec![json!("x"), json!({"Nombre_Tramite": "sin URL"})])];

        let err = merge(batches).unwrap_err();
        assert!(matches!(err, TramiteroError::EmptyIngest));
    }

    #[test]
    fn no_batches_at_all_is_fatal() {
        let err = merge(Vec::new()).unwrap_err();
        assert!(matches!(err, TramiteroError::EmptyIngest));
    }

    // --- Batch reading ---

    #[test]
    fn read_batch_parses_fixture() {
        let batch = read_batch(&fixture_path("json/batch-a.json")).unwrap();
        assert_eq!(batch.entries.len(), 2);
    }

    #[test]
    fn read_batch_missing_file_errors() {
        let err = read_batch(&fixture_path("json/no-such-file.json")).unwrap_err();
        assert!(matches!(err, TramiteroError::Io { .. }));
    }

    #[test]
    fn read_batch_invalid_json_errors() {
        let err = read_batch(&fixture_path("json/not-json.txt")).unwrap_err();
        assert!(matches!(err, TramiteroError::Parse { .. }));
    }

    #[test]
    fn read_batch_keeps_garbage_entries_for_the_merge() {
        let batch = read_batch(&fixture_path("json/batch-invalid-entry.json")).unwrap();
        assert_eq!(batch.entries.len(), 3);

        let outcome = merge(vec![batch]).unwrap();
        assert_eq!(outcome.documents.len(), 2);
        assert_eq!(outcome.stats.invalid_records, 1);
    }
}
