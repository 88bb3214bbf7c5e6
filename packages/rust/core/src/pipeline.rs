//! End-to-end ingest pipeline: batch files → merge → assemble → publish.
//!
//! Each run is a pure batch transformation — no state survives between
//! invocations, and the external index is rebuilt from scratch every time
//! (reset, then upsert). Callers running concurrently against the same
//! collection must serialize runs themselves; the index's own consistency
//! rules govern interleaved rebuilds.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use tramitero_index::IndexPublisher;
use tramitero_shared::Result;

use crate::merger::{self, MergeStats};

/// Configuration for one ingest run.
///
/// Everything the run needs is passed in explicitly — no ambient process
/// state — so tests can run in parallel against isolated index instances.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Batch files to merge, in priority order (earlier files win duplicates).
    pub batch_files: Vec<PathBuf>,
}

/// Result of a completed ingest run.
#[derive(Debug)]
pub struct IngestResult {
    /// Documents handed to the index publisher.
    pub documents_published: usize,
    /// Merge counters (duplicates, invalid records, skipped batches).
    pub stats: MergeStats,
    /// When the publish finished.
    pub completed_at: DateTime<Utc>,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait IngestProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each batch file is read.
    fn batch_read(&self, source: &str, records: usize, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &IngestResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl IngestProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn batch_read(&self, _source: &str, _records: usize, _current: usize, _total: usize) {}
    fn done(&self, _result: &IngestResult) {}
}

/// Run the full ingest pipeline.
///
/// 1. Read each batch file (unreadable files are skipped with a diagnostic)
/// 2. Merge and deduplicate (first-seen wins)
/// 3. Reset the index, then publish the assembled documents
///
/// The run either reports how many documents were published or fails with
/// the exact reason nothing was — never a silent partial success. A failed
/// publish after the reset leaves the old index gone: reset is destructive
/// by design and there is no rollback.
#[instrument(skip_all, fields(batches = config.batch_files.len()))]
pub async fn ingest(
    config: &IngestConfig,
    publisher: &dyn IndexPublisher,
    progress: &dyn IngestProgress,
) -> Result<IngestResult> {
    let start = Instant::now();
    let run_id = Uuid::now_v7();

    info!(%run_id, batches = config.batch_files.len(), "starting ingest run");

    // --- Phase 1: Read batches ---
    progress.phase("Reading batches");
    let total = config.batch_files.len();
    let mut batches = Vec::new();
    let mut batches_skipped = 0usize;

    for (i, path) in config.batch_files.iter().enumerate() {
        match merger::read_batch(path) {
            Ok(batch) => {
                progress.batch_read(&batch.source, batch.entries.len(), i + 1, total);
                batches.push(batch);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable batch");
                batches_skipped += 1;
            }
        }
    }

    // --- Phase 2: Merge ---
    progress.phase("Merging and deduplicating");
    let mut outcome = merger::merge(batches)?;
    outcome.stats.batches_skipped = batches_skipped;

    info!(
        retained = outcome.stats.retained,
        duplicates = outcome.stats.duplicates,
        invalid = outcome.stats.invalid_records,
        "merge complete"
    );

    // --- Phase 3: Publish (full rebuild, reset then upsert) ---
    progress.phase("Publishing to index");
    publisher.reset().await?;
    publisher.upsert(&outcome.documents).await?;

    let result = IngestResult {
        documents_published: outcome.documents.len(),
        stats: outcome.stats,
        completed_at: Utc::now(),
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        %run_id,
        documents = result.documents_published,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "ingest run complete"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tramitero_shared::{TramiteDoc, TramiteroError};

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    /// Records every call so tests can assert ordering and payloads.
    #[derive(Default)]
    struct RecordingPublisher {
        calls: Mutex<Vec<String>>,
        docs: Mutex<Vec<TramiteDoc>>,
        fail_upsert: bool,
    }

    impl RecordingPublisher {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn docs(&self) -> Vec<TramiteDoc> {
            self.docs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IndexPublisher for RecordingPublisher {
        async fn reset(&self) -> tramitero_shared::Result<()> {
            self.calls.lock().unwrap().push("reset".into());
            Ok(())
        }

        async fn upsert(&self, documents: &[TramiteDoc]) -> tramitero_shared::Result<()> {
            self.calls.lock().unwrap().push("upsert".into());
            if self.fail_upsert {
                return Err(TramiteroError::Index("server rejected batch".into()));
            }
            self.docs.lock().unwrap().extend_from_slice(documents);
            Ok(())
        }

        async fn query(&self, _text: &str, _k: usize) -> tramitero_shared::Result<Vec<TramiteDoc>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn end_to_end_merges_two_batch_files() {
        let publisher = RecordingPublisher::default();
        let config = IngestConfig {
            batch_files: vec![fixture("json/batch-a.json"), fixture("json/batch-b.json")],
        };

        let result = ingest(&config, &publisher, &SilentProgress).await.unwrap();

        // batch-a has {1, 2}; batch-b has {2', 3} — three unique documents,
        // with /2 taken from batch-a.
        assert_eq!(result.documents_published, 3);
        assert_eq!(result.stats.duplicates, 1);

        let docs = publisher.docs();
        let overlapping = docs
            .iter()
            .find(|d| d.metadata.source == "https://www.gob.ec/tramites/licencia-conducir")
            .expect("overlapping record present");
        assert_eq!(overlapping.metadata.title, "Licencia de conducir tipo B");
        assert!(overlapping.body.contains("Costo: 142 USD"));

        assert_eq!(publisher.calls(), vec!["reset", "upsert"]);
    }

    #[tokio::test]
    async fn unreadable_batches_are_skipped_and_counted() {
        let publisher = RecordingPublisher::default();
        let config = IngestConfig {
            batch_files: vec![
                fixture("json/no-such-file.json"),
                fixture("json/not-json.txt"),
                fixture("json/batch-a.json"),
            ],
        };

        let result = ingest(&config, &publisher, &SilentProgress).await.unwrap();
        assert_eq!(result.stats.batches_skipped, 2);
        assert_eq!(result.stats.batches_read, 1);
        assert_eq!(result.documents_published, 2);
    }

    #[tokio::test]
    async fn empty_result_never_touches_the_index() {
        let publisher = RecordingPublisher::default();
        let config = IngestConfig {
            batch_files: vec![fixture("json/no-such-file.json")],
        };

        let err = ingest(&config, &publisher, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, TramiteroError::EmptyIngest));
        assert!(publisher.calls().is_empty(), "no reset/upsert on empty result");
    }

    #[tokio::test]
    async fn publish_failure_is_fatal() {
        let publisher = RecordingPublisher {
            fail_upsert: true,
            ..Default::default()
        };
        let config = IngestConfig {
            batch_files: vec![fixture("json/batch-a.json")],
        };

        let err = ingest(&config, &publisher, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, TramiteroError::Index(_)));
        assert_eq!(publisher.calls(), vec!["reset", "upsert"]);
    }
}
