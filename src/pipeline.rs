use crate::config::{BLOCK_QUEUE_CAPACITY, COMMIT_COUNT, PROGRESS_INTERVAL};
use crate::extract::extract_fields;
use crate::lacnic::LacnicNormalizer;
use crate::models::AllocationRecord;
use crate::prefix::resolve_prefixes;
use crate::reader::{open_dump, Latin1Lines};
use crate::registry::Registry;
use crate::segment::BlockSegmenter;
use crate::stats::ImportStats;
use crate::store::{Store, StoreSession};
use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info};

/// When a worker's open transaction is committed and its session rotated.
/// Bounding the batch bounds both transaction size and how much one
/// mid-run failure can lose.
#[derive(Debug, Clone, Copy)]
pub struct BatchPolicy {
    pub commit_count: u64,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            commit_count: COMMIT_COUNT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub workers: usize,
    pub batch: BatchPolicy,
    pub queue_capacity: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            batch: BatchPolicy::default(),
            queue_capacity: BLOCK_QUEUE_CAPACITY,
        }
    }
}

/// Per-file run state, threaded explicitly into the producer and every
/// worker instead of living in process globals.
pub struct RunContext {
    pub filename: String,
    pub source: Option<Registry>,
    /// Blocks enqueued so far; the denominator of the progress
    /// approximation. Monotone, reaches the file's true total once the
    /// producer finishes.
    pub total_blocks: AtomicU64,
}

/// Approximate completion percentage for one worker, clamped to 100.
///
/// The numerator scales one worker's count by the worker total, so the
/// figure overshoots whenever blocks are unevenly distributed; it is a
/// progress hint, not a precise global counter.
fn progress_percent(blocks_done: u64, worker_count: u64, total_blocks: u64) -> u64 {
    if total_blocks == 0 {
        return 100;
    }
    ((blocks_done * worker_count * 100) / total_blocks).min(100)
}

/// Ingest one dump file: stream its blocks into a bounded queue drained by
/// a pool of writer threads, each owning a private store session.
///
/// A worker that fails aborts alone and loses only its uncommitted batch;
/// the import of the file fails outright only when every worker died or
/// reading the dump itself failed.
pub fn import_file<S>(
    store: &Arc<S>,
    path: &Path,
    opts: &ImportOptions,
    stats: &Arc<ImportStats>,
) -> Result<()>
where
    S: Store + Send + Sync + 'static,
{
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let source = Registry::from_filename(&filename);
    let ctx = Arc::new(RunContext {
        filename,
        source,
        total_blocks: AtomicU64::new(0),
    });

    let lines = Latin1Lines::new(open_dump(path)?);

    let workers = opts.workers.max(1);
    let (tx, rx) = bounded::<String>(opts.queue_capacity.max(1));

    debug!(workers, file = %ctx.filename, "starting worker threads");
    let mut handles = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let rx = rx.clone();
        let store = Arc::clone(store);
        let ctx = Arc::clone(&ctx);
        let stats = Arc::clone(stats);
        let policy = opts.batch;
        let handle = thread::Builder::new()
            .name(format!("atlas-worker-{worker_id}"))
            .spawn(move || write_blocks(&*store, rx, policy, &ctx, workers as u64, &stats))?;
        handles.push(handle);
    }
    drop(rx);

    let pb = make_spinner(&format!("Segmenting {} ...", ctx.filename));
    let produced = if source == Some(Registry::Lacnic) {
        produce_blocks(
            LacnicNormalizer::new(lines, Arc::clone(stats)),
            &ctx,
            &tx,
            stats,
            &pb,
        )
    } else {
        produce_blocks(BlockSegmenter::new(lines, source), &ctx, &tx, stats, &pb)
    };
    drop(tx);

    let mut failed_workers = 0;
    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                failed_workers += 1;
                error!(error = %e, file = %ctx.filename, "worker aborted, its uncommitted batch was lost");
            }
            Err(_) => {
                failed_workers += 1;
                error!(file = %ctx.filename, "worker panicked");
            }
        }
    }

    if failed_workers == workers {
        bail!(
            "all {workers} workers failed while importing {}",
            ctx.filename
        );
    }
    let produced = produced?;
    pb.finish_with_message(format!("{}: {produced} blocks", ctx.filename));
    info!(file = %ctx.filename, blocks = produced, "file import finished");
    Ok(())
}

fn produce_blocks<I>(
    blocks: I,
    ctx: &RunContext,
    tx: &Sender<String>,
    stats: &ImportStats,
    pb: &ProgressBar,
) -> Result<u64>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut enqueued = 0u64;
    for block in blocks {
        let block =
            block.with_context(|| format!("I/O error while reading {}", ctx.filename))?;
        ctx.total_blocks.fetch_add(1, Ordering::Relaxed);
        stats.inc_blocks();
        if tx.send(block).is_err() {
            bail!("all workers exited before {} was fully read", ctx.filename);
        }
        enqueued += 1;
        if enqueued % PROGRESS_INTERVAL == 0 {
            pb.tick();
        }
    }
    Ok(enqueued)
}

/// Worker loop: dequeue, extract, resolve, insert one record per prefix,
/// and commit every `commit_count` accepted blocks on a fresh session.
/// Channel close is the shutdown signal; the final partial batch is
/// committed before exiting.
fn write_blocks<S: Store>(
    store: &S,
    rx: Receiver<String>,
    policy: BatchPolicy,
    ctx: &RunContext,
    worker_count: u64,
    stats: &ImportStats,
) -> Result<()> {
    let mut session = store.open_session()?;
    let mut in_batch = 0u64;
    let mut done = 0u64;
    let mut batch_start = Instant::now();

    while let Ok(block) = rx.recv() {
        let prefixes = resolve_prefixes(&block);
        if prefixes.is_empty() {
            stats.inc_failed();
            continue;
        }
        let records = AllocationRecord::expand(extract_fields(&block), prefixes);
        for record in &records {
            session.insert(record)?;
        }
        stats.add_records(records.len() as u64);
        in_batch += 1;
        done += 1;

        if in_batch >= policy.commit_count {
            session.commit()?;
            session = store.open_session()?;
            let percent = progress_percent(
                done,
                worker_count,
                ctx.total_blocks.load(Ordering::Relaxed),
            );
            debug!(
                blocks = in_batch,
                elapsed_secs = batch_start.elapsed().as_secs_f64(),
                percent,
                "committed batch"
            );
            in_batch = 0;
            batch_start = Instant::now();
        }
    }

    session.commit()?;
    debug!(blocks = in_batch, "committed last blocks");
    Ok(())
}

fn make_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    /// Store double that logs session opens, inserts, and commits.
    #[derive(Clone, Default)]
    struct RecordingStore {
        log: Arc<Mutex<Vec<String>>>,
        next_session: Arc<AtomicU64>,
        fail_commits: bool,
    }

    struct RecordingSession {
        id: u64,
        log: Arc<Mutex<Vec<String>>>,
        fail_commits: bool,
    }

    impl Store for RecordingStore {
        type Session = RecordingSession;

        fn recreate_schema(&self) -> Result<()> {
            Ok(())
        }

        fn open_session(&self) -> Result<RecordingSession> {
            let id = self.next_session.fetch_add(1, Ordering::Relaxed);
            self.log.lock().unwrap().push(format!("open:{id}"));
            Ok(RecordingSession {
                id,
                log: self.log.clone(),
                fail_commits: self.fail_commits,
            })
        }
    }

    impl StoreSession for RecordingSession {
        fn insert(&mut self, record: &AllocationRecord) -> Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("insert:{}:{}", self.id, record.inetnum));
            Ok(())
        }

        fn commit(&mut self) -> Result<()> {
            if self.fail_commits {
                return Err(anyhow!("commit refused"));
            }
            self.log.lock().unwrap().push(format!("commit:{}", self.id));
            Ok(())
        }
    }

    fn test_ctx(total_blocks: u64) -> RunContext {
        RunContext {
            filename: "test.db".to_string(),
            source: Some(Registry::Ripe),
            total_blocks: AtomicU64::new(total_blocks),
        }
    }

    fn queue_of(blocks: &[&str]) -> Receiver<String> {
        let (tx, rx) = bounded(blocks.len().max(1));
        for block in blocks {
            tx.send(block.to_string()).unwrap();
        }
        rx
    }

    fn single_prefix_block(i: u8) -> String {
        format!("inetnum: 10.0.{i}.0 - 10.0.{i}.255\nnetname: NET-{i}\ncust_source: ripe")
    }

    #[test]
    fn seven_blocks_batch_of_three_commits_three_times() {
        let store = RecordingStore::default();
        let blocks: Vec<String> = (0..7).map(single_prefix_block).collect();
        let refs: Vec<&str> = blocks.iter().map(|b| b.as_str()).collect();
        let rx = queue_of(&refs);

        let stats = ImportStats::new();
        write_blocks(
            &store,
            rx,
            BatchPolicy { commit_count: 3 },
            &test_ctx(7),
            1,
            &stats,
        )
        .unwrap();

        let log = store.log.lock().unwrap();
        let commits: Vec<&String> = log.iter().filter(|e| e.starts_with("commit")).collect();
        let opens: Vec<&String> = log.iter().filter(|e| e.starts_with("open")).collect();

        assert_eq!(commits, ["commit:0", "commit:1", "commit:2"]);
        assert_eq!(opens, ["open:0", "open:1", "open:2"]);
        // batches of 3, 3, and the remaining 1; no rotation after the
        // final commit
        assert_eq!(log.last().unwrap().as_str(), "commit:2");
        assert_eq!(
            log.iter().filter(|e| e.starts_with("insert:2")).count(),
            1
        );
        assert_eq!(stats.records(), 7);
    }

    #[test]
    fn unparseable_blocks_do_not_advance_the_batch() {
        let store = RecordingStore::default();
        let good_a = single_prefix_block(1);
        let good_b = single_prefix_block(2);
        let good_c = single_prefix_block(3);
        let rx = queue_of(&[
            good_a.as_str(),
            "person: Nobody\naddress: Nowhere",
            good_b.as_str(),
            good_c.as_str(),
        ]);

        let stats = ImportStats::new();
        write_blocks(
            &store,
            rx,
            BatchPolicy { commit_count: 2 },
            &test_ctx(4),
            1,
            &stats,
        )
        .unwrap();

        let log = store.log.lock().unwrap();
        assert_eq!(log.iter().filter(|e| e.starts_with("commit")).count(), 2);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.records(), 3);
    }

    #[test]
    fn range_spanning_blocks_insert_one_record_per_prefix() {
        let store = RecordingStore::default();
        let block = "inetnum: 192.0.2.1 - 192.0.2.5\nnetname: ODD\ncust_source: ripe";
        let rx = queue_of(&[block]);

        let stats = ImportStats::new();
        write_blocks(
            &store,
            rx,
            BatchPolicy::default(),
            &test_ctx(1),
            1,
            &stats,
        )
        .unwrap();

        let log = store.log.lock().unwrap();
        let inserts = log.iter().filter(|e| e.starts_with("insert")).count();
        assert!(inserts > 1);
        assert_eq!(stats.records(), inserts as u64);
    }

    #[test]
    fn failed_commit_aborts_the_worker() {
        let store = RecordingStore {
            fail_commits: true,
            ..Default::default()
        };
        let block = single_prefix_block(1);
        let rx = queue_of(&[block.as_str()]);

        let result = write_blocks(
            &store,
            rx,
            BatchPolicy { commit_count: 1 },
            &test_ctx(1),
            1,
            &ImportStats::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_queue_still_commits_once() {
        let store = RecordingStore::default();
        let (tx, rx) = bounded::<String>(1);
        drop(tx);

        write_blocks(
            &store,
            rx,
            BatchPolicy::default(),
            &test_ctx(0),
            1,
            &ImportStats::new(),
        )
        .unwrap();

        let log = store.log.lock().unwrap();
        assert_eq!(log.as_slice(), ["open:0", "commit:0"]);
    }

    #[test]
    fn progress_clamped_at_100() {
        // 4 workers, this one saw most of the blocks: the approximation
        // overshoots and must clamp
        assert_eq!(progress_percent(90, 4, 100), 100);
        assert_eq!(progress_percent(25, 4, 100), 100);
        assert_eq!(progress_percent(10, 4, 100), 40);
        assert_eq!(progress_percent(0, 4, 100), 0);
    }

    #[test]
    fn progress_empty_file_is_done() {
        assert_eq!(progress_percent(0, 4, 0), 100);
    }
}
