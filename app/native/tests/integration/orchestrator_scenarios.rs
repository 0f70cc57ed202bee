//! Full runs: rotation, deduplication, failure threshold, and locking.

use std::fs;
use std::sync::Arc;

use wallfetch_lib::constants::files;
use wallfetch_lib::ledger::content_hash;
use wallfetch_lib::lock::{ProcessLock, ProcessProbe};
use wallfetch_lib::pipeline::SkipReason;
use wallfetch_lib::state::unix_now;

use crate::common::*;

struct NothingAlive;

impl ProcessProbe for NothingAlive {
    fn is_alive(&self, _pid: u32) -> bool { false }
}

#[tokio::test]
async fn test_known_url_is_skipped_without_download() {
    let temp = TempDir::new().unwrap();
    let state = state_dir(&temp);
    fs::create_dir_all(&state).unwrap();
    let known = "https://img.test/known.png";
    fs::write(state.join(files::LEDGER), format!("{}:{}\n", content_hash(known), unix_now() - 60.0)).unwrap();

    let provider = Arc::new(
        Scripted::new(ProviderId::Pexels)
            .serve("sky", &["https://img.test/sky-1.png"])
            .serve("forest", &[known]),
    );
    let mut orch = orchestrator(&temp, settings(&["sky", "forest"], 2), Arc::clone(&provider) as Arc<dyn ImageProvider>);

    let report = orch.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.status, RunStatus::Committed);
    assert_eq!(report.error_count, 0);
    assert_eq!(report.saved().len(), 1);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.results[1].tag, "forest");
    assert_eq!(report.results[1].outcome, TaskOutcome::Skipped(SkipReason::Duplicate));
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(file_count(&wallpaper_dir(&temp)), 1);
    assert!(orch.marker().read().is_some());
}

#[tokio::test]
async fn test_too_many_failures_abort_but_keep_saved_images() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(
        Scripted::new(ProviderId::Pexels)
            .serve("good", &["https://img.test/good.png"])
            .fail("bad1")
            .fail("bad2")
            .fail("bad3"),
    );
    let mut orch = orchestrator(&temp, settings(&["good", "bad1", "bad2", "bad3"], 4), provider);

    let report = orch.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.status, RunStatus::Aborted);
    assert_eq!(report.error_count, 3);
    assert_eq!(report.saved().len(), 1);
    assert!(orch.marker().read().is_none());
    assert_eq!(file_count(&wallpaper_dir(&temp)), 1);
    assert!(orch.ledger().exists(&content_hash("https://img.test/good.png")));
}

#[tokio::test]
async fn test_downloads_timing_out_through_every_retry_abort_the_run() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(
        Scripted::new(ProviderId::Pexels)
            .serve("a", &["https://img.test/a.png"])
            .serve("b", &["https://img.test/b.png"])
            .serve("c", &["https://img.test/c.png"])
            .serve("d", &["https://img.test/d.png"])
            .time_out_downloads(),
    );
    let mut orch =
        orchestrator(&temp, settings(&["a", "b", "c", "d"], 4), Arc::clone(&provider) as Arc<dyn ImageProvider>);

    let report = orch.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.status, RunStatus::Aborted);
    assert_eq!(report.error_count, 4);
    assert!(report.results.iter().all(|r| r.outcome.is_failure()));
    // Two attempts per slot.
    assert_eq!(provider.fetch_count(), 8);
    assert!(orch.marker().read().is_none());
    assert!(orch.ledger().is_empty());
}

#[tokio::test]
async fn test_failures_below_threshold_still_commit() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(
        Scripted::new(ProviderId::Pexels)
            .serve("a", &["https://img.test/a.png"])
            .serve("b", &["https://img.test/b.png"])
            .serve("c", &["https://img.test/c.png"])
            .fail("d"),
    );
    let mut orch = orchestrator(&temp, settings(&["a", "b", "c", "d"], 4), provider);

    let report = orch.run(RunOptions::default()).await.unwrap();

    // 1 < 0.5 * 4
    assert_eq!(report.error_count, 1);
    assert_eq!(report.status, RunStatus::Committed);
    assert!(orch.marker().read().is_some());
}

#[tokio::test]
async fn test_second_instance_sees_first_instance_ledger() {
    let temp = TempDir::new().unwrap();
    let provider: Arc<dyn ImageProvider> =
        Arc::new(Scripted::new(ProviderId::Pexels).serve("sky", &["https://img.test/sky.png"]));

    // Both open their state before either runs.
    let mut first = orchestrator(&temp, settings(&["sky"], 1), Arc::clone(&provider));
    let mut second = orchestrator(&temp, settings(&["sky"], 1), provider);

    let report = first.run(RunOptions::default()).await.unwrap();
    assert_eq!(report.saved().len(), 1);

    let report = second.run(RunOptions { force: true, ..RunOptions::default() }).await.unwrap();
    assert_eq!(report.results[0].outcome, TaskOutcome::Skipped(SkipReason::Duplicate));
    assert_eq!(file_count(&wallpaper_dir(&temp)), 1);
}

#[tokio::test]
async fn test_stale_lock_is_reclaimed() {
    let temp = TempDir::new().unwrap();
    let state = state_dir(&temp);
    fs::create_dir_all(&state).unwrap();
    let lock_path = state.join(files::LOCK);
    fs::write(&lock_path, "424242").unwrap();

    let provider = Arc::new(Scripted::new(ProviderId::Pexels).serve("sky", &["https://img.test/sky.png"]));
    let mut orch = orchestrator(&temp, settings(&["sky"], 1), provider)
        .with_lock(ProcessLock::with_probe(lock_path.clone(), 7, Box::new(NothingAlive)));

    let report = orch.run(RunOptions::default()).await.unwrap();

    assert_eq!(report.status, RunStatus::Committed);
    assert!(!lock_path.exists());
}

#[tokio::test]
async fn test_circular_rotation_continues_across_runs() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(
        Scripted::new(ProviderId::Pexels)
            .serve("a", &["https://img.test/a.png"])
            .serve("b", &["https://img.test/b.png"])
            .serve("c", &["https://img.test/c.png"]),
    );
    let mut orch = orchestrator(&temp, settings(&["a", "b", "c"], 2), provider);

    let first = orch.run(RunOptions::default()).await.unwrap();
    let second = orch.run(RunOptions { force: true, ..RunOptions::default() }).await.unwrap();

    let tags: Vec<&str> = first.results.iter().chain(&second.results).map(|r| r.tag.as_str()).collect();
    assert_eq!(tags, vec!["a", "b", "c", "a"]);
    assert_eq!(fs::read_to_string(state_dir(&temp).join(files::TAG_INDEX)).unwrap().trim(), "1");
}
