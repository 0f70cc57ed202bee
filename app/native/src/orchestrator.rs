//! Acquisition orchestrator.
//!
//! One [`Orchestrator::run`] walks through
//! `lock -> interval gate -> connectivity -> eviction -> dispatch -> aggregate
//! -> commit or abort -> unlock`. Every slot gets its tag and provider before
//! any task starts, tasks run concurrently and independently, and the run is
//! only recorded as done when enough of them did not fail.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{TagStrategy, WallfetchConfig};
use crate::connectivity::{ConnectivityProbe, RunConnectivity, TcpProbe};
use crate::constants::{SECONDS_PER_DAY, SECONDS_PER_HOUR, files};
use crate::error::WallfetchError;
use crate::ledger::DedupLedger;
use crate::lock::ProcessLock;
use crate::pipeline::{AcceptancePolicy, FetchFilter, FetchOutcome, SkipReason};
use crate::providers::{ImageProvider, ProviderError, ProviderId, ProviderRegistry};
use crate::retry::RetryPolicy;
use crate::rotation::{self, TagSelector};
use crate::state::{unix_now, write_atomic};
use crate::wallpaper::list_images;

/// Epoch seconds of the last committed run.
#[derive(Debug, Clone)]
pub struct LastRunMarker {
    path: PathBuf,
}

impl LastRunMarker {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self { Self { path } }

    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    /// The recorded timestamp, or `None` if there is no usable marker.
    #[must_use]
    pub fn read(&self) -> Option<f64> {
        let contents = fs::read_to_string(&self.path).ok()?;
        let parsed = contents.trim().parse::<f64>().ok().filter(|value| value.is_finite());
        if parsed.is_none() {
            tracing::warn!(path = %self.path.display(), "ignoring unreadable last-run marker");
        }
        parsed
    }

    /// Records `now` as the time of the last committed run.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    pub fn commit(&self, now: f64) -> io::Result<()> { write_atomic(&self.path, now.to_string().as_bytes()) }
}

/// Run-wide settings derived from the configuration.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub tags: Vec<String>,
    pub tag_strategy: TagStrategy,
    pub images_per_run: usize,
    pub force: bool,
    pub min_interval_seconds: f64,
    pub retention_seconds: f64,
    pub failure_threshold: f64,
    pub max_pages: u32,
    pub tag_suffix: HashMap<ProviderId, String>,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub acceptance: AcceptancePolicy,
    /// `host:port` probed before dispatching, if enabled.
    pub connectivity_host: Option<String>,
    pub request_timeout: Duration,
}

impl RunSettings {
    #[must_use]
    pub fn from_config(config: &WallfetchConfig) -> Self {
        Self {
            tags: config.effective_tags(),
            tag_strategy: config.tag_strategy,
            images_per_run: config.images_per_run,
            force: config.force_download,
            min_interval_seconds: config.run_interval_hours * SECONDS_PER_HOUR,
            retention_seconds: config.retention_days * SECONDS_PER_DAY,
            failure_threshold: config.failure_threshold,
            max_pages: config.max_pages,
            tag_suffix: config.tag_suffix.clone(),
            retry_attempts: config.retry_attempts,
            retry_delay: Duration::from_secs_f64(config.retry_delay_seconds),
            acceptance: AcceptancePolicy {
                target_width: config.target_width,
                target_height: config.target_height,
                tolerance: config.aspect_ratio_tolerance,
                resize: config.resize,
            },
            connectivity_host: config
                .check_internet_connection
                .then(|| config.connectivity_host.clone()),
            request_timeout: Duration::from_secs_f64(config.request_timeout_seconds),
        }
    }
}

/// Per-invocation overrides.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Ignore the run-interval gate.
    pub force: bool,
    /// Search this tag in every slot instead of rotating.
    pub tag_override: Option<String>,
    /// Number of slots; defaults to `imagesPerRun`.
    pub nums: Option<usize>,
}

/// Terminal outcome of one acquisition task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Success(PathBuf),
    Skipped(SkipReason),
    Failed(String),
}

impl TaskOutcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool { matches!(self, Self::Failed(_)) }
}

/// Result of one queue slot.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub slot: usize,
    pub provider: ProviderId,
    pub tag: String,
    pub outcome: TaskOutcome,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    /// The last run is too recent; nothing was dispatched.
    NotDue { last_run: f64, next_due: f64 },
    /// The connectivity probe failed; nothing was dispatched.
    Offline,
    /// Enough slots did not fail; the last-run marker was updated.
    Committed,
    /// Too many slots failed; the marker was left alone.
    Aborted,
}

/// Everything a caller needs to know about a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub results: Vec<TaskResult>,
    pub error_count: usize,
}

impl RunReport {
    const fn without_dispatch(status: RunStatus) -> Self {
        Self { status, results: Vec::new(), error_count: 0 }
    }

    /// Paths of the images saved during the run, in slot order.
    #[must_use]
    pub fn saved(&self) -> Vec<&Path> {
        self.results
            .iter()
            .filter_map(|result| match &result.outcome {
                TaskOutcome::Success(path) => Some(path.as_path()),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|result| matches!(result.outcome, TaskOutcome::Skipped(_))).count()
    }
}

/// A slot with its provider and tag assigned, ready to run.
struct AcquisitionTask {
    slot: usize,
    provider: Arc<dyn ImageProvider>,
    tag: String,
    query: String,
}

/// Owns every collaborator of a run.
pub struct Orchestrator {
    settings: RunSettings,
    registry: ProviderRegistry,
    ledger: Arc<DedupLedger>,
    rotator: Box<dyn TagSelector>,
    retry: RetryPolicy,
    pipeline: Arc<FetchFilter>,
    marker: LastRunMarker,
    lock: ProcessLock,
    connectivity: Option<Box<dyn ConnectivityProbe>>,
    wallpaper_dir: PathBuf,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("wallpaper_dir", &self.wallpaper_dir)
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Wires up the collaborators for runs writing into `wallpaper_dir` and
    /// keeping state in `state_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the retry settings are invalid, no provider is
    /// registered, or the ledger cannot be read.
    pub fn new(
        settings: RunSettings,
        registry: ProviderRegistry,
        wallpaper_dir: PathBuf,
        state_dir: &Path,
    ) -> Result<Self, WallfetchError> {
        if registry.is_empty() {
            return Err(WallfetchError::NoProviders);
        }

        let retry = RetryPolicy::new(settings.retry_attempts, settings.retry_delay)?;
        let ledger = Arc::new(DedupLedger::open(&state_dir.join(files::LEDGER))?);
        let rotator = rotation::open(settings.tag_strategy, state_dir);
        let pipeline = Arc::new(FetchFilter::new(
            Arc::clone(&ledger),
            wallpaper_dir.clone(),
            settings.acceptance,
            retry,
        ));
        let connectivity = settings.connectivity_host.as_ref().map(|host| {
            Box::new(TcpProbe::new(host.clone(), settings.request_timeout)) as Box<dyn ConnectivityProbe>
        });

        Ok(Self {
            marker: LastRunMarker::new(state_dir.join(files::LAST_RUN)),
            lock: ProcessLock::new(state_dir.join(files::LOCK)),
            settings,
            registry,
            ledger,
            rotator,
            retry,
            pipeline,
            connectivity,
            wallpaper_dir,
        })
    }

    /// Replaces the process lock, e.g. to inject a liveness probe.
    #[must_use]
    pub fn with_lock(mut self, lock: ProcessLock) -> Self {
        self.lock = lock;
        self
    }

    /// Replaces the connectivity probe; `None` skips the check.
    #[must_use]
    pub fn with_connectivity(mut self, probe: Option<Box<dyn ConnectivityProbe>>) -> Self {
        self.connectivity = probe;
        self
    }

    #[must_use]
    pub fn ledger(&self) -> &DedupLedger { &self.ledger }

    #[must_use]
    pub const fn marker(&self) -> &LastRunMarker { &self.marker }

    #[must_use]
    pub fn wallpaper_dir(&self) -> &Path { &self.wallpaper_dir }

    /// Performs one run.
    ///
    /// Task failures never surface here; they are counted in the report.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Contended` (wrapped) when another instance owns
    /// the run, and other errors when state cannot be read or written.
    #[allow(clippy::cast_precision_loss)]
    pub async fn run(&mut self, options: RunOptions) -> Result<RunReport, WallfetchError> {
        let _guard = self.lock.acquire()?;

        // Another instance may have run since this one was set up.
        self.ledger.reload()?;
        self.rotator.reload();

        let now = unix_now();
        if !options.force
            && !self.settings.force
            && let Some(status) = self.interval_gate(now)
        {
            tracing::info!("last run is too recent, nothing to do");
            return Ok(RunReport::without_dispatch(status));
        }

        if let Some(probe) = self.connectivity.as_deref() {
            let connectivity = RunConnectivity::new(probe);
            if !connectivity.is_online().await {
                tracing::warn!("no internet connection, skipping run");
                return Ok(RunReport::without_dispatch(RunStatus::Offline));
            }
        }

        self.ledger.evict_older_than(now, self.settings.retention_seconds)?;
        fs::create_dir_all(&self.wallpaper_dir)?;

        let nums = options.nums.unwrap_or(self.settings.images_per_run);
        let mut tasks = Vec::with_capacity(nums);
        for slot in 0..nums {
            let tag = match &options.tag_override {
                Some(tag) => tag.clone(),
                None => self.rotator.next(&self.settings.tags)?,
            };
            let provider = self.registry.pick_random().ok_or(WallfetchError::NoProviders)?;
            let suffix = self.settings.tag_suffix.get(&provider.id()).map_or("", String::as_str);
            let query = format!("{tag}{suffix}");
            tasks.push(AcquisitionTask { slot, provider, tag, query });
        }

        let results = self.dispatch(tasks).await;

        let error_count = results.iter().filter(|result| result.outcome.is_failure()).count();
        let aborted = error_count as f64 >= self.settings.failure_threshold * nums as f64;

        let status = if aborted {
            tracing::warn!(error_count, nums, "too many slots failed, run not recorded");
            RunStatus::Aborted
        } else {
            self.marker.commit(unix_now())?;
            tracing::info!(error_count, nums, "run committed");
            RunStatus::Committed
        };

        Ok(RunReport { status, results, error_count })
    }

    /// Returns `NotDue` if images exist and the last run is recent enough.
    fn interval_gate(&self, now: f64) -> Option<RunStatus> {
        let last_run = self.marker.read()?;
        if list_images(&self.wallpaper_dir).is_empty() {
            return None;
        }

        let next_due = last_run + self.settings.min_interval_seconds;
        (now < next_due).then_some(RunStatus::NotDue { last_run, next_due })
    }

    /// Runs every task concurrently and collects results in slot order.
    async fn dispatch(&self, tasks: Vec<AcquisitionTask>) -> Vec<TaskResult> {
        let mut assigned = Vec::with_capacity(tasks.len());
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            tracing::info!(slot = task.slot, provider = %task.provider.id(), tag = %task.tag, "dispatching");
            assigned.push((task.slot, task.provider.id(), task.tag.clone()));

            let pipeline = Arc::clone(&self.pipeline);
            let retry = self.retry;
            let max_pages = self.settings.max_pages;
            handles.push(tokio::spawn(async move { acquire(task, &pipeline, retry, max_pages).await }));
        }

        let joined = futures::future::join_all(handles).await;

        assigned
            .into_iter()
            .zip(joined)
            .map(|((slot, provider, tag), joined)| {
                let outcome = joined.unwrap_or_else(|err| TaskOutcome::Failed(format!("task aborted: {err}")));
                match &outcome {
                    TaskOutcome::Success(path) => {
                        tracing::info!(slot, %provider, %tag, path = %path.display(), "slot succeeded");
                    }
                    TaskOutcome::Skipped(reason) => {
                        tracing::info!(slot, %provider, %tag, %reason, "slot skipped");
                    }
                    TaskOutcome::Failed(err) => {
                        tracing::warn!(slot, %provider, %tag, error = %err, "slot failed");
                    }
                }
                TaskResult { slot, provider, tag, outcome }
            })
            .collect()
    }
}

/// Pages through search results until one candidate is saved.
///
/// A task that saves nothing is skipped, unless its last candidate could not
/// be downloaded through every retry; that counts as a failure.
async fn acquire(task: AcquisitionTask, pipeline: &FetchFilter, retry: RetryPolicy, max_pages: u32) -> TaskOutcome {
    let provider = task.provider.as_ref();
    let mut last_skip = SkipReason::NoResults;

    for page in 1..=max_pages.max(1) {
        let urls = match retry
            .run_if(|| provider.search(&task.query, page), ProviderError::is_transient)
            .await
        {
            Ok(urls) => urls,
            Err(err) if page == 1 => return TaskOutcome::Failed(format!("search failed: {err}")),
            Err(err) => {
                tracing::warn!(slot = task.slot, page, error = %err, "search failed, stopping");
                break;
            }
        };

        if urls.is_empty() {
            break;
        }

        for url in &urls {
            match pipeline.process(provider, url, &task.tag).await {
                Ok(FetchOutcome::Saved(path)) => return TaskOutcome::Success(path),
                Ok(FetchOutcome::Skipped(reason)) => last_skip = reason,
                Err(err) => return TaskOutcome::Failed(err.to_string()),
            }
        }
    }

    match last_skip {
        SkipReason::Unreachable(err) => {
            TaskOutcome::Failed(format!("download failed after retries: {err}"))
        }
        reason => TaskOutcome::Skipped(reason),
    }
}
