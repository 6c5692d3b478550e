use crate::{host_of, Candidate, Config, ProbeResult, Protocol, StreamChecker};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

const CHANNEL_CAPACITY: usize = 1000;

pub struct ProbeWorker {
    id: usize,
    checker: Arc<StreamChecker>,
    progress: Arc<ProgressTracker>,
    is_running: Arc<AtomicBool>,
    processed_count: Arc<AtomicUsize>,
    reachable_count: Arc<AtomicUsize>,
    panic_count: Arc<AtomicUsize>,
}

impl ProbeWorker {
    pub fn new(id: usize, checker: Arc<StreamChecker>, progress: Arc<ProgressTracker>) -> Self {
        Self {
            id,
            checker,
            progress,
            is_running: Arc::new(AtomicBool::new(false)),
            processed_count: Arc::new(AtomicUsize::new(0)),
            reachable_count: Arc::new(AtomicUsize::new(0)),
            panic_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn run_with_shared_receiver(
        &self,
        requests: Arc<Mutex<mpsc::Receiver<Candidate>>>,
        results: mpsc::Sender<ProbeResult>,
    ) {
        debug!("Starting probe worker {}", self.id);
        self.is_running.store(true, Ordering::Relaxed);

        loop {
            let candidate = {
                let mut receiver = requests.lock().await;
                receiver.recv().await
            };

            let Some(candidate) = candidate else { break };
            let Some(result) = self.process_candidate(candidate).await else {
                continue;
            };

            if let Err(e) = results.send(result).await {
                error!("Worker {} failed to send result: {}", self.id, e);
                break;
            }
        }

        self.is_running.store(false, Ordering::Relaxed);
        debug!("Probe worker {} stopped", self.id);
    }

    /// Run one check, containing any panic to this candidate.
    async fn process_candidate(&self, candidate: Candidate) -> Option<ProbeResult> {
        let url = candidate.url.clone();
        debug!("Worker {} probing {}", self.id, url);

        match AssertUnwindSafe(self.checker.check(candidate))
            .catch_unwind()
            .await
        {
            Ok(result) => {
                self.processed_count.fetch_add(1, Ordering::Relaxed);
                if result.reachable {
                    self.reachable_count.fetch_add(1, Ordering::Relaxed);
                }
                self.progress.record_completion(result.reachable);
                Some(result)
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Worker {} task for {} panicked: {}", self.id, url, message);
                self.panic_count.fetch_add(1, Ordering::Relaxed);
                self.checker.metrics().record_panic();
                self.progress.record_completion(false);
                None
            }
        }
    }

    pub fn get_stats(&self) -> WorkerStats {
        WorkerStats {
            id: self.id,
            is_running: self.is_running(),
            processed_count: self.processed_count(),
            reachable_count: self.reachable_count.load(Ordering::Relaxed),
            panic_count: self.panic_count.load(Ordering::Relaxed),
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    pub fn processed_count(&self) -> usize {
        self.processed_count.load(Ordering::Relaxed)
    }
}

impl Clone for ProbeWorker {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            checker: self.checker.clone(),
            progress: self.progress.clone(),
            is_running: self.is_running.clone(),
            processed_count: self.processed_count.clone(),
            reachable_count: self.reachable_count.clone(),
            panic_count: self.panic_count.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerStats {
    pub id: usize,
    pub is_running: bool,
    pub processed_count: usize,
    pub reachable_count: usize,
    pub panic_count: usize,
}

/// Fixed set of workers draining one shared queue.
///
/// At most `worker_count` checks are in flight at any time; further
/// candidates wait in the queue. The pool is single-use: once the request
/// side is closed the workers exit and the result channel ends.
pub struct WorkerPool {
    workers: Vec<ProbeWorker>,
    request_sender: Option<mpsc::Sender<Candidate>>,
    result_receiver: mpsc::Receiver<ProbeResult>,
}

impl WorkerPool {
    pub fn new(
        worker_count: usize,
        checker: Arc<StreamChecker>,
        progress: Arc<ProgressTracker>,
    ) -> Self {
        let (request_sender, request_receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let (result_sender, result_receiver) = mpsc::channel(CHANNEL_CAPACITY);

        let workers: Vec<ProbeWorker> = (0..worker_count.max(1))
            .map(|id| ProbeWorker::new(id, checker.clone(), progress.clone()))
            .collect();

        let shared_receiver = Arc::new(Mutex::new(request_receiver));

        for worker in &workers {
            let worker = worker.clone();
            let rx = shared_receiver.clone();
            let tx = result_sender.clone();

            tokio::spawn(async move {
                worker.run_with_shared_receiver(rx, tx).await;
            });
        }

        Self {
            workers,
            request_sender: Some(request_sender),
            result_receiver,
        }
    }

    /// Feed every candidate into the queue from a background task, then close it.
    pub fn submit_all(&mut self, candidates: Vec<Candidate>) {
        let Some(sender) = self.request_sender.take() else {
            error!("Worker pool already closed, dropping {} candidates", candidates.len());
            return;
        };

        tokio::spawn(async move {
            for candidate in candidates {
                if let Err(e) = sender.send(candidate).await {
                    error!("Failed to submit candidate: {}", e);
                    break;
                }
            }
        });
    }

    pub async fn get_result(&mut self) -> Option<ProbeResult> {
        self.result_receiver.recv().await
    }

    pub fn get_worker_stats(&self) -> Vec<WorkerStats> {
        self.workers.iter().map(|w| w.get_stats()).collect()
    }
}

/// Candidates removed before scheduling, by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipStats {
    pub excluded_protocol: usize,
    pub blocked_host: usize,
}

impl SkipStats {
    pub fn total(&self) -> usize {
        self.excluded_protocol + self.blocked_host
    }
}

/// Drop candidates whose protocol is not allowed or whose host is blocked.
pub fn filter_candidates(config: &Config, candidates: Vec<Candidate>) -> (Vec<Candidate>, SkipStats) {
    let mut stats = SkipStats::default();
    let kept = candidates
        .into_iter()
        .filter(|candidate| {
            let protocol = Protocol::from_url(&candidate.url);
            if !config.allows_protocol(protocol) {
                debug!("Skipping {} ({} not allowed)", candidate.url, protocol);
                stats.excluded_protocol += 1;
                return false;
            }
            if config.is_blocked_host(&host_of(&candidate.url)) {
                debug!("Skipping {} (blocked host)", candidate.url);
                stats.blocked_host += 1;
                return false;
            }
            true
        })
        .collect();
    (kept, stats)
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: Vec<ProbeResult>,
    pub skipped: SkipStats,
    pub worker_stats: Vec<WorkerStats>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn reachable(&self) -> usize {
        self.results.iter().filter(|r| r.reachable).count()
    }

    pub fn panicked(&self) -> usize {
        self.worker_stats.iter().map(|w| w.panic_count).sum()
    }
}

pub struct BatchProcessor {
    checker: Arc<StreamChecker>,
}

impl BatchProcessor {
    pub fn new(checker: Arc<StreamChecker>) -> Self {
        Self { checker }
    }

    /// Probe every schedulable candidate and wait for all of them.
    pub async fn process_batch(&self, candidates: Vec<Candidate>) -> BatchReport {
        let start = Instant::now();
        let config = self.checker.config();

        let (candidates, skipped) = filter_candidates(config, candidates);
        if skipped.total() > 0 {
            info!(
                "Skipped {} candidates ({} excluded protocol, {} blocked host)",
                skipped.total(),
                skipped.excluded_protocol,
                skipped.blocked_host
            );
            self.checker.metrics().record_skipped(skipped.total());
        }

        let total = candidates.len();
        info!(
            "Processing batch of {} candidates with {} workers",
            total, config.max_workers
        );

        let progress = Arc::new(ProgressTracker::new(total));
        let reporter = config
            .progress_interval
            .filter(|_| total > 0)
            .map(|interval| spawn_progress_reporter(progress.clone(), interval));

        let mut pool = WorkerPool::new(config.max_workers, self.checker.clone(), progress.clone());
        pool.submit_all(candidates);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = pool.get_result().await {
            results.push(result);
        }

        if let Some(reporter) = reporter {
            reporter.abort();
        }

        let report = BatchReport {
            results,
            skipped,
            worker_stats: pool.get_worker_stats(),
            elapsed: start.elapsed(),
        };

        info!(
            "Batch processing completed in {}. Reachable: {}, Unreachable: {}, Dropped: {}",
            crate::format_duration(report.elapsed),
            report.reachable(),
            report.results.len() - report.reachable(),
            report.panicked()
        );

        report
    }
}

fn spawn_progress_reporter(
    tracker: Arc<ProgressTracker>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        while !tracker.is_complete() {
            ticker.tick().await;
            let progress = tracker.get_progress();
            info!(
                "Progress: {}/{} ({:.1}%) - Reachable: {}, Failed: {}, Rate: {:.1}/s, ETA: {}",
                progress.completed,
                progress.total,
                progress.percent(),
                progress.reachable,
                progress.failed,
                progress.rate,
                progress
                    .eta
                    .map(crate::format_duration)
                    .unwrap_or_else(|| "unknown".to_string())
            );
        }
    })
}

pub struct ProgressTracker {
    total: usize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_completion(&self, reachable: bool) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if !reachable {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get_progress(&self) -> ProgressInfo {
        let completed = self.completed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed();
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { completed as f64 / secs } else { 0.0 };

        ProgressInfo {
            total: self.total,
            completed,
            failed,
            reachable: completed.saturating_sub(failed),
            elapsed,
            rate,
            eta: if completed > 0 && rate > 0.0 {
                let remaining = self.total.saturating_sub(completed);
                Some(Duration::from_secs_f64(remaining as f64 / rate))
            } else {
                None
            },
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Relaxed) >= self.total
    }
}

#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub reachable: usize,
    pub elapsed: Duration,
    pub rate: f64,
    pub eta: Option<Duration>,
}

impl ProgressInfo {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}
