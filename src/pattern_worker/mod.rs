// src/pattern_worker/mod.rs

//! Off-thread execution of pattern detection.
//!
//! The detection itself is pure (`patterns::detect_patterns`); this module
//! only decides where it runs. A `PatternWorker` owns a dedicated OS
//! thread fed through a message-passing channel so the caller's task never
//! blocks on a long analysis. When the thread cannot be spawned the worker
//! degrades to inline execution, exposed through the
//! `runs_in_background` capability flag; the result/error channel is the
//! same either way, so callers never special-case the strategy.

use log::{debug, error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Instant;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::calendar::Timeframe;
use crate::error::MarketError;
use crate::market_data::FinancialMetrics;
use crate::patterns::{SimplePattern, detect_patterns};

/// Result of one detection run. An empty `patterns` list is a successful
/// "nothing found", distinct from the `MarketError::Worker` failure path.
#[derive(Debug, Clone)]
pub struct PatternReport {
    /// Echo of the request id, so a caller that issued several requests
    /// can discard every report but the latest.
    pub request_id: Uuid,
    pub timeframe: Timeframe,
    pub patterns: Vec<SimplePattern>,
    pub processing_ms: f64,
}

struct DetectJob {
    request_id: Uuid,
    series: Vec<FinancialMetrics>,
    timeframe: Timeframe,
    reply: oneshot::Sender<Result<PatternReport, MarketError>>,
}

/// Handle to the detection thread, or to the inline fallback when no
/// thread could be created.
pub struct PatternWorker {
    jobs: Option<std_mpsc::Sender<DetectJob>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl PatternWorker {
    /// Starts the worker thread, falling back to inline execution if the
    /// spawn fails.
    pub fn spawn() -> Self {
        let (jobs_tx, jobs_rx) = std_mpsc::channel::<DetectJob>();
        match thread::Builder::new()
            .name("pattern-detector".to_string())
            .spawn(move || worker_loop(jobs_rx))
        {
            Ok(handle) => {
                info!("Pattern detection worker thread started.");
                Self {
                    jobs: Some(jobs_tx),
                    worker: Some(handle),
                }
            }
            Err(e) => {
                warn!(
                    "Failed to spawn pattern worker thread: {}. Falling back to inline detection.",
                    e
                );
                Self {
                    jobs: None,
                    worker: None,
                }
            }
        }
    }

    /// Whether detection runs on the background thread (`true`) or inline
    /// on the calling task (`false`).
    pub fn runs_in_background(&self) -> bool {
        self.jobs.is_some()
    }

    /// Submits the series for analysis and awaits the report.
    ///
    /// The worker receives a copy of the series and never mutates shared
    /// state. A newer request logically supersedes an older one: a caller
    /// juggling overlapping requests keeps only the report whose
    /// `request_id` matches its latest submission.
    pub async fn detect(
        &self,
        series: Vec<FinancialMetrics>,
        timeframe: Timeframe,
    ) -> Result<PatternReport, MarketError> {
        let request_id = Uuid::new_v4();
        match &self.jobs {
            Some(jobs) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                jobs.send(DetectJob {
                    request_id,
                    series,
                    timeframe,
                    reply: reply_tx,
                })
                .map_err(|_| MarketError::Worker("worker thread is gone".to_string()))?;
                reply_rx
                    .await
                    .map_err(|_| MarketError::Worker("worker dropped the request".to_string()))?
            }
            None => run_detection(request_id, &series, timeframe),
        }
    }
}

impl Drop for PatternWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(jobs: std_mpsc::Receiver<DetectJob>) {
    while let Ok(job) = jobs.recv() {
        let DetectJob {
            request_id,
            series,
            timeframe,
            reply,
        } = job;
        let result = run_detection(request_id, &series, timeframe);
        if reply.send(result).is_err() {
            debug!("Dropping pattern report for superseded request {}", request_id);
        }
    }
    info!("Pattern worker channel closed. Exiting worker thread.");
}

fn run_detection(
    request_id: Uuid,
    series: &[FinancialMetrics],
    timeframe: Timeframe,
) -> Result<PatternReport, MarketError> {
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| detect_patterns(series)));
    match outcome {
        Ok(patterns) => Ok(PatternReport {
            request_id,
            timeframe,
            patterns,
            processing_ms: started.elapsed().as_secs_f64() * 1000.0,
        }),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "detection panicked".to_string());
            error!("Pattern detection panicked: {}", message);
            Err(MarketError::Worker(message))
        }
    }
}
