//! Threshold calibration service.
//!
//! The service owns the authoritative [`ThresholdSet`] and the calibrating
//! flag. Runs are tagged with a generation; starting a new run cancels the
//! previous one, and any result that arrives for a superseded generation is
//! dropped in [`ThresholdCalibrationService::poll`]. Results are only applied
//! on the owner's thread, so readers never see a half-swapped state.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CalibrationSettings;
use crate::employees::{EmployeeId, Population};
use crate::risk::{ThresholdSet, ThresholdSnapshot};

mod observers;
mod policy;
mod worker;

pub use observers::Subscription;
pub use policy::{CalibratedThresholds, CalibrationBasis, CalibrationPolicy, calibrate};

use observers::ObserverRegistry;
use worker::{CalibrationJob, CalibrationMessage};

/// Failures delivered on the error channel. Never returned to `start`/`poll` callers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    /// The backend sent a probability outside `[0, 1]`.
    #[error("Employee {id} has churn probability {value} outside [0, 1]")]
    ProbabilityOutOfRange { id: EmployeeId, value: f64 },
    /// The configured policy cannot produce valid thresholds.
    #[error("Invalid calibration policy: {reason}")]
    InvalidPolicy { reason: String },
    /// The calibration computation panicked.
    #[error("Calibration worker panicked: {0}")]
    WorkerPanicked(String),
    /// The background thread could not be started.
    #[error("Failed to start calibration worker: {0}")]
    WorkerSpawn(String),
}

/// Where calibration runs execute.
///
/// Config values: `background`, `deferred`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationMode {
    /// One worker thread per run; results are applied on the next `poll`.
    #[default]
    Background,
    /// The latest requested run executes inside the next `poll`.
    Deferred,
}

struct InFlight {
    generation: u64,
    population: Population,
    cancel: Arc<AtomicBool>,
}

/// Single writer of the published thresholds and the calibrating flag.
pub struct ThresholdCalibrationService {
    policy: CalibrationPolicy,
    mode: CalibrationMode,
    thresholds: ThresholdSet,
    calibrating: bool,
    generation: u64,
    in_flight: Option<InFlight>,
    pending: Option<CalibrationJob>,
    result_tx: Sender<CalibrationMessage>,
    result_rx: Receiver<CalibrationMessage>,
    published: ObserverRegistry<ThresholdSet>,
    failures: ObserverRegistry<CalibrationError>,
}

impl ThresholdCalibrationService {
    /// Create a service holding the default thresholds at version 0.
    pub fn new(policy: CalibrationPolicy, mode: CalibrationMode) -> Self {
        let (result_tx, result_rx) = mpsc::channel();
        Self {
            policy,
            mode,
            thresholds: ThresholdSet::defaults(),
            calibrating: false,
            generation: 0,
            in_flight: None,
            pending: None,
            result_tx,
            result_rx,
            published: ObserverRegistry::new(),
            failures: ObserverRegistry::new(),
        }
    }

    /// Create a service from the `[calibration]` section of `config.toml`.
    pub fn from_settings(settings: &CalibrationSettings) -> Self {
        Self::new(settings.policy(), settings.mode)
    }

    pub fn policy(&self) -> &CalibrationPolicy {
        &self.policy
    }

    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    /// Last published threshold set.
    pub fn thresholds(&self) -> ThresholdSet {
        self.thresholds
    }

    /// True between `start` and the publication (or failure) of its result.
    pub fn is_calibrating(&self) -> bool {
        self.calibrating
    }

    pub fn snapshot(&self) -> ThresholdSnapshot {
        ThresholdSnapshot {
            thresholds: self.thresholds,
            calibrating: self.calibrating,
        }
    }

    /// Begin calibrating against `population`.
    ///
    /// A repeated call for the population that is already being calibrated is
    /// ignored. Any other call cancels the in-flight run and starts over.
    pub fn start(&mut self, population: Population) {
        if let Some(in_flight) = self.in_flight.as_ref()
            && Arc::ptr_eq(&in_flight.population, &population)
        {
            tracing::debug!(
                "Calibration {} already running for this population",
                in_flight.generation
            );
            return;
        }
        self.cancel_in_flight();
        self.generation += 1;
        let cancel = Arc::new(AtomicBool::new(false));
        let job = CalibrationJob {
            generation: self.generation,
            population: Arc::clone(&population),
            policy: self.policy.clone(),
            cancel: Arc::clone(&cancel),
        };
        self.in_flight = Some(InFlight {
            generation: self.generation,
            population,
            cancel,
        });
        self.calibrating = true;
        tracing::info!(
            "Calibration {} started over {} records",
            self.generation,
            job.population.len()
        );
        match self.mode {
            CalibrationMode::Background => worker::spawn_job(job, self.result_tx.clone()),
            CalibrationMode::Deferred => self.pending = Some(job),
        }
    }

    /// Halt calibration. The last published thresholds stay in place.
    pub fn stop(&mut self) {
        if self.in_flight.is_none() {
            return;
        }
        self.cancel_in_flight();
        self.calibrating = false;
        tracing::info!(
            "Calibration stopped; keeping thresholds version {}",
            self.thresholds.version()
        );
    }

    /// Run deferred work and apply finished results. Returns how many results were applied.
    pub fn poll(&mut self) -> usize {
        if let Some(job) = self.pending.take()
            && let Some(message) = worker::run_job(&job)
        {
            let _ = self.result_tx.send(message);
        }
        let mut applied = 0;
        while let Ok(message) = self.result_rx.try_recv() {
            if self.apply(message) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until the in-flight run has been applied or `timeout` elapses.
    ///
    /// Returns `true` when no run is in flight on return.
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.poll();
            if self.in_flight.is_none() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.result_rx.recv_timeout(remaining) {
                Ok(message) => {
                    self.apply(message);
                }
                Err(_) => return self.in_flight.is_none(),
            }
        }
    }

    /// Register a callback for every published threshold set.
    ///
    /// Callbacks run synchronously inside `poll`, after the swap, in
    /// registration order. A panicking callback is logged and skipped.
    pub fn subscribe(&self, callback: impl Fn(&ThresholdSet) + 'static) -> Subscription {
        self.published.subscribe(callback)
    }

    /// Register a callback for failed calibration runs.
    pub fn subscribe_errors(&self, callback: impl Fn(&CalibrationError) + 'static) -> Subscription {
        self.failures.subscribe(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.published.len()
    }

    fn cancel_in_flight(&mut self) {
        self.pending = None;
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.store(true, Ordering::Relaxed);
            tracing::debug!("Cancelled calibration {}", in_flight.generation);
        }
    }

    fn apply(&mut self, message: CalibrationMessage) -> bool {
        let current = self.in_flight.as_ref().map(|in_flight| in_flight.generation);
        if current != Some(message.generation) {
            tracing::debug!(
                "Discarding stale calibration {} (current {:?})",
                message.generation,
                current
            );
            return false;
        }
        self.in_flight = None;
        match message.result {
            Ok(calibrated) => {
                self.thresholds = calibrated
                    .thresholds
                    .with_version(self.thresholds.version() + 1);
                self.calibrating = false;
                tracing::info!(
                    "Published thresholds v{}: medium {:.4}, high {:.4} ({:?})",
                    self.thresholds.version(),
                    self.thresholds.medium_risk(),
                    self.thresholds.high_risk(),
                    calibrated.basis
                );
                let published = self.thresholds;
                self.published.notify(&published);
            }
            Err(error) => {
                self.calibrating = false;
                tracing::warn!(
                    "Calibration {} failed; keeping thresholds v{}: {error}",
                    message.generation,
                    self.thresholds.version()
                );
                self.failures.notify(&error);
            }
        }
        true
    }
}

impl Default for ThresholdCalibrationService {
    fn default() -> Self {
        Self::new(CalibrationPolicy::default(), CalibrationMode::default())
    }
}

impl Drop for ThresholdCalibrationService {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}
