use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
    },
    thread,
    time::Instant,
};

use super::observers::panic_message;
use super::policy::{CalibratedThresholds, CalibrationPolicy, calibrate};
use super::CalibrationError;
use crate::employees::Population;

/// One calibration run, tagged with the generation that requested it.
pub(crate) struct CalibrationJob {
    pub(crate) generation: u64,
    pub(crate) population: Population,
    pub(crate) policy: CalibrationPolicy,
    pub(crate) cancel: Arc<AtomicBool>,
}

/// Outcome reported back to the owning service.
pub(crate) struct CalibrationMessage {
    pub(crate) generation: u64,
    pub(crate) result: Result<CalibratedThresholds, CalibrationError>,
}

/// Run a job on the current thread. Returns `None` when the job was cancelled.
pub(crate) fn run_job(job: &CalibrationJob) -> Option<CalibrationMessage> {
    if job.cancel.load(Ordering::Relaxed) {
        return None;
    }
    let started_at = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        calibrate(&job.population, &job.policy, &job.cancel)
    }))
    .unwrap_or_else(|payload| {
        Err(CalibrationError::WorkerPanicked(panic_message(
            payload.as_ref(),
        )))
    });
    tracing::debug!(
        "Calibration run {} over {} records finished in {:.2?}",
        job.generation,
        job.population.len(),
        started_at.elapsed()
    );
    let result = match outcome {
        Ok(Some(calibrated)) => Ok(calibrated),
        Ok(None) => return None,
        Err(err) => Err(err),
    };
    Some(CalibrationMessage {
        generation: job.generation,
        result,
    })
}

/// Run a job on a background thread and send its outcome over `tx`.
pub(crate) fn spawn_job(job: CalibrationJob, tx: Sender<CalibrationMessage>) {
    let generation = job.generation;
    let fallback_tx = tx.clone();
    let spawned = thread::Builder::new()
        .name(format!("threshold-calibration-{generation}"))
        .spawn(move || {
            if let Some(message) = run_job(&job) {
                let _ = tx.send(message);
            }
        });
    if let Err(err) = spawned {
        let _ = fallback_tx.send(CalibrationMessage {
            generation,
            result: Err(CalibrationError::WorkerSpawn(err.to_string())),
        });
    }
}
