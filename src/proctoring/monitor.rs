// src/proctoring/monitor.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::{AdvisoryGate, FaceDetector, MonitorSettings, classify_faces, classify_lighting, evaluate};
use crate::{
    events::{EventSender, SessionEvent},
    media::StreamHandle,
    models::proctoring::{AdvisoryKind, FacePresence, ProctoringSnapshot},
};

/// Outcome of one monitoring tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorReport {
    pub snapshot: ProctoringSnapshot,
    pub presence: FacePresence,
    pub average_luma: f32,
    /// Categories to alert on, already de-duplicated.
    pub advisories: Vec<AdvisoryKind>,
    pub sampled_at: DateTime<Utc>,
}

/// Running monitoring loop. Dropping the handle stops it.
#[derive(Debug)]
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Cancels the pending tick; an in-flight detection is abandoned.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the loop and waits for it to wind down.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Monitoring task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Starts sampling `stream` every `settings.interval`, first tick one interval from now.
pub fn spawn_monitor(
    stream: StreamHandle,
    detector: Arc<dyn FaceDetector>,
    settings: MonitorSettings,
    events: EventSender,
) -> MonitorHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        run_monitor(stream, detector, settings, events, token).await;
    });

    tracing::info!(interval_ms = settings.interval.as_millis() as u64, "Proctoring monitor started");
    MonitorHandle {
        cancel,
        task: Some(task),
    }
}

async fn run_monitor(
    stream: StreamHandle,
    detector: Arc<dyn FaceDetector>,
    settings: MonitorSettings,
    events: EventSender,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut gate = AdvisoryGate::new(settings.interval);

    loop {
        let scheduled = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            scheduled = ticker.tick() => scheduled,
        };

        let report = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            report = sample(&stream, detector.as_ref(), &settings, &mut gate, scheduled) => report,
        };

        if let Some(report) = report {
            if events.send(SessionEvent::Monitor(report)).is_err() {
                tracing::debug!("Session dropped its event queue, stopping monitor");
                break;
            }
        }
    }

    detector.reset();
    tracing::info!("Proctoring monitor stopped");
}

/// One tick. `None` when the preview has no frame yet or detection failed.
/// Advisories are gated on the tick's scheduled instant, not on when detection returned.
async fn sample(
    stream: &StreamHandle,
    detector: &dyn FaceDetector,
    settings: &MonitorSettings,
    gate: &mut AdvisoryGate,
    scheduled: Instant,
) -> Option<MonitorReport> {
    let frame = stream.current_frame()?;

    let detections = match detector.detect(&frame, &settings.detector).await {
        Ok(detections) => detections,
        Err(e) => {
            tracing::warn!("Face detection failed, skipping tick: {}", e);
            return None;
        }
    };

    let presence = classify_faces(&detections, &settings.detector);
    let average_luma = frame.average_luma();
    let lighting = classify_lighting(average_luma, settings.brightness_threshold);
    let (snapshot, candidates) = evaluate(presence, lighting);

    let advisories = candidates
        .into_iter()
        .filter(|kind| gate.admit(*kind, scheduled))
        .collect();

    Some(MonitorReport {
        snapshot,
        presence,
        average_luma,
        advisories,
        sampled_at: Utc::now(),
    })
}
