// src/proctoring/mod.rs

//! Face-presence and lighting checks run while the exam step is active.

pub mod monitor;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    config::{DEFAULT_BRIGHTNESS_THRESHOLD, DEFAULT_FACE_INPUT_SIZE, DEFAULT_FACE_SCORE_THRESHOLD},
    error::AppError,
    media::VideoFrame,
    models::proctoring::{AdvisoryKind, FacePresence, Lighting, ProctoringSnapshot},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorOptions {
    pub input_size: u32,
    pub score_threshold: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_FACE_INPUT_SIZE,
            score_threshold: DEFAULT_FACE_SCORE_THRESHOLD,
        }
    }
}

/// Face region in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    pub region: BoundingBox,
    pub score: f32,
}

/// The opaque face-detection capability.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Loads model weights. Called once before the attempt reaches the exam.
    async fn load(&self) -> Result<(), AppError>;

    async fn detect(
        &self,
        frame: &VideoFrame,
        options: &DetectorOptions,
    ) -> Result<Vec<FaceDetection>, AppError>;

    /// Drops any per-stream state kept between detections.
    fn reset(&self) {}
}

/// Counts detections at or above the threshold.
pub fn classify_faces(detections: &[FaceDetection], options: &DetectorOptions) -> FacePresence {
    let confident = detections
        .iter()
        .filter(|d| d.score >= options.score_threshold)
        .count();
    FacePresence::from_count(confident)
}

pub fn classify_lighting(average_luma: f32, threshold: f32) -> Lighting {
    if average_luma < threshold {
        Lighting::Low
    } else {
        Lighting::Adequate
    }
}

/// Snapshot plus the advisory categories it warrants, before de-duplication.
pub fn evaluate(presence: FacePresence, lighting: Lighting) -> (ProctoringSnapshot, Vec<AdvisoryKind>) {
    let snapshot = ProctoringSnapshot::from_classification(presence, lighting);

    let mut advisories = Vec::new();
    match presence {
        FacePresence::NoFace => advisories.push(AdvisoryKind::NoFace),
        FacePresence::MultipleFaces => advisories.push(AdvisoryKind::MultipleFaces),
        FacePresence::OneFace => {}
    }
    if lighting == Lighting::Low {
        advisories.push(AdvisoryKind::LowLight);
    }

    (snapshot, advisories)
}

/// Suppresses a category that already fired less than `min_gap` ago.
#[derive(Debug)]
pub struct AdvisoryGate {
    min_gap: Duration,
    last_emitted: HashMap<AdvisoryKind, Instant>,
}

impl AdvisoryGate {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_emitted: HashMap::new(),
        }
    }

    pub fn admit(&mut self, kind: AdvisoryKind, now: Instant) -> bool {
        if let Some(last) = self.last_emitted.get(&kind) {
            if now.saturating_duration_since(*last) < self.min_gap {
                return false;
            }
        }
        self.last_emitted.insert(kind, now);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub detector: DetectorOptions,
    pub brightness_threshold: f32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(crate::config::DEFAULT_MONITOR_INTERVAL_MS),
            detector: DetectorOptions::default(),
            brightness_threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
        }
    }
}

impl MonitorSettings {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            interval: config.monitor_interval(),
            detector: DetectorOptions {
                input_size: config.face_input_size,
                score_threshold: config.face_score_threshold,
            },
            brightness_threshold: config.brightness_threshold,
        }
    }
}
