// src/models/proctoring.rs

use std::fmt;

use serde::Serialize;

/// Last known proctoring state. Overwritten on every monitoring tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProctoringSnapshot {
    pub face_detected: bool,
    pub multiple_faces: bool,
    pub lighting_issue: bool,
}

/// Result of counting faces in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FacePresence {
    NoFace,
    OneFace,
    MultipleFaces,
}

impl FacePresence {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => FacePresence::NoFace,
            1 => FacePresence::OneFace,
            _ => FacePresence::MultipleFaces,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Lighting {
    Adequate,
    Low,
}

impl ProctoringSnapshot {
    pub fn from_classification(presence: FacePresence, lighting: Lighting) -> Self {
        Self {
            face_detected: presence != FacePresence::NoFace,
            multiple_faces: presence == FacePresence::MultipleFaces,
            lighting_issue: lighting == Lighting::Low,
        }
    }
}

/// Soft proctoring warnings. Never errors, never blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdvisoryKind {
    NoFace,
    MultipleFaces,
    LowLight,
}

impl AdvisoryKind {
    /// Stable notice id, so a UI can replace rather than stack repeated alerts.
    pub fn notice_id(&self) -> &'static str {
        match self {
            AdvisoryKind::NoFace => "face-alert",
            AdvisoryKind::MultipleFaces => "multiple-faces",
            AdvisoryKind::LowLight => "lighting-alert",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AdvisoryKind::NoFace => "Face Not Detected",
            AdvisoryKind::MultipleFaces => "Multiple Faces Detected",
            AdvisoryKind::LowLight => "Poor Lighting",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AdvisoryKind::NoFace => "Please stay visible in the webcam view",
            AdvisoryKind::MultipleFaces => "Only you should be present during the exam",
            AdvisoryKind::LowLight => "Please ensure adequate lighting for face detection",
        }
    }
}

impl fmt::Display for AdvisoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdvisoryKind::NoFace => "no-face",
            AdvisoryKind::MultipleFaces => "multiple-faces",
            AdvisoryKind::LowLight => "low-light",
        })
    }
}
