// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{artifact::AnswerArtifact, identity::StillImage};

/// Everything sent at the end of an attempt.
///
/// Only the summary fields are serialized (`submission_data`); the encoded
/// answers and the identity photo travel as separate multipart parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub assignment: AssignmentSummary,
    pub identity: IdentitySummary,
    pub answers: Vec<AnswerSummary>,
    pub proctoring: ProctoringSummary,
    pub session: SessionTiming,

    #[serde(skip)]
    pub videos: Vec<AnswerArtifact>,

    #[serde(skip)]
    pub identity_photo: Option<StillImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    pub definition_id: String,
    pub jotform_id: String,
    pub course_name: String,
    pub title: String,
    pub total_pages: usize,
    /// ChosenQuestionIndex.
    pub random_number: u32,
    /// Selection bound N.
    pub random_integer: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    pub photo_taken: bool,
    pub photo_size: Option<usize>,
    pub captured_at: Option<DateTime<Utc>>,
}

/// Answer metadata without the media bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSummary {
    pub id: Uuid,
    pub page_number: i64,
    pub question_text: String,
    pub timestamp: DateTime<Utc>,
    pub random_question_number: u32,
    pub video_size: usize,
    pub video_type: String,
}

impl From<&AnswerArtifact> for AnswerSummary {
    fn from(artifact: &AnswerArtifact) -> Self {
        Self {
            id: artifact.id,
            page_number: artifact.page_number,
            question_text: artifact.question_text.clone(),
            timestamp: artifact.created_at,
            random_question_number: artifact.random_question_number,
            video_size: artifact.size,
            video_type: artifact.blob.mime_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProctoringSummary {
    pub face_detected: bool,
    pub multiple_faces: bool,
    pub lighting_issue: bool,
    pub models_loaded: bool,
    pub fullscreen: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTiming {
    pub attempt_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub exam_started_at: Option<DateTime<Utc>>,
    pub submission_time: DateTime<Utc>,
    pub total_recorded_answers: usize,
    pub time_spent_ms: i64,
}
