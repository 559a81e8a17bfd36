// src/submission.rs

//! Final submission: pure payload assembly plus a never-blocking dispatch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::AssignmentApi,
    events::{DeliveryStatus, EventSender, SessionEvent},
    models::{
        artifact::AnswerCollection,
        definition::AssignmentDefinition,
        identity::IdentityCapture,
        proctoring::ProctoringSnapshot,
        submission::{
            AnswerSummary, AssignmentSummary, IdentitySummary, ProctoringSummary, SessionTiming,
            SubmissionPayload,
        },
        target::AttemptTarget,
    },
};

/// Borrowed view of the session state the payload is built from.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionState<'a> {
    pub attempt_id: Uuid,
    pub target: &'a AttemptTarget,
    pub definition: &'a AssignmentDefinition,
    pub total_pages: usize,
    pub question_index: u32,
    pub question_bound: u32,
    pub identity: &'a IdentityCapture,
    pub answers: &'a AnswerCollection,
    pub proctoring: ProctoringSnapshot,
    pub models_loaded: bool,
    pub fullscreen: bool,
    pub started_at: DateTime<Utc>,
    pub exam_started_at: Option<DateTime<Utc>>,
}

/// Builds the submission. No I/O; the same state and `now` give the same payload.
pub fn assemble(state: &SubmissionState<'_>, now: DateTime<Utc>) -> SubmissionPayload {
    let title = state
        .definition
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| format!("Assignment - {}", state.target.course_name));

    let photo = state.identity.photo();

    SubmissionPayload {
        assignment: AssignmentSummary {
            definition_id: state.definition.id.clone(),
            jotform_id: state.target.jotform_name.clone(),
            course_name: state.target.course_name.clone(),
            title,
            total_pages: state.total_pages,
            random_number: state.question_index,
            random_integer: state.question_bound,
        },
        identity: IdentitySummary {
            photo_taken: state.identity.is_captured(),
            photo_size: photo.map(|p| p.size()),
            captured_at: state.identity.captured_at(),
        },
        answers: state.answers.iter().map(AnswerSummary::from).collect(),
        proctoring: ProctoringSummary {
            face_detected: state.proctoring.face_detected,
            multiple_faces: state.proctoring.multiple_faces,
            lighting_issue: state.proctoring.lighting_issue,
            models_loaded: state.models_loaded,
            fullscreen: state.fullscreen,
        },
        session: SessionTiming {
            attempt_id: state.attempt_id,
            started_at: state.started_at,
            exam_started_at: state.exam_started_at,
            submission_time: now,
            total_recorded_answers: state.answers.len(),
            time_spent_ms: (now - state.started_at).num_milliseconds().max(0),
        },
        videos: state.answers.iter().cloned().collect(),
        identity_photo: photo.cloned(),
    }
}

/// Sends the assembled payload in the background.
pub struct SubmissionDispatcher {
    api: Arc<dyn AssignmentApi>,
    events: EventSender,
    enabled: bool,
}

impl SubmissionDispatcher {
    pub fn new(api: Arc<dyn AssignmentApi>, events: EventSender, enabled: bool) -> Self {
        Self {
            api,
            events,
            enabled,
        }
    }

    /// Starts delivery and returns at once. The outcome arrives later as a
    /// `SubmissionDelivery` event; failures are logged, never raised.
    pub fn dispatch(&self, payload: SubmissionPayload) -> DeliveryStatus {
        log_payload(&payload);

        if !self.enabled {
            tracing::info!("Assignment dispatch disabled, submission kept local");
            return DeliveryStatus::Skipped;
        }

        let api = self.api.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = match api.submit_assignment(&payload).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    tracing::error!("Submission failed: {}", e);
                    Err(e.to_string())
                }
            };
            if events.send(SessionEvent::SubmissionDelivery { outcome }).is_err() {
                tracing::debug!("Session dropped its event queue before the submission settled");
            }
        });

        DeliveryStatus::Pending
    }
}

fn log_payload(payload: &SubmissionPayload) {
    tracing::info!(
        attempt_id = %payload.session.attempt_id,
        jotform = %payload.assignment.jotform_id,
        course = %payload.assignment.course_name,
        total_pages = payload.assignment.total_pages,
        random_number = payload.assignment.random_number,
        random_integer = payload.assignment.random_integer,
        answers = payload.answers.len(),
        photo_taken = payload.identity.photo_taken,
        face_detected = payload.proctoring.face_detected,
        multiple_faces = payload.proctoring.multiple_faces,
        lighting_issue = payload.proctoring.lighting_issue,
        "Assignment submission assembled"
    );
    for answer in &payload.answers {
        tracing::debug!(
            page_number = answer.page_number,
            size_kb = answer.video_size / 1024,
            timestamp = %answer.timestamp,
            "Recorded answer"
        );
    }
}
