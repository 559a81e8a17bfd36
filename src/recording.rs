// src/recording.rs

//! Per-question video answers.
//!
//! At most one recording is live at a time. Stopping it turns the encoded
//! buffer into an [`AnswerArtifact`], appends it to the answer collection and
//! hands a copy to the backend in the background.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::{AnswerUpload, AssignmentApi},
    error::AppError,
    events::{EventSender, SessionEvent},
    media::StreamHandle,
    models::{
        artifact::{AnswerArtifact, AnswerCollection, MediaBlob, NO_QUESTION_TEXT, RecordingSession},
        page::ProcessedPage,
        target::AttemptTarget,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    pub mime_type: String,
    pub audio_bits_per_second: u32,
    pub video_bits_per_second: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            mime_type: "video/webm; codecs=vp9,opus".to_string(),
            audio_bits_per_second: 128_000,
            video_bits_per_second: 2_500_000,
        }
    }
}

/// Platform audio+video encoder.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    async fn start(
        &self,
        stream: &StreamHandle,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn EncodingJob>, AppError>;
}

/// One running encode.
#[async_trait]
pub trait EncodingJob: Send {
    /// Flushes every buffered chunk into a single blob.
    async fn finish(self: Box<Self>) -> Result<MediaBlob, AppError>;

    /// Stops encoding and throws the buffered data away.
    fn abort(self: Box<Self>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(RecordingSession),
    AlreadyRecording,
    StreamNotReady,
    /// The page already has its one answer.
    AlreadyAnswered,
}

/// Sends finished answers to `POST /api/submit-answer` without waiting.
/// Outcomes come back through the session event queue.
#[derive(Clone)]
pub struct AnswerUploader {
    api: Arc<dyn AssignmentApi>,
    target: AttemptTarget,
    events: EventSender,
}

impl AnswerUploader {
    pub fn new(api: Arc<dyn AssignmentApi>, target: AttemptTarget, events: EventSender) -> Self {
        Self { api, target, events }
    }

    pub fn forward(&self, artifact: AnswerArtifact) {
        let api = self.api.clone();
        let events = self.events.clone();
        let upload = AnswerUpload::new(artifact, &self.target);

        tokio::spawn(async move {
            let artifact_id = upload.artifact.id;
            let page_number = upload.artifact.page_number;

            let outcome = match api.submit_answer(&upload).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    tracing::error!(%artifact_id, page_number, "Error sending answer to backend: {}", e);
                    Err(e.to_string())
                }
            };

            // the session may already be gone, nothing else to report to
            let _ = events.send(SessionEvent::AnswerDelivery {
                artifact_id,
                page_number,
                outcome,
            });
        });
    }
}

struct ActiveRecording {
    session: RecordingSession,
    job: Box<dyn EncodingJob>,
}

pub struct RecordingController {
    encoder: Arc<dyn MediaEncoder>,
    settings: EncoderSettings,
    uploader: Option<AnswerUploader>,
    active: Option<ActiveRecording>,
}

impl RecordingController {
    pub fn new(encoder: Arc<dyn MediaEncoder>) -> Self {
        Self {
            encoder,
            settings: EncoderSettings::default(),
            uploader: None,
            active: None,
        }
    }

    pub fn with_settings(mut self, settings: EncoderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn set_uploader(&mut self, uploader: AnswerUploader) {
        self.uploader = Some(uploader);
    }

    pub fn active(&self) -> Option<&RecordingSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Begins capturing an answer for the page at 1-based position `page_number`.
    /// Guard failures are reported as outcomes, not errors.
    pub async fn start(
        &mut self,
        page_number: i64,
        stream: Option<&StreamHandle>,
        answers: &AnswerCollection,
    ) -> Result<StartOutcome, AppError> {
        if self.active.is_some() {
            return Ok(StartOutcome::AlreadyRecording);
        }
        let stream = match stream {
            Some(stream) if stream.is_active() => stream,
            _ => return Ok(StartOutcome::StreamNotReady),
        };
        if answers.contains_page(page_number) {
            return Ok(StartOutcome::AlreadyAnswered);
        }

        let job = self.encoder.start(stream, &self.settings).await?;
        let session = RecordingSession {
            page_number,
            started_at: Utc::now(),
        };
        self.active = Some(ActiveRecording { session, job });

        tracing::info!(page_number, "Recording started");
        Ok(StartOutcome::Started(session))
    }

    /// Finalizes the live recording into an artifact for `page`, found at
    /// 1-based position `page_number`. Returns `Ok(None)` when nothing was recording.
    pub async fn stop(
        &mut self,
        page_number: i64,
        page: &ProcessedPage,
        question_index: u32,
        answers: &mut AnswerCollection,
    ) -> Result<Option<AnswerArtifact>, AppError> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };

        if active.session.page_number != page_number {
            tracing::warn!(
                recording_page = active.session.page_number,
                current_page = page_number,
                "Recording page differs from the current page"
            );
        }

        let blob = active.job.finish().await?;
        let artifact = AnswerArtifact {
            id: Uuid::new_v4(),
            page_number: active.session.page_number,
            question_text: page.question_text().unwrap_or(NO_QUESTION_TEXT).to_string(),
            size: blob.size(),
            blob,
            created_at: Utc::now(),
            random_question_number: question_index,
        };

        if !answers.push(artifact.clone()) {
            return Ok(None);
        }

        tracing::info!(
            artifact_id = %artifact.id,
            page_number = artifact.page_number,
            size = artifact.size,
            "Recording saved"
        );

        match &self.uploader {
            Some(uploader) => uploader.forward(artifact.clone()),
            None => tracing::debug!("No uploader configured, answer kept locally"),
        }

        Ok(Some(artifact))
    }

    /// Drops the live recording without producing an artifact.
    pub fn abort(&mut self) -> Option<RecordingSession> {
        let active = self.active.take()?;
        active.job.abort();
        tracing::info!(page_number = active.session.page_number, "Recording discarded");
        Some(active.session)
    }
}
