// src/session/mod.rs

//! One proctored attempt.
//!
//! Steps run strictly forward: `setup → photo → verification → exam →
//! completed`, with `exited` reachable from any live step. The only way back
//! is `photo → setup`; once the identity photo is confirmed there is none.
//! Background work (monitor ticks, uploads) reports in through the event
//! queue, drained by [`Session::pump_events`].

pub mod selection;
pub mod view;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::{self, AssignmentApi},
    config::Config,
    error::AppError,
    events::{self, DeliveryStatus, EventReceiver, EventSender, SessionEvent},
    media::{AcquireError, MediaAcquisition, MediaConstraints, MediaDevices},
    models::{
        artifact::{AnswerArtifact, AnswerCollection, RecordingSession},
        definition::AssignmentDefinition,
        identity::IdentityCapture,
        page::ProcessedPage,
        proctoring::ProctoringSnapshot,
        target::AttemptTarget,
    },
    notify::{Notice, Notifier, TracingNotifier},
    proctoring::{
        FaceDetector, MonitorSettings,
        monitor::{MonitorHandle, spawn_monitor},
    },
    recording::{AnswerUploader, MediaEncoder, RecordingController, StartOutcome},
    screen::Fullscreen,
    submission::{self, SubmissionDispatcher, SubmissionState},
};

pub use selection::{FixedDraw, QuestionDraw, UniformDraw};
pub use view::{ExamView, QuestionView};

/// Where the attempt currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Setup,
    Photo,
    /// `last_error` holds the reason the previous exam start failed, if any.
    Verification { last_error: Option<String> },
    Exam { page_index: usize },
    Completed(CompletionSummary),
    Exited,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Setup => "setup",
            Step::Photo => "photo",
            Step::Verification { .. } => "verification",
            Step::Exam { .. } => "exam",
            Step::Completed(_) => "completed",
            Step::Exited => "exited",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::Completed(_) | Step::Exited)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSummary {
    pub attempt_id: Uuid,
    pub answers_recorded: usize,
    pub total_pages: usize,
    pub submitted_at: DateTime<Utc>,
    /// Delivery state at the moment of completion; see [`Session::deliveries`] for later updates.
    pub submission: DeliveryStatus,
}

/// Platform capabilities an attempt drives.
#[derive(Clone)]
pub struct Platform {
    pub devices: Arc<dyn MediaDevices>,
    pub detector: Arc<dyn FaceDetector>,
    pub encoder: Arc<dyn MediaEncoder>,
    pub fullscreen: Arc<dyn Fullscreen>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerDelivery {
    pub artifact_id: Uuid,
    pub page_number: i64,
    pub status: DeliveryStatus,
}

/// What the backend has confirmed so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub answers: Vec<AnswerDelivery>,
    pub submission: Option<DeliveryStatus>,
}

impl DeliveryReport {
    fn track_answer(&mut self, artifact: &AnswerArtifact) {
        self.answers.push(AnswerDelivery {
            artifact_id: artifact.id,
            page_number: artifact.page_number,
            status: DeliveryStatus::Pending,
        });
    }

    fn settle_answer(&mut self, artifact_id: Uuid, page_number: i64, status: DeliveryStatus) {
        match self.answers.iter_mut().find(|a| a.artifact_id == artifact_id) {
            Some(entry) => entry.status = status,
            None => self.answers.push(AnswerDelivery {
                artifact_id,
                page_number,
                status,
            }),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.answers.iter().all(|a| a.status.is_settled())
            && self.submission.as_ref().is_none_or(|s| s.is_settled())
    }

    pub fn delivered_answers(&self) -> usize {
        self.answers
            .iter()
            .filter(|a| a.status == DeliveryStatus::Delivered)
            .count()
    }
}

/// Everything fixed at exam entry.
#[derive(Debug)]
struct ExamPlan {
    definition: AssignmentDefinition,
    title: String,
    question_index: u32,
    question_bound: u32,
    pages: Vec<ProcessedPage>,
}

pub struct Session {
    attempt_id: Uuid,
    target: AttemptTarget,
    step: Step,

    media: MediaAcquisition,
    constraints: MediaConstraints,
    media_error: Option<AcquireError>,

    detector: Arc<dyn FaceDetector>,
    models_loaded: Option<bool>,
    monitor_settings: MonitorSettings,
    monitor: Option<MonitorHandle>,

    recorder: RecordingController,
    dispatcher: SubmissionDispatcher,
    api: Arc<dyn AssignmentApi>,

    screen: Arc<dyn Fullscreen>,
    fullscreen: bool,

    notifier: Arc<dyn Notifier>,
    draw: Box<dyn QuestionDraw>,

    events_tx: EventSender,
    events_rx: EventReceiver,

    identity: IdentityCapture,
    plan: Option<ExamPlan>,
    answers: AnswerCollection,
    proctoring: ProctoringSnapshot,
    deliveries: DeliveryReport,

    started_at: DateTime<Utc>,
    exam_started_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        target: AttemptTarget,
        config: &Config,
        platform: Platform,
        api: Arc<dyn AssignmentApi>,
    ) -> Result<Self, AppError> {
        target.validate()?;

        let attempt_id = Uuid::new_v4();
        let (events_tx, events_rx) = events::channel();

        let mut recorder = RecordingController::new(platform.encoder.clone());
        recorder.set_uploader(AnswerUploader::new(
            api.clone(),
            target.clone(),
            events_tx.clone(),
        ));
        let dispatcher = SubmissionDispatcher::new(
            api.clone(),
            events_tx.clone(),
            config.submit_assignment_enabled,
        );

        tracing::info!(
            %attempt_id,
            jotform = %target.jotform_name,
            course = %target.course_name,
            "Attempt created"
        );

        Ok(Self {
            attempt_id,
            target,
            step: Step::Setup,
            media: MediaAcquisition::new(platform.devices).with_timeout(config.media_acquire_timeout()),
            constraints: MediaConstraints::default(),
            media_error: None,
            detector: platform.detector,
            models_loaded: None,
            monitor_settings: MonitorSettings::from_config(config),
            monitor: None,
            recorder,
            dispatcher,
            api,
            screen: platform.fullscreen,
            fullscreen: false,
            notifier: Arc::new(TracingNotifier),
            draw: Box::new(UniformDraw::from_entropy()),
            events_tx,
            events_rx,
            identity: IdentityCapture::default(),
            plan: None,
            answers: AnswerCollection::new(),
            proctoring: ProctoringSnapshot::default(),
            deliveries: DeliveryReport::default(),
            started_at: Utc::now(),
            exam_started_at: None,
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_draw(mut self, draw: Box<dyn QuestionDraw>) -> Self {
        self.draw = draw;
        self
    }

    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    // ---- setup ----

    /// Requests camera and microphone. Loads the face detector the first time.
    /// On failure the attempt stays in setup and the call can be repeated.
    pub async fn acquire_media(&mut self) -> Result<(), AppError> {
        self.ensure(matches!(self.step, Step::Setup), "acquire media")?;
        self.load_models().await;

        match self.media.acquire(&self.constraints).await {
            Ok(_) => {
                self.media_error = None;
                self.notifier.notify(Notice::success(
                    "Camera Ready",
                    "Camera access granted successfully",
                ));
                Ok(())
            }
            Err(reason) => {
                self.notifier
                    .notify(Notice::error("Camera Error", reason.user_message()));
                self.media_error = Some(reason.clone());
                Err(AppError::Acquisition(reason))
            }
        }
    }

    async fn load_models(&mut self) {
        if self.models_loaded.is_some() {
            return;
        }
        match self.detector.load().await {
            Ok(()) => {
                tracing::info!("Face detection models loaded");
                self.models_loaded = Some(true);
            }
            Err(e) => {
                tracing::warn!("Error loading face detection models, proctoring disabled: {}", e);
                self.models_loaded = Some(false);
            }
        }
    }

    pub fn continue_to_photo(&mut self) -> Result<(), AppError> {
        self.ensure(matches!(self.step, Step::Setup), "continue to the photo step")?;
        if !self.media.is_ready() {
            return Err(AppError::InvalidTransition(
                "Camera and microphone are not ready".to_string(),
            ));
        }
        self.advance(Step::Photo);
        Ok(())
    }

    // ---- photo ----

    pub fn capture_photo(&mut self) -> Result<(), AppError> {
        self.ensure(matches!(self.step, Step::Photo), "capture a photo")?;

        let stream = self
            .media
            .stream()
            .ok_or_else(|| AppError::Media("Camera is not ready".to_string()))?;
        let photo = stream
            .take_photo()
            .ok_or_else(|| AppError::Media("No preview frame available yet".to_string()))?;

        let size = photo.size();
        self.identity.replace(photo, Utc::now());
        tracing::info!(attempt_id = %self.attempt_id, size, "Identity photo captured");
        self.notifier.notify(Notice::success(
            "Photo Captured",
            "Your photo has been captured successfully",
        ));
        Ok(())
    }

    pub fn retake_photo(&mut self) -> Result<(), AppError> {
        self.ensure(matches!(self.step, Step::Photo), "retake the photo")?;
        self.identity.clear();
        Ok(())
    }

    /// The one backward move: photo back to setup.
    pub fn back(&mut self) -> Result<(), AppError> {
        self.ensure(matches!(self.step, Step::Photo), "go back")?;
        self.advance(Step::Setup);
        Ok(())
    }

    /// Confirms the identity photo. It cannot change afterwards.
    pub fn continue_to_verification(&mut self) -> Result<(), AppError> {
        self.ensure(matches!(self.step, Step::Photo), "continue to verification")?;
        if !self.identity.is_captured() {
            return Err(AppError::InvalidTransition(
                "Take a photo before continuing".to_string(),
            ));
        }
        self.identity.freeze();
        self.advance(Step::Verification { last_error: None });
        Ok(())
    }

    // ---- exam entry ----

    /// Loads the assignment, draws the question index, then enters fullscreen
    /// and starts monitoring. A load failure keeps the attempt in
    /// verification with the reason recorded; calling again retries.
    pub async fn start_exam(&mut self) -> Result<(), AppError> {
        self.ensure(matches!(self.step, Step::Verification { .. }), "start the exam")?;

        let plan = match self.load_plan().await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(attempt_id = %self.attempt_id, "Error fetching jotform data: {}", e);
                self.step = Step::Verification {
                    last_error: Some(e.user_message()),
                };
                self.notifier
                    .notify(Notice::error("Error", "Failed to load assignment content"));
                return Err(e);
            }
        };

        tracing::info!(
            attempt_id = %self.attempt_id,
            definition_id = %plan.definition.id,
            pages = plan.pages.len(),
            random_integer = plan.question_bound,
            random_number = plan.question_index,
            "Assignment loaded"
        );
        self.notifier.notify(Notice::success(
            "Assignment Loaded",
            format!(
                "Assignment loaded. Showing question {} from each page.",
                plan.question_index
            ),
        ));

        self.plan = Some(plan);
        self.exam_started_at = Some(Utc::now());
        self.advance(Step::Exam { page_index: 0 });

        self.enter_fullscreen().await;
        self.start_monitor();
        Ok(())
    }

    async fn load_plan(&mut self) -> Result<ExamPlan, AppError> {
        let definition =
            api::fetch_definition(self.api.as_ref(), &self.target.jotform_name).await?;
        if definition.pages.is_empty() {
            return Err(AppError::DefinitionLoad(format!(
                "Jotform {} has no pages",
                definition.jotform_name
            )));
        }

        let question_bound = selection::selection_bound(&definition)?;
        let question_index = self.draw.draw(question_bound);
        let pages = selection::process_pages(&definition, question_index);

        let title = definition
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Assignment - {}", self.target.course_name));

        Ok(ExamPlan {
            definition,
            title,
            question_index,
            question_bound,
            pages,
        })
    }

    async fn enter_fullscreen(&mut self) {
        match self.screen.request_fullscreen().await {
            Ok(()) => {
                self.fullscreen = true;
                self.notifier.notify(Notice::info(
                    "Exam Mode Activated",
                    "You are now in secure exam mode",
                ));
            }
            Err(e) => tracing::warn!(attempt_id = %self.attempt_id, "Fullscreen unavailable: {}", e),
        }
    }

    fn start_monitor(&mut self) {
        if self.models_loaded != Some(true) {
            tracing::warn!(attempt_id = %self.attempt_id, "Face detection unavailable, monitoring disabled");
            return;
        }
        let Some(stream) = self.media.stream().cloned() else {
            tracing::warn!(attempt_id = %self.attempt_id, "No live stream, monitoring disabled");
            return;
        };

        self.monitor = Some(spawn_monitor(
            stream,
            self.detector.clone(),
            self.monitor_settings,
            self.events_tx.clone(),
        ));
    }

    // ---- exam ----

    /// Moves one page forward. `Ok(false)` on the last page.
    pub fn next_page(&mut self) -> Result<bool, AppError> {
        let Step::Exam { page_index } = self.step else {
            return Err(self.rejected("move to the next page"));
        };
        if self.recorder.is_recording() {
            return Err(AppError::InvalidTransition(
                "Stop the recording before moving to the next page".to_string(),
            ));
        }
        if page_index + 1 >= self.total_pages() {
            return Ok(false);
        }

        self.step = Step::Exam {
            page_index: page_index + 1,
        };
        tracing::debug!(attempt_id = %self.attempt_id, page_index = page_index + 1, "Page advanced");
        self.notifier.notify(Notice::info(
            "Next Page",
            format!("Moved to page {}", page_index + 2),
        ));
        Ok(true)
    }

    /// Starts the answer recording for the current page.
    /// Already recording, no live stream and already answered are reported
    /// as outcomes and change nothing.
    pub async fn start_recording(&mut self) -> Result<StartOutcome, AppError> {
        let Step::Exam { page_index } = self.step else {
            return Err(self.rejected("start recording"));
        };
        let page = self
            .current_page()
            .ok_or_else(|| self.rejected("start recording"))?;
        if !page.has_video_recording {
            return Err(AppError::InvalidTransition(
                "This page does not take a video answer".to_string(),
            ));
        }
        let page_number = answer_page_number(page_index);

        let outcome = self
            .recorder
            .start(page_number, self.media.stream(), &self.answers)
            .await;

        match &outcome {
            Ok(StartOutcome::Started(_)) => self.notifier.notify(Notice::info(
                "Recording Started",
                "Recording your video answer...",
            )),
            Ok(other) => tracing::debug!(page_number, ?other, "Recording not started"),
            Err(e) => {
                tracing::error!(page_number, "Error starting recording: {}", e);
                self.notifier.notify(Notice::error(
                    "Recording Failed",
                    "Failed to start recording. Please try again.",
                ));
            }
        }
        outcome
    }

    /// Finalizes the live recording into the current page's answer.
    /// `Ok(None)` when nothing was recording.
    pub async fn stop_recording(&mut self) -> Result<Option<AnswerArtifact>, AppError> {
        let Step::Exam { page_index } = self.step else {
            return Err(self.rejected("stop recording"));
        };
        let plan = self
            .plan
            .as_ref()
            .ok_or_else(|| AppError::Internal("Exam step without a loaded plan".to_string()))?;
        let page = plan
            .pages
            .get(page_index)
            .ok_or_else(|| AppError::Internal(format!("No page at index {}", page_index)))?;

        let artifact = self
            .recorder
            .stop(
                answer_page_number(page_index),
                page,
                plan.question_index,
                &mut self.answers,
            )
            .await?;

        if let Some(artifact) = &artifact {
            self.deliveries.track_answer(artifact);
            self.notifier.notify(Notice::success(
                "Recording Saved",
                format!("Answer recorded for page {}", artifact.page_number),
            ));
        }
        Ok(artifact)
    }

    /// Assembles and dispatches the submission from the last page, then tears
    /// the attempt down. Completes regardless of the delivery outcome.
    pub async fn submit(&mut self) -> Result<CompletionSummary, AppError> {
        let Step::Exam { page_index } = self.step else {
            return Err(self.rejected("submit"));
        };
        if self.recorder.is_recording() {
            return Err(AppError::InvalidTransition(
                "Stop the recording before submitting".to_string(),
            ));
        }
        if page_index + 1 < self.total_pages() {
            return Err(AppError::InvalidTransition(
                "The assignment can only be submitted from the last page".to_string(),
            ));
        }

        // latest monitor reports feed the final snapshot
        self.pump_events();

        let now = Utc::now();
        let state = self
            .submission_state()
            .ok_or_else(|| AppError::Internal("Exam step without a loaded plan".to_string()))?;
        let payload = submission::assemble(&state, now);
        let status = self.dispatcher.dispatch(payload);
        self.deliveries.submission = Some(status.clone());

        self.teardown().await;

        let summary = CompletionSummary {
            attempt_id: self.attempt_id,
            answers_recorded: self.answers.len(),
            total_pages: self.total_pages(),
            submitted_at: now,
            submission: status,
        };
        self.advance(Step::Completed(summary.clone()));
        self.notifier.notify(Notice::success(
            "Assignment Submitted",
            format!("{} recorded answers submitted", summary.answers_recorded),
        ));
        Ok(summary)
    }

    fn submission_state(&self) -> Option<SubmissionState<'_>> {
        let plan = self.plan.as_ref()?;
        Some(SubmissionState {
            attempt_id: self.attempt_id,
            target: &self.target,
            definition: &plan.definition,
            total_pages: plan.pages.len(),
            question_index: plan.question_index,
            question_bound: plan.question_bound,
            identity: &self.identity,
            answers: &self.answers,
            proctoring: self.proctoring,
            models_loaded: self.models_loaded(),
            fullscreen: self.fullscreen,
            started_at: self.started_at,
            exam_started_at: self.exam_started_at,
        })
    }

    // ---- leaving ----

    /// Abandons the attempt. A live recording is discarded, not saved.
    /// Returns false when not confirmed or already finished.
    pub async fn exit(&mut self, confirmed: bool) -> bool {
        if !confirmed {
            tracing::debug!(attempt_id = %self.attempt_id, "Exit cancelled");
            return false;
        }
        if self.step.is_terminal() {
            return false;
        }

        if let Some(discarded) = self.recorder.abort() {
            tracing::info!(
                attempt_id = %self.attempt_id,
                page_number = discarded.page_number,
                "Discarded in-flight recording on exit"
            );
        }
        self.teardown().await;
        self.advance(Step::Exited);
        true
    }

    /// Stops monitoring, leaves fullscreen and releases the stream.
    async fn teardown(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.shutdown().await;
        }
        if self.fullscreen {
            self.screen.exit_fullscreen().await;
            self.fullscreen = false;
        }
        self.media.release();
    }

    /// The host window left fullscreen. Warns; never changes the step.
    pub fn on_fullscreen_exited(&mut self) {
        if !self.fullscreen {
            return;
        }
        self.fullscreen = false;
        tracing::warn!(attempt_id = %self.attempt_id, step = self.step.name(), "Fullscreen exited");

        if matches!(self.step, Step::Exam { .. }) {
            self.notifier.notify(
                Notice::warning(
                    "Warning: Fullscreen Exited",
                    "Exiting fullscreen mode may be flagged as suspicious activity",
                )
                .with_id("fullscreen-exit"),
            );
        }
    }

    // ---- background completions ----

    /// Applies every queued background completion. Returns how many were handled.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            handled += 1;
        }
        handled
    }

    /// Waits until every upload has an outcome, or `limit` passes.
    /// Returns whether everything settled.
    pub async fn settle_deliveries(&mut self, limit: Duration) -> bool {
        self.pump_events();
        let deadline = tokio::time::Instant::now() + limit;

        while !self.deliveries.is_settled() {
            match tokio::time::timeout_at(deadline, self.events_rx.recv()).await {
                Ok(Some(event)) => self.apply(event),
                Ok(None) | Err(_) => break,
            }
        }
        self.deliveries.is_settled()
    }

    fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Monitor(report) => {
                // a report from a loop that is being torn down is stale
                if !matches!(self.step, Step::Exam { .. }) {
                    return;
                }
                self.proctoring = report.snapshot;
                for kind in report.advisories {
                    self.notifier.notify(
                        Notice::warning(kind.title(), kind.message()).with_id(kind.notice_id()),
                    );
                }
            }
            SessionEvent::AnswerDelivery {
                artifact_id,
                page_number,
                outcome,
            } => {
                self.deliveries.settle_answer(
                    artifact_id,
                    page_number,
                    DeliveryStatus::from_outcome(outcome),
                );
            }
            SessionEvent::SubmissionDelivery { outcome } => {
                if outcome.is_err() {
                    self.notifier.notify(Notice::error(
                        "Submission Failed",
                        "Failed to submit assignment. Check the logs for details.",
                    ));
                }
                self.deliveries.submission = Some(DeliveryStatus::from_outcome(outcome));
            }
        }
    }

    // ---- queries ----

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    pub fn target(&self) -> &AttemptTarget {
        &self.target
    }

    pub fn media_error(&self) -> Option<&AcquireError> {
        self.media_error.as_ref()
    }

    pub fn is_media_ready(&self) -> bool {
        self.media.is_ready()
    }

    pub fn models_loaded(&self) -> bool {
        self.models_loaded == Some(true)
    }

    pub fn identity(&self) -> &IdentityCapture {
        &self.identity
    }

    pub fn answers(&self) -> &AnswerCollection {
        &self.answers
    }

    pub fn proctoring(&self) -> ProctoringSnapshot {
        self.proctoring
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.as_ref().is_some_and(|m| m.is_running())
    }

    pub fn recording(&self) -> Option<&RecordingSession> {
        self.recorder.active()
    }

    pub fn deliveries(&self) -> &DeliveryReport {
        &self.deliveries
    }

    pub fn question_index(&self) -> Option<u32> {
        self.plan.as_ref().map(|p| p.question_index)
    }

    pub fn question_bound(&self) -> Option<u32> {
        self.plan.as_ref().map(|p| p.question_bound)
    }

    pub fn pages(&self) -> &[ProcessedPage] {
        self.plan.as_ref().map(|p| p.pages.as_slice()).unwrap_or(&[])
    }

    pub fn total_pages(&self) -> usize {
        self.pages().len()
    }

    pub fn current_page(&self) -> Option<&ProcessedPage> {
        match self.step {
            Step::Exam { page_index } => self.pages().get(page_index),
            _ => None,
        }
    }

    /// Render-ready state of the current exam page.
    pub fn exam_view(&self) -> Option<ExamView> {
        let Step::Exam { page_index } = self.step else {
            return None;
        };
        let plan = self.plan.as_ref()?;
        let page = plan.pages.get(page_index)?;
        let recording = self
            .recorder
            .active()
            .filter(|r| r.page_number == answer_page_number(page_index));

        Some(ExamView {
            title: plan.title.clone(),
            course_name: self.target.course_name.clone(),
            page_number: page.page_number,
            position: page_index + 1,
            total_pages: plan.pages.len(),
            question_number: plan.question_index,
            question_bound: plan.question_bound,
            total_paragraphs: page.total_paragraphs,
            question: QuestionView::for_page(page, plan.question_index),
            recording_required: page.has_video_recording,
            answered: self.answers.contains_page(answer_page_number(page_index)),
            recording_elapsed_secs: recording.map(|r| r.elapsed_secs(Utc::now())),
            is_last_page: page_index + 1 == plan.pages.len(),
            fullscreen: self.fullscreen,
            monitoring: self.is_monitoring(),
            proctoring: self.proctoring,
            recorded_answers: self.answers.len(),
        })
    }

    // ---- helpers ----

    fn ensure(&self, allowed: bool, action: &str) -> Result<(), AppError> {
        if allowed {
            Ok(())
        } else {
            Err(self.rejected(action))
        }
    }

    fn rejected(&self, action: &str) -> AppError {
        AppError::InvalidTransition(format!(
            "Cannot {} during the {} step",
            action,
            self.step.name()
        ))
    }

    fn advance(&mut self, next: Step) {
        tracing::info!(
            attempt_id = %self.attempt_id,
            from = self.step.name(),
            to = next.name(),
            "Step changed"
        );
        self.step = next;
    }
}

/// Answers are keyed by the page's 1-based position, not its authored `page` value.
fn answer_page_number(page_index: usize) -> i64 {
    page_index as i64 + 1
}
