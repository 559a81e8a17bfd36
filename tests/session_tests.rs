// tests/session_tests.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use common::{Backend, pharma_forms, spawn_app};
use proctor::{
    api::HttpApi,
    config::Config,
    devices::{SyntheticDetector, SyntheticDevices, SyntheticEncoder, SyntheticScene, SyntheticScreen},
    error::AppError,
    events::DeliveryStatus,
    models::target::AttemptTarget,
    notify::{Notice, NoticeQueue},
    recording::StartOutcome,
    session::{FixedDraw, Platform, QuestionView, Session, Step},
};
use serde_json::{Value, json};

const SETTLE: Duration = Duration::from_secs(10);

struct Attempt {
    session: Session,
    scene: SyntheticScene,
    encoder: Arc<SyntheticEncoder>,
    detector: Arc<SyntheticDetector>,
    screen: Arc<SyntheticScreen>,
    notices: Arc<NoticeQueue>,
}

fn attempt(address: &str, question: u32, configure: impl FnOnce(&mut Config)) -> Attempt {
    let mut config = Config {
        api_base_url: address.to_string(),
        monitor_interval_ms: 100,
        ..Config::default()
    };
    configure(&mut config);

    let scene = SyntheticScene::new();
    let encoder = Arc::new(SyntheticEncoder::new());
    let detector = Arc::new(SyntheticDetector::new(scene.clone()));
    let screen = Arc::new(SyntheticScreen::new());
    let notices = Arc::new(NoticeQueue::new());

    let platform = Platform {
        devices: Arc::new(SyntheticDevices::new(scene.clone())),
        detector: detector.clone(),
        encoder: encoder.clone(),
        fullscreen: screen.clone(),
    };
    let api = Arc::new(HttpApi::new(&config).expect("Failed to build client"));

    let session = Session::new(
        AttemptTarget::new("Pharma Assignment Form", "Pharma Compliance Basics"),
        &config,
        platform,
        api,
    )
    .expect("Failed to create session")
    .with_notifier(notices.clone())
    .with_draw(Box::new(FixedDraw(question)));

    Attempt {
        session,
        scene,
        encoder,
        detector,
        screen,
        notices,
    }
}

async fn enter_exam(session: &mut Session) {
    session.acquire_media().await.expect("Media failed");
    session.continue_to_photo().unwrap();
    session.capture_photo().unwrap();
    session.continue_to_verification().unwrap();
    session.start_exam().await.expect("Exam did not start");
}

async fn record_current_page(session: &mut Session) {
    let outcome = session.start_recording().await.expect("Start failed");
    assert!(matches!(outcome, StartOutcome::Started(_)));
    session
        .stop_recording()
        .await
        .expect("Stop failed")
        .expect("No artifact produced");
}

fn titles(notices: &[Notice]) -> Vec<&str> {
    notices.iter().map(|n| n.title.as_str()).collect()
}

#[tokio::test]
async fn scenario_a_records_second_question() {
    // Arrange
    let backend = Backend::with_forms(pharma_forms());
    let address = spawn_app(backend.clone()).await;
    let Attempt {
        mut session,
        screen,
        ..
    } = attempt(&address, 2, |_| {});

    // Act
    enter_exam(&mut session).await;
    let view = session.exam_view().expect("No exam view");
    record_current_page(&mut session).await;
    let settled = session.settle_deliveries(SETTLE).await;

    // Assert
    assert_eq!(view.page_number, 1);
    assert_eq!(view.progress_label(), "Page 1 of 3");
    assert_eq!(
        view.question,
        QuestionView::Paragraph {
            html: "<b>Second</b> question".to_string()
        }
    );
    assert_eq!(view.total_paragraphs, 3);
    assert!(view.recording_required);
    assert!(view.fullscreen);
    assert!(screen.is_fullscreen());

    let answers = session.answers();
    assert_eq!(answers.len(), 1);
    let artifact = answers.iter().next().unwrap();
    assert_eq!(artifact.random_question_number, 2);
    assert_eq!(artifact.page_number, 1);

    assert!(settled);
    assert_eq!(session.deliveries().delivered_answers(), 1);
    let received = backend.answers();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].fields["questionText"], "<b>Second</b> question");
    assert_eq!(received[0].fields["jotformId"], "Pharma Assignment Form");
    assert_eq!(received[0].fields["randomQuestionNumber"], "2");
}

#[tokio::test]
async fn scenario_b_short_pool_shows_not_available() {
    // Arrange
    let address = spawn_app(Backend::with_forms(pharma_forms())).await;
    let Attempt { mut session, .. } = attempt(&address, 3, |_| {});
    enter_exam(&mut session).await;

    // Act
    session.next_page().unwrap();
    let view = session.exam_view().unwrap();

    // Assert
    assert_eq!(view.page_number, 2);
    assert_eq!(view.question, QuestionView::NotAvailable { question_number: 3 });
    assert_eq!(
        view.question.unavailable_message().as_deref(),
        Some("No paragraph available for question 3 on this page.")
    );
    // the marker still asks for an answer
    assert!(view.can_record());
    record_current_page(&mut session).await;
    assert_eq!(
        session.answers().iter().next().unwrap().question_text,
        "No question text"
    );
}

#[tokio::test]
async fn scenario_c_exit_mid_recording_discards_it() {
    // Arrange
    let address = spawn_app(Backend::with_forms(pharma_forms())).await;
    let Attempt {
        mut session,
        encoder,
        screen,
        ..
    } = attempt(&address, 1, |_| {});
    enter_exam(&mut session).await;
    record_current_page(&mut session).await;
    session.next_page().unwrap();
    session.start_recording().await.unwrap();

    // Act
    assert!(!session.exit(false).await);
    assert!(session.recording().is_some());
    let exited = session.exit(true).await;

    // Assert
    assert!(exited);
    assert_eq!(session.step(), &Step::Exited);
    assert_eq!(encoder.aborted(), 1);
    assert_eq!(encoder.finished(), 1);
    let pages: Vec<i64> = session.answers().iter().map(|a| a.page_number).collect();
    assert_eq!(pages, vec![1]);
    assert!(!session.is_media_ready());
    assert!(!session.is_monitoring());
    assert!(!screen.is_fullscreen());
}

#[tokio::test]
async fn paging_is_forward_only_and_blocked_while_recording() {
    // Arrange
    let address = spawn_app(Backend::with_forms(pharma_forms())).await;
    let Attempt { mut session, .. } = attempt(&address, 1, |_| {});
    enter_exam(&mut session).await;

    // Act & Assert
    session.start_recording().await.unwrap();
    assert_eq!(
        session.start_recording().await.unwrap(),
        StartOutcome::AlreadyRecording
    );
    assert!(matches!(
        session.next_page(),
        Err(AppError::InvalidTransition(_))
    ));
    assert!(!session.exam_view().unwrap().can_advance());
    session.stop_recording().await.unwrap();

    // a page keeps its one answer
    assert_eq!(
        session.start_recording().await.unwrap(),
        StartOutcome::AlreadyAnswered
    );
    assert!(session.stop_recording().await.unwrap().is_none());
    assert_eq!(session.answers().len(), 1);

    assert!(session.submit().await.is_err());
    assert!(session.next_page().unwrap());
    assert!(session.next_page().unwrap());
    assert_eq!(session.step(), &Step::Exam { page_index: 2 });
    assert!(!session.next_page().unwrap());
    assert_eq!(session.step(), &Step::Exam { page_index: 2 });

    // page 3 has no recording marker
    assert!(session.start_recording().await.is_err());
}

#[tokio::test]
async fn submit_packages_answers_and_photo() {
    // Arrange
    let backend = Backend::with_forms(pharma_forms());
    let address = spawn_app(backend.clone()).await;
    let Attempt {
        mut session,
        screen,
        ..
    } = attempt(&address, 2, |_| {});
    enter_exam(&mut session).await;
    record_current_page(&mut session).await;
    session.next_page().unwrap();
    record_current_page(&mut session).await;
    session.next_page().unwrap();

    // Act
    let summary = session.submit().await.expect("Submit failed");
    let settled = session.settle_deliveries(SETTLE).await;

    // Assert
    assert_eq!(summary.answers_recorded, 2);
    assert_eq!(summary.total_pages, 3);
    assert_eq!(summary.submission, DeliveryStatus::Pending);
    assert!(matches!(session.step(), Step::Completed(_)));
    assert!(!session.is_media_ready());
    assert!(!screen.is_fullscreen());

    assert!(settled);
    assert_eq!(
        session.deliveries().submission,
        Some(DeliveryStatus::Delivered)
    );

    let submissions = backend.submissions();
    assert_eq!(submissions.len(), 1);
    let received = &submissions[0];
    assert_eq!(received.fields["page_0"], "1");
    assert_eq!(received.fields["page_1"], "2");
    assert_eq!(received.fields["question_1"], "Only two");
    assert!(received.fields.contains_key("timestamp_0"));
    assert_eq!(
        received.files["video_0"].file_name.as_deref(),
        Some("answer_page_1.webm")
    );
    let photo = &received.files["identity_photo"];
    assert_eq!(photo.file_name.as_deref(), Some("identity_photo.jpg"));
    assert_eq!(photo.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(&photo.bytes[..2], &[0xFF, 0xD8]);

    let data: Value = serde_json::from_str(&received.fields["submission_data"]).unwrap();
    assert_eq!(data["assignment"]["title"], "GMP Basics");
    assert_eq!(data["assignment"]["definitionId"], "12");
    assert_eq!(data["assignment"]["randomNumber"], 2);
    assert_eq!(data["assignment"]["randomInteger"], 3);
    assert_eq!(data["assignment"]["totalPages"], 3);
    assert_eq!(data["identity"]["photoTaken"], true);
    assert_eq!(data["answers"].as_array().unwrap().len(), 2);
    assert_eq!(data["session"]["totalRecordedAnswers"], 2);
    assert_eq!(data["proctoring"]["modelsLoaded"], true);
    assert!(data.get("videos").is_none());
}

#[tokio::test]
async fn failed_submission_still_completes() {
    // Arrange
    let backend = Backend::with_forms(pharma_forms());
    backend.fail_uploads(StatusCode::SERVICE_UNAVAILABLE);
    let address = spawn_app(backend.clone()).await;
    let Attempt {
        mut session,
        notices,
        ..
    } = attempt(&address, 1, |_| {});
    enter_exam(&mut session).await;
    record_current_page(&mut session).await;
    session.next_page().unwrap();
    session.next_page().unwrap();

    // Act
    let summary = session.submit().await.expect("Submit must not fail on network errors");
    session.settle_deliveries(SETTLE).await;

    // Assert
    assert!(matches!(session.step(), Step::Completed(s) if s == &summary));
    let report = session.deliveries();
    assert!(matches!(report.submission, Some(DeliveryStatus::Failed(_))));
    assert!(matches!(report.answers[0].status, DeliveryStatus::Failed(_)));
    // the local answer survives the failed upload
    assert_eq!(session.answers().len(), 1);
    assert!(titles(&notices.drain()).contains(&"Submission Failed"));
}

#[tokio::test]
async fn disabled_dispatch_is_skipped() {
    // Arrange
    let backend = Backend::with_forms(pharma_forms());
    let address = spawn_app(backend.clone()).await;
    let Attempt { mut session, .. } =
        attempt(&address, 1, |config| config.submit_assignment_enabled = false);
    enter_exam(&mut session).await;
    session.next_page().unwrap();
    session.next_page().unwrap();

    // Act
    let summary = session.submit().await.unwrap();

    // Assert
    assert_eq!(summary.submission, DeliveryStatus::Skipped);
    assert!(session.settle_deliveries(SETTLE).await);
    assert!(backend.submissions().is_empty());
}

#[tokio::test]
async fn load_error_then_retry() {
    // Arrange
    let backend = Backend::with_forms(json!([]));
    let address = spawn_app(backend.clone()).await;
    let Attempt { mut session, .. } = attempt(&address, 1, |_| {});
    session.acquire_media().await.unwrap();
    session.continue_to_photo().unwrap();
    session.capture_photo().unwrap();
    session.continue_to_verification().unwrap();

    // Act
    let first = session.start_exam().await;
    let step_after_failure = session.step().clone();

    backend.set_forms(json!([{
        "id": 1,
        "jotformName": "Pharma Assignment Form",
        "pages": [{ "page": 1, "elements": [
            { "id": "p", "tagName": "paragraph", "content": "No bound here", "sequence": 1 }
        ]}]
    }]));
    let second = session.start_exam().await;

    backend.set_forms(pharma_forms());
    let third = session.start_exam().await;

    // Assert
    assert!(matches!(first, Err(AppError::NotFound(_))));
    assert!(matches!(
        step_after_failure,
        Step::Verification { last_error: Some(_) }
    ));
    assert!(matches!(second, Err(AppError::DefinitionLoad(_))));
    assert!(third.is_ok());
    assert_eq!(session.step(), &Step::Exam { page_index: 0 });
    assert_eq!(session.question_bound(), Some(3));
}

#[tokio::test]
async fn fullscreen_exit_only_warns() {
    // Arrange
    let address = spawn_app(Backend::with_forms(pharma_forms())).await;
    let Attempt {
        mut session,
        screen,
        notices,
        ..
    } = attempt(&address, 1, |_| {});
    enter_exam(&mut session).await;
    notices.drain();

    // Act
    screen.leave();
    session.on_fullscreen_exited();

    // Assert
    assert_eq!(session.step(), &Step::Exam { page_index: 0 });
    assert!(!session.is_fullscreen());
    let raised = notices.drain();
    assert_eq!(titles(&raised), vec!["Warning: Fullscreen Exited"]);
    assert_eq!(raised[0].id, Some("fullscreen-exit"));

    // still fully usable
    record_current_page(&mut session).await;
    assert!(session.next_page().unwrap());
}

#[tokio::test]
async fn monitoring_updates_snapshot_and_warns() {
    // Arrange
    let address = spawn_app(Backend::with_forms(pharma_forms())).await;
    let Attempt {
        mut session,
        scene,
        notices,
        ..
    } = attempt(&address, 1, |_| {});
    enter_exam(&mut session).await;
    assert!(session.is_monitoring());
    notices.drain();

    // Act
    scene.set_faces(2);
    scene.set_brightness(10);
    let deadline = tokio::time::Instant::now() + SETTLE;
    let mut raised = Vec::new();
    loop {
        session.pump_events();
        raised.extend(notices.drain());
        let snapshot = session.proctoring();
        if snapshot.multiple_faces && snapshot.lighting_issue {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "monitor never reported the new scene"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // Assert
    let snapshot = session.proctoring();
    assert!(snapshot.face_detected);
    assert!(snapshot.multiple_faces);
    assert!(snapshot.lighting_issue);
    assert!(titles(&raised).contains(&"Multiple Faces Detected"));
    assert!(titles(&raised).contains(&"Poor Lighting"));

    // recording is never blocked by advisories
    record_current_page(&mut session).await;
}

#[tokio::test]
async fn detector_load_failure_disables_monitoring() {
    // Arrange
    let backend = Backend::with_forms(pharma_forms());
    let address = spawn_app(backend.clone()).await;
    let Attempt {
        mut session,
        detector,
        ..
    } = attempt(&address, 1, |_| {});
    detector.fail_loading();

    // Act
    enter_exam(&mut session).await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    session.next_page().unwrap();
    session.next_page().unwrap();
    session.submit().await.unwrap();
    session.settle_deliveries(SETTLE).await;

    // Assert
    assert!(!session.models_loaded());
    assert_eq!(detector.detect_calls(), 0);
    let data: Value =
        serde_json::from_str(&backend.submissions()[0].fields["submission_data"]).unwrap();
    assert_eq!(data["proctoring"]["modelsLoaded"], false);
}

#[tokio::test]
async fn refused_fullscreen_does_not_block_exam() {
    // Arrange
    let address = spawn_app(Backend::with_forms(pharma_forms())).await;
    let Attempt {
        mut session,
        screen,
        ..
    } = attempt(&address, 1, |_| {});
    screen.refuse_requests();

    // Act
    enter_exam(&mut session).await;

    // Assert
    assert_eq!(session.step(), &Step::Exam { page_index: 0 });
    assert!(!session.is_fullscreen());
    assert_eq!(screen.request_count(), 1);
}
