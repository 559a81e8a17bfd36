// src/main.rs

//! Headless rehearsal: runs one full attempt against the configured backend
//! with the synthetic camera, encoder, detector and window.

use std::sync::Arc;
use std::time::Duration;

use proctor::{
    api::HttpApi,
    config::Config,
    devices::{SyntheticDetector, SyntheticDevices, SyntheticEncoder, SyntheticScene, SyntheticScreen},
    error::AppError,
    models::target::AttemptTarget,
    recording::StartOutcome,
    session::{Platform, Session},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const ANSWER_LENGTH: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env file included, if present)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "proctor.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Err(e) = run(config).await {
        tracing::error!("Rehearsal failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    let jotform_name = config
        .jotform_name
        .clone()
        .ok_or_else(|| AppError::Config("JOTFORM_NAME must be set".to_string()))?;
    let course_name = config
        .course_name
        .clone()
        .ok_or_else(|| AppError::Config("COURSE_NAME must be set".to_string()))?;

    let scene = SyntheticScene::new();
    let platform = Platform {
        devices: Arc::new(SyntheticDevices::new(scene.clone())),
        detector: Arc::new(SyntheticDetector::new(scene)),
        encoder: Arc::new(SyntheticEncoder::new()),
        fullscreen: Arc::new(SyntheticScreen::new()),
    };
    let api = Arc::new(HttpApi::new(&config)?);
    tracing::info!(base_url = %config.api_base_url, "Backend configured");

    let mut session = Session::new(
        AttemptTarget::new(jotform_name, course_name),
        &config,
        platform,
        api,
    )?;

    session.acquire_media().await?;
    session.continue_to_photo()?;
    session.capture_photo()?;
    session.continue_to_verification()?;
    session.start_exam().await?;

    loop {
        if let Some(view) = session.exam_view() {
            tracing::info!(
                progress = %view.progress_label(),
                selection = %view.selection_label(),
                question = ?view.question,
                "Showing page"
            );
            if view.can_record() {
                match session.start_recording().await? {
                    StartOutcome::Started(_) => {
                        tokio::time::sleep(ANSWER_LENGTH).await;
                        session.stop_recording().await?;
                    }
                    other => tracing::warn!(?other, "Skipping answer for this page"),
                }
            }
        }

        session.pump_events();
        if !session.next_page()? {
            break;
        }
    }

    let summary = session.submit().await?;
    let limit = config.http_timeout().unwrap_or(Duration::from_secs(30));
    let settled = session.settle_deliveries(limit).await;

    let report = session.deliveries();
    tracing::info!(
        attempt_id = %summary.attempt_id,
        answers = summary.answers_recorded,
        delivered = report.delivered_answers(),
        submission = ?report.submission,
        settled,
        "Rehearsal finished"
    );
    Ok(())
}
