// src/devices/synthetic.rs

//! In-process stand-ins for camera, encoder, face detector and window.
//!
//! Every device reads the same [`SyntheticScene`], so a test (or the headless
//! rehearsal binary) can change what "the camera sees" while an attempt runs:
//! number of faces, brightness, whether the preview has produced a frame yet.

use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    error::AppError,
    media::{
        CaptureStream, DeviceError, MediaConstraints, MediaDevices, StreamHandle, TrackInfo,
        TrackKind, VideoFrame,
    },
    models::{
        artifact::{ANSWER_MIME_TYPE, MediaBlob},
        identity::StillImage,
    },
    proctoring::{BoundingBox, DetectorOptions, FaceDetection, FaceDetector},
    recording::{EncoderSettings, EncodingJob, MediaEncoder},
    screen::Fullscreen,
};

// Frames are kept small; only their average brightness matters.
const FRAME_WIDTH: u32 = 64;
const FRAME_HEIGHT: u32 = 48;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug)]
struct SceneState {
    faces: usize,
    brightness: u8,
    frame_ready: bool,
}

/// What the synthetic camera currently sees. Cloning shares the scene.
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    state: Arc<Mutex<SceneState>>,
}

impl Default for SyntheticScene {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticScene {
    /// One well-lit face, preview ready.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SceneState {
                faces: 1,
                brightness: 128,
                frame_ready: true,
            })),
        }
    }

    pub fn set_faces(&self, faces: usize) {
        lock(&self.state).faces = faces;
    }

    pub fn set_brightness(&self, brightness: u8) {
        lock(&self.state).brightness = brightness;
    }

    pub fn set_frame_ready(&self, ready: bool) {
        lock(&self.state).frame_ready = ready;
    }

    pub fn faces(&self) -> usize {
        lock(&self.state).faces
    }

    pub fn frame(&self) -> Option<VideoFrame> {
        let state = lock(&self.state);
        state.frame_ready.then(|| {
            let b = state.brightness;
            VideoFrame::solid(FRAME_WIDTH, FRAME_HEIGHT, [b, b, b])
        })
    }
}

/// `getUserMedia` over a [`SyntheticScene`].
#[derive(Debug)]
pub struct SyntheticDevices {
    scene: SyntheticScene,
    requests: AtomicUsize,
    next_failure: Mutex<Option<DeviceError>>,
    response_delay: Mutex<Option<Duration>>,
}

impl SyntheticDevices {
    pub fn new(scene: SyntheticScene) -> Self {
        Self {
            scene,
            requests: AtomicUsize::new(0),
            next_failure: Mutex::new(None),
            response_delay: Mutex::new(None),
        }
    }

    /// The next request fails with `error`; later ones succeed again.
    pub fn fail_next(&self, error: DeviceError) {
        *lock(&self.next_failure) = Some(error);
    }

    pub fn set_response_delay(&self, delay: Duration) {
        *lock(&self.response_delay) = Some(delay);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Arc<dyn CaptureStream>, DeviceError> {
        let request = self.requests.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = *lock(&self.response_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = lock(&self.next_failure).take() {
            return Err(error);
        }

        Ok(Arc::new(SyntheticStream::new(
            self.scene.clone(),
            constraints,
            request,
        )))
    }
}

/// A live synthetic capture with one video and (optionally) one audio track.
#[derive(Debug)]
pub struct SyntheticStream {
    scene: SyntheticScene,
    tracks: Mutex<Vec<TrackInfo>>,
    width: u32,
    height: u32,
}

impl SyntheticStream {
    pub fn new(scene: SyntheticScene, constraints: &MediaConstraints, serial: usize) -> Self {
        let mut tracks = vec![TrackInfo {
            id: format!("video-{}", serial),
            kind: TrackKind::Video,
            label: "Synthetic Camera".to_string(),
            live: true,
        }];
        if constraints.audio {
            tracks.push(TrackInfo {
                id: format!("audio-{}", serial),
                kind: TrackKind::Audio,
                label: "Synthetic Microphone".to_string(),
                live: true,
            });
        }

        Self {
            scene,
            tracks: Mutex::new(tracks),
            width: constraints.video.width,
            height: constraints.video.height,
        }
    }

    fn video_live(&self) -> bool {
        lock(&self.tracks)
            .iter()
            .any(|t| t.kind == TrackKind::Video && t.live)
    }
}

impl CaptureStream for SyntheticStream {
    fn tracks(&self) -> Vec<TrackInfo> {
        lock(&self.tracks).clone()
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        if !self.video_live() {
            return None;
        }
        self.scene.frame()
    }

    fn take_photo(&self) -> Option<StillImage> {
        let frame = self.current_frame()?;

        // SOI, a few payload bytes derived from the frame, EOI
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0];
        data.extend(frame.rgba.iter().step_by(64).copied());
        data.extend_from_slice(&[0xFF, 0xD9]);

        Some(StillImage::jpeg(data, self.width, self.height))
    }

    fn stop_track(&self, track_id: &str) {
        if let Some(track) = lock(&self.tracks).iter_mut().find(|t| t.id == track_id) {
            track.live = false;
        }
    }
}

#[derive(Debug, Default)]
struct EncoderCounters {
    started: AtomicUsize,
    finished: AtomicUsize,
    aborted: AtomicUsize,
}

/// Encoder that produces a WebM-looking blob sized by recording length.
#[derive(Debug, Default)]
pub struct SyntheticEncoder {
    counters: Arc<EncoderCounters>,
    fail_next_start: AtomicBool,
}

impl SyntheticEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_start(&self) {
        self.fail_next_start.store(true, Ordering::SeqCst);
    }

    pub fn started(&self) -> usize {
        self.counters.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.counters.finished.load(Ordering::SeqCst)
    }

    pub fn aborted(&self) -> usize {
        self.counters.aborted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaEncoder for SyntheticEncoder {
    async fn start(
        &self,
        stream: &StreamHandle,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn EncodingJob>, AppError> {
        if self.fail_next_start.swap(false, Ordering::SeqCst) {
            return Err(AppError::Media("Encoder refused to start".to_string()));
        }
        if !stream.is_active() {
            return Err(AppError::Media("Stream has no live tracks".to_string()));
        }

        self.counters.started.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticJob {
            counters: self.counters.clone(),
            started_at: Instant::now(),
            bits_per_second: settings.audio_bits_per_second as u64
                + settings.video_bits_per_second as u64,
        }))
    }
}

struct SyntheticJob {
    counters: Arc<EncoderCounters>,
    started_at: Instant,
    bits_per_second: u64,
}

#[async_trait]
impl EncodingJob for SyntheticJob {
    async fn finish(self: Box<Self>) -> Result<MediaBlob, AppError> {
        let elapsed_ms = self.started_at.elapsed().as_millis() as u64;
        // at least one chunk even for an instant stop
        let payload = (self.bits_per_second / 8 * elapsed_ms / 1000).clamp(1024, 4 * 1024 * 1024);

        // EBML magic, then filler
        let mut data = vec![0x1A, 0x45, 0xDF, 0xA3];
        data.resize(payload as usize, 0);

        self.counters.finished.fetch_add(1, Ordering::SeqCst);
        Ok(MediaBlob::new(ANSWER_MIME_TYPE, data))
    }

    fn abort(self: Box<Self>) {
        self.counters.aborted.fetch_add(1, Ordering::SeqCst);
    }
}

/// Reports exactly as many faces as the scene holds, each at high confidence.
#[derive(Debug)]
pub struct SyntheticDetector {
    scene: SyntheticScene,
    fail_loading: AtomicBool,
    detect_calls: AtomicUsize,
    reset_calls: AtomicUsize,
}

impl SyntheticDetector {
    pub fn new(scene: SyntheticScene) -> Self {
        Self {
            scene,
            fail_loading: AtomicBool::new(false),
            detect_calls: AtomicUsize::new(0),
            reset_calls: AtomicUsize::new(0),
        }
    }

    /// Every later `load` fails, as when the model weights cannot be fetched.
    pub fn fail_loading(&self) {
        self.fail_loading.store(true, Ordering::SeqCst);
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) -> usize {
        self.reset_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceDetector for SyntheticDetector {
    async fn load(&self) -> Result<(), AppError> {
        if self.fail_loading.load(Ordering::SeqCst) {
            return Err(AppError::Media("Face detection model failed to load".to_string()));
        }
        Ok(())
    }

    async fn detect(
        &self,
        frame: &VideoFrame,
        _options: &DetectorOptions,
    ) -> Result<Vec<FaceDetection>, AppError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);

        let faces = self.scene.faces();
        let slot = frame.width as f32 / faces.max(1) as f32;
        Ok((0..faces)
            .map(|i| FaceDetection {
                region: BoundingBox {
                    x: i as f32 * slot,
                    y: frame.height as f32 / 4.0,
                    width: slot,
                    height: frame.height as f32 / 2.0,
                },
                score: 0.9,
            })
            .collect())
    }

    fn reset(&self) {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Host window whose fullscreen state can be toggled from outside.
#[derive(Debug, Default)]
pub struct SyntheticScreen {
    fullscreen: AtomicBool,
    refuse: AtomicBool,
    requests: AtomicUsize,
}

impl SyntheticScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later requests are denied, as a browser does without a user gesture.
    pub fn refuse_requests(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    /// Simulates the user leaving fullscreen (e.g. pressing Esc).
    pub fn leave(&self) {
        self.fullscreen.store(false, Ordering::SeqCst);
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fullscreen for SyntheticScreen {
    async fn request_fullscreen(&self) -> Result<(), AppError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(AppError::Media("Fullscreen request denied".to_string()));
        }
        self.fullscreen.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn exit_fullscreen(&self) {
        self.fullscreen.store(false, Ordering::SeqCst);
    }
}
