//! Caption session: wires audio capture, recognition, throttling, the
//! transcript, and the optional relay into one start/stop lifecycle.

use crate::audio::router::AudioSourceRouter;
use crate::audio::source::CaptureBackend;
use crate::error::{LivecapError, Result};
use crate::recognize::engine::{EngineErrorKind, EngineEvent, RecognitionEngine};
use crate::recognize::throttle;
use crate::relay::service::RelayService;
use crate::transcript::Transcript;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

struct ActiveSession {
    throttle: throttle::ThrottleHandle,
    event_pump: JoinHandle<()>,
    display_pump: JoinHandle<()>,
}

/// Drives one live-captioning session at a time.
///
/// `start` opens a recognition stream, routes captured audio into it,
/// and pumps recognition events through the display throttle into the
/// transcript. When a relay is attached, every display update is also
/// broadcast to peers. Starting while active is a no-op; `stop` tears
/// the whole chain down and leaves the transcript in place.
pub struct SessionController {
    engine: Arc<dyn RecognitionEngine>,
    router: AudioSourceRouter,
    throttle_interval: Duration,
    transcript: Arc<Mutex<Transcript>>,
    relay: Option<Arc<Mutex<RelayService>>>,
    last_error: Arc<Mutex<Option<String>>>,
    active: Option<ActiveSession>,
}

impl SessionController {
    pub fn new(engine: Arc<dyn RecognitionEngine>, throttle_interval: Duration) -> Self {
        Self {
            engine,
            router: AudioSourceRouter::new(),
            throttle_interval,
            transcript: Arc::new(Mutex::new(Transcript::new())),
            relay: None,
            last_error: Arc::new(Mutex::new(None)),
            active: None,
        }
    }

    /// Attach a relay; display updates will be broadcast through it.
    pub fn with_relay(mut self, relay: Arc<Mutex<RelayService>>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub async fn transcript_text(&self) -> String {
        self.transcript.lock().await.text().to_string()
    }

    pub async fn clear_transcript(&self) {
        self.transcript.lock().await.clear();
        if let Some(active) = &self.active {
            active.throttle.clear();
        }
    }

    pub async fn save_transcript(&self, path: &std::path::Path) -> Result<()> {
        self.transcript.lock().await.save(path)
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Start captioning from the given capture backend.
    pub async fn start(&mut self, backend: Box<dyn CaptureBackend>) -> Result<()> {
        if self.active.is_some() {
            return Ok(());
        }

        if !self.engine.is_authorized() && !self.engine.request_authorization().await {
            return Err(LivecapError::PermissionDenied {
                message: "speech recognition is not authorized".to_string(),
            });
        }

        let stream = self.engine.open_stream()?;
        let (throttle, mut display_rx) = throttle::spawn(self.throttle_interval);

        // The forwarder thread owns the frame sender; stopping the router
        // drops it, which signals end-of-input to the engine.
        let frames = stream.frames;
        self.router.start(backend, move |frame| {
            let _ = frames.send(frame);
        })?;

        let pump_throttle = throttle.clone();
        let last_error = Arc::clone(&self.last_error);
        let mut events = stream.events;
        let event_pump = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    EngineEvent::Result(result) => {
                        pump_throttle.on_event(result.text, result.is_final);
                    }
                    // Silence is not an error worth surfacing
                    EngineEvent::Error(e) if e.kind == EngineErrorKind::NoSpeech => {}
                    EngineEvent::Error(e) => {
                        *last_error.lock().await = Some(e.message);
                    }
                }
            }
        });

        let transcript = Arc::clone(&self.transcript);
        let relay = self.relay.clone();
        let display_pump = tokio::spawn(async move {
            while let Some(update) = display_rx.recv().await {
                transcript.lock().await.set(update.text.clone());
                if let Some(relay) = &relay {
                    // Relay failures are recorded by the service itself
                    let _ = relay.lock().await.send(&update.text).await;
                }
            }
        });

        self.active = Some(ActiveSession {
            throttle,
            event_pump,
            display_pump,
        });
        Ok(())
    }

    /// Stop captioning. Idempotent; the transcript survives.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };

        // Joining the forwarder here guarantees no frame reaches the
        // engine after this returns.
        self.router.stop()?;
        active.throttle.clear();
        active.event_pump.abort();
        active.display_pump.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame::{AudioFrame, Samples};
    use crate::recognize::engine::{EngineError, RecognitionEvent, ScriptedEngine};
    use crate::relay::service::ListenerState;

    fn capture_with_audio() -> Box<crate::audio::source::MockCaptureBackend> {
        let frame = AudioFrame {
            samples: Samples::F32(vec![0.0; 160]),
            sample_rate: 16_000,
            channels: 1,
        };
        Box::new(crate::audio::source::MockCaptureBackend::new().with_frames(vec![frame]))
    }

    async fn wait_for<F, Fut>(mut condition: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..400 {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within timeout");
    }

    fn controller_with_script(events: Vec<EngineEvent>) -> SessionController {
        let engine = Arc::new(ScriptedEngine::new(events));
        SessionController::new(engine, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn unauthorized_engine_refuses_to_start() {
        let engine = Arc::new(ScriptedEngine::unauthorized());
        let mut session = SessionController::new(engine, Duration::from_millis(10));

        let result = session.start(capture_with_audio()).await;
        assert!(matches!(result, Err(LivecapError::PermissionDenied { .. })));
        assert!(!session.is_active());
    }

    #[tokio::test]
    async fn final_result_lands_in_transcript() {
        let mut session = controller_with_script(vec![
            EngineEvent::Result(RecognitionEvent::partial("hel")),
            EngineEvent::Result(RecognitionEvent::final_result("hello world")),
        ]);

        session.start(capture_with_audio()).await.unwrap();
        wait_for(|| async { session.transcript_text().await == "hello world" }).await;
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_while_active_is_noop() {
        let mut session = controller_with_script(vec![EngineEvent::Result(
            RecognitionEvent::final_result("once"),
        )]);

        session.start(capture_with_audio()).await.unwrap();
        assert!(session.is_active());
        session.start(capture_with_audio()).await.unwrap();

        wait_for(|| async { session.transcript_text().await == "once" }).await;
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_keeps_transcript() {
        let mut session = controller_with_script(vec![EngineEvent::Result(
            RecognitionEvent::final_result("kept"),
        )]);

        session.start(capture_with_audio()).await.unwrap();
        wait_for(|| async { session.transcript_text().await == "kept" }).await;

        session.stop().await.unwrap();
        session.stop().await.unwrap();
        assert!(!session.is_active());
        assert_eq!(session.transcript_text().await, "kept");
    }

    #[tokio::test]
    async fn no_speech_errors_are_suppressed() {
        let mut session = controller_with_script(vec![
            EngineEvent::Error(EngineError::no_speech()),
            EngineEvent::Result(RecognitionEvent::final_result("done")),
        ]);

        session.start(capture_with_audio()).await.unwrap();
        wait_for(|| async { session.transcript_text().await == "done" }).await;
        assert!(session.last_error().await.is_none());
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn other_engine_errors_are_retained() {
        let mut session = controller_with_script(vec![
            EngineEvent::Error(EngineError::other("recognizer crashed")),
            EngineEvent::Result(RecognitionEvent::final_result("still works")),
        ]);

        session.start(capture_with_audio()).await.unwrap();
        wait_for(|| async { session.transcript_text().await == "still works" }).await;
        assert_eq!(
            session.last_error().await.as_deref(),
            Some("recognizer crashed")
        );
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn clear_transcript_empties_buffer() {
        let mut session = controller_with_script(vec![EngineEvent::Result(
            RecognitionEvent::final_result("gone soon"),
        )]);

        session.start(capture_with_audio()).await.unwrap();
        wait_for(|| async { !session.transcript_text().await.is_empty() }).await;

        session.clear_transcript().await;
        assert_eq!(session.transcript_text().await, "");
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn display_updates_reach_attached_relay() {
        let mut relay = RelayService::new(0);
        relay.start().await.unwrap();
        assert_eq!(relay.state().await, ListenerState::Listening);
        let relay = Arc::new(Mutex::new(relay));

        let mut session = controller_with_script(vec![EngineEvent::Result(
            RecognitionEvent::final_result("broadcast me"),
        )])
        .with_relay(Arc::clone(&relay));

        session.start(capture_with_audio()).await.unwrap();
        wait_for(|| async { session.transcript_text().await == "broadcast me" }).await;
        session.stop().await.unwrap();
        relay.lock().await.stop().await;
    }
}
