//! Recognition-engine boundary.
//!
//! The streaming recognizer itself is an external collaborator: this
//! module defines the push/pull interface a session wires up, a scripted
//! mock for tests, and a line-reader adapter that lets any external
//! recognizer process feed captions in through a pipe.

use crate::audio::frame::NormalizedFrame;
use crate::error::{LivecapError, Result};
use tokio::sync::mpsc;

/// One recognition result: a candidate text and whether it is final for
/// its utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionEvent {
    pub text: String,
    pub is_final: bool,
}

impl RecognitionEvent {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_result(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Classification of an engine-reported error.
///
/// `NoSpeech` is the benign "no speech detected" condition recognizers
/// raise during silence; sessions suppress it entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    NoSpeech,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn no_speech() -> Self {
        Self {
            kind: EngineErrorKind::NoSpeech,
            message: "no speech detected".to_string(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: EngineErrorKind::Other,
            message: message.into(),
        }
    }
}

/// What the engine emits on its event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Result(RecognitionEvent),
    Error(EngineError),
}

/// An open recognition stream: audio in, events out.
///
/// Dropping `frames` signals end-of-input to the engine.
pub struct EngineStream {
    pub frames: mpsc::UnboundedSender<NormalizedFrame>,
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
}

/// Boundary to the streaming speech recognizer.
#[async_trait::async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Whether recognition is currently authorized.
    fn is_authorized(&self) -> bool {
        true
    }

    /// Request authorization; resolves to the resulting state.
    async fn request_authorization(&self) -> bool {
        self.is_authorized()
    }

    /// Open a recognition stream for one session.
    fn open_stream(&self) -> Result<EngineStream>;
}

/// Mock engine that replays a scripted event sequence.
///
/// Events are emitted once the first audio frame arrives, preserving the
/// real engine's "nothing before audio" behavior; the stream then drains
/// frames until the session drops its sender.
pub struct ScriptedEngine {
    events: Vec<EngineEvent>,
    authorized: bool,
}

impl ScriptedEngine {
    pub fn new(events: Vec<EngineEvent>) -> Self {
        Self {
            events,
            authorized: true,
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            events: Vec::new(),
            authorized: false,
        }
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for ScriptedEngine {
    fn is_authorized(&self) -> bool {
        self.authorized
    }

    fn open_stream(&self) -> Result<EngineStream> {
        if !self.authorized {
            return Err(LivecapError::PermissionDenied {
                message: "speech recognition is not authorized".to_string(),
            });
        }

        let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<NormalizedFrame>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let script = self.events.clone();

        tokio::spawn(async move {
            if frames_rx.recv().await.is_none() {
                return; // End-of-input before any audio
            }
            for event in script {
                if events_tx.send(event).is_err() {
                    return;
                }
            }
            // Drain remaining audio until the session signals end-of-input
            while frames_rx.recv().await.is_some() {}
        });

        Ok(EngineStream {
            frames: frames_tx,
            events: events_rx,
        })
    }
}

/// Adapter that turns text lines from a reader into final recognition
/// events, one per line.
///
/// This is how an external recognizer process is piped in: its stdout
/// becomes the event stream, and captured audio is discarded.
pub struct LineEngine<R> {
    reader: std::sync::Mutex<Option<R>>,
}

impl<R: std::io::BufRead + Send + 'static> LineEngine<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: std::sync::Mutex::new(Some(reader)),
        }
    }
}

#[async_trait::async_trait]
impl<R: std::io::BufRead + Send + 'static> RecognitionEngine for LineEngine<R> {
    fn open_stream(&self) -> Result<EngineStream> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| LivecapError::Engine {
                message: "line reader poisoned".to_string(),
            })?
            .take()
            .ok_or_else(|| LivecapError::Engine {
                message: "line engine stream already opened".to_string(),
            })?;

        let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<NormalizedFrame>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        // The reader blocks, so it gets its own thread
        std::thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if events_tx
                    .send(EngineEvent::Result(RecognitionEvent::final_result(line)))
                    .is_err()
                {
                    break;
                }
            }
        });

        // Audio is not what drives this adapter; discard it
        tokio::spawn(async move { while frames_rx.recv().await.is_some() {} });

        Ok(EngineStream {
            frames: frames_tx,
            events: events_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_engine_emits_after_first_frame() {
        let engine = ScriptedEngine::new(vec![
            EngineEvent::Result(RecognitionEvent::partial("hel")),
            EngineEvent::Result(RecognitionEvent::final_result("hello")),
        ]);

        let mut stream = engine.open_stream().unwrap();
        stream
            .frames
            .send(NormalizedFrame::new(vec![0.0; 160]))
            .unwrap();

        let first = stream.events.recv().await.unwrap();
        assert_eq!(first, EngineEvent::Result(RecognitionEvent::partial("hel")));

        let second = stream.events.recv().await.unwrap();
        assert_eq!(
            second,
            EngineEvent::Result(RecognitionEvent::final_result("hello"))
        );
    }

    #[tokio::test]
    async fn scripted_engine_silent_without_audio() {
        let engine = ScriptedEngine::new(vec![EngineEvent::Result(RecognitionEvent::partial(
            "never",
        ))]);

        let mut stream = engine.open_stream().unwrap();
        drop(stream.frames); // End-of-input before any audio

        assert!(stream.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn unauthorized_engine_refuses_stream() {
        let engine = ScriptedEngine::unauthorized();
        assert!(!engine.is_authorized());
        assert!(!engine.request_authorization().await);
        assert!(matches!(
            engine.open_stream(),
            Err(LivecapError::PermissionDenied { .. })
        ));
    }

    #[tokio::test]
    async fn line_engine_turns_lines_into_finals() {
        let input = std::io::Cursor::new("hello world\n\nsecond line\n");
        let engine = LineEngine::new(input);

        let mut stream = engine.open_stream().unwrap();

        let first = stream.events.recv().await.unwrap();
        assert_eq!(
            first,
            EngineEvent::Result(RecognitionEvent::final_result("hello world"))
        );

        let second = stream.events.recv().await.unwrap();
        assert_eq!(
            second,
            EngineEvent::Result(RecognitionEvent::final_result("second line"))
        );

        // EOF closes the event channel
        assert!(stream.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn line_engine_stream_is_single_use() {
        let engine = LineEngine::new(std::io::Cursor::new(""));
        let _first = engine.open_stream().unwrap();
        assert!(matches!(
            engine.open_stream(),
            Err(LivecapError::Engine { .. })
        ));
    }

    #[test]
    fn engine_error_constructors() {
        assert_eq!(EngineError::no_speech().kind, EngineErrorKind::NoSpeech);
        let other = EngineError::other("backend crashed");
        assert_eq!(other.kind, EngineErrorKind::Other);
        assert_eq!(other.message, "backend crashed");
    }
}
