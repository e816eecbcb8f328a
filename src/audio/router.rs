//! Audio source router: one live capture backend feeding one callback.
//!
//! The router owns the active backend and a forwarding thread that drains
//! raw frames from the backend's delivery channel, normalizes them, and
//! invokes the session's frame callback. `stop` joins the forwarder, so
//! once it returns no further callback invocation can happen.

use crate::audio::frame::NormalizedFrame;
use crate::audio::normalizer::FormatNormalizer;
use crate::audio::source::CaptureBackend;
use crate::error::Result;
use std::thread::JoinHandle;

struct ActiveCapture {
    backend: Box<dyn CaptureBackend>,
    forwarder: JoinHandle<()>,
}

/// Routes one capture backend's frames through the normalizer to a
/// single output callback.
#[derive(Default)]
pub struct AudioSourceRouter {
    active: Option<ActiveCapture>,
}

impl AudioSourceRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    /// Start capturing from `backend`, delivering normalized frames to
    /// `on_frame`. A no-op when already capturing.
    ///
    /// Frames the normalizer rejects are dropped; capture continues.
    pub fn start<F>(&mut self, mut backend: Box<dyn CaptureBackend>, mut on_frame: F) -> Result<()>
    where
        F: FnMut(NormalizedFrame) + Send + 'static,
    {
        if self.active.is_some() {
            return Ok(());
        }

        let (sink, frames) = crossbeam_channel::unbounded();
        backend.start(sink)?;

        let forwarder = std::thread::spawn(move || {
            let mut normalizer = FormatNormalizer::new();
            while let Ok(frame) = frames.recv() {
                match normalizer.normalize(frame) {
                    Ok(normalized) => on_frame(normalized),
                    Err(e) => {
                        eprintln!("livecap: dropping frame: {}", e);
                    }
                }
            }
        });

        self.active = Some(ActiveCapture { backend, forwarder });
        Ok(())
    }

    /// Stop the active backend and wait for the forwarder to drain.
    ///
    /// After this returns, no further `on_frame` invocation occurs.
    pub fn stop(&mut self) -> Result<()> {
        let Some(mut active) = self.active.take() else {
            return Ok(());
        };

        let stopped = active.backend.stop();
        // Dropping the backend releases any sink clone its stream held,
        // which disconnects the channel and lets the forwarder exit.
        drop(active.backend);
        if active.forwarder.join().is_err() {
            eprintln!("livecap: frame forwarder panicked during teardown");
        }
        stopped
    }
}

impl Drop for AudioSourceRouter {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
