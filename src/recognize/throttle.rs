//! Throttles raw recognition events into a display-friendly cadence.
//!
//! Recognizers revise their partial hypothesis many times per second;
//! repainting captions at that rate is unreadable. The throttle applies
//! partials at most once per interval, defers the latest pending partial
//! on a single cancellable timer, and lets finals through immediately.

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};

/// The current best-known caption text, as the display should show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayUpdate {
    pub text: String,
}

enum Command {
    Event { text: String, is_final: bool },
    Clear,
}

/// Handle to a running throttle actor.
///
/// Events must be delivered in recognition arrival order; the actor
/// processes them in order and emits updates on the sink channel.
#[derive(Clone)]
pub struct ThrottleHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ThrottleHandle {
    /// Feed one recognition event.
    pub fn on_event(&self, text: impl Into<String>, is_final: bool) {
        let _ = self.tx.send(Command::Event {
            text: text.into(),
            is_final,
        });
    }

    /// Cancel any pending flush and forget applied/pending text.
    pub fn clear(&self) {
        let _ = self.tx.send(Command::Clear);
    }
}

/// Spawn the throttle actor.
///
/// Returns the event handle and the channel on which display updates
/// arrive. The actor exits when every handle clone is dropped.
pub fn spawn(interval: Duration) -> (ThrottleHandle, mpsc::UnboundedReceiver<DisplayUpdate>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();

    tokio::spawn(run(interval, rx, updates_tx));

    (ThrottleHandle { tx }, updates_rx)
}

struct ThrottleState {
    interval: Duration,
    last_applied: String,
    last_applied_at: Instant,
    pending: String,
    /// When the single deferred flush fires; `None` = no timer live.
    deadline: Option<Instant>,
}

impl ThrottleState {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_applied: String::new(),
            last_applied_at: Instant::now(),
            pending: String::new(),
            deadline: None,
        }
    }

    fn apply(&mut self, text: String, updates: &mpsc::UnboundedSender<DisplayUpdate>) {
        self.last_applied = text.clone();
        self.last_applied_at = Instant::now();
        let _ = updates.send(DisplayUpdate { text });
    }

    fn on_event(
        &mut self,
        text: String,
        is_final: bool,
        updates: &mpsc::UnboundedSender<DisplayUpdate>,
    ) {
        if text == self.last_applied {
            return;
        }

        if is_final {
            // A final always wins over any pending deferred partial
            self.deadline = None;
            self.apply(text, updates);
            return;
        }

        self.pending = text;
        if self.last_applied_at.elapsed() >= self.interval {
            self.deadline = None;
            let pending = self.pending.clone();
            self.apply(pending, updates);
        } else {
            // Rescheduling always replaces the prior timer
            self.deadline = Some(self.last_applied_at + self.interval);
        }
    }

    fn flush(&mut self, updates: &mpsc::UnboundedSender<DisplayUpdate>) {
        self.deadline = None;
        if self.pending != self.last_applied {
            let pending = self.pending.clone();
            self.apply(pending, updates);
        }
    }

    fn clear(&mut self) {
        self.deadline = None;
        self.pending.clear();
        self.last_applied.clear();
    }
}

async fn run(
    interval: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
    updates: mpsc::UnboundedSender<DisplayUpdate>,
) {
    let mut state = ThrottleState::new(interval);

    loop {
        let deadline = state.deadline;
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Event { text, is_final }) => {
                    state.on_event(text, is_final, &updates);
                }
                Some(Command::Clear) => state.clear(),
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                state.flush(&updates);
            }
        }
    }
}
