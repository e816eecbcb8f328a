//! UDP relay service: listener lifecycle, broadcast send, receive log.

use crate::error::{LivecapError, Result};
use crate::relay::packet;
use crate::relay::peers::PeerRegistry;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Listener lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Starting,
    Listening,
    Failed,
    Stopped,
}

/// State mutated by the receive loop and the service API.
#[derive(Debug)]
struct RelayShared {
    state: ListenerState,
    peers: PeerRegistry,
    /// Append-only log of received caption text.
    received: String,
    last_error: Option<String>,
}

impl RelayShared {
    fn new() -> Self {
        Self {
            state: ListenerState::Idle,
            peers: PeerRegistry::new(),
            received: String::new(),
            last_error: None,
        }
    }

    fn append_received(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.received.push_str(text);
        // Consecutive messages must never visually merge
        if !text.ends_with('\n') {
            self.received.push('\n');
        }
    }
}

/// Exchanges caption text with remote peers over UDP.
///
/// The listener binds the configured port and accepts datagrams from any
/// source, tracking each distinct source host as a peer. Sends are
/// broadcast to the subnet so they reach peers that have not announced
/// themselves yet. At most one listener is live; starting again tears
/// down the prior one first.
pub struct RelayService {
    port: u16,
    shared: Arc<Mutex<RelayShared>>,
    socket: Option<Arc<UdpSocket>>,
    receiver: Option<JoinHandle<()>>,
}

impl RelayService {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            shared: Arc::new(Mutex::new(RelayShared::new())),
            socket: None,
            receiver: None,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Port actually bound by the live listener.
    pub fn local_port(&self) -> Option<u16> {
        self.socket
            .as_ref()
            .and_then(|s| s.local_addr().ok())
            .map(|addr| addr.port())
    }

    /// Change the relay port. Only allowed while not listening.
    pub async fn update_port(&mut self, port: u16) -> Result<()> {
        if self.shared.lock().await.state == ListenerState::Listening {
            return Err(LivecapError::Transport {
                message: "cannot change port while listening".to_string(),
            });
        }
        self.port = port;
        Ok(())
    }

    pub async fn state(&self) -> ListenerState {
        self.shared.lock().await.state
    }

    pub async fn is_connected(&self) -> bool {
        self.shared.lock().await.state == ListenerState::Listening
    }

    pub async fn last_error(&self) -> Option<String> {
        self.shared.lock().await.last_error.clone()
    }

    pub async fn received_text(&self) -> String {
        self.shared.lock().await.received.clone()
    }

    pub async fn clear_received(&self) {
        self.shared.lock().await.received.clear();
    }

    pub async fn peers(&self) -> Vec<IpAddr> {
        self.shared.lock().await.peers.hosts()
    }

    /// Bind the listener and start receiving.
    ///
    /// Any prior listener is torn down first. A bind failure moves the
    /// state to `Failed` with a retained message.
    pub async fn start(&mut self) -> Result<()> {
        self.teardown().await;
        self.shared.lock().await.state = ListenerState::Starting;

        let socket = match UdpSocket::bind(("0.0.0.0", self.port)).await {
            Ok(socket) => socket,
            Err(e) => {
                let message = format!("failed to bind UDP port {}: {}", self.port, e);
                let mut shared = self.shared.lock().await;
                shared.state = ListenerState::Failed;
                shared.last_error = Some(message.clone());
                return Err(LivecapError::Transport { message });
            }
        };

        if let Err(e) = socket.set_broadcast(true) {
            let message = format!("failed to enable broadcast: {}", e);
            let mut shared = self.shared.lock().await;
            shared.state = ListenerState::Failed;
            shared.last_error = Some(message.clone());
            return Err(LivecapError::Transport { message });
        }

        let socket = Arc::new(socket);
        {
            let mut shared = self.shared.lock().await;
            shared.state = ListenerState::Listening;
            shared.last_error = None;
        }

        let receive_socket = Arc::clone(&socket);
        let shared = Arc::clone(&self.shared);
        self.receiver = Some(tokio::spawn(receive_loop(receive_socket, shared)));
        self.socket = Some(socket);
        Ok(())
    }

    /// Stop listening and drop every peer.
    ///
    /// This is the intentional-cancellation path: peers are removed
    /// silently, without an error report.
    pub async fn stop(&mut self) {
        self.teardown().await;
        let mut shared = self.shared.lock().await;
        shared.state = ListenerState::Stopped;
        shared.peers.clear();
    }

    /// Broadcast caption text to the subnet on the relay port.
    ///
    /// A no-op when not listening; a send succeeds (reaches the wire)
    /// even before any peer has announced itself.
    pub async fn send(&self, text: &str) -> Result<()> {
        if self.shared.lock().await.state != ListenerState::Listening {
            return Ok(());
        }
        let Some(socket) = &self.socket else {
            return Ok(());
        };

        let datagram = packet::encode(text);
        match socket
            .send_to(&datagram, (Ipv4Addr::BROADCAST, self.port))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                let message = format!("broadcast send failed: {}", e);
                self.shared.lock().await.last_error = Some(message.clone());
                Err(LivecapError::Transport { message })
            }
        }
    }

    async fn teardown(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            receiver.abort();
        }
        self.socket = None;
        self.shared.lock().await.peers.clear();
    }
}

impl Drop for RelayService {
    fn drop(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            receiver.abort();
        }
    }
}

/// Continuous receive loop; re-arms after every datagram.
///
/// A malformed packet is dropped silently. A socket error is reported
/// and ends the loop; intentional cancellation (service stop) aborts the
/// task without touching the error state.
async fn receive_loop(socket: Arc<UdpSocket>, shared: Arc<Mutex<RelayShared>>) {
    // Largest possible UDP payload
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, src)) => {
                let mut shared = shared.lock().await;
                // First datagram from a host is its ready transition;
                // repeats are idempotent
                shared.peers.add(src.ip());
                if let Some(packet) = packet::decode(&buf[..len]) {
                    shared.append_received(&packet.text);
                }
            }
            Err(e) => {
                let mut shared = shared.lock().await;
                shared.state = ListenerState::Failed;
                shared.last_error = Some(format!("receive error: {}", e));
                break;
            }
        }
    }
}
