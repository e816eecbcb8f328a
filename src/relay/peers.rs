//! Registry of remote endpoints currently exchanging caption text.

use std::collections::BTreeSet;
use std::net::IpAddr;

/// Set of known peers, identified by host address only.
///
/// The port is deliberately not part of peer identity: repeated
/// announcements from different source ports on one machine are the same
/// peer. Insertion is idempotent.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    peers: BTreeSet<IpAddr>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer host; returns true if it was not known before.
    pub fn add(&mut self, host: IpAddr) -> bool {
        self.peers.insert(host)
    }

    /// Remove a peer host; returns true if it was present.
    pub fn remove(&mut self, host: &IpAddr) -> bool {
        self.peers.remove(host)
    }

    pub fn contains(&self, host: &IpAddr) -> bool {
        self.peers.contains(host)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    /// Snapshot of peer hosts for display, in stable order.
    pub fn hosts(&self) -> Vec<IpAddr> {
        self.peers.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn host(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, last))
    }

    #[test]
    fn repeated_ready_events_add_one_peer() {
        let mut registry = PeerRegistry::new();

        assert!(registry.add(host(10)));
        assert!(!registry.add(host(10)));
        assert!(!registry.add(host(10)));

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&host(10)));
    }

    #[test]
    fn remove_after_ready_empties_registry() {
        let mut registry = PeerRegistry::new();
        registry.add(host(10));

        assert!(registry.remove(&host(10)));
        assert!(registry.is_empty());
        assert!(!registry.remove(&host(10)));
    }

    #[test]
    fn distinct_hosts_are_distinct_peers() {
        let mut registry = PeerRegistry::new();
        registry.add(host(10));
        registry.add(host(20));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.hosts(), vec![host(10), host(20)]);
    }

    #[test]
    fn clear_removes_everything() {
        let mut registry = PeerRegistry::new();
        registry.add(host(1));
        registry.add(host(2));

        registry.clear();
        assert!(registry.is_empty());
    }
}
