//! Peer endpoints and the lock-protected peer set.

use super::errors::TransportError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// A peer's listening address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerEndpoint {
    pub host: String,
    pub port: u16,
}

impl PeerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port` suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for PeerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

impl FromStr for PeerEndpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| TransportError::InvalidPeerAddress(s.to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = port
            .parse::<u16>()
            .map_err(|_| TransportError::InvalidPeerAddress(s.to_string()))?;
        if host.is_empty() {
            return Err(TransportError::InvalidPeerAddress(s.to_string()));
        }
        Ok(Self::new(host, port))
    }
}

/// Peers this node broadcasts to.
pub struct PeerSet {
    peers: RwLock<Vec<PeerEndpoint>>,
    max_peers: usize,
}

impl PeerSet {
    pub fn new(max_peers: usize) -> Self {
        Self {
            peers: RwLock::new(Vec::new()),
            max_peers,
        }
    }

    /// Add a peer; returns false if already present or the set is full.
    pub fn add(&self, peer: PeerEndpoint) -> bool {
        let mut peers = self.peers.write();
        if peers.contains(&peer) {
            return false;
        }
        if peers.len() >= self.max_peers {
            warn!(peer = %peer, max = self.max_peers, "[dfl-03] peer set full, peer ignored");
            return false;
        }
        debug!(peer = %peer, "[dfl-03] peer added");
        peers.push(peer);
        true
    }

    pub fn remove(&self, peer: &PeerEndpoint) -> bool {
        let mut peers = self.peers.write();
        let before = peers.len();
        peers.retain(|p| p != peer);
        before != peers.len()
    }

    /// Copy of the current peers; the lock is released on return.
    pub fn snapshot(&self) -> Vec<PeerEndpoint> {
        self.peers.read().clone()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_port() {
        let peer: PeerEndpoint = "10.0.0.7:8000".parse().unwrap();
        assert_eq!(peer, PeerEndpoint::new("10.0.0.7", 8000));
    }

    #[test]
    fn test_parse_ipv6_brackets() {
        let peer: PeerEndpoint = "[::1]:9000".parse().unwrap();
        assert_eq!(peer.host, "::1");
        assert_eq!(peer.address(), "[::1]:9000");
    }

    #[test]
    fn test_parse_rejects_missing_port() {
        assert!("localhost".parse::<PeerEndpoint>().is_err());
        assert!("localhost:http".parse::<PeerEndpoint>().is_err());
    }

    #[test]
    fn test_add_dedupes_and_respects_limit() {
        let set = PeerSet::new(2);
        assert!(set.add(PeerEndpoint::new("a", 1)));
        assert!(!set.add(PeerEndpoint::new("a", 1)));
        assert!(set.add(PeerEndpoint::new("b", 1)));
        assert!(!set.add(PeerEndpoint::new("c", 1)));
        assert_eq!(set.len(), 2);

        assert!(set.remove(&PeerEndpoint::new("a", 1)));
        assert!(!set.remove(&PeerEndpoint::new("a", 1)));
        assert_eq!(set.snapshot(), vec![PeerEndpoint::new("b", 1)]);
    }
}
