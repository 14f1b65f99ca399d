//! Gossip transport service.

use crate::adapters::tcp_client::send_request;
use crate::domain::errors::TransportError;
use crate::domain::outcome::PeerResult;
use crate::domain::peers::{PeerEndpoint, PeerSet};
use crate::ports::inbound::FrameHandler;
use crate::ports::outbound::InboundSink;
use dfl_01_wire_codec::{CommandType, DEFAULT_MAX_PAYLOAD_LEN};
use dfl_02_transaction_verification::TransactionVerificationApi;
use serde::de::DeserializeOwned;
use shared_types::{short_hex, Block, BlockConfirmation, NodeIdentity, Transaction, WorkerPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Transport tuning.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Bound on each phase of a one-shot request.
    pub rpc_timeout: Duration,
    pub max_payload_len: usize,
    pub max_peers: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(10),
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            max_peers: 10,
        }
    }
}

/// Broadcasts local gossip and dispatches inbound gossip.
pub struct GossipTransport {
    identity: NodeIdentity,
    peers: PeerSet,
    verifier: Arc<dyn TransactionVerificationApi>,
    sink: Arc<dyn InboundSink>,
    pool: Arc<WorkerPool>,
    config: TransportConfig,
}

impl GossipTransport {
    pub fn new(
        identity: NodeIdentity,
        verifier: Arc<dyn TransactionVerificationApi>,
        sink: Arc<dyn InboundSink>,
        pool: Arc<WorkerPool>,
        config: TransportConfig,
    ) -> Self {
        Self {
            identity,
            peers: PeerSet::new(config.max_peers),
            verifier,
            sink,
            pool,
            config,
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn add_peer(&self, peer: PeerEndpoint) -> bool {
        self.peers.add(peer)
    }

    pub fn remove_peer(&self, peer: &PeerEndpoint) -> bool {
        self.peers.remove(peer)
    }

    pub fn peers(&self) -> Vec<PeerEndpoint> {
        self.peers.snapshot()
    }

    /// Send a transaction to every peer.
    pub async fn broadcast(&self, tx: &Transaction) -> Result<Vec<PeerResult>, TransportError> {
        let payload = bincode::serialize(tx)?;
        let results = self.broadcast_command(CommandType::Transaction, payload).await;
        let acked = results.iter().filter(|r| r.outcome.is_ack()).count();
        info!(
            tx_hash = %short_hex(&tx.hash),
            receipts = tx.receipts.len(),
            "[dfl-03] transaction broadcast: {}/{} peers acked",
            acked,
            results.len()
        );
        Ok(results)
    }

    pub async fn broadcast_confirmation(
        &self,
        confirmation: &BlockConfirmation,
    ) -> Result<Vec<PeerResult>, TransportError> {
        let payload = bincode::serialize(confirmation)?;
        Ok(self
            .broadcast_command(CommandType::BlockConfirmation, payload)
            .await)
    }

    pub async fn broadcast_block(&self, block: &Block) -> Result<Vec<PeerResult>, TransportError> {
        let payload = bincode::serialize(block)?;
        let results = self.broadcast_command(CommandType::Block, payload).await;
        info!(
            height = block.height,
            "[dfl-03] block broadcast to {} peers",
            results.len()
        );
        Ok(results)
    }

    /// One independent one-shot request per peer in the current snapshot.
    async fn broadcast_command(&self, command: CommandType, payload: Vec<u8>) -> Vec<PeerResult> {
        let peers = self.peers.snapshot();
        let payload = Arc::new(payload);
        let mut requests = JoinSet::new();

        for peer in peers {
            let payload = Arc::clone(&payload);
            let rpc_timeout = self.config.rpc_timeout;
            let max_payload_len = self.config.max_payload_len;
            requests.spawn(async move {
                let outcome = send_request(
                    &peer.address(),
                    command,
                    &payload,
                    rpc_timeout,
                    max_payload_len,
                )
                .await;
                if let Some(reason) = outcome.rejection_reason() {
                    debug!(peer = %peer, "[dfl-03] {} rejected: {}", command, reason);
                }
                PeerResult { peer, outcome }
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = requests.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!("[dfl-03] broadcast task failed: {}", e),
            }
        }
        results
    }

    fn on_transaction(&self, payload: &[u8]) -> (CommandType, Vec<u8>) {
        let tx: Transaction = match decode(payload) {
            Ok(tx) => tx,
            Err(reason) => return reject(reason),
        };
        if let Err(e) = self.verifier.verify_transaction(&tx) {
            warn!(tx_hash = %short_hex(&tx.hash), "[dfl-03] transaction rejected: {}", e);
            return reject(e.to_string());
        }

        let sink = Arc::clone(&self.sink);
        let tx_hash = tx.hash;
        if let Err(e) = self.pool.submit(move || sink.on_transaction(tx)) {
            warn!(tx_hash = %short_hex(&tx_hash), "[dfl-03] transaction not queued: {}", e);
            return reject(e.to_string());
        }
        (CommandType::Ack, Vec::new())
    }

    fn on_confirmation(&self, payload: &[u8]) -> (CommandType, Vec<u8>) {
        let confirmation: BlockConfirmation = match decode(payload) {
            Ok(c) => c,
            Err(reason) => return reject(reason),
        };
        if let Err(e) = self.verifier.verify_confirmation(&confirmation) {
            warn!("[dfl-03] confirmation rejected: {}", e);
            return reject(e.to_string());
        }

        let sink = Arc::clone(&self.sink);
        if let Err(e) = self.pool.submit(move || sink.on_confirmation(confirmation)) {
            return reject(e.to_string());
        }
        (CommandType::Ack, Vec::new())
    }

    fn on_block(&self, payload: &[u8]) -> (CommandType, Vec<u8>) {
        let block: Block = match decode(payload) {
            Ok(b) => b,
            Err(reason) => return reject(reason),
        };
        if block.compute_content_hash() != block.block_content_hash {
            warn!(height = block.height, "[dfl-03] block rejected: content hash mismatch");
            return reject("block content hash mismatch".into());
        }

        let sink = Arc::clone(&self.sink);
        if let Err(e) = self.pool.submit(move || sink.on_block(block)) {
            return reject(e.to_string());
        }
        (CommandType::Ack, Vec::new())
    }
}

impl FrameHandler for GossipTransport {
    fn handle(&self, command: CommandType, payload: &[u8]) -> (CommandType, Vec<u8>) {
        match command {
            CommandType::Transaction => self.on_transaction(payload),
            CommandType::BlockConfirmation => self.on_confirmation(payload),
            CommandType::Block => self.on_block(payload),
            other => {
                debug!("[dfl-03] unhandled command {}", other);
                (CommandType::Unknown, Vec::new())
            }
        }
    }
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, String> {
    bincode::deserialize(payload).map_err(|e| {
        warn!("[dfl-03] undecodable payload: {}", e);
        format!("malformed payload: {e}")
    })
}

fn reject(reason: String) -> (CommandType, Vec<u8>) {
    (CommandType::AckRejected, reason.into_bytes())
}
