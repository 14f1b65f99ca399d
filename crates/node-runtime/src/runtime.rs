//! Process-level wiring: stores, pools, server and background tasks.

use crate::adapters::{open_store, ModelAggregator, NodeStore};
use crate::config::{IdentityConfig, NodeConfig};
use crate::ledger::{run_block_ticker, run_broadcaster, LedgerNode};
use anyhow::{Context, Result};
use dfl_01_wire_codec::DEFAULT_MAX_PAYLOAD_LEN;
use dfl_02_transaction_verification::{
    KeyError, NodeKeys, TimingPolicy, TransactionGenerator, TransactionVerifier,
};
use dfl_03_gossip_transport::{
    GossipTransport, PeerEndpoint, RpcServer, ServerConfig, TransportConfig, TransportError,
};
use dfl_04_batch_accumulator::TransactionBatchAccumulator;
use dfl_05_transaction_cache::TransactionCache;
use dfl_06_block_manager::{BlockManager, BlockManagerConfig};
use shared_types::{hash_to_hex, SystemTimeSource, TimeSource, WorkerPool};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Load the configured key, or generate one when none is configured.
pub fn load_keys(identity: &IdentityConfig) -> Result<NodeKeys, KeyError> {
    match &identity.private_key {
        Some(private_key) => NodeKeys::from_hex(private_key, identity.address.as_deref()),
        None => {
            let keys = NodeKeys::generate();
            warn!(
                address = %hash_to_hex(&keys.identity().address),
                "[node] no private key configured, using a fresh key for this run"
            );
            Ok(keys)
        }
    }
}

/// A running ledger node.
pub struct NodeRuntime {
    node: Arc<LedgerNode<NodeStore>>,
    transport: Arc<GossipTransport>,
    local_addr: SocketAddr,
    server_stop: watch::Sender<bool>,
    tasks_stop: watch::Sender<bool>,
    server: JoinHandle<Result<(), TransportError>>,
    ticker: JoinHandle<()>,
    broadcaster: JoinHandle<()>,
    pools: Vec<Arc<WorkerPool>>,
}

impl NodeRuntime {
    /// Open the ledger, bind the gossip server and start background tasks.
    pub async fn start(
        config: NodeConfig,
        keys: NodeKeys,
        aggregator: Arc<dyn ModelAggregator>,
    ) -> Result<Self> {
        keys.self_check().context("key pair self-check failed")?;
        let keys = Arc::new(keys);
        let identity = keys.identity().clone();
        let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        let ledger = &config.ledger;

        let cache = TransactionCache::open(
            open_store(&ledger.block_cache_path())?,
            open_store(&ledger.verified_path())?,
        )
        .context("failed to open transaction cache")?;

        let blocks = BlockManager::open(
            open_store(&ledger.block_store_path())?,
            identity.clone(),
            Arc::clone(&time),
            BlockManagerConfig {
                confirmation_window_secs: ledger.confirmation_window_secs,
                shutdown_poll_ms: ledger.tick_ms,
                creator_policy: ledger.creator_policy,
            },
        )
        .context("failed to open block store")?;
        let genesis = blocks
            .set_genesis(ledger.genesis_content.as_bytes())
            .context("genesis check failed")?;
        info!(genesis = %hash_to_hex(&genesis), "[node] chain ready at height {}", blocks.height());

        let batch_pool = Arc::new(WorkerPool::new("dfl-batch", 1, 64)?);
        let accumulator =
            TransactionBatchAccumulator::new(ledger.batch_trigger, Arc::clone(&batch_pool));

        let (outbox_tx, outbox_rx) = mpsc::channel(config.network.outbox_capacity.max(1));
        let generator = TransactionGenerator::new(
            Arc::clone(&keys),
            Arc::clone(&time),
            TimingPolicy::default(),
        );
        let node = Arc::new(LedgerNode::new(
            generator,
            cache,
            blocks,
            accumulator,
            aggregator,
            outbox_tx,
            ledger.clone(),
        ));

        let network = &config.network;
        let gossip_pool = Arc::new(WorkerPool::new(
            "dfl-gossip",
            network.worker_threads,
            network.worker_queue,
        )?);
        let transport = Arc::new(GossipTransport::new(
            identity,
            Arc::new(TransactionVerifier::new(time, TimingPolicy::default())),
            node.clone(),
            Arc::clone(&gossip_pool),
            TransportConfig {
                rpc_timeout: Duration::from_secs(network.rpc_timeout_secs),
                max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
                max_peers: network.max_peers,
            },
        ));
        for peer in &network.peers {
            match peer.parse::<PeerEndpoint>() {
                Ok(endpoint) => {
                    transport.add_peer(endpoint);
                }
                Err(e) => warn!("[node] ignoring peer {}: {}", peer, e),
            }
        }

        let server = RpcServer::bind(
            &format!("{}:{}", network.listen_host, network.p2p_port),
            transport.clone(),
            ServerConfig {
                read_timeout: Duration::from_secs(network.read_timeout_secs),
                max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
                max_connections: network.max_connections,
            },
        )
        .await
        .context("failed to bind gossip server")?;
        let local_addr = server.local_addr()?;

        let (server_stop, server_rx) = watch::channel(false);
        let (tasks_stop, tasks_rx) = watch::channel(false);
        let server = tokio::spawn(server.run(server_rx));
        let broadcaster = tokio::spawn(run_broadcaster(
            Arc::clone(&transport),
            outbox_rx,
            network.max_inflight_broadcasts,
            tasks_rx.clone(),
        ));
        let ticker = tokio::spawn(run_block_ticker(
            Arc::clone(&node),
            Duration::from_millis(ledger.tick_ms.max(1)),
            tasks_rx,
        ));

        info!(
            address = %hash_to_hex(&node.identity().address),
            peers = transport.peers().len(),
            "[node] ledger node listening on {}", local_addr
        );
        Ok(Self {
            node,
            transport,
            local_addr,
            server_stop,
            tasks_stop,
            server,
            ticker,
            broadcaster,
            pools: vec![gossip_pool, batch_pool],
        })
    }

    pub fn node(&self) -> &Arc<LedgerNode<NodeStore>> {
        &self.node
    }

    pub fn transport(&self) -> &Arc<GossipTransport> {
        &self.transport
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting gossip, wait for the open block, flush, and stop.
    pub async fn shutdown(self) -> Result<()> {
        info!("[node] initiating graceful shutdown...");
        let _ = self.server_stop.send(true);
        match self.server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("[node] server exited with error: {}", e),
            Err(e) => warn!("[node] server task failed: {}", e),
        }

        self.node.shutdown().await.context("ledger shutdown failed")?;

        let _ = self.tasks_stop.send(true);
        if let Err(e) = self.ticker.await {
            warn!("[node] ticker task failed: {}", e);
        }
        if let Err(e) = self.broadcaster.await {
            warn!("[node] broadcaster task failed: {}", e);
        }

        let pools = self.pools;
        tokio::task::spawn_blocking(move || {
            for pool in pools {
                pool.shutdown();
            }
        })
        .await?;

        info!("[node] shutdown complete");
        Ok(())
    }
}
