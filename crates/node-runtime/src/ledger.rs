//! # Ledger Pipeline
//!
//! `LedgerNode` is the `InboundSink` behind the gossip transport. Accepted
//! gossip lands here on worker-pool threads; everything that must leave the
//! node is queued on the bounded outbox and sent by `run_broadcaster`,
//! which keeps at most `max_in_flight` broadcasts running. A full outbox
//! drops the message with a warning.
//!
//! ## Block Cycle
//!
//! 1. Pending arrivals reach `block_size`: the cache is dumped and the
//!    eligible transactions become the open block, which is broadcast.
//! 2. Peers that issued a receipt inside the block answer with a
//!    confirmation.
//! 3. The block is finalized once `confirmation_quota` confirmations are
//!    attached or the confirmation window elapses.
//!
//! The builder never confirms its own block.

use crate::adapters::ModelAggregator;
use crate::config::LedgerConfig;
use dfl_02_transaction_verification::{GeneratorError, TransactionGenerator};
use dfl_03_gossip_transport::{GossipTransport, InboundSink, TransportError};
use dfl_04_batch_accumulator::{AccumulatorError, TransactionBatchAccumulator};
use dfl_05_transaction_cache::{CacheError, MergeOutcome, TransactionCache, VerifiedCheck};
use dfl_06_block_manager::{BlockManager, BlockManagerError, BlockManagerState};
use parking_lot::Mutex;
use shared_types::{
    short_hex, Block, BlockConfirmation, KeyValueStore, NodeIdentity, Transaction,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Ledger pipeline failures.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Block manager error: {0}")]
    Block(#[from] BlockManagerError),

    #[error("Accumulator error: {0}")]
    Accumulator(#[from] AccumulatorError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Gossip queued for broadcast.
#[derive(Debug, Clone)]
pub enum Outbound {
    Transaction(Transaction),
    Confirmation(BlockConfirmation),
    Block(Block),
}

/// Cache, accumulator and block manager driven by accepted gossip.
pub struct LedgerNode<S: KeyValueStore> {
    generator: TransactionGenerator,
    cache: TransactionCache<S>,
    blocks: BlockManager<S>,
    accumulator: TransactionBatchAccumulator,
    outbox: mpsc::Sender<Outbound>,
    dropped_gossip: AtomicU64,
    config: LedgerConfig,
    /// Serializes dump + generate so a dumped set always reaches a block.
    building: Mutex<()>,
}

impl<S: KeyValueStore + 'static> LedgerNode<S> {
    pub fn new(
        generator: TransactionGenerator,
        cache: TransactionCache<S>,
        blocks: BlockManager<S>,
        accumulator: TransactionBatchAccumulator,
        aggregator: Arc<dyn ModelAggregator>,
        outbox: mpsc::Sender<Outbound>,
        config: LedgerConfig,
    ) -> Self {
        accumulator.add_callback(move |batch| aggregator.aggregate(batch));
        Self {
            generator,
            cache,
            blocks,
            accumulator,
            outbox,
            dropped_gossip: AtomicU64::new(0),
            config,
            building: Mutex::new(()),
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        self.generator.identity()
    }

    pub fn cache(&self) -> &TransactionCache<S> {
        &self.cache
    }

    pub fn blocks(&self) -> &BlockManager<S> {
        &self.blocks
    }

    pub fn accumulator(&self) -> &TransactionBatchAccumulator {
        &self.accumulator
    }

    /// Messages dropped because the outbox was full or closed.
    pub fn dropped_gossip(&self) -> u64 {
        self.dropped_gossip.load(Ordering::Relaxed)
    }

    /// Sign a locally produced model update and gossip it.
    pub fn submit_local(
        &self,
        payload: Vec<u8>,
        metadata: impl Into<String>,
    ) -> Result<Transaction, NodeError> {
        let tx = self.generator.generate(payload, metadata)?;
        self.cache.add_or_merge(&tx)?;
        self.accumulator.add(tx.clone())?;
        info!(tx_hash = %short_hex(&tx.hash), "[node] local transaction created");
        self.send(Outbound::Transaction(tx.clone()));
        self.maybe_build_block()?;
        Ok(tx)
    }

    /// Handle a transaction that passed verification.
    pub fn accept_transaction(&self, tx: Transaction) -> Result<MergeOutcome, NodeError> {
        let outcome = self.cache.add_or_merge(&tx)?;
        if outcome == MergeOutcome::Inserted {
            self.accumulator.add(tx.clone())?;
            if tx.creator() != self.identity() {
                self.relay(tx)?;
            }
        }
        self.maybe_build_block()?;
        Ok(outcome)
    }

    /// Append this node's receipt, record it, and gossip the result.
    fn relay(&self, mut tx: Transaction) -> Result<(), NodeError> {
        let receipt = match self.generator.append_receipt(&mut tx, "") {
            Ok(receipt) => receipt,
            Err(GeneratorError::TtlExpired { min_ttl }) => {
                debug!(tx_hash = %short_hex(&tx.hash), min_ttl, "[node] not relaying, TTL exhausted");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        self.cache.add_verified(&tx, &receipt)?;
        self.cache.add_or_merge(&tx)?;
        debug!(
            tx_hash = %short_hex(&tx.hash),
            receipt = %short_hex(&receipt.hash),
            "[node] relaying with receipt"
        );
        self.send(Outbound::Transaction(tx));
        Ok(())
    }

    /// Open a block when enough transactions have arrived.
    pub fn maybe_build_block(&self) -> Result<Option<Block>, NodeError> {
        if self.cache.pending_size() < self.config.block_size.max(1) {
            return Ok(None);
        }
        let Some(_guard) = self.building.try_lock() else {
            return Ok(None);
        };
        if self.blocks.state() != BlockManagerState::NoBlock || self.blocks.genesis_hash().is_none()
        {
            return Ok(None);
        }

        let transactions = self.cache.dump(self.config.receipt_threshold)?;
        if transactions.is_empty() {
            debug!("[node] no transaction met the receipt threshold");
            return Ok(None);
        }
        let block = self.blocks.generate_block(transactions)?;
        self.send(Outbound::Block(block.clone()));
        Ok(Some(block))
    }

    /// Confirm every transaction in a peer's block that carries our receipt.
    pub fn confirm_block(&self, block: &Block) -> Result<Vec<BlockConfirmation>, NodeError> {
        let mut confirmations = Vec::new();
        for tx in block.content.transactions.values() {
            if self.cache.check(tx)? != VerifiedCheck::Pass {
                continue;
            }
            let Some(record) = self.cache.verified_record(&tx.hash)? else {
                continue;
            };
            let confirmation = self.generator.create_confirmation(
                block.block_content_hash,
                tx.hash,
                record.receipt_hash,
            )?;
            self.cache.remove_verified(&tx.hash)?;
            confirmations.push(confirmation);
        }
        Ok(confirmations)
    }

    /// Attach a peer's confirmation to the open block.
    pub fn accept_confirmation(&self, confirmation: &BlockConfirmation) -> Result<(), NodeError> {
        match self.blocks.append_confirmation(confirmation) {
            Ok(()) => {
                self.maybe_finalize()?;
            }
            Err(rejection) => {
                debug!(
                    block_hash = %short_hex(&confirmation.block_hash),
                    "[node] confirmation not attached: {}", rejection
                );
            }
        }
        Ok(())
    }

    /// Finalize the open block if its quota is met or its window elapsed.
    pub fn maybe_finalize(&self) -> Result<Option<Block>, NodeError> {
        let Some(count) = self.blocks.confirmation_count() else {
            return Ok(None);
        };
        if count < self.config.confirmation_quota && !self.blocks.confirmation_window_elapsed() {
            return Ok(None);
        }
        match self.blocks.finalize() {
            Ok(block) => Ok(Some(block)),
            Err(BlockManagerError::NoOpenBlock) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Periodic work: finalize on timeout, then try to open a block.
    pub fn tick(&self) -> Result<(), NodeError> {
        self.maybe_finalize()?;
        self.maybe_build_block()?;
        Ok(())
    }

    /// Wait for the open block, then flush the stores.
    pub async fn shutdown(&self) -> Result<(), NodeError> {
        self.blocks.shutdown().await?;
        self.cache.flush()?;
        let unbatched = self.accumulator.take_all();
        if !unbatched.is_empty() {
            info!("[node] {} transactions never reached a full batch", unbatched.len());
        }
        Ok(())
    }

    fn send(&self, message: Outbound) {
        let reason = match self.outbox.try_send(message) {
            Ok(()) => return,
            Err(TrySendError::Full(_)) => "outbox full",
            Err(TrySendError::Closed(_)) => "outbox closed",
        };
        let dropped = self.dropped_gossip.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(dropped, "[node] {}, gossip dropped", reason);
    }
}

impl<S: KeyValueStore + 'static> InboundSink for LedgerNode<S> {
    fn on_transaction(&self, tx: Transaction) {
        let tx_hash = tx.hash;
        if let Err(e) = self.accept_transaction(tx) {
            error!(tx_hash = %short_hex(&tx_hash), "[node] transaction handling failed: {}", e);
        }
    }

    fn on_confirmation(&self, confirmation: BlockConfirmation) {
        if let Err(e) = self.accept_confirmation(&confirmation) {
            error!("[node] confirmation handling failed: {}", e);
        }
    }

    fn on_block(&self, block: Block) {
        match self.confirm_block(&block) {
            Ok(confirmations) => {
                debug!(
                    height = block.height,
                    "[node] confirming {} transactions of peer block",
                    confirmations.len()
                );
                for confirmation in confirmations {
                    self.send(Outbound::Confirmation(confirmation));
                }
            }
            Err(e) => error!(height = block.height, "[node] block handling failed: {}", e),
        }
    }
}

/// Send queued gossip until the outbox closes or `shutdown` flips.
///
/// At most `max_in_flight` broadcasts run at once; the outbox fills up
/// behind them. On shutdown, queued messages are discarded and running
/// broadcasts are joined.
pub async fn run_broadcaster(
    transport: Arc<GossipTransport>,
    mut outbox: mpsc::Receiver<Outbound>,
    max_in_flight: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let max_in_flight = max_in_flight.max(1);
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            message = outbox.recv() => {
                let Some(message) = message else { break };
                while in_flight.len() >= max_in_flight {
                    if let Some(joined) = in_flight.join_next().await {
                        log_broadcast_task(joined);
                    }
                }
                let transport = Arc::clone(&transport);
                in_flight.spawn(async move { send_outbound(&transport, message).await });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                log_broadcast_task(joined);
            }
            _ = shutdown.changed() => break,
        }
    }

    outbox.close();
    let mut discarded = 0usize;
    while outbox.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        warn!(discarded, "[node] queued gossip discarded at shutdown");
    }
    while let Some(joined) = in_flight.join_next().await {
        log_broadcast_task(joined);
    }
    debug!("[node] broadcaster stopped");
}

async fn send_outbound(transport: &GossipTransport, message: Outbound) {
    let sent = match &message {
        Outbound::Transaction(tx) => transport.broadcast(tx).await,
        Outbound::Confirmation(c) => transport.broadcast_confirmation(c).await,
        Outbound::Block(block) => transport.broadcast_block(block).await,
    };
    if let Err(e) = sent {
        warn!("[node] broadcast failed: {}", e);
    }
}

fn log_broadcast_task(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        warn!("[node] broadcast task failed: {}", e);
    }
}

/// Call `tick` every `period` until `shutdown` flips to true.
pub async fn run_block_ticker<S: KeyValueStore + 'static>(
    node: Arc<LedgerNode<S>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let node = Arc::clone(&node);
                match tokio::task::spawn_blocking(move || node.tick()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("[node] block tick failed: {}", e),
                    Err(e) => error!("[node] block tick panicked: {}", e),
                }
            }
            _ = shutdown.changed() => break,
        }
    }
    debug!("[node] block ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LoggingAggregator;
    use dfl_02_transaction_verification::{NodeKeys, TimingPolicy, TransactionVerifier};
    use dfl_03_gossip_transport::TransportConfig;
    use dfl_06_block_manager::BlockManagerConfig;
    use shared_types::{InMemoryKVStore, ManualTimeSource, TimeSource, WorkerPool};

    struct Harness {
        node: LedgerNode<InMemoryKVStore>,
        outbox: mpsc::Receiver<Outbound>,
        clock: Arc<ManualTimeSource>,
        peer: TransactionGenerator,
    }

    fn harness(config: LedgerConfig) -> Harness {
        harness_with_outbox(config, 64)
    }

    fn harness_with_outbox(config: LedgerConfig, outbox_capacity: usize) -> Harness {
        let clock = Arc::new(ManualTimeSource::new(1_000_000));
        let keys = Arc::new(NodeKeys::generate());
        let generator =
            TransactionGenerator::new(keys.clone(), clock.clone(), TimingPolicy::default());
        let cache =
            TransactionCache::open(InMemoryKVStore::new(), InMemoryKVStore::new()).unwrap();
        let blocks = BlockManager::open(
            InMemoryKVStore::new(),
            keys.identity().clone(),
            clock.clone(),
            BlockManagerConfig {
                confirmation_window_secs: config.confirmation_window_secs,
                shutdown_poll_ms: 10,
                creator_policy: config.creator_policy,
            },
        )
        .unwrap();
        blocks.set_genesis(b"test-genesis").unwrap();
        let pool = Arc::new(WorkerPool::new("test-batch", 1, 8).unwrap());
        let accumulator = TransactionBatchAccumulator::new(config.batch_trigger, pool);
        let (tx, rx) = mpsc::channel(outbox_capacity);

        let node = LedgerNode::new(
            generator,
            cache,
            blocks,
            accumulator,
            Arc::new(LoggingAggregator::new()),
            tx,
            config,
        );
        let peer = TransactionGenerator::new(
            Arc::new(NodeKeys::generate()),
            clock.clone(),
            TimingPolicy::default(),
        );
        Harness {
            node,
            outbox: rx,
            clock,
            peer,
        }
    }

    fn drain(outbox: &mut mpsc::Receiver<Outbound>) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(message) = outbox.try_recv() {
            out.push(message);
        }
        out
    }

    fn large_block() -> LedgerConfig {
        LedgerConfig {
            block_size: 100,
            ..LedgerConfig::default()
        }
    }

    #[test]
    fn test_foreign_transaction_is_relayed_with_receipt() {
        let mut h = harness(large_block());
        let tx = h.peer.generate(vec![1, 2, 3], "").unwrap();

        assert_eq!(h.node.accept_transaction(tx.clone()).unwrap(), MergeOutcome::Inserted);

        let sent = drain(&mut h.outbox);
        assert_eq!(sent.len(), 1);
        let Outbound::Transaction(relayed) = &sent[0] else {
            panic!("expected a relayed transaction");
        };
        assert_eq!(relayed.hash, tx.hash);
        assert_eq!(relayed.receipts.len(), 1);
        assert_eq!(h.node.cache().check(relayed).unwrap(), VerifiedCheck::Pass);
        assert_eq!(h.node.cache().get(&tx.hash).unwrap().unwrap().receipts.len(), 1);
    }

    #[test]
    fn test_own_transaction_is_not_relayed_again() {
        let mut h = harness(large_block());
        let tx = h.node.submit_local(vec![4], "").unwrap();
        drain(&mut h.outbox);

        assert_eq!(h.node.accept_transaction(tx).unwrap(), MergeOutcome::Unchanged);
        assert!(drain(&mut h.outbox).is_empty());
    }

    #[test]
    fn test_stale_relay_dropped() {
        let mut h = harness(large_block());
        let mut tx = h.peer.generate(vec![1], "").unwrap();
        h.peer.append_receipt(&mut tx, "").unwrap();

        assert_eq!(
            h.node.accept_transaction(tx).unwrap(),
            MergeOutcome::DiscardedStaleRelay
        );
        assert!(drain(&mut h.outbox).is_empty());
    }

    #[test]
    fn test_block_built_at_block_size() {
        let mut h = harness(LedgerConfig {
            block_size: 2,
            receipt_threshold: 0,
            ..LedgerConfig::default()
        });

        h.node.submit_local(vec![1], "").unwrap();
        assert_eq!(h.node.blocks().state(), BlockManagerState::NoBlock);
        h.node.submit_local(vec![2], "").unwrap();

        assert_eq!(h.node.blocks().state(), BlockManagerState::Building);
        let sent = drain(&mut h.outbox);
        let blocks: Vec<&Block> = sent
            .iter()
            .filter_map(|m| match m {
                Outbound::Block(b) => Some(b),
                _ => None,
            })
            .collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content.transactions.len(), 2);
        assert_eq!(h.node.cache().pending_size(), 0);
    }

    #[test]
    fn test_peer_block_confirmed_once() {
        let h = harness(large_block());
        let tx = h.peer.generate(vec![1], "").unwrap();
        h.node.accept_transaction(tx.clone()).unwrap();
        let relayed = h.node.cache().get(&tx.hash).unwrap().unwrap();

        let block = Block {
            height: 1,
            content: shared_types::BlockContent {
                previous_block_hash: None,
                creator: h.peer.identity().clone(),
                transactions: [(relayed.hash, relayed)].into_iter().collect(),
                block_generated_time: h.clock.now(),
                genesis_content: Vec::new(),
                genesis_block_hash: None,
                memo: String::new(),
            },
            block_content_hash: [0; 32],
            confirmations: Default::default(),
            block_finalization_time: 0,
            final_hash: [0; 32],
        };

        let confirmations = h.node.confirm_block(&block).unwrap();
        assert_eq!(confirmations.len(), 1);
        assert_eq!(confirmations[0].creator, *h.node.identity());
        assert!(h.node.confirm_block(&block).unwrap().is_empty());
    }

    #[test]
    fn test_confirmation_quota_finalizes() {
        let h = harness(LedgerConfig {
            block_size: 1,
            receipt_threshold: 1,
            confirmation_quota: 1,
            ..LedgerConfig::default()
        });
        // Our transaction, relayed back with the peer's receipt.
        let mut tx = h.node.submit_local(vec![9], "").unwrap();
        let receipt = h.peer.append_receipt(&mut tx, "").unwrap();
        h.node.accept_transaction(tx.clone()).unwrap();
        // The first dump found no receipts; one more arrival opens the block.
        h.node.submit_local(vec![10], "").unwrap();

        let block = h.node.blocks().open_block().unwrap();
        assert!(block.content.transactions.contains_key(&tx.hash));

        let confirmation = h
            .peer
            .create_confirmation(block.block_content_hash, tx.hash, receipt.hash)
            .unwrap();
        h.node.accept_confirmation(&confirmation).unwrap();

        assert_eq!(h.node.blocks().state(), BlockManagerState::NoBlock);
        let stored = h.node.blocks().get_block(block.height).unwrap().unwrap();
        assert_eq!(stored.confirmations.len(), 1);
    }

    #[test]
    fn test_tick_finalizes_after_window() {
        let h = harness(LedgerConfig {
            block_size: 1,
            receipt_threshold: 0,
            confirmation_quota: 5,
            ..LedgerConfig::default()
        });
        h.node.submit_local(vec![1], "").unwrap();
        assert_eq!(h.node.blocks().state(), BlockManagerState::Building);

        h.node.tick().unwrap();
        assert_eq!(h.node.blocks().state(), BlockManagerState::Building);

        h.clock.advance(60);
        h.node.tick().unwrap();
        assert_eq!(h.node.blocks().state(), BlockManagerState::NoBlock);
        assert_eq!(h.node.blocks().height(), 2);
    }

    #[test]
    fn test_full_outbox_drops_gossip() {
        let mut h = harness_with_outbox(large_block(), 1);

        h.node.submit_local(vec![1], "").unwrap();
        assert_eq!(h.node.dropped_gossip(), 0);
        h.node.submit_local(vec![2], "").unwrap();
        h.node.submit_local(vec![3], "").unwrap();

        assert_eq!(h.node.dropped_gossip(), 2);
        assert_eq!(drain(&mut h.outbox).len(), 1);
        // Space freed by the broadcaster is usable again.
        h.node.submit_local(vec![4], "").unwrap();
        assert_eq!(h.node.dropped_gossip(), 2);
        assert_eq!(drain(&mut h.outbox).len(), 1);
    }

    #[test]
    fn test_closed_outbox_counts_as_dropped() {
        let h = harness(large_block());
        drop(h.outbox);

        let tx = h.node.submit_local(vec![1], "").unwrap();
        assert_eq!(h.node.dropped_gossip(), 1);
        assert!(h.node.cache().contains(&tx.hash).unwrap());
    }

    struct NullSink;

    impl InboundSink for NullSink {
        fn on_transaction(&self, _tx: Transaction) {}
    }

    fn peerless_transport() -> Arc<GossipTransport> {
        let keys = NodeKeys::generate();
        let time: Arc<dyn TimeSource> = Arc::new(ManualTimeSource::new(1_000_000));
        Arc::new(GossipTransport::new(
            keys.identity().clone(),
            Arc::new(TransactionVerifier::new(time, TimingPolicy::default())),
            Arc::new(NullSink),
            Arc::new(WorkerPool::new("test-gossip", 1, 4).unwrap()),
            TransportConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_broadcaster_drains_and_stops_on_shutdown() {
        let h = harness(large_block());
        let (outbox_tx, outbox_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);
        for round in 0..3u8 {
            let tx = h.peer.generate(vec![round], "").unwrap();
            outbox_tx.try_send(Outbound::Transaction(tx)).unwrap();
        }

        let broadcaster = tokio::spawn(run_broadcaster(peerless_transport(), outbox_rx, 1, stop_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), broadcaster)
            .await
            .expect("broadcaster did not stop")
            .unwrap();
        assert!(outbox_tx.is_closed());
    }

    #[tokio::test]
    async fn test_shutdown_flushes_when_idle() {
        let h = harness(large_block());
        h.node.submit_local(vec![1], "").unwrap();
        h.node.shutdown().await.unwrap();
    }
}
