//! # Outbound Ports (Driven Ports / SPI)
//!
//! Downstream consumer of accepted gossip.

use shared_types::{Block, BlockConfirmation, Transaction};

/// Receives messages that passed verification.
///
/// Methods run on the transport's worker pool, never on the accept loop.
pub trait InboundSink: Send + Sync {
    fn on_transaction(&self, tx: Transaction);

    fn on_confirmation(&self, _confirmation: BlockConfirmation) {}

    fn on_block(&self, _block: Block) {}
}
