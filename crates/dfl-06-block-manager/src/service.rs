//! Block manager service.

use crate::config::{BlockManagerConfig, CreatorPolicy};
use crate::domain::errors::{BlockManagerError, ConfirmationRejection};
use crate::domain::genesis::build_genesis_block;
use crate::domain::state::{BlockManagerState, BlockSlot};
use parking_lot::Mutex;
use shared_crypto::{Secp256k1PublicKey, Secp256k1Signature};
use shared_types::{
    hash_to_hex, short_hex, BatchOperation, Block, BlockConfirmation, BlockContent, Hash,
    KeyValueStore, NodeIdentity, TimeSource, Transaction,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const GENESIS_LABEL_KEY: &[u8] = b"genesis";

struct ChainState {
    /// Height the next block will get.
    height: u64,
    genesis_hash: Option<Hash>,
    previous_block_hash: Option<Hash>,
    slot: BlockSlot,
}

/// Single-writer block builder over a key-value store.
pub struct BlockManager<S: KeyValueStore> {
    identity: NodeIdentity,
    time: Arc<dyn TimeSource>,
    config: BlockManagerConfig,
    chain: Mutex<ChainState>,
    store: Mutex<S>,
}

fn height_key(height: u64) -> Vec<u8> {
    height.to_string().into_bytes()
}

impl<S: KeyValueStore> BlockManager<S> {
    /// Open over `store`, recovering the next height from persisted blocks.
    pub fn open(
        store: S,
        identity: NodeIdentity,
        time: Arc<dyn TimeSource>,
        config: BlockManagerConfig,
    ) -> Result<Self, BlockManagerError> {
        let next_height = store
            .iterate_all()?
            .iter()
            .filter_map(|(key, _)| std::str::from_utf8(key).ok()?.parse::<u64>().ok())
            .max()
            .map_or(0, |h| h + 1);

        info!("[dfl-06] block store opened, next height {}", next_height);
        Ok(Self {
            identity,
            time,
            config,
            chain: Mutex::new(ChainState {
                height: next_height,
                genesis_hash: None,
                previous_block_hash: None,
                slot: BlockSlot::NoBlock,
            }),
            store: Mutex::new(store),
        })
    }

    /// Install or validate the genesis block; returns its final hash.
    ///
    /// On an empty store the genesis block is written. Otherwise the stored
    /// genesis must match `genesis_content` exactly.
    pub fn set_genesis(&self, genesis_content: &[u8]) -> Result<Hash, BlockManagerError> {
        let genesis = build_genesis_block(genesis_content);
        let height = self.chain.lock().height;

        if height == 0 {
            let bytes = bincode::serialize(&genesis)?;
            self.store.lock().atomic_batch_write(vec![
                BatchOperation::put(height_key(0), bytes),
                BatchOperation::put(GENESIS_LABEL_KEY, hash_to_hex(&genesis.final_hash)),
            ])?;

            let mut chain = self.chain.lock();
            chain.height = 1;
            chain.genesis_hash = Some(genesis.final_hash);
            chain.previous_block_hash = Some(genesis.final_hash);
            info!(genesis = %hash_to_hex(&genesis.final_hash), "[dfl-06] genesis block written");
            return Ok(genesis.final_hash);
        }

        let stored = self
            .get_block(0)?
            .ok_or(BlockManagerError::MissingBlock { height: 0 })?;
        if stored.final_hash != genesis.final_hash {
            error!("[dfl-06] stored genesis does not match configured genesis content");
            return Err(BlockManagerError::GenesisMismatch {
                stored: hash_to_hex(&stored.final_hash),
                computed: hash_to_hex(&genesis.final_hash),
            });
        }

        let previous = self
            .get_block(height - 1)?
            .ok_or(BlockManagerError::MissingBlock { height: height - 1 })?;

        let mut chain = self.chain.lock();
        chain.genesis_hash = Some(genesis.final_hash);
        chain.previous_block_hash = Some(previous.final_hash);
        info!(
            height,
            previous = %short_hex(&previous.final_hash),
            "[dfl-06] genesis verified, chain resumed"
        );
        Ok(genesis.final_hash)
    }

    /// Open a new block containing `transactions`.
    pub fn generate_block(&self, transactions: Vec<Transaction>) -> Result<Block, BlockManagerError> {
        let first_creator = transactions
            .first()
            .map(|tx| tx.creator().clone())
            .ok_or(BlockManagerError::NoTransactions)?;

        let mut chain = self.chain.lock();
        if !matches!(chain.slot, BlockSlot::NoBlock) {
            return Err(BlockManagerError::AlreadyBuilding);
        }
        let genesis_hash = chain.genesis_hash.ok_or(BlockManagerError::GenesisNotSet)?;

        let now = self.time.now();
        let creator = match self.config.creator_policy {
            CreatorPolicy::FirstTransactionCreator => first_creator,
            CreatorPolicy::LocalNode => self.identity.clone(),
        };
        let content = BlockContent {
            previous_block_hash: chain.previous_block_hash,
            creator,
            transactions: transactions.into_iter().map(|tx| (tx.hash, tx)).collect(),
            block_generated_time: now,
            genesis_content: Vec::new(),
            genesis_block_hash: Some(genesis_hash),
            memo: String::new(),
        };
        let mut block = Block {
            height: chain.height,
            content,
            block_content_hash: [0u8; 32],
            confirmations: BTreeMap::new(),
            block_finalization_time: 0,
            final_hash: [0u8; 32],
        };
        block.block_content_hash = block.compute_content_hash();

        info!(
            height = block.height,
            transactions = block.content.transactions.len(),
            block_hash = %short_hex(&block.block_content_hash),
            "[dfl-06] block opened"
        );
        chain.slot = BlockSlot::Building {
            block: block.clone(),
            opened_at: now,
        };
        Ok(block)
    }

    /// Attach a confirmation to the open block.
    ///
    /// Rejections leave the block unchanged.
    pub fn append_confirmation(
        &self,
        confirmation: &BlockConfirmation,
    ) -> Result<(), ConfirmationRejection> {
        // Integrity checks need no chain state, so they run before locking;
        // their outcome is reported after the structural checks.
        let hash_ok = confirmation.compute_final_hash() == confirmation.final_hash;
        let signature_ok = hash_ok && confirmation_signature_valid(confirmation);

        let mut chain = self.chain.lock();
        let BlockSlot::Building { block, .. } = &mut chain.slot else {
            return Err(ConfirmationRejection::NoOpenBlock);
        };
        if confirmation.block_hash != block.block_content_hash {
            return Err(ConfirmationRejection::BlockHashMismatch);
        }
        let tx = block
            .content
            .transactions
            .get(&confirmation.transaction_hash)
            .ok_or(ConfirmationRejection::TransactionNotFound)?;
        let receipt = tx
            .receipts
            .get(&confirmation.receipt_hash)
            .ok_or(ConfirmationRejection::ReceiptNotFound)?;
        if receipt.content.creator != confirmation.creator {
            return Err(ConfirmationRejection::CreatorMismatch);
        }
        if !hash_ok {
            return Err(ConfirmationRejection::HashMismatch);
        }
        if !signature_ok {
            return Err(ConfirmationRejection::SignatureInvalid);
        }

        block
            .confirmations
            .insert(confirmation.final_hash, confirmation.clone());
        debug!(
            height = block.height,
            confirmations = block.confirmations.len(),
            "[dfl-06] confirmation attached"
        );
        Ok(())
    }

    /// Seal the open block, persist it, and advance the chain.
    pub fn finalize(&self) -> Result<Block, BlockManagerError> {
        let (mut block, opened_at) = {
            let mut chain = self.chain.lock();
            match std::mem::replace(&mut chain.slot, BlockSlot::Finalizing) {
                BlockSlot::Building { block, opened_at } => (block, opened_at),
                other => {
                    chain.slot = other;
                    return Err(BlockManagerError::NoOpenBlock);
                }
            }
        };

        block.block_finalization_time = self.time.now();
        block.final_hash = block.compute_final_hash();

        let write = bincode::serialize(&block)
            .map_err(BlockManagerError::from)
            .and_then(|bytes| {
                self.store
                    .lock()
                    .put(&height_key(block.height), &bytes)
                    .map_err(BlockManagerError::from)
            });

        let mut chain = self.chain.lock();
        if let Err(e) = write {
            warn!(height = block.height, "[dfl-06] block write failed, block stays open: {}", e);
            block.final_hash = [0u8; 32];
            block.block_finalization_time = 0;
            chain.slot = BlockSlot::Building { block, opened_at };
            return Err(e);
        }

        chain.height = block.height + 1;
        chain.previous_block_hash = Some(block.final_hash);
        chain.slot = BlockSlot::NoBlock;
        info!(
            height = block.height,
            confirmations = block.confirmations.len(),
            final_hash = %short_hex(&block.final_hash),
            "[dfl-06] block finalized"
        );
        Ok(block)
    }

    pub fn state(&self) -> BlockManagerState {
        self.chain.lock().slot.state()
    }

    /// Height the next block will get.
    pub fn height(&self) -> u64 {
        self.chain.lock().height
    }

    pub fn previous_block_hash(&self) -> Option<Hash> {
        self.chain.lock().previous_block_hash
    }

    pub fn genesis_hash(&self) -> Option<Hash> {
        self.chain.lock().genesis_hash
    }

    /// Snapshot of the open block.
    pub fn open_block(&self) -> Option<Block> {
        match &self.chain.lock().slot {
            BlockSlot::Building { block, .. } => Some(block.clone()),
            _ => None,
        }
    }

    pub fn confirmation_count(&self) -> Option<usize> {
        match &self.chain.lock().slot {
            BlockSlot::Building { block, .. } => Some(block.confirmations.len()),
            _ => None,
        }
    }

    /// True once the open block has been accepting confirmations for the
    /// configured window.
    pub fn confirmation_window_elapsed(&self) -> bool {
        match &self.chain.lock().slot {
            BlockSlot::Building { opened_at, .. } => {
                self.time.now() >= opened_at.saturating_add(self.config.confirmation_window_secs)
            }
            _ => false,
        }
    }

    /// Read a finalized block.
    pub fn get_block(&self, height: u64) -> Result<Option<Block>, BlockManagerError> {
        let bytes = self.store.lock().get(&height_key(height))?;
        match bytes {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Wait until no block is open, then flush the store.
    pub async fn shutdown(&self) -> Result<(), BlockManagerError> {
        let poll = Duration::from_millis(self.config.shutdown_poll_ms);
        loop {
            let state = self.state();
            if state == BlockManagerState::NoBlock {
                break;
            }
            info!("[dfl-06] waiting for open block to finalize before shutdown ({:?})", state);
            tokio::time::sleep(poll).await;
        }
        self.store.lock().flush()?;
        info!("[dfl-06] block store flushed");
        Ok(())
    }
}

fn confirmation_signature_valid(confirmation: &BlockConfirmation) -> bool {
    let Ok(key) = Secp256k1PublicKey::from_bytes(confirmation.creator.public_key) else {
        return false;
    };
    key.verify_digest(
        &confirmation.final_hash,
        &Secp256k1Signature::from_bytes(confirmation.signature),
    )
    .is_ok()
}
