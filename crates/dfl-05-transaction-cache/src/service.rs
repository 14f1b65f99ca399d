//! Cache service over two key-value stores.

use crate::domain::entities::{MergeOutcome, VerifiedCheck, VerifiedRecord};
use crate::domain::errors::CacheError;
use parking_lot::Mutex;
use rayon::prelude::*;
use shared_types::{
    hash_to_hex, short_hex, BatchOperation, Hash, KeyValueStore, Transaction, TransactionReceipt,
};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

struct PendingState<S> {
    store: S,
    /// Receipts merged since insertion; absent for entries reloaded from disk.
    receipt_counts: HashMap<Hash, usize>,
    /// Arrivals since the last dump.
    pending_size: usize,
}

/// Pending-transaction cache plus verified-transaction log.
pub struct TransactionCache<S: KeyValueStore> {
    pending: Mutex<PendingState<S>>,
    verified: Mutex<S>,
}

impl<S: KeyValueStore> TransactionCache<S> {
    /// Open over existing stores; the pending size starts at the number of
    /// stored entries.
    pub fn open(block_cache_store: S, verified_store: S) -> Result<Self, CacheError> {
        let existing = block_cache_store.iterate_all()?.len();
        if existing > 0 {
            info!("[dfl-05] block cache reloaded with {} pending transactions", existing);
        }
        Ok(Self {
            pending: Mutex::new(PendingState {
                store: block_cache_store,
                receipt_counts: HashMap::new(),
                pending_size: existing,
            }),
            verified: Mutex::new(verified_store),
        })
    }

    /// Insert a fresh transaction or merge the receipts of a known one.
    pub fn add_or_merge(&self, tx: &Transaction) -> Result<MergeOutcome, CacheError> {
        let key = hash_to_hex(&tx.hash);
        let mut state = self.pending.lock();

        let Some(bytes) = state.store.get(key.as_bytes())? else {
            if !tx.receipts.is_empty() {
                debug!(tx_hash = %short_hex(&tx.hash), "[dfl-05] stale relay discarded");
                return Ok(MergeOutcome::DiscardedStaleRelay);
            }
            state.store.put(key.as_bytes(), &bincode::serialize(tx)?)?;
            state.receipt_counts.insert(tx.hash, 0);
            state.pending_size += 1;
            debug!(tx_hash = %short_hex(&tx.hash), pending = state.pending_size, "[dfl-05] transaction cached");
            return Ok(MergeOutcome::Inserted);
        };

        let mut stored: Transaction = bincode::deserialize(&bytes)?;
        let mut added = 0;
        for (receipt_hash, receipt) in &tx.receipts {
            if !stored.receipts.contains_key(receipt_hash) {
                stored.receipts.insert(*receipt_hash, receipt.clone());
                added += 1;
            }
        }
        if added == 0 {
            return Ok(MergeOutcome::Unchanged);
        }

        state.store.put(key.as_bytes(), &bincode::serialize(&stored)?)?;
        *state.receipt_counts.entry(tx.hash).or_insert(0) += added;
        debug!(
            tx_hash = %short_hex(&tx.hash),
            added,
            total = stored.receipts.len(),
            "[dfl-05] receipts merged"
        );
        Ok(MergeOutcome::Merged { added })
    }

    /// Remove and return every entry eligible for a block.
    pub fn dump(&self, threshold: usize) -> Result<Vec<Transaction>, CacheError> {
        let mut state = self.pending.lock();
        let entries = state.store.iterate_all()?;

        let decoded: Vec<(Vec<u8>, Result<Transaction, bincode::Error>)> = entries
            .into_par_iter()
            .map(|(key, value)| {
                let tx = bincode::deserialize::<Transaction>(&value);
                (key, tx)
            })
            .collect();

        let mut selected = Vec::new();
        let mut removals = Vec::new();
        for (key, result) in decoded {
            match result {
                Ok(tx) => {
                    let eligible = state
                        .receipt_counts
                        .get(&tx.hash)
                        .map_or(true, |count| *count >= threshold);
                    if eligible {
                        removals.push(BatchOperation::delete(key));
                        selected.push(tx);
                    }
                }
                Err(e) => {
                    error!(
                        key = %String::from_utf8_lossy(&key),
                        "[dfl-05] undecodable cache entry purged: {}", e
                    );
                    removals.push(BatchOperation::delete(key));
                }
            }
        }

        state.store.atomic_batch_write(removals)?;
        for tx in &selected {
            state.receipt_counts.remove(&tx.hash);
        }
        state.pending_size = 0;

        info!("[dfl-05] dumped {} transactions (threshold {})", selected.len(), threshold);
        Ok(selected)
    }

    /// Arrivals since the last dump.
    pub fn pending_size(&self) -> usize {
        self.pending.lock().pending_size
    }

    pub fn contains(&self, tx_hash: &Hash) -> Result<bool, CacheError> {
        Ok(self
            .pending
            .lock()
            .store
            .exists(hash_to_hex(tx_hash).as_bytes())?)
    }

    /// Pending copy of a transaction with all merged receipts.
    pub fn get(&self, tx_hash: &Hash) -> Result<Option<Transaction>, CacheError> {
        let state = self.pending.lock();
        match state.store.get(hash_to_hex(tx_hash).as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Verified log
    // =========================================================================

    /// Record the receipt this node issued for `tx`.
    pub fn add_verified(
        &self,
        tx: &Transaction,
        receipt: &TransactionReceipt,
    ) -> Result<(), CacheError> {
        let key = hash_to_hex(&tx.hash);
        let record = VerifiedRecord {
            transaction_hash: tx.hash,
            signature: tx.signature,
            receipt_hash: receipt.hash,
            receipt: receipt.clone(),
        };

        let mut store = self.verified.lock();
        if store.exists(key.as_bytes())? {
            warn!(tx_hash = %short_hex(&tx.hash), "[dfl-05] overwriting verified record");
        }
        store.put(key.as_bytes(), &bincode::serialize(&record)?)?;
        Ok(())
    }

    /// Compare `tx` with the recorded signature and receipt.
    pub fn check(&self, tx: &Transaction) -> Result<VerifiedCheck, CacheError> {
        let bytes = {
            let store = self.verified.lock();
            store.get(hash_to_hex(&tx.hash).as_bytes())?
        };
        let Some(bytes) = bytes else {
            return Ok(VerifiedCheck::NotFound);
        };
        let record: VerifiedRecord = bincode::deserialize(&bytes)?;

        if record.signature != tx.signature {
            return Ok(VerifiedCheck::Mismatch);
        }
        Ok(match tx.receipts.get(&record.receipt_hash) {
            None => VerifiedCheck::ReceiptNotPresent,
            Some(receipt) if *receipt != record.receipt => VerifiedCheck::Mismatch,
            Some(_) => VerifiedCheck::Pass,
        })
    }

    /// The recorded entry for a transaction hash.
    pub fn verified_record(&self, tx_hash: &Hash) -> Result<Option<VerifiedRecord>, CacheError> {
        let store = self.verified.lock();
        match store.get(hash_to_hex(tx_hash).as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Drop the record for a transaction; returns whether one existed.
    pub fn remove_verified(&self, tx_hash: &Hash) -> Result<bool, CacheError> {
        let key = hash_to_hex(tx_hash);
        let mut store = self.verified.lock();
        let existed = store.exists(key.as_bytes())?;
        if existed {
            store.delete(key.as_bytes())?;
        }
        Ok(existed)
    }

    /// Flush both stores.
    pub fn flush(&self) -> Result<(), CacheError> {
        self.pending.lock().store.flush()?;
        self.verified.lock().flush()?;
        Ok(())
    }
}
