//! # Ledger Scenarios
//!
//! Behavior that spans several crates, exercised without sockets:
//!
//! 1. Receipt chain exhausts the relay TTL
//! 2. Byte-at-a-time frame decoding
//! 3. Independent nodes agree on genesis
//! 4. Cache merge and dump bookkeeping
//! 5. A second block cannot open while one is building
//! 6. Finalized blocks chain to their predecessor

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dfl_01_wire_codec::{encode_frame, CommandType, FrameDecoder};
    use dfl_02_transaction_verification::{
        GeneratorError, NodeKeys, TimingPolicy, TransactionGenerator, TransactionVerifier,
    };
    use dfl_05_transaction_cache::{MergeOutcome, TransactionCache};
    use dfl_06_block_manager::{
        build_genesis_block, BlockManager, BlockManagerConfig, BlockManagerError,
    };
    use shared_types::{InMemoryKVStore, ManualTimeSource, TimeSource};

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    const START: u64 = 1_700_000_000;

    fn clock() -> Arc<ManualTimeSource> {
        Arc::new(ManualTimeSource::new(START))
    }

    fn node(clock: &Arc<ManualTimeSource>, policy: TimingPolicy) -> TransactionGenerator {
        TransactionGenerator::new(Arc::new(NodeKeys::generate()), clock.clone(), policy)
    }

    fn block_manager(clock: &Arc<ManualTimeSource>) -> BlockManager<InMemoryKVStore> {
        let keys = NodeKeys::generate();
        let manager = BlockManager::open(
            InMemoryKVStore::new(),
            keys.identity().clone(),
            clock.clone(),
            BlockManagerConfig::default(),
        )
        .unwrap();
        manager.set_genesis(b"scenario-genesis").unwrap();
        manager
    }

    // =========================================================================
    // SCENARIOS
    // =========================================================================

    #[test]
    fn test_receipt_chain_exhausts_ttl() {
        let clock = clock();
        let policy = TimingPolicy {
            initial_ttl: 2,
            ..TimingPolicy::default()
        };
        let creator = node(&clock, policy);
        let verifier = TransactionVerifier::new(clock.clone(), policy);

        let mut tx = creator.generate(b"abc".to_vec(), "").unwrap();
        assert_eq!(verifier.verify(&tx), Ok(()));

        let first = node(&clock, policy).append_receipt(&mut tx, "").unwrap();
        let second = node(&clock, policy).append_receipt(&mut tx, "").unwrap();
        assert_eq!(first.content.receive_at_ttl, 1);
        assert_eq!(second.content.receive_at_ttl, 0);
        assert_eq!(verifier.verify(&tx), Ok(()));

        let third = node(&clock, policy).append_receipt(&mut tx, "");
        assert!(matches!(third, Err(GeneratorError::TtlExpired { min_ttl: 0 })));
        assert_eq!(tx.receipts.len(), 2);
    }

    #[test]
    fn test_frame_fed_one_byte_at_a_time() {
        let bytes = encode_frame(CommandType::Transaction, b"abc").unwrap();
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();

        for byte in &bytes {
            decoder
                .feed(std::slice::from_ref(byte), |frame| frames.push(frame))
                .unwrap();
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, CommandType::Transaction);
        assert_eq!(frames[0].payload, b"abc");
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_independent_nodes_agree_on_genesis() {
        let a = build_genesis_block(b"shared genesis");
        let b = build_genesis_block(b"shared genesis");
        assert_eq!(a.final_hash, b.final_hash);

        let clock = clock();
        let left = block_manager(&clock);
        let right = block_manager(&clock);
        assert_eq!(left.genesis_hash(), right.genesis_hash());
    }

    #[test]
    fn test_cache_merge_and_dump() {
        let clock = clock();
        let creator = node(&clock, TimingPolicy::default());
        let relay = node(&clock, TimingPolicy::default());
        let cache = TransactionCache::open(InMemoryKVStore::new(), InMemoryKVStore::new()).unwrap();

        let tx = creator.generate(vec![1, 2, 3], "").unwrap();
        assert_eq!(cache.add_or_merge(&tx).unwrap(), MergeOutcome::Inserted);
        assert_eq!(cache.pending_size(), 1);

        let mut relayed = tx.clone();
        relay.append_receipt(&mut relayed, "").unwrap();
        assert_eq!(
            cache.add_or_merge(&relayed).unwrap(),
            MergeOutcome::Merged { added: 1 }
        );
        assert_eq!(cache.add_or_merge(&relayed).unwrap(), MergeOutcome::Unchanged);
        assert_eq!(cache.pending_size(), 1);

        let dumped = cache.dump(1).unwrap();
        assert_eq!(dumped.len(), 1);
        assert_eq!(dumped[0].hash, tx.hash);
        assert_eq!(dumped[0].receipts.len(), 1);
        assert_eq!(cache.pending_size(), 0);
    }

    #[test]
    fn test_second_block_rejected_while_building() {
        let clock = clock();
        let creator = node(&clock, TimingPolicy::default());
        let manager = block_manager(&clock);

        let t1 = creator.generate(vec![1], "").unwrap();
        let t2 = creator.generate(vec![2], "").unwrap();
        manager.generate_block(vec![t1]).unwrap();

        assert_eq!(
            manager.generate_block(vec![t2]),
            Err(BlockManagerError::AlreadyBuilding)
        );
        assert_eq!(manager.open_block().unwrap().content.transactions.len(), 1);
    }

    #[test]
    fn test_finalized_blocks_chain_to_predecessor() {
        let clock = clock();
        let creator = node(&clock, TimingPolicy::default());
        let manager = block_manager(&clock);

        for round in 0..3u8 {
            let tx = creator.generate(vec![round], "").unwrap();
            manager.generate_block(vec![tx]).unwrap();
            clock.advance(1);
            manager.finalize().unwrap();
        }

        let mut previous = manager.get_block(0).unwrap().unwrap();
        for height in 1..=3 {
            let block = manager.get_block(height).unwrap().unwrap();
            assert_eq!(block.content.previous_block_hash, Some(previous.final_hash));
            assert!(block.block_finalization_time <= clock.now());
            previous = block;
        }
    }
}
