//! # Two-Node Ledger Flow
//!
//! Full `NodeRuntime`s gossiping over loopback:
//!
//! ```text
//! A: submit tx1 ──▶ B: verify, receipt, relay ──▶ A: merge receipt
//! A: submit tx2 ──▶ block [tx1] ──▶ B: confirm ──▶ A: finalize height 1
//! ```

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dfl_02_transaction_verification::{KeyError, NodeKeys};
    use dfl_03_gossip_transport::PeerEndpoint;
    use dfl_06_block_manager::BlockManagerState;
    use node_runtime::adapters::LoggingAggregator;
    use node_runtime::{load_keys, IdentityConfig, LedgerConfig, NetworkConfig, NodeConfig, NodeRuntime};
    use shared_types::hash_to_hex;
    use tempfile::TempDir;

    fn config(data_dir: &TempDir, ledger: LedgerConfig) -> NodeConfig {
        NodeConfig {
            network: NetworkConfig {
                listen_host: "127.0.0.1".to_string(),
                p2p_port: 0,
                rpc_timeout_secs: 2,
                worker_threads: 2,
                ..NetworkConfig::default()
            },
            ledger: LedgerConfig {
                data_dir: data_dir.path().to_path_buf(),
                tick_ms: 50,
                ..ledger
            },
            identity: IdentityConfig::default(),
        }
    }

    fn endpoint(runtime: &NodeRuntime) -> PeerEndpoint {
        PeerEndpoint::new("127.0.0.1", runtime.local_addr().port())
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
        for _ in 0..250 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        condition()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_receipt_block_and_confirmation_round_trip() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let aggregator = Arc::new(LoggingAggregator::new());

        let a = NodeRuntime::start(
            config(
                &dir_a,
                LedgerConfig {
                    batch_trigger: 2,
                    block_size: 2,
                    receipt_threshold: 1,
                    confirmation_quota: 1,
                    ..LedgerConfig::default()
                },
            ),
            NodeKeys::generate(),
            aggregator.clone(),
        )
        .await
        .unwrap();
        let b = NodeRuntime::start(
            config(
                &dir_b,
                LedgerConfig {
                    block_size: 100,
                    ..LedgerConfig::default()
                },
            ),
            NodeKeys::generate(),
            Arc::new(LoggingAggregator::new()),
        )
        .await
        .unwrap();
        a.transport().add_peer(endpoint(&b));
        b.transport().add_peer(endpoint(&a));

        // tx1 travels to B and comes back carrying B's receipt.
        let tx1 = a.node().submit_local(b"delta-1".to_vec(), "round=1").unwrap();
        assert!(
            wait_for(|| {
                a.node()
                    .cache()
                    .get(&tx1.hash)
                    .ok()
                    .flatten()
                    .map_or(false, |tx| tx.receipts.len() == 1)
            })
            .await,
            "receipt from B never merged"
        );
        assert!(b.node().cache().verified_record(&tx1.hash).unwrap().is_some());

        // tx2 reaches the block size; only tx1 has enough receipts.
        let tx2 = a.node().submit_local(b"delta-2".to_vec(), "round=1").unwrap();
        assert!(
            wait_for(|| a.node().blocks().height() == 2).await,
            "block was never finalized"
        );

        let block = a.node().blocks().get_block(1).unwrap().unwrap();
        assert!(block.content.transactions.contains_key(&tx1.hash));
        assert!(!block.content.transactions.contains_key(&tx2.hash));
        assert_eq!(block.confirmations.len(), 1);
        let confirmation = block.confirmations.values().next().unwrap();
        assert_eq!(confirmation.creator, *b.node().identity());
        assert_eq!(
            block.content.previous_block_hash,
            a.node().blocks().genesis_hash()
        );
        assert_eq!(a.node().blocks().state(), BlockManagerState::NoBlock);

        // Both local transactions formed one model-update batch.
        assert!(wait_for(|| aggregator.received().len() == 1).await);
        assert_eq!(aggregator.received()[0].transactions, 2);

        a.shutdown().await.unwrap();
        b.shutdown().await.unwrap();
    }

    #[test]
    fn test_configured_address_must_match_key() {
        let keys = NodeKeys::generate();
        let identity = IdentityConfig {
            private_key: Some(keys.private_key_hex()),
            address: Some(hash_to_hex(&keys.identity().address)),
        };
        assert_eq!(load_keys(&identity).unwrap().identity(), keys.identity());

        let wrong = IdentityConfig {
            address: Some("11".repeat(32)),
            ..identity
        };
        assert!(matches!(
            load_keys(&wrong),
            Err(KeyError::AddressMismatch { .. })
        ));
    }
}
