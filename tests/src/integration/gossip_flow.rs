//! # Loopback Gossip
//!
//! A sender transport broadcasts to a receiver transport served by a real
//! `RpcServer` on 127.0.0.1. Covers the ACK / ACK_REJECTED contract and
//! isolation of dead peers.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dfl_02_transaction_verification::{
        NodeKeys, TimingPolicy, TransactionGenerator, TransactionVerifier,
    };
    use dfl_03_gossip_transport::{
        GossipTransport, InboundSink, PeerEndpoint, RpcOutcome, RpcServer, ServerConfig,
        TransportConfig,
    };
    use parking_lot::Mutex;
    use shared_types::{SystemTimeSource, TimeSource, Transaction, WorkerPool};
    use tokio::sync::watch;

    #[derive(Default)]
    struct Inbox {
        transactions: Mutex<Vec<Transaction>>,
    }

    impl InboundSink for Inbox {
        fn on_transaction(&self, tx: Transaction) {
            self.transactions.lock().push(tx);
        }
    }

    fn transport(sink: Arc<dyn InboundSink>) -> Arc<GossipTransport> {
        let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        let keys = NodeKeys::generate();
        Arc::new(GossipTransport::new(
            keys.identity().clone(),
            Arc::new(TransactionVerifier::new(time, TimingPolicy::default())),
            sink,
            Arc::new(WorkerPool::new("test-gossip", 2, 32).unwrap()),
            TransportConfig {
                rpc_timeout: Duration::from_secs(2),
                ..TransportConfig::default()
            },
        ))
    }

    async fn serve(receiver: Arc<GossipTransport>) -> (PeerEndpoint, watch::Sender<bool>) {
        let server = RpcServer::bind("127.0.0.1:0", receiver, ServerConfig::default())
            .await
            .unwrap();
        let port = server.local_addr().unwrap().port();
        let (stop, stop_rx) = watch::channel(false);
        tokio::spawn(server.run(stop_rx));
        (PeerEndpoint::new("127.0.0.1", port), stop)
    }

    fn generator() -> TransactionGenerator {
        TransactionGenerator::new(
            Arc::new(NodeKeys::generate()),
            Arc::new(SystemTimeSource),
            TimingPolicy::default(),
        )
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
        for _ in 0..100 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        condition()
    }

    #[tokio::test]
    async fn test_valid_transaction_acked_and_delivered() {
        let inbox = Arc::new(Inbox::default());
        let (endpoint, _stop) = serve(transport(inbox.clone())).await;
        let sender = transport(Arc::new(Inbox::default()));
        sender.add_peer(endpoint);

        let tx = generator().generate(b"model-delta".to_vec(), "round=1").unwrap();
        let results = sender.broadcast(&tx).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].outcome.is_ack());
        assert!(wait_for(|| inbox.transactions.lock().len() == 1).await);
        assert_eq!(inbox.transactions.lock()[0], tx);
    }

    #[tokio::test]
    async fn test_tampered_transaction_rejected_with_reason() {
        let inbox = Arc::new(Inbox::default());
        let (endpoint, _stop) = serve(transport(inbox.clone())).await;
        let sender = transport(Arc::new(Inbox::default()));
        sender.add_peer(endpoint);

        let mut tx = generator().generate(b"model-delta".to_vec(), "").unwrap();
        tx.content.payload.push(0);
        let results = sender.broadcast(&tx).await.unwrap();

        let reason = results[0].outcome.rejection_reason().unwrap();
        assert_eq!(reason, "Hash mismatch");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(inbox.transactions.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dead_peer_does_not_block_live_peer() {
        let inbox = Arc::new(Inbox::default());
        let (live, _stop) = serve(transport(inbox.clone())).await;

        // Bind and drop to get a port nobody listens on.
        let dead_port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let sender = transport(Arc::new(Inbox::default()));
        sender.add_peer(live.clone());
        sender.add_peer(PeerEndpoint::new("127.0.0.1", dead_port));

        let tx = generator().generate(vec![7; 64], "").unwrap();
        let results = sender.broadcast(&tx).await.unwrap();

        assert_eq!(results.len(), 2);
        for result in &results {
            if result.peer == live {
                assert!(result.outcome.is_ack());
            } else {
                assert_eq!(result.outcome, RpcOutcome::ConnectionFailed);
            }
        }
        assert!(wait_for(|| inbox.transactions.lock().len() == 1).await);
    }

    #[tokio::test]
    async fn test_removed_peer_not_contacted() {
        let inbox = Arc::new(Inbox::default());
        let (endpoint, _stop) = serve(transport(inbox.clone())).await;
        let sender = transport(Arc::new(Inbox::default()));
        sender.add_peer(endpoint.clone());
        assert!(sender.remove_peer(&endpoint));

        let tx = generator().generate(vec![1], "").unwrap();
        assert!(sender.broadcast(&tx).await.unwrap().is_empty());
    }
}
