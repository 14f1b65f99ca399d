//! # Gossip Transport (DFL-03)
//!
//! Moves transactions, confirmations and blocks between nodes.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): peer set, RPC outcomes, errors
//! - **Ports Layer** (`ports/`): `FrameHandler` (driven by the server),
//!   `InboundSink` (downstream consumer of accepted messages)
//! - **Adapters** (`adapters/`): tokio TCP client and server
//! - **Service** (`service.rs`): `GossipTransport`, tying verification and
//!   dispatch to the wire
//!
//! ## One-Shot RPC
//!
//! ```text
//! client                              server
//!   │ connect                           │
//!   │── frame(TRANSACTION, bincode tx) ▶│ decode → verify
//!   │                                   │   ok  → worker pool → InboundSink
//!   │◀────────── frame(ACK | ACK_REJECTED + reason)
//!   │ close                             │
//! ```
//!
//! Every broadcast snapshots the peer set and runs one independent RPC per
//! peer, each bounded by the RPC timeout. A dead peer costs at most one
//! timeout and never delays the others.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::tcp_client::send_request;
pub use adapters::tcp_server::{RpcServer, ServerConfig};
pub use domain::errors::TransportError;
pub use domain::outcome::{PeerResult, RpcOutcome};
pub use domain::peers::{PeerEndpoint, PeerSet};
pub use ports::inbound::FrameHandler;
pub use ports::outbound::InboundSink;
pub use service::{GossipTransport, TransportConfig};
