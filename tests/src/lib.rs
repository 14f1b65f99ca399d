//! # DFL Ledger Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── scenarios.rs     # end-to-end behavior across crates, no sockets
//!     ├── gossip_flow.rs   # transport + verifier over loopback TCP
//!     └── ledger_flow.rs   # full nodes: receipts, blocks, confirmations
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p dfl-tests
//! cargo test -p dfl-tests integration::ledger_flow
//! ```

pub mod integration;
