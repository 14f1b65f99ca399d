//! Cross-crate integration tests.

pub mod gossip_flow;
pub mod ledger_flow;
pub mod scenarios;
