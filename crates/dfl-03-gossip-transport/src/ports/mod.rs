//! Port definitions.

pub mod inbound;
pub mod outbound;
