//! # Transaction Generation & Verification (DFL-02)
//!
//! Signs outgoing transactions, receipts and block confirmations with the
//! local node key, and verifies what peers send.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): key handling, timing policy, generator, verifier
//! - **Ports Layer** (`ports/`): `TransactionVerificationApi` consumed by the gossip transport
//!
//! ## Verification Order
//!
//! | Step | Check | Error |
//! |------|-------|-------|
//! | 1 | `expire_time >= creation_time` | `ExpiresBeforeCreation` |
//! | 2 | `creation_time <= now + clock_skew` | `CreatedInFuture` |
//! | 3 | `now <= expire_time` | `Expired` |
//! | 4 | `hash == sha256(canonical(content))` | `HashMismatch` |
//! | 5 | `creator.address == sha256(creator.public_key)` | `AddressMismatch` |
//! | 6 | signature under creator key | `SignatureInvalid` |
//! | 7 | every receipt (same checks, receipt creator key) | `ReceiptRejected` |
//!
//! The first failing check is reported. Verification is pure apart from
//! reading the clock.

pub mod domain;
pub mod ports;

pub use domain::errors::{GeneratorError, KeyError, ReceiptFault, VerificationError};
pub use domain::generator::TransactionGenerator;
pub use domain::keys::NodeKeys;
pub use domain::policy::TimingPolicy;
pub use domain::verifier::TransactionVerifier;
pub use ports::inbound::TransactionVerificationApi;
