//! # Domain Layer
//!
//! Signing and verification logic with no I/O dependencies.

pub mod errors;
pub mod generator;
pub mod keys;
pub mod policy;
pub mod verifier;
