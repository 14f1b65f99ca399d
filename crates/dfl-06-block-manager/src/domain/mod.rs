//! # Domain Layer
//!
//! Genesis construction, slot state and error types.

pub mod errors;
pub mod genesis;
pub mod state;
