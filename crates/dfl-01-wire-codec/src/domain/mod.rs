//! # Domain Layer
//!
//! Pure framing logic with no I/O dependencies.

pub mod command;
pub mod decoder;
pub mod errors;
pub mod header;
