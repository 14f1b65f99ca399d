//! tokio TCP adapters.

pub mod framed_io;
pub mod tcp_client;
pub mod tcp_server;
