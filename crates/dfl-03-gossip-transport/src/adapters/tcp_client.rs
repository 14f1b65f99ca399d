//! One-shot request client.

use super::framed_io::{read_one_frame, write_frame};
use crate::domain::outcome::RpcOutcome;
use dfl_01_wire_codec::CommandType;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Connect, send one framed request, wait for one framed reply, close.
///
/// Connecting and sending share one `rpc_timeout`; waiting for the reply
/// gets another.
pub async fn send_request(
    address: &str,
    command: CommandType,
    payload: &[u8],
    rpc_timeout: Duration,
    max_payload_len: usize,
) -> RpcOutcome {
    let connect_and_send = async {
        let mut stream = TcpStream::connect(address).await?;
        write_frame(&mut stream, command, payload).await?;
        Ok::<_, crate::domain::errors::TransportError>(stream)
    };

    let mut stream = match timeout(rpc_timeout, connect_and_send).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            debug!(peer = address, "[dfl-03] connect/send failed: {}", e);
            return RpcOutcome::ConnectionFailed;
        }
        Err(_) => {
            debug!(peer = address, "[dfl-03] connect/send timed out");
            return RpcOutcome::ConnectionFailed;
        }
    };

    let outcome = match timeout(rpc_timeout, read_one_frame(&mut stream, max_payload_len)).await {
        Ok(Ok(Some(frame))) => RpcOutcome::Success {
            command: frame.command,
            payload: frame.payload,
        },
        Ok(Ok(None)) => {
            debug!(peer = address, "[dfl-03] peer closed without reply");
            RpcOutcome::NoReply
        }
        Ok(Err(e)) => {
            debug!(peer = address, "[dfl-03] invalid reply: {}", e);
            RpcOutcome::NoReply
        }
        Err(_) => {
            debug!(peer = address, "[dfl-03] reply timed out");
            RpcOutcome::NoReply
        }
    };

    let _ = stream.shutdown().await;
    outcome
}
