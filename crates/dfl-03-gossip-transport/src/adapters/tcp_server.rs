//! Accept loop answering one request per connection.

use super::framed_io::{read_one_frame, write_frame};
use crate::domain::errors::TransportError;
use crate::ports::inbound::FrameHandler;
use dfl_01_wire_codec::{CommandType, DEFAULT_MAX_PAYLOAD_LEN};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Server limits.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// How long a client may take to deliver its request.
    pub read_timeout: Duration,
    pub max_payload_len: usize,
    /// Connections served concurrently; further accepts wait.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(10),
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            max_connections: 256,
        }
    }
}

/// TCP server dispatching each request frame to a `FrameHandler`.
pub struct RpcServer {
    listener: TcpListener,
    handler: Arc<dyn FrameHandler>,
    config: ServerConfig,
}

impl RpcServer {
    pub async fn bind(
        address: &str,
        handler: Arc<dyn FrameHandler>,
        config: ServerConfig,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(address).await?;
        info!("[dfl-03] listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            handler,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), TransportError> {
        let limiter = Arc::new(Semaphore::new(self.config.max_connections.max(1)));

        loop {
            let permit = tokio::select! {
                permit = Arc::clone(&limiter).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = shutdown.changed() => break,
            };

            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = shutdown.changed() => break,
            };

            match accepted {
                Ok((stream, peer)) => {
                    let handler = Arc::clone(&self.handler);
                    let config = self.config.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, handler, &config).await {
                            debug!(%peer, "[dfl-03] connection dropped: {}", e);
                        }
                        drop(permit);
                    });
                }
                Err(e) => {
                    warn!("[dfl-03] accept failed: {}", e);
                }
            }
        }

        info!("[dfl-03] server stopped");
        Ok(())
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    handler: Arc<dyn FrameHandler>,
    config: &ServerConfig,
) -> Result<(), TransportError> {
    let request = match timeout(
        config.read_timeout,
        read_one_frame(&mut stream, config.max_payload_len),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            return Err(TransportError::ProtocolViolation(
                "request not received in time".into(),
            ))
        }
    };
    let Some(request) = request else {
        return Ok(());
    };

    let (reply_command, reply_payload) = tokio::task::spawn_blocking(move || {
        handler.handle(request.command, &request.payload)
    })
    .await
    .unwrap_or_else(|e| {
        error!("[dfl-03] request handler failed: {}", e);
        (CommandType::Unknown, Vec::new())
    });

    write_frame(&mut stream, reply_command, &reply_payload).await?;
    let _ = stream.shutdown().await;
    Ok(())
}
