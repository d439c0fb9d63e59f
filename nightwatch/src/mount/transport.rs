//! Byte-level transports for the LX200 wire protocol (§4.A ADDED).
//!
//! `MountTransport` hides whether the controller is reached over TCP or a
//! serial line behind a single read-until-terminator-or-timeout contract;
//! the protocol engine in `lx200.rs` never branches on connection type.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_serial::SerialPortBuilderExt;

use crate::errors::ConnectionError;

#[async_trait]
pub trait MountTransport: Send + Sync {
    async fn write_all(&mut self, buf: &[u8]) -> Result<(), ConnectionError>;

    /// Reads bytes until `terminator` is seen or `timeout_after` elapses.
    /// The terminator itself is included in the returned buffer.
    async fn read_until(
        &mut self,
        terminator: u8,
        timeout_after: Duration,
    ) -> Result<Vec<u8>, ConnectionError>;
}

pub struct TcpMountTransport {
    stream: TcpStream,
    target: String,
}

impl TcpMountTransport {
    pub async fn connect(host: &str, port: u16) -> Result<Self, ConnectionError> {
        let target = format!("{host}:{port}");
        let stream =
            TcpStream::connect(&target)
                .await
                .map_err(|e| ConnectionError::Failed {
                    target: target.clone(),
                    reason: e.to_string(),
                })?;
        Ok(Self { stream, target })
    }
}

#[async_trait]
impl MountTransport for TcpMountTransport {
    async fn write_all(&mut self, buf: &[u8]) -> Result<(), ConnectionError> {
        self.stream
            .write_all(buf)
            .await
            .map_err(|e| ConnectionError::Failed {
                target: self.target.clone(),
                reason: e.to_string(),
            })
    }

    async fn read_until(
        &mut self,
        terminator: u8,
        timeout_after: Duration,
    ) -> Result<Vec<u8>, ConnectionError> {
        read_until_generic(&mut self.stream, terminator, timeout_after, &self.target).await
    }
}

pub struct SerialMountTransport {
    port: tokio_serial::SerialStream,
    path: String,
}

impl SerialMountTransport {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, ConnectionError> {
        let port = tokio_serial::new(path, baud_rate)
            .timeout(Duration::from_secs(1))
            .open_native_async()
            .map_err(|e| ConnectionError::Failed {
                target: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            port,
            path: path.to_string(),
        })
    }
}

#[async_trait]
impl MountTransport for SerialMountTransport {
    async fn write_all(&mut self, buf: &[u8]) -> Result<(), ConnectionError> {
        self.port
            .write_all(buf)
            .await
            .map_err(|e| ConnectionError::Failed {
                target: self.path.clone(),
                reason: e.to_string(),
            })
    }

    async fn read_until(
        &mut self,
        terminator: u8,
        timeout_after: Duration,
    ) -> Result<Vec<u8>, ConnectionError> {
        read_until_generic(&mut self.port, terminator, timeout_after, &self.path).await
    }
}

/// Shared read loop: byte-at-a-time until `terminator`, under a deadline.
/// The LX200 wire has two reply shapes, terminated strings and a single
/// bare digit for some motion acks, so callers decide how to interpret a
/// timeout that nonetheless produced bytes.
async fn read_until_generic<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    terminator: u8,
    timeout_after: Duration,
    target: &str,
) -> Result<Vec<u8>, ConnectionError> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    let fut = async {
        loop {
            let n = reader
                .read(&mut byte)
                .await
                .map_err(|e| ConnectionError::Failed {
                    target: target.to_string(),
                    reason: e.to_string(),
                })?;
            if n == 0 {
                return Err(ConnectionError::Reset {
                    target: target.to_string(),
                });
            }
            buf.push(byte[0]);
            if byte[0] == terminator {
                return Ok(buf.clone());
            }
        }
    };
    match timeout(timeout_after, fut).await {
        Ok(result) => result,
        Err(_) => Ok(buf),
    }
}
