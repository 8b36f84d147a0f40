//! Transport adapter over tokio byte streams.
//!
//! [`StreamTransport`] wraps anything that is `AsyncRead + AsyncWrite`: a
//! serial device handle, a TCP connection to a serial bridge, or a test
//! mock. It spawns a read loop that turns incoming bytes into
//! [`TransportSignal`]s.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};

use super::{Connector, Transport, TransportLink, TransportSignal};

// ============================================================================
// Constants
// ============================================================================

/// Read buffer size for the read loop.
const READ_BUFFER_SIZE: usize = 1024;

// ============================================================================
// StreamTransport
// ============================================================================

/// Transport over a split tokio byte stream.
pub struct StreamTransport<S> {
    /// Write half, `None` once closed.
    writer: AsyncMutex<Option<WriteHalf<S>>>,
    /// Read loop task.
    reader: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Splits `stream` and spawns its read loop.
    ///
    /// The returned link's first signal is [`TransportSignal::Opened`].
    pub fn spawn(stream: S) -> TransportLink {
        let (read_half, write_half) = tokio::io::split(stream);
        let (signal_tx, signals) = mpsc::unbounded_channel();

        let _ = signal_tx.send(TransportSignal::Opened);
        let reader = tokio::spawn(Self::run_read_loop(read_half, signal_tx));

        let transport = Arc::new(Self {
            writer: AsyncMutex::new(Some(write_half)),
            reader: parking_lot::Mutex::new(Some(reader)),
        });

        TransportLink { transport, signals }
    }

    /// Forwards reads as signals until EOF or error.
    async fn run_read_loop(
        mut read_half: ReadHalf<S>,
        signal_tx: mpsc::UnboundedSender<TransportSignal>,
    ) {
        let mut buffer = [0u8; READ_BUFFER_SIZE];

        loop {
            match read_half.read(&mut buffer).await {
                Ok(0) => {
                    debug!("Stream ended");
                    break;
                }
                Ok(n) => {
                    trace!(bytes = n, "Read from stream");
                    if signal_tx
                        .send(TransportSignal::Data(buffer[..n].to_vec()))
                        .is_err()
                    {
                        debug!("Signal receiver dropped");
                        return;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Stream read failed");
                    let _ = signal_tx.send(TransportSignal::Error(e.to_string()));
                    break;
                }
            }
        }

        let _ = signal_tx.send(TransportSignal::Closed);
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(Error::ConnectionClosed)?;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            writer.shutdown().await?;
            debug!("Stream closed");
        }
        Ok(())
    }
}

// ============================================================================
// TcpConnector
// ============================================================================

/// Connects to serial-over-TCP bridges.
///
/// The port string is a `host:port` address. Raw bridges have no channel
/// for line settings, so the baud rate is only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, port: &str, baud_rate: u32) -> Result<TransportLink> {
        let stream = TcpStream::connect(port)
            .await
            .map_err(|e| Error::connection(format!("{port}: {e}")))?;
        stream.set_nodelay(true)?;

        info!(port, baud_rate, "Connected to serial bridge");
        Ok(StreamTransport::spawn(stream))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_loop_signals() {
        let mock = Builder::new().read(b"MicroPython\r\n>>> ").build();
        let mut link = StreamTransport::spawn(mock);

        assert_eq!(link.signals.recv().await, Some(TransportSignal::Opened));
        assert_eq!(
            link.signals.recv().await,
            Some(TransportSignal::Data(b"MicroPython\r\n>>> ".to_vec()))
        );
        assert_eq!(link.signals.recv().await, Some(TransportSignal::Closed));
    }

    #[tokio::test]
    async fn test_write_passthrough() {
        let mock = Builder::new().write(b"\r\x03").build();
        let link = StreamTransport::spawn(mock);

        link.transport.write(b"\r\x03").await.unwrap();
        link.transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_write_after_close() {
        let mock = Builder::new().build();
        let link = StreamTransport::spawn(mock);

        link.transport.close().await.unwrap();
        link.transport.close().await.unwrap();
        let err = link.transport.write(b"x").await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_tcp_connector() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1];
            socket.read_exact(&mut buf).await.unwrap();
            buf
        });

        let mut link = TcpConnector.connect(&addr, 115_200).await.unwrap();
        assert_eq!(link.signals.recv().await, Some(TransportSignal::Opened));
        link.transport.write(b"\r").await.unwrap();

        assert_eq!(&server.await.unwrap(), b"\r");
    }

    #[tokio::test]
    async fn test_tcp_connector_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpConnector.connect(&addr, 115_200).await.err().unwrap();
        assert!(matches!(err, Error::Connection { .. }));
    }
}
