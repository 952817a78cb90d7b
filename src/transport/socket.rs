//! # Raw Socket Channel
//!
//! Sends the stream as raw bytes over TCP, usually to port 9100 of a
//! network printer or print server.
//!
//! Availability only checks that the address resolves; connecting is left
//! to `send` so a probe never wakes a sleeping printer. After the write the
//! connection stays open for a short grace period before shutdown, since
//! some print servers drop data when the peer closes immediately.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, lookup_host};
use tracing::{debug, instrument};

use super::{ChannelKind, PrintChannel};
use crate::codegen::CommandStream;
use crate::error::{EtiquetaError, Result};

/// Raw printing port
pub const DEFAULT_PORT: u16 = 9100;

/// Default hard timeout for connect plus write
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay between the last write and shutdown
pub const DEFAULT_GRACE: Duration = Duration::from_millis(200);

/// Default priority in the fallback chain
pub const DEFAULT_PRIORITY: i32 = 20;

#[derive(Debug, Clone)]
pub struct SocketChannel {
    name: String,
    host: String,
    port: u16,
    timeout: Duration,
    grace: Duration,
    priority: i32,
}

impl SocketChannel {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            name: "socket".to_string(),
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
            grace: DEFAULT_GRACE,
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Parse `host:port`, or a bare host on [`DEFAULT_PORT`].
    pub fn from_addr(addr: &str) -> Result<Self> {
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(EtiquetaError::Config("empty socket address".into()));
        }
        // Bracketed IPv6 literals carry colons of their own.
        let split = match addr.rfind(':') {
            Some(i) if !addr[..i].contains(':') => Some(i),
            Some(i) if addr.starts_with('[') && addr[..i].ends_with(']') => Some(i),
            _ => None,
        };
        match split {
            Some(i) => {
                let port = addr[i + 1..]
                    .parse()
                    .map_err(|_| EtiquetaError::Config(format!("invalid port in '{}'", addr)))?;
                let host = addr[..i].trim_start_matches('[').trim_end_matches(']');
                Ok(Self::new(host, port))
            }
            None => Ok(Self::new(addr.trim_start_matches('[').trim_end_matches(']'), DEFAULT_PORT)),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    async fn deliver(&self, data: &[u8]) -> Result<()> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| EtiquetaError::channel(&self.name, format!("{}:{}: {}", self.host, self.port, e)))?;

        debug!("connected, sending {} bytes", data.len());

        stream
            .write_all(data)
            .await
            .map_err(|e| EtiquetaError::channel(&self.name, format!("write failed: {}", e)))?;
        stream
            .flush()
            .await
            .map_err(|e| EtiquetaError::channel(&self.name, format!("flush failed: {}", e)))?;

        if !self.grace.is_zero() {
            tokio::time::sleep(self.grace).await;
        }
        // The data is already written; a failed shutdown is not a failed print.
        if let Err(e) = stream.shutdown().await {
            debug!(error = %e, "shutdown after write failed");
        }
        Ok(())
    }
}

#[async_trait]
impl PrintChannel for SocketChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Socket
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn timeout(&self) -> Duration {
        self.timeout + self.grace
    }

    async fn availability(&self) -> Result<()> {
        let resolved = tokio::time::timeout(self.timeout, lookup_host((self.host.as_str(), self.port))).await;
        match resolved {
            Ok(Ok(mut addrs)) => match addrs.next() {
                Some(_) => Ok(()),
                None => Err(EtiquetaError::unavailable(
                    &self.name,
                    format!("{} resolves to no address", self.host),
                )),
            },
            Ok(Err(e)) => Err(EtiquetaError::unavailable(
                &self.name,
                format!("cannot resolve {}: {}", self.host, e),
            )),
            Err(_) => Err(EtiquetaError::unavailable(
                &self.name,
                format!("resolving {} timed out", self.host),
            )),
        }
    }

    #[instrument(skip(self, stream), fields(host = %self.host, port = self.port, bytes = stream.as_bytes().len()))]
    async fn send(&self, stream: &CommandStream) -> Result<()> {
        tokio::time::timeout(self.timeout(), self.deliver(stream.as_bytes()))
            .await
            .map_err(|_| EtiquetaError::ChannelTimeout {
                channel: self.name.clone(),
                timeout_ms: self.timeout().as_millis() as u64,
            })?
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::Language;
    use crate::label::LabelSize;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn stream() -> CommandStream {
        CommandStream::from_raw("^XA\n^FO10,10^FDhello^FS\n^XZ", Language::Zpl, LabelSize::new(50.0, 25.0), 203)
            .unwrap()
    }

    #[test]
    fn test_from_addr() {
        let ch = SocketChannel::from_addr("192.168.1.50:9101").unwrap();
        assert_eq!((ch.host(), ch.port()), ("192.168.1.50", 9101));

        let ch = SocketChannel::from_addr("printer.local").unwrap();
        assert_eq!((ch.host(), ch.port()), ("printer.local", DEFAULT_PORT));

        let ch = SocketChannel::from_addr("[::1]:9100").unwrap();
        assert_eq!((ch.host(), ch.port()), ("::1", 9100));

        assert!(SocketChannel::from_addr("printer:abc").is_err());
        assert!(SocketChannel::from_addr("").is_err());
    }

    #[tokio::test]
    async fn test_sends_raw_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            conn.read_to_end(&mut received).await.unwrap();
            received
        });

        let channel = SocketChannel::new("127.0.0.1", port).with_grace(Duration::ZERO);
        assert!(channel.is_available().await);
        channel.send(&stream()).await.unwrap();

        assert_eq!(server.await.unwrap(), stream().as_bytes());
    }

    #[tokio::test]
    async fn test_refused_connection_fails() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let channel = SocketChannel::new("127.0.0.1", port).with_grace(Duration::ZERO);
        // Resolving still works; only the send fails.
        assert!(channel.is_available().await);
        let err = channel.send(&stream()).await.unwrap_err();
        assert!(matches!(err, EtiquetaError::Channel { .. }));
    }

    #[tokio::test]
    async fn test_unresolvable_host_unavailable() {
        let channel = SocketChannel::new("etiqueta-no-such-host.invalid", DEFAULT_PORT);
        assert!(!channel.is_available().await);
    }
}
