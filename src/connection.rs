//! Manages the TCP connection to a TiVo box.
//!
//! Does not have any awareness of the status line format. The connection only understands reading
//! raw text sent by the box and writing raw command text to it. See [`crate::status`] for parsing
//! what the box sends.
//!
//! The box is not a reliable peer: it drops idle connections, stops answering while in standby,
//! and sends nothing at all unless its status changes. The connection therefore treats a read
//! timeout on an open socket as "still alive, nothing new" and reconnects on anything else.
//!
//! All access to the socket goes through a single async mutex. A poll and a command can both be
//! in flight; whichever gets the lock first runs to completion, and [`TivoConnection::disconnect`]
//! is skipped entirely while the lock is held.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::Mutex;
use tokio::time::timeout;

const READ_BUFFER_SIZE: usize = 1024;

/// Problems talking to the box.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("timed out")]
    Timeout,
    #[error("could not resolve host: {0}")]
    Resolve(String),
    #[error("could not connect: {0}")]
    Connect(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not connected")]
    NotConnected,
    #[error("connection closed by box")]
    Closed,
}

impl ConnectionError {
    /// Whether the error is expected to clear up by itself on the next attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ConnectionError::Timeout)
    }
}

/// The result of a successful [`TivoConnection::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The existing connection is still open, and the box had nothing new to say.
    Alive,
    /// New data was read from the box (either on an existing or a fresh connection).
    NewData,
}

#[derive(Debug, Default)]
struct ConnectionInner {
    stream: Option<TcpStream>,
    last_message: String,
    message_seq: u64,
}

impl ConnectionInner {
    fn record_message(&mut self, bytes: &[u8]) {
        self.last_message = String::from_utf8_lossy(bytes).into_owned();
        self.message_seq += 1;
    }
}

/// Handle to the connection to a single box. Cloning the handle shares the connection.
#[derive(Debug, Clone)]
pub struct TivoConnection {
    name: String,
    host: String,
    port: u16,
    io_timeout: Duration,
    inner: Arc<Mutex<ConnectionInner>>,
}

impl TivoConnection {
    pub fn new(name: &str, host: &str, port: u16, io_timeout: Duration) -> Self {
        TivoConnection {
            name: name.to_string(),
            host: host.to_string(),
            port,
            io_timeout,
            inner: Arc::new(Mutex::new(ConnectionInner::default())),
        }
    }

    /// Make sure there's a live connection to the box, reading anything the box has sent.
    ///
    /// With an open connection this performs a single short read. A timeout means the connection
    /// is alive but idle. End-of-stream or a read error discards the socket and falls through to
    /// a fresh connection, which expects the box to announce its status straight away.
    pub async fn connect(&self) -> Result<ConnectOutcome, ConnectionError> {
        let mut inner = self.inner.lock().await;

        if let Some(stream) = inner.stream.as_mut() {
            let mut buffer = [0u8; READ_BUFFER_SIZE];
            let read_result = timeout(self.io_timeout, stream.read(&mut buffer)).await;

            match read_result {
                Err(_) => return Ok(ConnectOutcome::Alive),
                Ok(Ok(bytes_read)) if bytes_read > 0 => {
                    inner.record_message(&buffer[..bytes_read]);
                    return Ok(ConnectOutcome::NewData);
                }
                Ok(Ok(_)) => debug!("{}: connection closed by box", self.name),
                Ok(Err(e)) => debug!("{}: connection attempt gave [{}]", self.name, e),
            }

            inner.stream = None;
        }

        debug!("{}: connecting to [{}:{}]", self.name, self.host, self.port);

        let mut stream = self.open_stream().await?;

        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let bytes_read = timeout(self.io_timeout, stream.read(&mut buffer))
            .await
            .map_err(|_| ConnectionError::Timeout)??;

        if bytes_read == 0 {
            return Err(ConnectionError::Closed);
        }

        inner.record_message(&buffer[..bytes_read]);
        debug!(
            "{}: response data [{}]",
            self.name,
            inner.last_message.trim_end()
        );

        inner.stream = Some(stream);

        Ok(ConnectOutcome::NewData)
    }

    async fn open_stream(&self) -> Result<TcpStream, ConnectionError> {
        let mut addrs = timeout(self.io_timeout, lookup_host((self.host.as_str(), self.port)))
            .await
            .map_err(|_| ConnectionError::Timeout)?
            .map_err(|e| ConnectionError::Resolve(format!("{}: {}", self.host, e)))?;

        let addr = addrs
            .next()
            .ok_or_else(|| ConnectionError::Resolve(self.host.clone()))?;

        timeout(self.io_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ConnectionError::Timeout)?
            .map_err(|e| ConnectionError::Connect(format!("{}: {}", addr, e)))
    }

    /// Send raw command text to the box.
    ///
    /// A write timeout leaves the connection in place (the command is presumed lost). Any other
    /// write error discards the socket so the next [`connect`](Self::connect) starts afresh.
    pub async fn send(&self, command: &str) -> Result<(), ConnectionError> {
        let mut inner = self.inner.lock().await;

        let stream = inner.stream.as_mut().ok_or(ConnectionError::NotConnected)?;
        let write_result = timeout(self.io_timeout, stream.write_all(command.as_bytes())).await;

        match write_result {
            Err(_) => Err(ConnectionError::Timeout),
            Ok(Err(e)) => {
                inner.stream = None;
                Err(ConnectionError::Io(e))
            }
            Ok(Ok(())) => {
                debug!("{}: sent request [{}]", self.name, command.trim_end());
                Ok(())
            }
        }
    }

    /// Close the connection, unless it's currently in use.
    ///
    /// Returns whether the connection was closed.
    pub fn disconnect(&self) -> bool {
        match self.inner.try_lock() {
            Ok(mut inner) => {
                if inner.stream.take().is_some() {
                    info!("{}: disconnected from [{}]", self.name, self.host);
                }
                true
            }
            Err(_) => {
                debug!("{}: connection busy, not disconnecting", self.name);
                false
            }
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.stream.is_some()
    }

    /// The most recent text received from the box, along with a sequence number which increases
    /// every time new text arrives.
    pub async fn last_message(&self) -> (String, u64) {
        let inner = self.inner.lock().await;
        (inner.last_message.clone(), inner.message_seq)
    }
}

// ================================================================================================
// Tests
