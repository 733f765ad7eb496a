//! UDP/TCP syslog receivers and the parser task
//!
//! Listeners only split the byte stream into messages. Header stripping and
//! parsing happen in `forward_to_parser`, which is the single writer of the
//! stats table and processes messages strictly in arrival order.

use super::{ListenAddress, Protocol, SyslogFormat, extract_content};
use crate::error::{AppError, AppResult, StatsError};
use crate::stats::RsyslogStats;
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

/// Largest message accepted on either input (one datagram or one TCP line)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// One received message, or the framing error that replaced it
pub type Frame = Result<String, StatsError>;

enum Socket {
    Udp(UdpSocket),
    Tcp(TcpListener),
}

/// Bound syslog input socket
pub struct SyslogListener {
    socket: Socket,
    address: ListenAddress,
}

impl SyslogListener {
    /// Bind the socket described by `address`
    pub async fn bind(address: &ListenAddress) -> AppResult<Self> {
        let bind_error = |source: std::io::Error| AppError::Listener {
            address: address.to_string(),
            source,
        };

        let socket = match address.protocol {
            Protocol::Udp => Socket::Udp(
                UdpSocket::bind(&address.address)
                    .await
                    .map_err(bind_error)?,
            ),
            Protocol::Tcp => Socket::Tcp(
                TcpListener::bind(&address.address)
                    .await
                    .map_err(bind_error)?,
            ),
        };

        Ok(Self {
            socket,
            address: address.clone(),
        })
    }

    /// Address the socket is actually bound to (useful with port 0)
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        let result = match &self.socket {
            Socket::Udp(socket) => socket.local_addr(),
            Socket::Tcp(listener) => listener.local_addr(),
        };
        result.map_err(|source| AppError::Listener {
            address: self.address.to_string(),
            source,
        })
    }

    /// Receive messages until the parser side of `tx` goes away
    pub async fn run(self, tx: mpsc::Sender<Frame>) {
        tracing::info!(address = %self.address, "Listening for syslog messages");

        match self.socket {
            Socket::Udp(socket) => run_udp(socket, tx).await,
            Socket::Tcp(listener) => run_tcp(listener, tx).await,
        }
    }
}

async fn run_udp(socket: UdpSocket, tx: mpsc::Sender<Frame>) {
    let mut buf = vec![0u8; MAX_MESSAGE_SIZE];

    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, peer)) => {
                let message = String::from_utf8_lossy(&buf[..len]).into_owned();
                tracing::trace!(peer = %peer, bytes = len, "Received syslog datagram");
                if tx.send(Ok(message)).await.is_err() {
                    tracing::warn!("Stats parser stopped, closing UDP syslog input");
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to receive syslog datagram");
            }
        }
    }
}

async fn run_tcp(listener: TcpListener, tx: mpsc::Sender<Frame>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tracing::debug!(peer = %peer, "Accepted syslog connection");
                tokio::spawn(handle_connection(stream, peer, tx.clone()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept syslog connection");
            }
        }

        if tx.is_closed() {
            tracing::warn!("Stats parser stopped, closing TCP syslog input");
            return;
        }
    }
}

/// Newline-delimited framing, one message per line
///
/// A line longer than `MAX_MESSAGE_SIZE` is reported as a framing failure and
/// the connection is closed, since the rest of the stream cannot be trusted to
/// be aligned on message boundaries.
async fn handle_connection(stream: TcpStream, peer: SocketAddr, tx: mpsc::Sender<Frame>) {
    let mut lines = FramedRead::new(stream, LinesCodec::new_with_max_length(MAX_MESSAGE_SIZE));

    while let Some(line) = lines.next().await {
        let frame = match line {
            Ok(message) if message.is_empty() => continue,
            Ok(message) => Ok(message),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                tracing::warn!(
                    peer = %peer,
                    max_bytes = MAX_MESSAGE_SIZE,
                    "Syslog message too long, closing connection"
                );
                let error = StatsError::Framing(format!(
                    "message from {} exceeds {} bytes",
                    peer, MAX_MESSAGE_SIZE
                ));
                let _ = tx.send(Err(error)).await;
                break;
            }
            Err(LinesCodecError::Io(e)) => {
                tracing::warn!(peer = %peer, error = %e, "Syslog connection failed");
                break;
            }
        };

        if tx.send(frame).await.is_err() {
            break;
        }
    }

    tracing::debug!(peer = %peer, "Syslog connection closed");
}

/// Strip syslog headers and parse every received message in order
///
/// Messages whose header cannot be parsed count as parser failures.
pub async fn forward_to_parser(
    stats: Arc<RsyslogStats>,
    format: SyslogFormat,
    mut rx: mpsc::Receiver<Frame>,
) {
    while let Some(frame) = rx.recv().await {
        let raw = match frame {
            Ok(raw) => raw,
            Err(e) => {
                stats.record_failure(&e, "<dropped frame>");
                continue;
            }
        };
        match extract_content(format, &raw) {
            Ok(content) => {
                // failures are logged and counted by the stats engine
                if let Ok(report) = stats.parse(content) {
                    tracing::trace!(
                        shape = report.shape.as_str(),
                        observations = report.observations,
                        "Stats message processed"
                    );
                }
            }
            Err(e) => stats.record_failure(&e, &raw),
        }
    }

    tracing::info!("Syslog input closed, stats parser stopping");
}

/// Start the syslog input and the stats parser as background tasks
///
/// Both tasks are expected to live as long as the process. A monitoring task
/// reports if either of them stops.
pub fn start_ingest(
    listener: SyslogListener,
    stats: Arc<RsyslogStats>,
    format: SyslogFormat,
    channel_capacity: usize,
) {
    let (tx, rx) = mpsc::channel(channel_capacity);

    let input = tokio::spawn(listener.run(tx));
    let parser = tokio::spawn(forward_to_parser(stats, format, rx));

    tokio::spawn(async move {
        match input.await {
            Ok(()) => tracing::error!(
                "Syslog input task terminated unexpectedly. \
                No further impstats messages will be received until restart."
            ),
            Err(e) => tracing::error!(
                error = %e,
                "Syslog input task panicked. \
                No further impstats messages will be received until restart."
            ),
        }
    });

    tokio::spawn(async move {
        match parser.await {
            Ok(()) => tracing::error!(
                "Stats parser task terminated unexpectedly. \
                Exported metrics will no longer change until restart."
            ),
            Err(e) => tracing::error!(
                error = %e,
                "Stats parser task panicked. \
                Exported metrics will no longer change until restart."
            ),
        }
    });
}
