//! GTP connections
//!
//! Turns raw UDP datagrams into dispatched handler events. A [`Conn`] is
//! a control-plane endpoint (GTP-C, any version); a [`UPlaneConn`] is a
//! user-plane endpoint (GTPv1-U) that can additionally relay tunneled
//! traffic between peers or delegate the data path to a kernel device.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Notify};

use crate::error::GtpError;
use crate::message::{GtpMessage, GtpVersion};

pub mod cplane;
pub mod handler;
pub mod kernel;
pub mod uplane;

pub use cplane::{Conn, DialConfig};
pub use handler::HandlerRegistry;
pub use kernel::{KernelTunnel, Role};
pub use uplane::UPlaneConn;

/// Maximum UDP datagram size
pub const MAX_DATAGRAM: usize = 65535;

/// Capacity of the per-connection error channel; reports beyond this are
/// dropped rather than blocking handler tasks
pub const ERROR_CHANNEL_CAPACITY: usize = 256;

/// Connection-layer error type
#[derive(Error, Debug)]
pub enum ConnError {
    /// Socket read/write failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed datagram
    #[error("codec error: {0}")]
    Codec(#[from] GtpError),

    /// No handler registered for a received message type (non-fatal)
    #[error("no handler registered for message type {msg_type} from {from}")]
    NoHandlerFound { msg_type: u8, from: SocketAddr },

    /// Echo handshake gave up
    #[error("echo handshake with {peer} timed out after {attempts} attempts")]
    HandshakeTimeout { peer: SocketAddr, attempts: u32 },

    /// Operation on a closed connection
    #[error("connection is closed")]
    Closed,

    /// Peer answered with Version Not Supported
    #[error("peer {0} does not support the requested GTP version")]
    VersionNotSupportedByPeer(SocketAddr),

    /// Kernel tunnel operation invoked while userland relay is active
    #[error("kernel GTP-U is not enabled on this connection")]
    KernelNotEnabled,

    /// Userland relay operation invoked while kernel offload is active
    #[error("kernel GTP-U is active; userland relay is unavailable")]
    KernelActive,

    /// Kernel tunnel operation failure, with device and operation context
    #[error("kernel tunnel op {op} on device {device} failed: {source}")]
    Kernel {
        device: String,
        op: &'static str,
        source: io::Error,
    },
}

/// Future returned by a message handler
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), ConnError>> + Send>>;

/// A registered message handler
///
/// Handlers receive a cheap clone of the connection's [`Endpoint`] for
/// sending replies, the sender address, and the decoded message.
pub type Handler = Arc<dyn Fn(Endpoint, SocketAddr, GtpMessage) -> HandlerFuture + Send + Sync>;

pub(crate) struct EndpointInner {
    pub(crate) socket: UdpSocket,
    pub(crate) version: GtpVersion,
    pub(crate) restart_counter: u8,
    pub(crate) sequence: AtomicU32,
    pub(crate) closed: AtomicBool,
    pub(crate) shutdown: Notify,
    pub(crate) errors: mpsc::Sender<ConnError>,
}

/// Shared send/report handle for a connection
///
/// An `Endpoint` owns the socket, restart counter and sequence allocator
/// that both connection types and their handlers use. Clones share the
/// same underlying state.
#[derive(Clone)]
pub struct Endpoint {
    pub(crate) inner: Arc<EndpointInner>,
}

impl Endpoint {
    pub(crate) fn new(
        socket: UdpSocket,
        version: GtpVersion,
        restart_counter: u8,
        errors: mpsc::Sender<ConnError>,
    ) -> Self {
        Self {
            inner: Arc::new(EndpointInner {
                socket,
                version,
                restart_counter,
                sequence: AtomicU32::new(1),
                closed: AtomicBool::new(false),
                shutdown: Notify::new(),
                errors,
            }),
        }
    }

    /// Local address the socket is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.socket.local_addr()
    }

    /// GTP version this endpoint speaks for its own signalling
    pub fn version(&self) -> GtpVersion {
        self.inner.version
    }

    /// Local restart counter reported in Recovery IEs
    pub fn restart_counter(&self) -> u8 {
        self.inner.restart_counter
    }

    /// Allocate the next outgoing sequence number (24-bit wrap)
    pub fn next_sequence(&self) -> u32 {
        self.inner.sequence.fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF
    }

    /// True once the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Serialize and send a message to the given peer
    pub async fn send_to(&self, msg: &GtpMessage, to: SocketAddr) -> Result<usize, ConnError> {
        self.send_raw(&msg.encode(), to).await
    }

    /// Send raw bytes to the given peer
    pub async fn send_raw(&self, raw: &[u8], to: SocketAddr) -> Result<usize, ConnError> {
        if self.is_closed() {
            return Err(ConnError::Closed);
        }
        Ok(self.inner.socket.send_to(raw, to).await?)
    }

    /// Close the endpoint: further sends fail and the receive loop exits
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            // notify_one stores a permit, so the receive loop wakes even
            // if it is not parked on the Notify yet
            self.inner.shutdown.notify_one();
        }
    }

    /// Report an asynchronous failure on the error channel, best-effort
    pub(crate) fn report(&self, err: ConnError) {
        if let Err(e) = self.inner.errors.try_send(err) {
            log::debug!("error channel full or closed, dropping report: {e}");
        }
    }
}

/// Decode a datagram and dispatch it through the registry.
///
/// Each matched message runs on its own task so a slow handler cannot
/// stall the receive loop. Decode failures and missing handlers are
/// non-fatal: they are reported on the error channel and the datagram is
/// discarded.
pub(crate) fn dispatch_datagram(
    endpoint: &Endpoint,
    handlers: &HandlerRegistry,
    raw: &[u8],
    from: SocketAddr,
) {
    let msg = match GtpMessage::decode(raw) {
        Ok(msg) => msg,
        Err(GtpError::InvalidVersion(version)) => {
            log::warn!("unsupported GTP version {version} from {from}");
            let ep = endpoint.clone();
            let seq = ep.next_sequence();
            tokio::spawn(async move {
                let reply = GtpMessage::version_not_supported(ep.version(), seq);
                let _ = ep.send_to(&reply, from).await;
            });
            endpoint.report(ConnError::Codec(GtpError::InvalidVersion(version)));
            return;
        }
        Err(err) => {
            log::debug!("dropping malformed datagram from {from}: {err}");
            endpoint.report(ConnError::Codec(err));
            return;
        }
    };

    let msg_type = msg.message_type();
    match handlers.get(msg_type) {
        Some(handler) => {
            let ep = endpoint.clone();
            tokio::spawn(async move {
                if let Err(err) = handler(ep.clone(), from, msg).await {
                    ep.report(err);
                }
            });
        }
        None => endpoint.report(ConnError::NoHandlerFound { msg_type, from }),
    }
}
