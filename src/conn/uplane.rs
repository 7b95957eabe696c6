//! User-plane connection and relay
//!
//! A [`UPlaneConn`] is a GTPv1-U endpoint. Tunneled G-PDUs take a fast
//! path that never fully decodes the datagram: the TEID is peeked from
//! the fixed header, rewritten in place on a relay hit, and the same
//! buffer is written out the destination connection's socket. Everything
//! else goes through the normal handler registry.
//!
//! Forwarding is either userland relay or kernel offload, never both:
//! the mode is a tagged variant, and enabling the kernel path clears any
//! userland associations.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, RwLock};

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::message::{GtpMessage, GtpVersion};
use crate::v1::header::{Gtp1MessageType, GTP1_VERSION, GTPV1_HEADER_LEN};

use super::handler::HandlerRegistry;
use super::kernel::{KernelTunnel, Role};
use super::{dispatch_datagram, ConnError, Endpoint, ERROR_CHANNEL_CAPACITY, MAX_DATAGRAM};

/// Destination of a userland relay association
#[derive(Clone)]
pub struct RelayPeer {
    /// TEID written into forwarded datagrams
    pub teid_out: u32,
    /// Remote address forwarded datagrams are sent to
    pub addr: SocketAddr,
    /// Connection whose socket carries the forwarded datagrams
    dst: Endpoint,
}

enum ForwardingMode {
    Userland(HashMap<u32, RelayPeer>),
    Kernel(Box<dyn KernelTunnel>),
}

/// User-plane GTP connection
pub struct UPlaneConn {
    endpoint: Endpoint,
    handlers: HandlerRegistry,
    mode: RwLock<ForwardingMode>,
}

impl UPlaneConn {
    /// Bind a user-plane socket and start serving
    pub async fn bind(
        laddr: SocketAddr,
        restart_counter: u8,
    ) -> Result<(Arc<Self>, mpsc::Receiver<ConnError>), ConnError> {
        let socket = UdpSocket::bind(laddr).await?;
        log::info!("GTP-U connection serving on {}", socket.local_addr()?);

        let (tx, rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let conn = Arc::new(Self {
            endpoint: Endpoint::new(socket, GtpVersion::V1, restart_counter, tx),
            handlers: HandlerRegistry::with_defaults(),
            mode: RwLock::new(ForwardingMode::Userland(HashMap::new())),
        });
        tokio::spawn(conn.clone().serve());
        Ok((conn, rx))
    }

    /// Register (or override) the handler for a message type
    pub fn add_handler<F, Fut>(&self, msg_type: u8, f: F)
    where
        F: Fn(Endpoint, SocketAddr, GtpMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ConnError>> + Send + 'static,
    {
        self.handlers.add(msg_type, f);
    }

    /// Send handle shared with handlers
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Local address the socket is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.endpoint.local_addr()
    }

    /// Serialize and send a message to the given peer
    pub async fn send_to(&self, msg: &GtpMessage, to: SocketAddr) -> Result<usize, ConnError> {
        self.endpoint.send_to(msg, to).await
    }

    /// Close the connection and stop the receive loop
    pub fn close(&self) {
        self.endpoint.close();
        log::info!("GTP-U connection closed");
    }

    // ------------------------------------------------------------------
    // Userland relay
    // ------------------------------------------------------------------

    /// Associate an incoming TEID with a destination connection.
    ///
    /// A G-PDU arriving with `teid_in` is forwarded out `dst`'s socket
    /// to `peer_addr` with its TEID rewritten to `teid_out`. Fails with
    /// [`ConnError::KernelActive`] while kernel offload is enabled.
    pub fn relay_to(
        &self,
        dst: &Arc<UPlaneConn>,
        teid_in: u32,
        teid_out: u32,
        peer_addr: SocketAddr,
    ) -> Result<(), ConnError> {
        let mut mode = self.mode.write().unwrap();
        match &mut *mode {
            ForwardingMode::Userland(peers) => {
                peers.insert(
                    teid_in,
                    RelayPeer {
                        teid_out,
                        addr: peer_addr,
                        dst: dst.endpoint.clone(),
                    },
                );
                log::info!(
                    "relay added: teid_in={teid_in:#010x} -> teid_out={teid_out:#010x} peer={peer_addr}"
                );
                Ok(())
            }
            ForwardingMode::Kernel(_) => Err(ConnError::KernelActive),
        }
    }

    /// Remove the relay association for an incoming TEID
    pub fn remove_relay(&self, teid_in: u32) -> bool {
        let mut mode = self.mode.write().unwrap();
        match &mut *mode {
            ForwardingMode::Userland(peers) => peers.remove(&teid_in).is_some(),
            ForwardingMode::Kernel(_) => false,
        }
    }

    // ------------------------------------------------------------------
    // Kernel offload
    // ------------------------------------------------------------------

    /// Switch the data path to a kernel GTP-U device.
    ///
    /// Clears any userland relay associations; the two modes are
    /// mutually exclusive.
    pub fn enable_kernel_gtp(
        &self,
        device: Box<dyn KernelTunnel>,
        role: Role,
    ) -> Result<(), ConnError> {
        device.enable(role).map_err(|source| ConnError::Kernel {
            device: device.name().to_string(),
            op: "enable",
            source,
        })?;
        log::info!("kernel GTP-U enabled on {} ({role:?})", device.name());
        *self.mode.write().unwrap() = ForwardingMode::Kernel(device);
        Ok(())
    }

    /// Switch back to userland relay with an empty association map
    pub fn disable_kernel_gtp(&self) {
        *self.mode.write().unwrap() = ForwardingMode::Userland(HashMap::new());
    }

    /// True while kernel offload is the active forwarding mode
    pub fn kernel_gtp_enabled(&self) -> bool {
        matches!(&*self.mode.read().unwrap(), ForwardingMode::Kernel(_))
    }

    /// Add a kernel tunnel for a subscriber
    pub fn add_tunnel(
        &self,
        peer: IpAddr,
        subscriber: IpAddr,
        otei: u32,
        itei: u32,
    ) -> Result<(), ConnError> {
        self.with_kernel("add_tunnel", |dev| dev.add_tunnel(peer, subscriber, otei, itei))
    }

    /// Add a kernel tunnel, replacing any existing one for the subscriber
    pub fn add_tunnel_override(
        &self,
        peer: IpAddr,
        subscriber: IpAddr,
        otei: u32,
        itei: u32,
    ) -> Result<(), ConnError> {
        self.with_kernel("add_tunnel_override", |dev| {
            dev.add_tunnel_override(peer, subscriber, otei, itei)
        })
    }

    /// Delete a kernel tunnel by its incoming TEID
    pub fn del_tunnel_by_itei(&self, itei: u32) -> Result<(), ConnError> {
        self.with_kernel("del_tunnel_by_itei", |dev| dev.del_tunnel_by_itei(itei))
    }

    /// Delete a kernel tunnel by the subscriber's IP address
    pub fn del_tunnel_by_ms_address(&self, subscriber: IpAddr) -> Result<(), ConnError> {
        self.with_kernel("del_tunnel_by_ms_address", |dev| {
            dev.del_tunnel_by_ms_address(subscriber)
        })
    }

    fn with_kernel(
        &self,
        op: &'static str,
        f: impl FnOnce(&dyn KernelTunnel) -> io::Result<()>,
    ) -> Result<(), ConnError> {
        let mode = self.mode.read().unwrap();
        match &*mode {
            ForwardingMode::Kernel(device) => f(device.as_ref()).map_err(|source| {
                ConnError::Kernel {
                    device: device.name().to_string(),
                    op,
                    source,
                }
            }),
            ForwardingMode::Userland(_) => Err(ConnError::KernelNotEnabled),
        }
    }

    // ------------------------------------------------------------------
    // Receive path
    // ------------------------------------------------------------------

    async fn serve(self: Arc<Self>) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                _ = self.endpoint.inner.shutdown.notified() => break,
                result = self.endpoint.inner.socket.recv_from(&mut buf) => match result {
                    Ok((n, from)) => {
                        let datagram = &mut buf[..n];
                        if !self.try_relay(datagram) {
                            dispatch_datagram(&self.endpoint, &self.handlers, datagram, from);
                        }
                    }
                    Err(err) => {
                        log::error!("GTP-U receive loop terminating: {err}");
                        self.endpoint.report(ConnError::Io(err));
                        break;
                    }
                }
            }
        }
    }

    /// Fast path for tunneled traffic.
    ///
    /// Returns true when the datagram was consumed (forwarded or
    /// dropped). Only the fixed header is inspected; the payload is
    /// neither decoded nor copied. A G-PDU whose TEID has no association
    /// is dropped silently: relaying is best-effort until both peer
    /// associations exist.
    fn try_relay(&self, raw: &mut [u8]) -> bool {
        if raw.len() < GTPV1_HEADER_LEN {
            return false;
        }
        if raw[0] >> 5 != GTP1_VERSION || raw[1] != Gtp1MessageType::GPdu as u8 {
            return false;
        }

        let teid = u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);

        let mode = self.mode.read().unwrap();
        match &*mode {
            ForwardingMode::Userland(peers) => {
                if let Some(peer) = peers.get(&teid) {
                    raw[4..8].copy_from_slice(&peer.teid_out.to_be_bytes());
                    // best-effort: a full socket buffer drops the datagram
                    if let Err(err) = peer.dst.inner.socket.try_send_to(raw, peer.addr) {
                        log::debug!("relay send to {} failed: {err}", peer.addr);
                    }
                } else {
                    log::trace!("no relay peer for teid {teid:#010x}, dropping");
                }
            }
            ForwardingMode::Kernel(_) => {
                // kernel owns the data path; stray userspace G-PDUs are dropped
                log::trace!("G-PDU in kernel mode, dropping");
            }
        }
        true
    }
}
