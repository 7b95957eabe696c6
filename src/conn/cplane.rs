//! Control-plane connection
//!
//! A [`Conn`] owns a UDP socket, a restart counter and a handler
//! registry. `listen_and_serve` is the passive open; `dial` is the
//! active open and doubles as a liveness probe: it sends Echo Requests
//! under a deadline until the peer answers.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Duration, Instant};

use crate::message::{GtpMessage, GtpVersion};

use super::handler::{HandlerRegistry, MSG_TYPE_ECHO_RESPONSE};
use super::{dispatch_datagram, ConnError, Endpoint, ERROR_CHANNEL_CAPACITY, MAX_DATAGRAM};

/// Echo handshake retry policy for [`Conn::dial_with`]
#[derive(Debug, Clone, Copy)]
pub struct DialConfig {
    /// Deadline for one Echo Request attempt
    pub timeout: Duration,
    /// Attempts before giving up; `None` retries until the peer answers
    pub max_retries: Option<u32>,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            max_retries: Some(5),
        }
    }
}

/// Control-plane GTP connection
pub struct Conn {
    endpoint: Endpoint,
    handlers: HandlerRegistry,
}

impl Conn {
    /// Passive open: bind the socket and start serving.
    ///
    /// Returns the connection and the receiving end of its error
    /// channel. The caller must drain the channel to observe
    /// asynchronous failures.
    pub async fn listen_and_serve(
        version: GtpVersion,
        laddr: SocketAddr,
        restart_counter: u8,
    ) -> Result<(Arc<Self>, mpsc::Receiver<ConnError>), ConnError> {
        let socket = UdpSocket::bind(laddr).await?;
        log::info!("GTP connection serving on {}", socket.local_addr()?);
        Ok(Self::start(socket, version, restart_counter))
    }

    /// Active open with the default retry policy
    pub async fn dial(
        version: GtpVersion,
        laddr: SocketAddr,
        raddr: SocketAddr,
        restart_counter: u8,
    ) -> Result<(Arc<Self>, mpsc::Receiver<ConnError>), ConnError> {
        Self::dial_with(version, laddr, raddr, restart_counter, DialConfig::default()).await
    }

    /// Active open: send Echo Requests until the peer answers, then
    /// start serving.
    ///
    /// Datagrams that are not an Echo Response from the dialed peer are
    /// discarded while the per-attempt deadline runs. A transport error
    /// aborts immediately; exceeding `max_retries` yields
    /// [`ConnError::HandshakeTimeout`].
    pub async fn dial_with(
        version: GtpVersion,
        laddr: SocketAddr,
        raddr: SocketAddr,
        restart_counter: u8,
        config: DialConfig,
    ) -> Result<(Arc<Self>, mpsc::Receiver<ConnError>), ConnError> {
        let socket = UdpSocket::bind(laddr).await?;
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let mut attempts: u32 = 0;

        'handshake: loop {
            attempts += 1;
            let request = GtpMessage::echo_request(version, attempts, restart_counter);
            socket.send_to(&request.encode(), raddr).await?;
            log::debug!("echo request sent to {raddr} (attempt {attempts})");

            let deadline = Instant::now() + config.timeout;
            loop {
                match timeout_at(deadline, socket.recv_from(&mut buf)).await {
                    Err(_) => break, // deadline passed, resend
                    Ok(Err(err)) => return Err(err.into()),
                    Ok(Ok((n, from))) => {
                        if from != raddr {
                            continue;
                        }
                        match GtpMessage::decode(&buf[..n]) {
                            Ok(msg)
                                if msg.version() == version
                                    && msg.message_type() == MSG_TYPE_ECHO_RESPONSE =>
                            {
                                log::info!("peer {raddr} answered echo, connection open");
                                break 'handshake;
                            }
                            // anything else is discarded until the deadline
                            _ => continue,
                        }
                    }
                }
            }

            if let Some(max) = config.max_retries {
                if attempts >= max {
                    return Err(ConnError::HandshakeTimeout {
                        peer: raddr,
                        attempts,
                    });
                }
            }
        }

        Ok(Self::start(socket, version, restart_counter))
    }

    fn start(
        socket: UdpSocket,
        version: GtpVersion,
        restart_counter: u8,
    ) -> (Arc<Self>, mpsc::Receiver<ConnError>) {
        let (tx, rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let conn = Arc::new(Self {
            endpoint: Endpoint::new(socket, version, restart_counter, tx),
            handlers: HandlerRegistry::with_defaults(),
        });
        tokio::spawn(conn.clone().serve());
        (conn, rx)
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

    /// Local restart counter
    pub fn restart_counter(&self) -> u8 {
        self.endpoint.restart_counter()
    }

    /// Allocate the next outgoing sequence number
    pub fn next_sequence(&self) -> u32 {
        self.endpoint.next_sequence()
    }

    /// Serialize and send a message to the given peer
    pub async fn send_to(&self, msg: &GtpMessage, to: SocketAddr) -> Result<usize, ConnError> {
        self.endpoint.send_to(msg, to).await
    }

    /// Close the connection and stop the receive loop
    pub fn close(&self) {
        self.endpoint.close();
        log::info!("GTP connection closed");
    }

    /// Receive loop: one task reads the socket; every decoded message is
    /// dispatched on its own task
    async fn serve(self: Arc<Self>) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                _ = self.endpoint.inner.shutdown.notified() => break,
                result = self.endpoint.inner.socket.recv_from(&mut buf) => match result {
                    Ok((n, from)) => {
                        dispatch_datagram(&self.endpoint, &self.handlers, &buf[..n], from);
                    }
                    Err(err) => {
                        // transport errors are fatal to the receive loop
                        log::error!("receive loop terminating: {err}");
                        self.endpoint.report(ConnError::Io(err));
                        break;
                    }
                }
            }
        }
    }
}
