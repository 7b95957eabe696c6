//! GTP (GPRS Tunneling Protocol) datagram engine
//!
//! This crate provides the binary Information-Element and message codec
//! shared by GTPv0 (3GPP TS 09.60), GTPv1 (TS 29.060 / TS 29.281) and
//! GTPv2-C (TS 29.274), together with a connection layer that decodes
//! incoming UDP datagrams, dispatches them to registered handlers and
//! forwards tunneled user traffic between peers by TEID, in userland or
//! through a kernel GTP-U device.
//!
//! # Example
//!
//! ```no_run
//! use nextgtp::conn::{Conn, UPlaneConn};
//! use nextgtp::GtpVersion;
//!
//! # async fn run() -> Result<(), nextgtp::conn::ConnError> {
//! // passive control-plane endpoint; answers echo keepalives by default
//! let (cplane, mut errors) =
//!     Conn::listen_and_serve(GtpVersion::V2, "127.0.0.1:2123".parse().unwrap(), 1).await?;
//!
//! // user-plane endpoints relaying a tunnel between two peers
//! let (left, _) = UPlaneConn::bind("127.0.0.1:2152".parse().unwrap(), 1).await?;
//! let (right, _) = UPlaneConn::bind("127.0.0.1:2252".parse().unwrap(), 1).await?;
//! left.relay_to(&right, 0x11111111, 0x22222222, "127.0.0.2:2152".parse().unwrap())?;
//!
//! while let Some(err) = errors.recv().await {
//!     log::warn!("gtp: {err}");
//! }
//! # cplane.close();
//! # Ok(())
//! # }
//! ```

pub mod conn;
pub mod conv;
pub mod error;
pub mod message;
pub mod teid_pool;
pub mod v0;
pub mod v1;
pub mod v2;


pub use error::{GtpError, GtpResult};
pub use message::{GtpMessage, GtpVersion};
pub use teid_pool::TeidPool;

/// GTP-C UDP port (2123)
pub const GTPC_UDP_PORT: u16 = 2123;

/// GTP-U UDP port (2152)
pub const GTPU_UDP_PORT: u16 = 2152;
