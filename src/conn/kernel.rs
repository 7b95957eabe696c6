//! Kernel GTP-U offload interface
//!
//! The kernel data path (a `gtp` netlink device) is an external
//! collaborator; this crate only speaks to it through the narrow
//! interface below. Implementations live with the platform integration,
//! not here.

use std::io;
use std::net::IpAddr;

/// Which side of the tunnel the kernel device encapsulates for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Ggsn,
    Sgsn,
}

/// Narrow interface to a kernel GTP-U tunnel device
pub trait KernelTunnel: Send + Sync {
    /// Device name, used in error context and logs
    fn name(&self) -> &str;

    /// Attach the device for the given role
    fn enable(&self, role: Role) -> io::Result<()>;

    /// Add a tunnel for a subscriber; fails if one already exists
    fn add_tunnel(
        &self,
        peer: IpAddr,
        subscriber: IpAddr,
        otei: u32,
        itei: u32,
    ) -> io::Result<()>;

    /// Add a tunnel, replacing any existing one for the subscriber
    fn add_tunnel_override(
        &self,
        peer: IpAddr,
        subscriber: IpAddr,
        otei: u32,
        itei: u32,
    ) -> io::Result<()>;

    /// Delete a tunnel by its incoming TEID
    fn del_tunnel_by_itei(&self, itei: u32) -> io::Result<()>;

    /// Delete a tunnel by the subscriber's IP address
    fn del_tunnel_by_ms_address(&self, subscriber: IpAddr) -> io::Result<()>;
}
