//! Handler registry
//!
//! Maps a message-type byte to application logic. Every connection owns
//! its own registry, seeded from the default table at construction, so
//! overriding a handler on one connection never affects another.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use crate::message::GtpMessage;

use super::{ConnError, Endpoint, Handler, HandlerFuture};

/// Well-known message type bytes shared by all versions
pub const MSG_TYPE_ECHO_REQUEST: u8 = 1;
pub const MSG_TYPE_ECHO_RESPONSE: u8 = 2;
pub const MSG_TYPE_VERSION_NOT_SUPPORTED: u8 = 3;

/// Message-type to handler mapping with concurrent read/write
pub struct HandlerRegistry {
    map: RwLock<HashMap<u8, Handler>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry seeded with the default handlers, so a node
    /// answers keepalives with zero caller configuration
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(MSG_TYPE_ECHO_REQUEST, Arc::new(handle_echo_request));
        registry.register(MSG_TYPE_ECHO_RESPONSE, Arc::new(handle_echo_response));
        registry.register(
            MSG_TYPE_VERSION_NOT_SUPPORTED,
            Arc::new(handle_version_not_supported),
        );
        registry
    }

    /// Register (or override) the handler for a message type
    pub fn register(&self, msg_type: u8, handler: Handler) {
        self.map.write().unwrap().insert(msg_type, handler);
    }

    /// Register an async closure as the handler for a message type
    pub fn add<F, Fut>(&self, msg_type: u8, f: F)
    where
        F: Fn(Endpoint, SocketAddr, GtpMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ConnError>> + Send + 'static,
    {
        self.register(
            msg_type,
            Arc::new(move |ep, from, msg| -> HandlerFuture { Box::pin(f(ep, from, msg)) }),
        );
    }

    /// Look up the handler for a message type
    pub fn get(&self, msg_type: u8) -> Option<Handler> {
        self.map.read().unwrap().get(&msg_type).cloned()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Default Echo Request handler: answer with an Echo Response carrying
/// the local restart counter, in the same version the request used
fn handle_echo_request(ep: Endpoint, from: SocketAddr, msg: GtpMessage) -> HandlerFuture {
    Box::pin(async move {
        let sequence = msg.sequence().unwrap_or(0);
        let reply = GtpMessage::echo_response(msg.version(), sequence, ep.restart_counter());
        ep.send_to(&reply, from).await?;
        log::debug!("answered echo request from {from}");
        Ok(())
    })
}

/// Default Echo Response handler: the peer is alive, nothing to do
fn handle_echo_response(_ep: Endpoint, from: SocketAddr, _msg: GtpMessage) -> HandlerFuture {
    Box::pin(async move {
        log::debug!("echo response from {from}");
        Ok(())
    })
}

/// Default Version Not Supported handler: surface the rejection to the
/// caller through the error channel
fn handle_version_not_supported(
    _ep: Endpoint,
    from: SocketAddr,
    _msg: GtpMessage,
) -> HandlerFuture {
    Box::pin(async move { Err(ConnError::VersionNotSupportedByPeer(from)) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let registry = HandlerRegistry::with_defaults();
        assert!(registry.get(MSG_TYPE_ECHO_REQUEST).is_some());
        assert!(registry.get(MSG_TYPE_ECHO_RESPONSE).is_some());
        assert!(registry.get(MSG_TYPE_VERSION_NOT_SUPPORTED).is_some());
        assert!(registry.get(32).is_none());
    }

    #[test]
    fn test_override_replaces_entry() {
        let registry = HandlerRegistry::with_defaults();
        let before = registry.get(MSG_TYPE_ECHO_REQUEST).unwrap();
        registry.add(MSG_TYPE_ECHO_REQUEST, |_ep, _from, _msg| async { Ok(()) });
        let after = registry.get(MSG_TYPE_ECHO_REQUEST).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }
}
