//! GTPv0 protocol support (3GPP TS 09.60)

pub mod header;
pub mod ie;
pub mod message;

pub use header::{Gtp0Header, Gtp0MessageType, GTPV0_HEADER_LEN};
pub use ie::{Gtp0Ie, Gtp0IeType};
pub use message::Gtp0Message;
