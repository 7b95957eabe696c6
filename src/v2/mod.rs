//! GTPv2-C protocol support (3GPP TS 29.274)

pub mod header;
pub mod ie;
pub mod message;
pub mod types;

pub use header::{Gtp2Header, Gtp2MessageType, GTPV2C_HEADER_LEN, GTPV2C_HEADER_LEN_NO_TEID};
pub use ie::{Gtp2Ie, Gtp2IeType};
pub use message::Gtp2Message;
pub use types::{Gtp2CauseInfo, Gtp2Fteid, Gtp2Paa};
