//! GTPv1 protocol support (3GPP TS 29.060 / TS 29.281)

pub mod header;
pub mod ie;
pub mod message;

pub use header::{
    Gtp1ExtHeader, Gtp1Header, Gtp1MessageType, GTPV1_HEADER_LEN, GTPV1_HEADER_LEN_OPTIONAL,
};
pub use ie::{Gtp1Ie, Gtp1IeType};
pub use message::Gtp1Message;
