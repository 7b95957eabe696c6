//! Version dispatch for incoming datagrams
//!
//! The top 3 bits of the first byte select the protocol version; each
//! version module then picks the concrete message structure from the
//! message-type byte.

use bytes::{Bytes, BytesMut};

use crate::error::{GtpError, GtpResult};
use crate::v0::Gtp0Message;
use crate::v1::Gtp1Message;
use crate::v2::Gtp2Message;

/// GTP protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GtpVersion {
    V0,
    V1,
    V2,
}

impl GtpVersion {
    /// Numeric version value as carried in the header flags
    pub fn value(&self) -> u8 {
        match self {
            Self::V0 => 0,
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    /// Version of a raw datagram, from the top 3 bits of the first byte
    pub fn of_datagram(raw: &[u8]) -> GtpResult<Self> {
        let first = raw.first().ok_or(GtpError::BufferTooShort {
            needed: 1,
            available: 0,
        })?;
        match first >> 5 {
            0 => Ok(Self::V0),
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            v => Err(GtpError::InvalidVersion(v)),
        }
    }
}

/// A decoded GTP message of any version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GtpMessage {
    V0(Gtp0Message),
    V1(Gtp1Message),
    V2(Gtp2Message),
}

impl GtpMessage {
    /// Decode a raw datagram, dispatching on the version bits
    pub fn decode(raw: &[u8]) -> GtpResult<Self> {
        let mut buf = Bytes::copy_from_slice(raw);
        match GtpVersion::of_datagram(raw)? {
            GtpVersion::V0 => Ok(Self::V0(Gtp0Message::decode(&mut buf)?)),
            GtpVersion::V1 => Ok(Self::V1(Gtp1Message::decode(&mut buf)?)),
            GtpVersion::V2 => Ok(Self::V2(Gtp2Message::decode(&mut buf)?)),
        }
    }

    /// Protocol version of this message
    pub fn version(&self) -> GtpVersion {
        match self {
            Self::V0(_) => GtpVersion::V0,
            Self::V1(_) => GtpVersion::V1,
            Self::V2(_) => GtpVersion::V2,
        }
    }

    /// Message type byte
    pub fn message_type(&self) -> u8 {
        match self {
            Self::V0(m) => m.message_type(),
            Self::V1(m) => m.message_type(),
            Self::V2(m) => m.message_type(),
        }
    }

    /// TEID carried in the header, when the version/header has one
    pub fn teid(&self) -> Option<u32> {
        match self {
            Self::V0(_) => None,
            Self::V1(m) => Some(m.teid()),
            Self::V2(m) => m.teid(),
        }
    }

    /// Serialized length of the whole message
    pub fn len(&self) -> usize {
        match self {
            Self::V0(m) => m.len(),
            Self::V1(m) => m.len(),
            Self::V2(m) => m.len(),
        }
    }

    /// True when the message carries no IEs or payload
    pub fn is_empty(&self) -> bool {
        match self {
            Self::V0(m) => m.is_empty(),
            Self::V1(m) => m.is_empty(),
            Self::V2(m) => m.is_empty(),
        }
    }

    /// Encode message to bytes
    pub fn encode(&self) -> BytesMut {
        match self {
            Self::V0(m) => m.encode(),
            Self::V1(m) => m.encode(),
            Self::V2(m) => m.encode(),
        }
    }

    /// Build an Echo Request of the given version
    pub fn echo_request(version: GtpVersion, sequence: u32, recovery: u8) -> Self {
        match version {
            GtpVersion::V0 => Self::V0(Gtp0Message::echo_request(sequence as u16)),
            GtpVersion::V1 => Self::V1(Gtp1Message::echo_request(sequence as u16)),
            GtpVersion::V2 => Self::V2(Gtp2Message::echo_request(sequence, recovery)),
        }
    }

    /// Build an Echo Response of the given version
    pub fn echo_response(version: GtpVersion, sequence: u32, recovery: u8) -> Self {
        match version {
            GtpVersion::V0 => Self::V0(Gtp0Message::echo_response(sequence as u16, recovery)),
            GtpVersion::V1 => Self::V1(Gtp1Message::echo_response(sequence as u16, recovery)),
            GtpVersion::V2 => Self::V2(Gtp2Message::echo_response(sequence, recovery)),
        }
    }

    /// Build a Version Not Supported message of the given version
    pub fn version_not_supported(version: GtpVersion, sequence: u32) -> Self {
        match version {
            GtpVersion::V0 => Self::V0(Gtp0Message::version_not_supported(sequence as u16)),
            GtpVersion::V1 => Self::V1(Gtp1Message::version_not_supported(sequence as u16)),
            GtpVersion::V2 => Self::V2(Gtp2Message::version_not_supported(sequence)),
        }
    }

    /// Sequence number widened to u32, when present
    pub fn sequence(&self) -> Option<u32> {
        match self {
            Self::V0(m) => Some(m.sequence() as u32),
            Self::V1(m) => m.sequence().map(u32::from),
            Self::V2(m) => Some(m.sequence()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_dispatch() {
        let v2 = GtpMessage::echo_request(GtpVersion::V2, 1, 0).encode();
        assert_eq!(GtpVersion::of_datagram(&v2).unwrap(), GtpVersion::V2);

        let v1 = GtpMessage::echo_request(GtpVersion::V1, 1, 0).encode();
        assert_eq!(GtpVersion::of_datagram(&v1).unwrap(), GtpVersion::V1);

        let v0 = GtpMessage::echo_request(GtpVersion::V0, 1, 0).encode();
        assert_eq!(GtpVersion::of_datagram(&v0).unwrap(), GtpVersion::V0);
    }

    #[test]
    fn test_v2_echo_request_known_vector() {
        let raw = [
            0x40, 0x01, 0x00, 0x09, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x01, 0x00, 0x80,
        ];
        let msg = GtpMessage::decode(&raw).unwrap();
        assert_eq!(msg.version(), GtpVersion::V2);
        assert_eq!(msg.message_type(), 1);
        match msg {
            GtpMessage::V2(crate::v2::Gtp2Message::EchoRequest(m)) => {
                assert_eq!(m.recovery.unwrap().as_recovery().unwrap(), 0x80);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_version() {
        let raw = [0xE0, 0x01, 0x00, 0x00];
        assert_eq!(GtpMessage::decode(&raw), Err(GtpError::InvalidVersion(7)));
    }

    #[test]
    fn test_empty_datagram() {
        assert!(matches!(
            GtpMessage::decode(&[]),
            Err(GtpError::BufferTooShort { .. })
        ));
    }

    #[test]
    fn test_len_matches_encode_across_versions() {
        for version in [GtpVersion::V0, GtpVersion::V1, GtpVersion::V2] {
            let msg = GtpMessage::echo_response(version, 9, 3);
            assert_eq!(msg.encode().len(), msg.len());
        }
    }
}
