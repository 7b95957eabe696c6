//! GTPv2 Header
//!
//! GTPv2-C header structure as specified in 3GPP TS 29.274. The 4-byte
//! prefix is followed by an optional TEID (gated by a flag bit) and a
//! 24-bit sequence number plus a spare byte.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{GtpError, GtpResult};

/// GTPv2-C header length (with TEID)
pub const GTPV2C_HEADER_LEN: usize = 12;

/// GTPv2-C header length (without TEID)
pub const GTPV2C_HEADER_LEN_NO_TEID: usize = 8;

/// GTPv2 version value
pub const GTP2_VERSION: u8 = 2;

/// GTPv2-C Message Types (the subset this crate names; any type byte
/// still decodes, unknown ones into the Generic container)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Gtp2MessageType {
    EchoRequest = 1,
    EchoResponse = 2,
    VersionNotSupported = 3,
    CreateSessionRequest = 32,
    CreateSessionResponse = 33,
    ModifyBearerRequest = 34,
    ModifyBearerResponse = 35,
    DeleteSessionRequest = 36,
    DeleteSessionResponse = 37,
    ModifyBearerCommand = 64,
    DeleteBearerCommand = 66,
    CreateBearerRequest = 95,
    CreateBearerResponse = 96,
    UpdateBearerRequest = 97,
    UpdateBearerResponse = 98,
    DeleteBearerRequest = 99,
    DeleteBearerResponse = 100,
    ReleaseAccessBearersRequest = 170,
    ReleaseAccessBearersResponse = 171,
    DownlinkDataNotification = 176,
    DownlinkDataNotificationAcknowledge = 177,
}

impl TryFrom<u8> for Gtp2MessageType {
    type Error = GtpError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::EchoRequest),
            2 => Ok(Self::EchoResponse),
            3 => Ok(Self::VersionNotSupported),
            32 => Ok(Self::CreateSessionRequest),
            33 => Ok(Self::CreateSessionResponse),
            34 => Ok(Self::ModifyBearerRequest),
            35 => Ok(Self::ModifyBearerResponse),
            36 => Ok(Self::DeleteSessionRequest),
            37 => Ok(Self::DeleteSessionResponse),
            64 => Ok(Self::ModifyBearerCommand),
            66 => Ok(Self::DeleteBearerCommand),
            95 => Ok(Self::CreateBearerRequest),
            96 => Ok(Self::CreateBearerResponse),
            97 => Ok(Self::UpdateBearerRequest),
            98 => Ok(Self::UpdateBearerResponse),
            99 => Ok(Self::DeleteBearerRequest),
            100 => Ok(Self::DeleteBearerResponse),
            170 => Ok(Self::ReleaseAccessBearersRequest),
            171 => Ok(Self::ReleaseAccessBearersResponse),
            176 => Ok(Self::DownlinkDataNotification),
            177 => Ok(Self::DownlinkDataNotificationAcknowledge),
            _ => Err(GtpError::InvalidMessageType(value)),
        }
    }
}

/// GTPv2-C Header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gtp2Header {
    /// Version (3 bits) - 2 for GTPv2
    pub version: u8,
    /// Piggybacked flag (1 bit)
    pub piggybacked: bool,
    /// TEID presence flag (1 bit)
    pub teid_presence: bool,
    /// Message Type
    pub message_type: u8,
    /// Message Length (excluding the first 4 bytes of the header)
    pub length: u16,
    /// Tunnel Endpoint Identifier (present if teid_presence)
    pub teid: Option<u32>,
    /// Sequence Number (24 bits)
    pub sequence_number: u32,
}

impl Default for Gtp2Header {
    fn default() -> Self {
        Self {
            version: GTP2_VERSION,
            piggybacked: false,
            teid_presence: true,
            message_type: 0,
            length: 0,
            teid: Some(0),
            sequence_number: 0,
        }
    }
}

impl Gtp2Header {
    /// Create a new GTPv2-C header with TEID
    pub fn new(message_type: u8, teid: u32, sequence_number: u32) -> Self {
        Self {
            message_type,
            teid: Some(teid),
            sequence_number: sequence_number & 0x00FF_FFFF,
            ..Default::default()
        }
    }

    /// Create a new GTPv2-C header without TEID
    pub fn new_no_teid(message_type: u8, sequence_number: u32) -> Self {
        Self {
            teid_presence: false,
            message_type,
            teid: None,
            sequence_number: sequence_number & 0x00FF_FFFF,
            ..Default::default()
        }
    }

    /// Get the flags byte
    pub fn flags(&self) -> u8 {
        let mut flags = (self.version & 0x07) << 5;
        if self.piggybacked {
            flags |= 0x10;
        }
        if self.teid_presence {
            flags |= 0x08;
        }
        flags
    }

    /// Serialized header length
    pub fn header_len(&self) -> usize {
        if self.teid_presence {
            GTPV2C_HEADER_LEN
        } else {
            GTPV2C_HEADER_LEN_NO_TEID
        }
    }

    /// Encode header to bytes
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.flags());
        buf.put_u8(self.message_type);
        buf.put_u16(self.length);
        if self.teid_presence {
            buf.put_u32(self.teid.unwrap_or(0));
        }
        // sequence (24 bits) + spare
        buf.put_u32(self.sequence_number << 8);
    }

    /// Decode header from bytes
    pub fn decode(buf: &mut Bytes) -> GtpResult<Self> {
        if buf.remaining() < 4 {
            return Err(GtpError::BufferTooShort {
                needed: 4,
                available: buf.remaining(),
            });
        }

        let flags = buf.get_u8();
        let version = (flags >> 5) & 0x07;
        if version != GTP2_VERSION {
            return Err(GtpError::InvalidVersion(version));
        }
        let piggybacked = (flags & 0x10) != 0;
        let teid_presence = (flags & 0x08) != 0;

        let message_type = buf.get_u8();
        let length = buf.get_u16();

        let min_remaining = if teid_presence { 8 } else { 4 };
        if buf.remaining() < min_remaining {
            return Err(GtpError::BufferTooShort {
                needed: min_remaining,
                available: buf.remaining(),
            });
        }

        let teid = if teid_presence {
            Some(buf.get_u32())
        } else {
            None
        };
        let sequence_number = buf.get_u32() >> 8;

        Ok(Self {
            version,
            piggybacked,
            teid_presence,
            message_type,
            length,
            teid,
            sequence_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip_with_teid() {
        let mut header = Gtp2Header::new(
            Gtp2MessageType::CreateSessionRequest as u8,
            0x12345678,
            0x123456,
        );
        header.length = 100;

        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), GTPV2C_HEADER_LEN);

        let mut bytes = buf.freeze();
        let decoded = Gtp2Header::decode(&mut bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_round_trip_without_teid() {
        let header = Gtp2Header::new_no_teid(Gtp2MessageType::EchoRequest as u8, 0x123456);

        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), GTPV2C_HEADER_LEN_NO_TEID);

        let mut bytes = buf.freeze();
        let decoded = Gtp2Header::decode(&mut bytes).unwrap();
        assert!(!decoded.teid_presence);
        assert_eq!(decoded.teid, None);
        assert_eq!(decoded.sequence_number, 0x123456);
    }

    #[test]
    fn test_sequence_masked_to_24_bits() {
        let header = Gtp2Header::new(1, 0, 0xFF123456);
        assert_eq!(header.sequence_number, 0x123456);
    }

    #[test]
    fn test_decode_wrong_version() {
        let raw = [0x30, 0x01, 0x00, 0x00, 0, 0, 0, 0];
        let mut bytes = Bytes::copy_from_slice(&raw);
        assert_eq!(
            Gtp2Header::decode(&mut bytes),
            Err(GtpError::InvalidVersion(1))
        );
    }
}
