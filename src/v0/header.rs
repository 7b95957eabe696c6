//! GTPv0 Header
//!
//! GTPv0 header structure as specified in 3GPP TS 09.60. Unlike later
//! versions the prefix is a fixed 20 bytes with no optional fields.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{GtpError, GtpResult};

/// GTPv0 header length (fixed)
pub const GTPV0_HEADER_LEN: usize = 20;

/// GTPv0 version value
pub const GTP0_VERSION: u8 = 0;

/// GTPv0 Message Types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Gtp0MessageType {
    EchoRequest = 1,
    EchoResponse = 2,
    VersionNotSupported = 3,
    CreatePdpContextRequest = 16,
    CreatePdpContextResponse = 17,
    UpdatePdpContextRequest = 18,
    UpdatePdpContextResponse = 19,
    DeletePdpContextRequest = 20,
    DeletePdpContextResponse = 21,
    ErrorIndication = 26,
    PduNotificationRequest = 27,
    PduNotificationResponse = 28,
    TPdu = 255,
}

impl TryFrom<u8> for Gtp0MessageType {
    type Error = GtpError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::EchoRequest),
            2 => Ok(Self::EchoResponse),
            3 => Ok(Self::VersionNotSupported),
            16 => Ok(Self::CreatePdpContextRequest),
            17 => Ok(Self::CreatePdpContextResponse),
            18 => Ok(Self::UpdatePdpContextRequest),
            19 => Ok(Self::UpdatePdpContextResponse),
            20 => Ok(Self::DeletePdpContextRequest),
            21 => Ok(Self::DeletePdpContextResponse),
            26 => Ok(Self::ErrorIndication),
            27 => Ok(Self::PduNotificationRequest),
            28 => Ok(Self::PduNotificationResponse),
            255 => Ok(Self::TPdu),
            _ => Err(GtpError::InvalidMessageType(value)),
        }
    }
}

/// GTPv0 Header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gtp0Header {
    /// Version (3 bits) - 0 for GTPv0
    pub version: u8,
    /// Protocol Type (1 bit) - 1 for GTP, 0 for GTP'
    pub pt: bool,
    /// SNDCP N-PDU Number flag (1 bit)
    pub snn: bool,
    /// Message Type
    pub message_type: u8,
    /// Message Length (excluding the 20-byte header)
    pub length: u16,
    /// Sequence Number
    pub sequence_number: u16,
    /// Flow Label
    pub flow_label: u16,
    /// SNDCP N-PDU Number (0xFF when unused)
    pub sndcp_number: u8,
    /// Tunnel Identifier (TBCD IMSI + NSAPI)
    pub tid: u64,
}

impl Default for Gtp0Header {
    fn default() -> Self {
        Self {
            version: GTP0_VERSION,
            pt: true,
            snn: false,
            message_type: 0,
            length: 0,
            sequence_number: 0,
            flow_label: 0,
            sndcp_number: 0xFF,
            tid: 0,
        }
    }
}

impl Gtp0Header {
    /// Create a new GTPv0 header
    pub fn new(message_type: u8, sequence_number: u16, tid: u64) -> Self {
        Self {
            message_type,
            sequence_number,
            tid,
            ..Default::default()
        }
    }

    /// Get the flags byte
    pub fn flags(&self) -> u8 {
        // spare bits between PT and SNN are transmitted as ones
        let mut flags = ((self.version & 0x07) << 5) | 0x0E;
        if self.pt {
            flags |= 0x10;
        }
        if self.snn {
            flags |= 0x01;
        }
        flags
    }

    /// Header length (always 20 bytes)
    pub fn header_len(&self) -> usize {
        GTPV0_HEADER_LEN
    }

    /// Encode header to bytes
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.flags());
        buf.put_u8(self.message_type);
        buf.put_u16(self.length);
        buf.put_u16(self.sequence_number);
        buf.put_u16(self.flow_label);
        buf.put_u8(self.sndcp_number);
        // spare, transmitted as ones
        buf.put_slice(&[0xFF, 0xFF, 0xFF]);
        buf.put_u64(self.tid);
    }

    /// Decode header from bytes
    pub fn decode(buf: &mut Bytes) -> GtpResult<Self> {
        if buf.remaining() < GTPV0_HEADER_LEN {
            return Err(GtpError::BufferTooShort {
                needed: GTPV0_HEADER_LEN,
                available: buf.remaining(),
            });
        }

        let flags = buf.get_u8();
        let version = (flags >> 5) & 0x07;
        if version != GTP0_VERSION {
            return Err(GtpError::InvalidVersion(version));
        }
        let pt = (flags & 0x10) != 0;
        let snn = (flags & 0x01) != 0;

        let message_type = buf.get_u8();
        let length = buf.get_u16();
        let sequence_number = buf.get_u16();
        let flow_label = buf.get_u16();
        let sndcp_number = buf.get_u8();
        buf.advance(3); // spare
        let tid = buf.get_u64();

        Ok(Self {
            version,
            pt,
            snn,
            message_type,
            length,
            sequence_number,
            flow_label,
            sndcp_number,
            tid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let mut header = Gtp0Header::new(Gtp0MessageType::EchoRequest as u8, 0x1234, 0x1122334455667788);
        header.flow_label = 0xBEEF;
        header.length = 0;

        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), GTPV0_HEADER_LEN);

        let mut bytes = buf.freeze();
        let decoded = Gtp0Header::decode(&mut bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_decode_short_buffer() {
        let mut bytes = Bytes::from_static(&[0x1E, 0x01, 0x00]);
        assert!(matches!(
            Gtp0Header::decode(&mut bytes),
            Err(GtpError::BufferTooShort { .. })
        ));
    }

    #[test]
    fn test_decode_wrong_version() {
        // version bits = 1
        let raw = [0x3E, 0x01, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut bytes = Bytes::copy_from_slice(&raw);
        assert_eq!(
            Gtp0Header::decode(&mut bytes),
            Err(GtpError::InvalidVersion(1))
        );
    }
}
