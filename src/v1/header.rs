//! GTPv1 Header
//!
//! GTPv1 header structure shared by GTPv1-C and GTPv1-U, as specified in
//! 3GPP TS 29.060 and TS 29.281. The 8-byte mandatory prefix is followed
//! by a 4-byte optional tail whenever any of the E/S/PN flags is set, and
//! by a chain of extension headers when E is set.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{GtpError, GtpResult};

/// GTPv1 header length (mandatory prefix)
pub const GTPV1_HEADER_LEN: usize = 8;

/// GTPv1 header length including the optional tail
pub const GTPV1_HEADER_LEN_OPTIONAL: usize = 12;

/// GTPv1 version value
pub const GTP1_VERSION: u8 = 1;

/// GTPv1 flag bits
pub const GTP1_FLAGS_PT: u8 = 0x10;
pub const GTP1_FLAGS_E: u8 = 0x04;
pub const GTP1_FLAGS_S: u8 = 0x02;
pub const GTP1_FLAGS_PN: u8 = 0x01;

/// GTPv1 Message Types (control- and user-plane)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Gtp1MessageType {
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
    SupportedExtensionHeadersNotification = 31,
    EndMarker = 254,
    GPdu = 255,
}

impl TryFrom<u8> for Gtp1MessageType {
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
            31 => Ok(Self::SupportedExtensionHeadersNotification),
            254 => Ok(Self::EndMarker),
            255 => Ok(Self::GPdu),
            _ => Err(GtpError::InvalidMessageType(value)),
        }
    }
}

/// A single GTPv1 extension header
///
/// On the wire each extension header is `4 * n` bytes: a length octet
/// (`n`), the content, and a next-extension-type octet. The content is
/// therefore always `4 * n - 2` bytes long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gtp1ExtHeader {
    /// Extension header type
    pub ext_type: u8,
    /// Content bytes (length ≡ 2 mod 4)
    pub content: Bytes,
}

impl Gtp1ExtHeader {
    /// Create an extension header, validating the content length
    pub fn new(ext_type: u8, content: Bytes) -> GtpResult<Self> {
        if content.is_empty() || (content.len() + 2) % 4 != 0 {
            return Err(GtpError::InvalidHeader(format!(
                "extension header content length {} not 4n-2",
                content.len()
            )));
        }
        Ok(Self { ext_type, content })
    }

    /// Encoded size of this extension header
    pub fn encoded_len(&self) -> usize {
        self.content.len() + 2
    }
}

/// GTPv1 Header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gtp1Header {
    /// Version (3 bits) - 1 for GTPv1
    pub version: u8,
    /// Protocol Type (1 bit) - 1 for GTP, 0 for GTP'
    pub pt: bool,
    /// Extension Header flag (1 bit)
    pub e: bool,
    /// Sequence Number flag (1 bit)
    pub s: bool,
    /// N-PDU Number flag (1 bit)
    pub pn: bool,
    /// Message Type
    pub message_type: u8,
    /// Message Length (excluding the 8-byte mandatory prefix)
    pub length: u16,
    /// Tunnel Endpoint Identifier
    pub teid: u32,
    /// Sequence Number (valid if s=1)
    pub sequence_number: Option<u16>,
    /// N-PDU Number (valid if pn=1)
    pub npdu_number: Option<u8>,
    /// Extension headers (present if e=1)
    pub extension_headers: Vec<Gtp1ExtHeader>,
}

impl Default for Gtp1Header {
    fn default() -> Self {
        Self {
            version: GTP1_VERSION,
            pt: true,
            e: false,
            s: false,
            pn: false,
            message_type: 0,
            length: 0,
            teid: 0,
            sequence_number: None,
            npdu_number: None,
            extension_headers: Vec::new(),
        }
    }
}

impl Gtp1Header {
    /// Create a new GTPv1 header
    pub fn new(message_type: u8, teid: u32) -> Self {
        Self {
            message_type,
            teid,
            ..Default::default()
        }
    }

    /// Create a new GTPv1 header with sequence number
    pub fn with_sequence(message_type: u8, teid: u32, sequence_number: u16) -> Self {
        Self {
            s: true,
            message_type,
            teid,
            sequence_number: Some(sequence_number),
            ..Default::default()
        }
    }

    /// Get the flags byte
    pub fn flags(&self) -> u8 {
        let mut flags = (self.version & 0x07) << 5;
        if self.pt {
            flags |= GTP1_FLAGS_PT;
        }
        if self.e {
            flags |= GTP1_FLAGS_E;
        }
        if self.s {
            flags |= GTP1_FLAGS_S;
        }
        if self.pn {
            flags |= GTP1_FLAGS_PN;
        }
        flags
    }

    /// Check if the 4-byte optional tail is present
    pub fn has_optional_fields(&self) -> bool {
        self.e || self.s || self.pn
    }

    fn ext_headers_len(&self) -> usize {
        self.extension_headers
            .iter()
            .map(|e| e.encoded_len())
            .sum()
    }

    /// Serialized header length including optional tail and extension headers
    pub fn header_len(&self) -> usize {
        if self.has_optional_fields() {
            GTPV1_HEADER_LEN_OPTIONAL + self.ext_headers_len()
        } else {
            GTPV1_HEADER_LEN
        }
    }

    /// Encode header to bytes
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.flags());
        buf.put_u8(self.message_type);
        buf.put_u16(self.length);
        buf.put_u32(self.teid);

        if self.has_optional_fields() {
            buf.put_u16(self.sequence_number.unwrap_or(0));
            buf.put_u8(self.npdu_number.unwrap_or(0));
            buf.put_u8(
                self.extension_headers
                    .first()
                    .map(|e| e.ext_type)
                    .unwrap_or(0),
            );
            for (i, ext) in self.extension_headers.iter().enumerate() {
                buf.put_u8(((ext.content.len() + 2) / 4) as u8);
                buf.put_slice(&ext.content);
                let next = self
                    .extension_headers
                    .get(i + 1)
                    .map(|e| e.ext_type)
                    .unwrap_or(0);
                buf.put_u8(next);
            }
        }
    }

    /// Decode header from bytes
    pub fn decode(buf: &mut Bytes) -> GtpResult<Self> {
        if buf.remaining() < GTPV1_HEADER_LEN {
            return Err(GtpError::BufferTooShort {
                needed: GTPV1_HEADER_LEN,
                available: buf.remaining(),
            });
        }

        let flags = buf.get_u8();
        let version = (flags >> 5) & 0x07;
        if version != GTP1_VERSION {
            return Err(GtpError::InvalidVersion(version));
        }
        let pt = (flags & GTP1_FLAGS_PT) != 0;
        let e = (flags & GTP1_FLAGS_E) != 0;
        let s = (flags & GTP1_FLAGS_S) != 0;
        let pn = (flags & GTP1_FLAGS_PN) != 0;

        let message_type = buf.get_u8();
        let length = buf.get_u16();
        let teid = buf.get_u32();

        let mut header = Self {
            version,
            pt,
            e,
            s,
            pn,
            message_type,
            length,
            teid,
            sequence_number: None,
            npdu_number: None,
            extension_headers: Vec::new(),
        };

        if header.has_optional_fields() {
            if buf.remaining() < 4 {
                return Err(GtpError::BufferTooShort {
                    needed: 4,
                    available: buf.remaining(),
                });
            }
            let sequence = buf.get_u16();
            let npdu = buf.get_u8();
            let mut next_type = buf.get_u8();

            if s {
                header.sequence_number = Some(sequence);
            }
            if pn {
                header.npdu_number = Some(npdu);
            }

            while next_type != 0 {
                if buf.remaining() < 1 {
                    return Err(GtpError::BufferTooShort {
                        needed: 1,
                        available: 0,
                    });
                }
                let units = buf.get_u8() as usize;
                if units == 0 {
                    return Err(GtpError::InvalidHeader(
                        "zero-length extension header".to_string(),
                    ));
                }
                let content_len = units * 4 - 2;
                if buf.remaining() < content_len + 1 {
                    return Err(GtpError::BufferTooShort {
                        needed: content_len + 1,
                        available: buf.remaining(),
                    });
                }
                let content = buf.copy_to_bytes(content_len);
                header.extension_headers.push(Gtp1ExtHeader {
                    ext_type: next_type,
                    content,
                });
                next_type = buf.get_u8();
            }
        }

        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip_plain() {
        let mut header = Gtp1Header::new(Gtp1MessageType::GPdu as u8, 0x12345678);
        header.length = 11;

        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), GTPV1_HEADER_LEN);

        let mut bytes = buf.freeze();
        assert_eq!(Gtp1Header::decode(&mut bytes).unwrap(), header);
    }

    #[test]
    fn test_header_round_trip_with_sequence() {
        let header = Gtp1Header::with_sequence(Gtp1MessageType::EchoRequest as u8, 0, 0xABCD);

        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), GTPV1_HEADER_LEN_OPTIONAL);

        let mut bytes = buf.freeze();
        let decoded = Gtp1Header::decode(&mut bytes).unwrap();
        assert!(decoded.s);
        assert_eq!(decoded.sequence_number, Some(0xABCD));
    }

    #[test]
    fn test_header_round_trip_with_extension() {
        let mut header = Gtp1Header::with_sequence(Gtp1MessageType::GPdu as u8, 1, 9);
        header.e = true;
        header
            .extension_headers
            .push(Gtp1ExtHeader::new(0x40, Bytes::from_static(&[0x08, 0x68])).unwrap());

        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        let mut bytes = buf.freeze();
        let decoded = Gtp1Header::decode(&mut bytes).unwrap();
        assert_eq!(decoded.extension_headers, header.extension_headers);
    }

    #[test]
    fn test_ext_header_bad_content_len() {
        assert!(Gtp1ExtHeader::new(0x40, Bytes::from_static(&[1, 2, 3])).is_err());
    }

    #[test]
    fn test_decode_wrong_version() {
        let raw = [0x40, 0x01, 0, 0, 0, 0, 0, 0];
        let mut bytes = Bytes::copy_from_slice(&raw);
        assert_eq!(
            Gtp1Header::decode(&mut bytes),
            Err(GtpError::InvalidVersion(2))
        );
    }
}
