//! GTPv0 Messages
//!
//! Concrete message structures and encoding/decoding for GTPv0. Message
//! types without a concrete structure decode into [`Generic`] so they can
//! still be inspected and forwarded.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{GtpError, GtpResult};

use super::header::{Gtp0Header, Gtp0MessageType, GTPV0_HEADER_LEN};
use super::ie::{Gtp0Ie, Gtp0IeType};

/// Echo Request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EchoRequest {
    pub header: Gtp0Header,
    pub additional_ies: Vec<Gtp0Ie>,
}

/// Echo Response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EchoResponse {
    pub header: Gtp0Header,
    pub recovery: Option<Gtp0Ie>,
    pub additional_ies: Vec<Gtp0Ie>,
}

/// Version Not Supported
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionNotSupported {
    pub header: Gtp0Header,
    pub additional_ies: Vec<Gtp0Ie>,
}

/// T-PDU (tunneled user payload)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TPdu {
    pub header: Gtp0Header,
    pub payload: Bytes,
}

/// Container for message types without a concrete structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generic {
    pub header: Gtp0Header,
    pub ies: Vec<Gtp0Ie>,
}

/// GTPv0 Message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gtp0Message {
    EchoRequest(EchoRequest),
    EchoResponse(EchoResponse),
    VersionNotSupported(VersionNotSupported),
    TPdu(TPdu),
    Generic(Generic),
}

impl Gtp0Message {
    /// Create an Echo Request message
    pub fn echo_request(sequence_number: u16) -> Self {
        Self::EchoRequest(EchoRequest {
            header: Gtp0Header::new(Gtp0MessageType::EchoRequest as u8, sequence_number, 0),
            additional_ies: Vec::new(),
        })
    }

    /// Create an Echo Response message
    pub fn echo_response(sequence_number: u16, recovery: u8) -> Self {
        Self::EchoResponse(EchoResponse {
            header: Gtp0Header::new(Gtp0MessageType::EchoResponse as u8, sequence_number, 0),
            recovery: Some(Gtp0Ie::recovery(recovery)),
            additional_ies: Vec::new(),
        })
    }

    /// Create a Version Not Supported message
    pub fn version_not_supported(sequence_number: u16) -> Self {
        Self::VersionNotSupported(VersionNotSupported {
            header: Gtp0Header::new(Gtp0MessageType::VersionNotSupported as u8, sequence_number, 0),
            additional_ies: Vec::new(),
        })
    }

    /// Create a T-PDU message
    pub fn t_pdu(flow_label: u16, tid: u64, payload: Bytes) -> Self {
        let mut header = Gtp0Header::new(Gtp0MessageType::TPdu as u8, 0, tid);
        header.flow_label = flow_label;
        Self::TPdu(TPdu { header, payload })
    }

    /// Message header
    pub fn header(&self) -> &Gtp0Header {
        match self {
            Self::EchoRequest(m) => &m.header,
            Self::EchoResponse(m) => &m.header,
            Self::VersionNotSupported(m) => &m.header,
            Self::TPdu(m) => &m.header,
            Self::Generic(m) => &m.header,
        }
    }

    /// Message type byte
    pub fn message_type(&self) -> u8 {
        self.header().message_type
    }

    /// Sequence number
    pub fn sequence(&self) -> u16 {
        self.header().sequence_number
    }

    fn ies_in_order(&self) -> Vec<&Gtp0Ie> {
        match self {
            Self::EchoRequest(m) => m.additional_ies.iter().collect(),
            Self::EchoResponse(m) => {
                let mut ies: Vec<&Gtp0Ie> = Vec::new();
                ies.extend(m.recovery.iter());
                ies.extend(m.additional_ies.iter());
                ies
            }
            Self::VersionNotSupported(m) => m.additional_ies.iter().collect(),
            Self::TPdu(_) => Vec::new(),
            Self::Generic(m) => m.ies.iter().collect(),
        }
    }

    /// Serialized length of the whole message
    pub fn len(&self) -> usize {
        GTPV0_HEADER_LEN + self.payload_len()
    }

    /// True when the message carries no IEs or payload
    pub fn is_empty(&self) -> bool {
        self.payload_len() == 0
    }

    fn payload_len(&self) -> usize {
        match self {
            Self::TPdu(m) => m.payload.len(),
            _ => self.ies_in_order().iter().map(|ie| ie.encoded_len()).sum(),
        }
    }

    /// Encode message to bytes, recomputing the header length field
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.len());

        let mut header = self.header().clone();
        header.length = self.payload_len() as u16;
        header.encode(&mut buf);

        match self {
            Self::TPdu(m) => buf.put_slice(&m.payload),
            _ => {
                for ie in self.ies_in_order() {
                    ie.encode(&mut buf);
                }
            }
        }

        buf
    }

    /// Decode message from bytes
    pub fn decode(buf: &mut Bytes) -> GtpResult<Self> {
        let header = Gtp0Header::decode(buf)?;

        let payload_len = header.length as usize;
        if buf.remaining() < payload_len {
            return Err(GtpError::BufferTooShort {
                needed: payload_len,
                available: buf.remaining(),
            });
        }

        if header.message_type == Gtp0MessageType::TPdu as u8 {
            let payload = buf.copy_to_bytes(payload_len);
            return Ok(Self::TPdu(TPdu { header, payload }));
        }

        let mut ie_bytes = buf.copy_to_bytes(payload_len);
        let ies = Gtp0Ie::decode_multi(&mut ie_bytes)?;

        Ok(match header.message_type {
            t if t == Gtp0MessageType::EchoRequest as u8 => Self::EchoRequest(EchoRequest {
                header,
                additional_ies: ies,
            }),
            t if t == Gtp0MessageType::EchoResponse as u8 => {
                let mut msg = EchoResponse {
                    header,
                    recovery: None,
                    additional_ies: Vec::new(),
                };
                for ie in ies {
                    if ie.ie_type == Gtp0IeType::Recovery as u8 && msg.recovery.is_none() {
                        msg.recovery = Some(ie);
                    } else {
                        msg.additional_ies.push(ie);
                    }
                }
                Self::EchoResponse(msg)
            }
            t if t == Gtp0MessageType::VersionNotSupported as u8 => {
                Self::VersionNotSupported(VersionNotSupported {
                    header,
                    additional_ies: ies,
                })
            }
            _ => Self::Generic(Generic { header, ies }),
        })
    }
}
