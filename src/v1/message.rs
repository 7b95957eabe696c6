//! GTPv1 Messages
//!
//! Concrete message structures and encoding/decoding for GTPv1. The
//! user-plane G-PDU carries an opaque payload; signalling messages carry
//! IEs. Types without a concrete structure decode into [`Generic`].

use std::net::IpAddr;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{GtpError, GtpResult};

use super::header::{Gtp1Header, Gtp1MessageType, GTPV1_HEADER_LEN};
use super::ie::{Gtp1Ie, Gtp1IeType};

/// Echo Request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EchoRequest {
    pub header: Gtp1Header,
    pub private_extension: Option<Gtp1Ie>,
    pub additional_ies: Vec<Gtp1Ie>,
}

/// Echo Response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EchoResponse {
    pub header: Gtp1Header,
    pub recovery: Option<Gtp1Ie>,
    pub private_extension: Option<Gtp1Ie>,
    pub additional_ies: Vec<Gtp1Ie>,
}

/// Version Not Supported
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionNotSupported {
    pub header: Gtp1Header,
    pub additional_ies: Vec<Gtp1Ie>,
}

/// Error Indication (GTP-U)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorIndication {
    pub header: Gtp1Header,
    pub teid_data_i: Option<Gtp1Ie>,
    pub gsn_address: Option<Gtp1Ie>,
    pub additional_ies: Vec<Gtp1Ie>,
}

/// End Marker (GTP-U)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EndMarker {
    pub header: Gtp1Header,
    pub additional_ies: Vec<Gtp1Ie>,
}

/// G-PDU (tunneled user payload)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GPdu {
    pub header: Gtp1Header,
    pub payload: Bytes,
}

/// Container for message types without a concrete structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generic {
    pub header: Gtp1Header,
    pub ies: Vec<Gtp1Ie>,
}

/// GTPv1 Message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gtp1Message {
    EchoRequest(EchoRequest),
    EchoResponse(EchoResponse),
    VersionNotSupported(VersionNotSupported),
    ErrorIndication(ErrorIndication),
    EndMarker(EndMarker),
    GPdu(GPdu),
    Generic(Generic),
}

impl Gtp1Message {
    /// Create an Echo Request message
    pub fn echo_request(sequence_number: u16) -> Self {
        Self::EchoRequest(EchoRequest {
            header: Gtp1Header::with_sequence(Gtp1MessageType::EchoRequest as u8, 0, sequence_number),
            ..Default::default()
        })
    }

    /// Create an Echo Response message
    pub fn echo_response(sequence_number: u16, recovery: u8) -> Self {
        Self::EchoResponse(EchoResponse {
            header: Gtp1Header::with_sequence(
                Gtp1MessageType::EchoResponse as u8,
                0,
                sequence_number,
            ),
            recovery: Some(Gtp1Ie::recovery(recovery)),
            ..Default::default()
        })
    }

    /// Create a Version Not Supported message
    pub fn version_not_supported(sequence_number: u16) -> Self {
        Self::VersionNotSupported(VersionNotSupported {
            header: Gtp1Header::with_sequence(
                Gtp1MessageType::VersionNotSupported as u8,
                0,
                sequence_number,
            ),
            additional_ies: Vec::new(),
        })
    }

    /// Create an Error Indication message
    pub fn error_indication(peer_teid: u32, peer_addr: IpAddr) -> Self {
        Self::ErrorIndication(ErrorIndication {
            header: Gtp1Header::with_sequence(Gtp1MessageType::ErrorIndication as u8, 0, 0),
            teid_data_i: Some(Gtp1Ie::teid_data_i(peer_teid)),
            gsn_address: Some(Gtp1Ie::gsn_address(peer_addr)),
            additional_ies: Vec::new(),
        })
    }

    /// Create an End Marker message
    pub fn end_marker(teid: u32) -> Self {
        Self::EndMarker(EndMarker {
            header: Gtp1Header::new(Gtp1MessageType::EndMarker as u8, teid),
            additional_ies: Vec::new(),
        })
    }

    /// Create a G-PDU message
    pub fn g_pdu(teid: u32, payload: Bytes) -> Self {
        Self::GPdu(GPdu {
            header: Gtp1Header::new(Gtp1MessageType::GPdu as u8, teid),
            payload,
        })
    }

    /// Message header
    pub fn header(&self) -> &Gtp1Header {
        match self {
            Self::EchoRequest(m) => &m.header,
            Self::EchoResponse(m) => &m.header,
            Self::VersionNotSupported(m) => &m.header,
            Self::ErrorIndication(m) => &m.header,
            Self::EndMarker(m) => &m.header,
            Self::GPdu(m) => &m.header,
            Self::Generic(m) => &m.header,
        }
    }

    /// Message type byte
    pub fn message_type(&self) -> u8 {
        self.header().message_type
    }

    /// Tunnel Endpoint Identifier
    pub fn teid(&self) -> u32 {
        self.header().teid
    }

    /// Sequence number, when present
    pub fn sequence(&self) -> Option<u16> {
        self.header().sequence_number
    }

    fn ies_in_order(&self) -> Vec<&Gtp1Ie> {
        let mut ies: Vec<&Gtp1Ie> = Vec::new();
        match self {
            Self::EchoRequest(m) => {
                ies.extend(m.private_extension.iter());
                ies.extend(m.additional_ies.iter());
            }
            Self::EchoResponse(m) => {
                ies.extend(m.recovery.iter());
                ies.extend(m.private_extension.iter());
                ies.extend(m.additional_ies.iter());
            }
            Self::VersionNotSupported(m) => ies.extend(m.additional_ies.iter()),
            Self::ErrorIndication(m) => {
                ies.extend(m.teid_data_i.iter());
                ies.extend(m.gsn_address.iter());
                ies.extend(m.additional_ies.iter());
            }
            Self::EndMarker(m) => ies.extend(m.additional_ies.iter()),
            Self::GPdu(_) => {}
            Self::Generic(m) => ies.extend(m.ies.iter()),
        }
        ies
    }

    fn body_len(&self) -> usize {
        match self {
            Self::GPdu(m) => m.payload.len(),
            _ => self.ies_in_order().iter().map(|ie| ie.encoded_len()).sum(),
        }
    }

    /// Serialized length of the whole message
    pub fn len(&self) -> usize {
        self.header().header_len() + self.body_len()
    }

    /// True when the message carries no IEs or payload
    pub fn is_empty(&self) -> bool {
        self.body_len() == 0
    }

    /// Encode message to bytes, recomputing the header length field
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.len());

        let mut header = self.header().clone();
        // length covers everything after the 8-byte mandatory prefix
        header.length = (header.header_len() - GTPV1_HEADER_LEN + self.body_len()) as u16;
        header.encode(&mut buf);

        match self {
            Self::GPdu(m) => buf.put_slice(&m.payload),
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
        let header = Gtp1Header::decode(buf)?;

        // header.length spans the optional tail, extension headers and body
        let consumed_extra = header.header_len() - GTPV1_HEADER_LEN;
        let body_len = (header.length as usize).checked_sub(consumed_extra).ok_or(
            GtpError::InvalidHeader(format!(
                "length field {} shorter than optional header fields {}",
                header.length, consumed_extra
            )),
        )?;

        if buf.remaining() < body_len {
            return Err(GtpError::BufferTooShort {
                needed: body_len,
                available: buf.remaining(),
            });
        }

        if header.message_type == Gtp1MessageType::GPdu as u8 {
            let payload = buf.copy_to_bytes(body_len);
            return Ok(Self::GPdu(GPdu { header, payload }));
        }

        let mut ie_bytes = buf.copy_to_bytes(body_len);
        let ies = Gtp1Ie::decode_multi(&mut ie_bytes)?;

        Ok(match header.message_type {
            t if t == Gtp1MessageType::EchoRequest as u8 => {
                let mut msg = EchoRequest {
                    header,
                    ..Default::default()
                };
                for ie in ies {
                    match ie.ie_type {
                        t if t == Gtp1IeType::PrivateExtension as u8
                            && msg.private_extension.is_none() =>
                        {
                            msg.private_extension = Some(ie)
                        }
                        _ => msg.additional_ies.push(ie),
                    }
                }
                Self::EchoRequest(msg)
            }
            t if t == Gtp1MessageType::EchoResponse as u8 => {
                let mut msg = EchoResponse {
                    header,
                    ..Default::default()
                };
                for ie in ies {
                    match ie.ie_type {
                        t if t == Gtp1IeType::Recovery as u8 && msg.recovery.is_none() => {
                            msg.recovery = Some(ie)
                        }
                        t if t == Gtp1IeType::PrivateExtension as u8
                            && msg.private_extension.is_none() =>
                        {
                            msg.private_extension = Some(ie)
                        }
                        _ => msg.additional_ies.push(ie),
                    }
                }
                Self::EchoResponse(msg)
            }
            t if t == Gtp1MessageType::VersionNotSupported as u8 => {
                Self::VersionNotSupported(VersionNotSupported {
                    header,
                    additional_ies: ies,
                })
            }
            t if t == Gtp1MessageType::ErrorIndication as u8 => {
                let mut msg = ErrorIndication {
                    header,
                    ..Default::default()
                };
                for ie in ies {
                    match ie.ie_type {
                        t if t == Gtp1IeType::TeidDataI as u8 && msg.teid_data_i.is_none() => {
                            msg.teid_data_i = Some(ie)
                        }
                        t if t == Gtp1IeType::GsnAddress as u8 && msg.gsn_address.is_none() => {
                            msg.gsn_address = Some(ie)
                        }
                        _ => msg.additional_ies.push(ie),
                    }
                }
                Self::ErrorIndication(msg)
            }
            t if t == Gtp1MessageType::EndMarker as u8 => Self::EndMarker(EndMarker {
                header,
                additional_ies: ies,
            }),
            _ => Self::Generic(Generic { header, ies }),
        })
    }
}
