//! GTPv2 Messages
//!
//! Concrete GTPv2-C message structures with named IE slots. Decoding
//! assigns each parsed IE to its slot by (type, instance); anything
//! unexpected — unknown tags, or repeats beyond the instances a message
//! defines — lands in `additional_ies` and still round-trips. Message
//! types without a concrete structure decode into [`Generic`].

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{GtpError, GtpResult};

use super::header::{Gtp2Header, Gtp2MessageType};
use super::ie::{Gtp2Ie, Gtp2IeType};

/// Echo Request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EchoRequest {
    pub header: Gtp2Header,
    pub recovery: Option<Gtp2Ie>,
    pub additional_ies: Vec<Gtp2Ie>,
}

/// Echo Response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EchoResponse {
    pub header: Gtp2Header,
    pub recovery: Option<Gtp2Ie>,
    pub additional_ies: Vec<Gtp2Ie>,
}

/// Version Not Supported Indication
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionNotSupported {
    pub header: Gtp2Header,
    pub additional_ies: Vec<Gtp2Ie>,
}

/// Create Session Request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateSessionRequest {
    pub header: Gtp2Header,
    pub imsi: Option<Gtp2Ie>,
    pub msisdn: Option<Gtp2Ie>,
    pub mei: Option<Gtp2Ie>,
    pub uli: Option<Gtp2Ie>,
    pub serving_network: Option<Gtp2Ie>,
    pub rat_type: Option<Gtp2Ie>,
    pub indication: Option<Gtp2Ie>,
    pub sender_fteid: Option<Gtp2Ie>,
    pub pgw_s5s8_fteid: Option<Gtp2Ie>,
    pub apn: Option<Gtp2Ie>,
    pub selection_mode: Option<Gtp2Ie>,
    pub pdn_type: Option<Gtp2Ie>,
    pub paa: Option<Gtp2Ie>,
    pub apn_restriction: Option<Gtp2Ie>,
    pub ambr: Option<Gtp2Ie>,
    pub recovery: Option<Gtp2Ie>,
    pub bearer_contexts_to_be_created: Option<Gtp2Ie>,
    pub bearer_contexts_to_be_removed: Option<Gtp2Ie>,
    pub additional_ies: Vec<Gtp2Ie>,
}

impl CreateSessionRequest {
    /// Create an empty request; callers fill the IE slots they need
    pub fn new(teid: u32, sequence_number: u32) -> Self {
        Self {
            header: Gtp2Header::new(
                Gtp2MessageType::CreateSessionRequest as u8,
                teid,
                sequence_number,
            ),
            ..Default::default()
        }
    }
}

/// Create Session Response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateSessionResponse {
    pub header: Gtp2Header,
    pub cause: Option<Gtp2Ie>,
    pub sender_fteid: Option<Gtp2Ie>,
    pub pgw_s5s8_fteid: Option<Gtp2Ie>,
    pub paa: Option<Gtp2Ie>,
    pub apn_restriction: Option<Gtp2Ie>,
    pub recovery: Option<Gtp2Ie>,
    pub bearer_contexts_created: Option<Gtp2Ie>,
    pub bearer_contexts_marked_for_removal: Option<Gtp2Ie>,
    pub additional_ies: Vec<Gtp2Ie>,
}

impl CreateSessionResponse {
    pub fn new(teid: u32, sequence_number: u32) -> Self {
        Self {
            header: Gtp2Header::new(
                Gtp2MessageType::CreateSessionResponse as u8,
                teid,
                sequence_number,
            ),
            ..Default::default()
        }
    }
}

/// Modify Bearer Request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModifyBearerRequest {
    pub header: Gtp2Header,
    pub mei: Option<Gtp2Ie>,
    pub uli: Option<Gtp2Ie>,
    pub serving_network: Option<Gtp2Ie>,
    pub rat_type: Option<Gtp2Ie>,
    pub sender_fteid: Option<Gtp2Ie>,
    pub ambr: Option<Gtp2Ie>,
    pub recovery: Option<Gtp2Ie>,
    pub bearer_contexts_to_be_modified: Option<Gtp2Ie>,
    pub bearer_contexts_to_be_removed: Option<Gtp2Ie>,
    pub additional_ies: Vec<Gtp2Ie>,
}

impl ModifyBearerRequest {
    pub fn new(teid: u32, sequence_number: u32) -> Self {
        Self {
            header: Gtp2Header::new(
                Gtp2MessageType::ModifyBearerRequest as u8,
                teid,
                sequence_number,
            ),
            ..Default::default()
        }
    }
}

/// Modify Bearer Response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModifyBearerResponse {
    pub header: Gtp2Header,
    pub cause: Option<Gtp2Ie>,
    pub msisdn: Option<Gtp2Ie>,
    pub recovery: Option<Gtp2Ie>,
    pub bearer_contexts_modified: Option<Gtp2Ie>,
    pub bearer_contexts_marked_for_removal: Option<Gtp2Ie>,
    pub additional_ies: Vec<Gtp2Ie>,
}

impl ModifyBearerResponse {
    pub fn new(teid: u32, sequence_number: u32) -> Self {
        Self {
            header: Gtp2Header::new(
                Gtp2MessageType::ModifyBearerResponse as u8,
                teid,
                sequence_number,
            ),
            ..Default::default()
        }
    }
}

/// Delete Session Request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteSessionRequest {
    pub header: Gtp2Header,
    pub linked_ebi: Option<Gtp2Ie>,
    pub uli: Option<Gtp2Ie>,
    pub indication: Option<Gtp2Ie>,
    pub sender_fteid: Option<Gtp2Ie>,
    pub additional_ies: Vec<Gtp2Ie>,
}

impl DeleteSessionRequest {
    pub fn new(teid: u32, sequence_number: u32) -> Self {
        Self {
            header: Gtp2Header::new(
                Gtp2MessageType::DeleteSessionRequest as u8,
                teid,
                sequence_number,
            ),
            ..Default::default()
        }
    }
}

/// Delete Session Response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteSessionResponse {
    pub header: Gtp2Header,
    pub cause: Option<Gtp2Ie>,
    pub recovery: Option<Gtp2Ie>,
    pub pco: Option<Gtp2Ie>,
    pub additional_ies: Vec<Gtp2Ie>,
}

impl DeleteSessionResponse {
    pub fn new(teid: u32, sequence_number: u32) -> Self {
        Self {
            header: Gtp2Header::new(
                Gtp2MessageType::DeleteSessionResponse as u8,
                teid,
                sequence_number,
            ),
            ..Default::default()
        }
    }
}

/// Container for message types without a concrete structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generic {
    pub header: Gtp2Header,
    pub ies: Vec<Gtp2Ie>,
}

/// GTPv2-C Message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gtp2Message {
    EchoRequest(EchoRequest),
    EchoResponse(EchoResponse),
    VersionNotSupported(VersionNotSupported),
    CreateSessionRequest(CreateSessionRequest),
    CreateSessionResponse(CreateSessionResponse),
    ModifyBearerRequest(ModifyBearerRequest),
    ModifyBearerResponse(ModifyBearerResponse),
    DeleteSessionRequest(DeleteSessionRequest),
    DeleteSessionResponse(DeleteSessionResponse),
    Generic(Generic),
}

impl Gtp2Message {
    /// Create an Echo Request message
    pub fn echo_request(sequence_number: u32, recovery: u8) -> Self {
        Self::EchoRequest(EchoRequest {
            header: Gtp2Header::new_no_teid(Gtp2MessageType::EchoRequest as u8, sequence_number),
            recovery: Some(Gtp2Ie::recovery(recovery)),
            additional_ies: Vec::new(),
        })
    }

    /// Create an Echo Response message
    pub fn echo_response(sequence_number: u32, recovery: u8) -> Self {
        Self::EchoResponse(EchoResponse {
            header: Gtp2Header::new_no_teid(Gtp2MessageType::EchoResponse as u8, sequence_number),
            recovery: Some(Gtp2Ie::recovery(recovery)),
            additional_ies: Vec::new(),
        })
    }

    /// Create a Version Not Supported message
    pub fn version_not_supported(sequence_number: u32) -> Self {
        Self::VersionNotSupported(VersionNotSupported {
            header: Gtp2Header::new_no_teid(
                Gtp2MessageType::VersionNotSupported as u8,
                sequence_number,
            ),
            additional_ies: Vec::new(),
        })
    }

    /// Message header
    pub fn header(&self) -> &Gtp2Header {
        match self {
            Self::EchoRequest(m) => &m.header,
            Self::EchoResponse(m) => &m.header,
            Self::VersionNotSupported(m) => &m.header,
            Self::CreateSessionRequest(m) => &m.header,
            Self::CreateSessionResponse(m) => &m.header,
            Self::ModifyBearerRequest(m) => &m.header,
            Self::ModifyBearerResponse(m) => &m.header,
            Self::DeleteSessionRequest(m) => &m.header,
            Self::DeleteSessionResponse(m) => &m.header,
            Self::Generic(m) => &m.header,
        }
    }

    /// Message type byte
    pub fn message_type(&self) -> u8 {
        self.header().message_type
    }

    /// Tunnel Endpoint Identifier, when the header carries one
    pub fn teid(&self) -> Option<u32> {
        self.header().teid
    }

    /// Sequence number (24 bits)
    pub fn sequence(&self) -> u32 {
        self.header().sequence_number
    }

    fn ies_in_order(&self) -> Vec<&Gtp2Ie> {
        let mut ies: Vec<&Gtp2Ie> = Vec::new();
        match self {
            Self::EchoRequest(m) => {
                ies.extend(m.recovery.iter());
                ies.extend(m.additional_ies.iter());
            }
            Self::EchoResponse(m) => {
                ies.extend(m.recovery.iter());
                ies.extend(m.additional_ies.iter());
            }
            Self::VersionNotSupported(m) => ies.extend(m.additional_ies.iter()),
            Self::CreateSessionRequest(m) => {
                ies.extend(m.imsi.iter());
                ies.extend(m.msisdn.iter());
                ies.extend(m.mei.iter());
                ies.extend(m.uli.iter());
                ies.extend(m.serving_network.iter());
                ies.extend(m.rat_type.iter());
                ies.extend(m.indication.iter());
                ies.extend(m.sender_fteid.iter());
                ies.extend(m.pgw_s5s8_fteid.iter());
                ies.extend(m.apn.iter());
                ies.extend(m.selection_mode.iter());
                ies.extend(m.pdn_type.iter());
                ies.extend(m.paa.iter());
                ies.extend(m.apn_restriction.iter());
                ies.extend(m.ambr.iter());
                ies.extend(m.recovery.iter());
                ies.extend(m.bearer_contexts_to_be_created.iter());
                ies.extend(m.bearer_contexts_to_be_removed.iter());
                ies.extend(m.additional_ies.iter());
            }
            Self::CreateSessionResponse(m) => {
                ies.extend(m.cause.iter());
                ies.extend(m.sender_fteid.iter());
                ies.extend(m.pgw_s5s8_fteid.iter());
                ies.extend(m.paa.iter());
                ies.extend(m.apn_restriction.iter());
                ies.extend(m.recovery.iter());
                ies.extend(m.bearer_contexts_created.iter());
                ies.extend(m.bearer_contexts_marked_for_removal.iter());
                ies.extend(m.additional_ies.iter());
            }
            Self::ModifyBearerRequest(m) => {
                ies.extend(m.mei.iter());
                ies.extend(m.uli.iter());
                ies.extend(m.serving_network.iter());
                ies.extend(m.rat_type.iter());
                ies.extend(m.sender_fteid.iter());
                ies.extend(m.ambr.iter());
                ies.extend(m.recovery.iter());
                ies.extend(m.bearer_contexts_to_be_modified.iter());
                ies.extend(m.bearer_contexts_to_be_removed.iter());
                ies.extend(m.additional_ies.iter());
            }
            Self::ModifyBearerResponse(m) => {
                ies.extend(m.cause.iter());
                ies.extend(m.msisdn.iter());
                ies.extend(m.recovery.iter());
                ies.extend(m.bearer_contexts_modified.iter());
                ies.extend(m.bearer_contexts_marked_for_removal.iter());
                ies.extend(m.additional_ies.iter());
            }
            Self::DeleteSessionRequest(m) => {
                ies.extend(m.linked_ebi.iter());
                ies.extend(m.uli.iter());
                ies.extend(m.indication.iter());
                ies.extend(m.sender_fteid.iter());
                ies.extend(m.additional_ies.iter());
            }
            Self::DeleteSessionResponse(m) => {
                ies.extend(m.cause.iter());
                ies.extend(m.recovery.iter());
                ies.extend(m.pco.iter());
                ies.extend(m.additional_ies.iter());
            }
            Self::Generic(m) => ies.extend(m.ies.iter()),
        }
        ies
    }

    fn ies_len(&self) -> usize {
        self.ies_in_order().iter().map(|ie| ie.encoded_len()).sum()
    }

    /// Serialized length of the whole message
    pub fn len(&self) -> usize {
        self.header().header_len() + self.ies_len()
    }

    /// True when the message carries no IEs
    pub fn is_empty(&self) -> bool {
        self.ies_in_order().is_empty()
    }

    /// Encode message to bytes, recomputing the header length field
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.len());

        let mut header = self.header().clone();
        // length covers everything after the first 4 bytes of the header
        header.length = (header.header_len() - 4 + self.ies_len()) as u16;
        header.encode(&mut buf);

        for ie in self.ies_in_order() {
            ie.encode(&mut buf);
        }

        buf
    }

    /// Decode message from bytes
    pub fn decode(buf: &mut Bytes) -> GtpResult<Self> {
        let header = Gtp2Header::decode(buf)?;

        let consumed_extra = header.header_len() - 4;
        let ies_len = (header.length as usize).checked_sub(consumed_extra).ok_or(
            GtpError::InvalidHeader(format!(
                "length field {} shorter than header fields {}",
                header.length, consumed_extra
            )),
        )?;

        if buf.remaining() < ies_len {
            return Err(GtpError::BufferTooShort {
                needed: ies_len,
                available: buf.remaining(),
            });
        }

        let mut ie_bytes = buf.copy_to_bytes(ies_len);
        let ies = Gtp2Ie::decode_multi(&mut ie_bytes)?;

        Ok(Self::assemble(header, ies))
    }

    /// Route parsed IEs into the named slots of the concrete message type
    fn assemble(header: Gtp2Header, ies: Vec<Gtp2Ie>) -> Self {
        const IMSI: u8 = Gtp2IeType::Imsi as u8;
        const CAUSE: u8 = Gtp2IeType::Cause as u8;
        const RECOVERY: u8 = Gtp2IeType::Recovery as u8;
        const APN: u8 = Gtp2IeType::Apn as u8;
        const AMBR: u8 = Gtp2IeType::Ambr as u8;
        const EBI: u8 = Gtp2IeType::Ebi as u8;
        const MEI: u8 = Gtp2IeType::Mei as u8;
        const MSISDN: u8 = Gtp2IeType::Msisdn as u8;
        const INDICATION: u8 = Gtp2IeType::Indication as u8;
        const PCO: u8 = Gtp2IeType::Pco as u8;
        const PAA: u8 = Gtp2IeType::Paa as u8;
        const RAT_TYPE: u8 = Gtp2IeType::RatType as u8;
        const SERVING_NETWORK: u8 = Gtp2IeType::ServingNetwork as u8;
        const ULI: u8 = Gtp2IeType::Uli as u8;
        const FTEID: u8 = Gtp2IeType::FTeid as u8;
        const BEARER_CONTEXT: u8 = Gtp2IeType::BearerContext as u8;
        const PDN_TYPE: u8 = Gtp2IeType::PdnType as u8;
        const APN_RESTRICTION: u8 = Gtp2IeType::ApnRestriction as u8;
        const SELECTION_MODE: u8 = Gtp2IeType::SelectionMode as u8;

        fn slot(target: &mut Option<Gtp2Ie>, overflow: &mut Vec<Gtp2Ie>, ie: Gtp2Ie) {
            if target.is_none() {
                *target = Some(ie);
            } else {
                overflow.push(ie);
            }
        }

        match header.message_type {
            t if t == Gtp2MessageType::EchoRequest as u8 => {
                let mut msg = EchoRequest {
                    header,
                    ..Default::default()
                };
                for ie in ies {
                    match (ie.ie_type, ie.instance) {
                        (RECOVERY, 0) => slot(&mut msg.recovery, &mut msg.additional_ies, ie),
                        _ => msg.additional_ies.push(ie),
                    }
                }
                Self::EchoRequest(msg)
            }
            t if t == Gtp2MessageType::EchoResponse as u8 => {
                let mut msg = EchoResponse {
                    header,
                    ..Default::default()
                };
                for ie in ies {
                    match (ie.ie_type, ie.instance) {
                        (RECOVERY, 0) => slot(&mut msg.recovery, &mut msg.additional_ies, ie),
                        _ => msg.additional_ies.push(ie),
                    }
                }
                Self::EchoResponse(msg)
            }
            t if t == Gtp2MessageType::VersionNotSupported as u8 => {
                Self::VersionNotSupported(VersionNotSupported {
                    header,
                    additional_ies: ies,
                })
            }
            t if t == Gtp2MessageType::CreateSessionRequest as u8 => {
                let mut msg = CreateSessionRequest {
                    header,
                    ..Default::default()
                };
                for ie in ies {
                    match (ie.ie_type, ie.instance) {
                        (IMSI, 0) => slot(&mut msg.imsi, &mut msg.additional_ies, ie),
                        (MSISDN, 0) => slot(&mut msg.msisdn, &mut msg.additional_ies, ie),
                        (MEI, 0) => slot(&mut msg.mei, &mut msg.additional_ies, ie),
                        (ULI, 0) => slot(&mut msg.uli, &mut msg.additional_ies, ie),
                        (SERVING_NETWORK, 0) => {
                            slot(&mut msg.serving_network, &mut msg.additional_ies, ie)
                        }
                        (RAT_TYPE, 0) => slot(&mut msg.rat_type, &mut msg.additional_ies, ie),
                        (INDICATION, 0) => slot(&mut msg.indication, &mut msg.additional_ies, ie),
                        (FTEID, 0) => slot(&mut msg.sender_fteid, &mut msg.additional_ies, ie),
                        (FTEID, 1) => slot(&mut msg.pgw_s5s8_fteid, &mut msg.additional_ies, ie),
                        (APN, 0) => slot(&mut msg.apn, &mut msg.additional_ies, ie),
                        (SELECTION_MODE, 0) => {
                            slot(&mut msg.selection_mode, &mut msg.additional_ies, ie)
                        }
                        (PDN_TYPE, 0) => slot(&mut msg.pdn_type, &mut msg.additional_ies, ie),
                        (PAA, 0) => slot(&mut msg.paa, &mut msg.additional_ies, ie),
                        (APN_RESTRICTION, 0) => {
                            slot(&mut msg.apn_restriction, &mut msg.additional_ies, ie)
                        }
                        (AMBR, 0) => slot(&mut msg.ambr, &mut msg.additional_ies, ie),
                        (RECOVERY, 0) => slot(&mut msg.recovery, &mut msg.additional_ies, ie),
                        (BEARER_CONTEXT, 0) => slot(
                            &mut msg.bearer_contexts_to_be_created,
                            &mut msg.additional_ies,
                            ie,
                        ),
                        (BEARER_CONTEXT, 1) => slot(
                            &mut msg.bearer_contexts_to_be_removed,
                            &mut msg.additional_ies,
                            ie,
                        ),
                        _ => msg.additional_ies.push(ie),
                    }
                }
                Self::CreateSessionRequest(msg)
            }
            t if t == Gtp2MessageType::CreateSessionResponse as u8 => {
                let mut msg = CreateSessionResponse {
                    header,
                    ..Default::default()
                };
                for ie in ies {
                    match (ie.ie_type, ie.instance) {
                        (CAUSE, 0) => slot(&mut msg.cause, &mut msg.additional_ies, ie),
                        (FTEID, 0) => slot(&mut msg.sender_fteid, &mut msg.additional_ies, ie),
                        (FTEID, 1) => slot(&mut msg.pgw_s5s8_fteid, &mut msg.additional_ies, ie),
                        (PAA, 0) => slot(&mut msg.paa, &mut msg.additional_ies, ie),
                        (APN_RESTRICTION, 0) => {
                            slot(&mut msg.apn_restriction, &mut msg.additional_ies, ie)
                        }
                        (RECOVERY, 0) => slot(&mut msg.recovery, &mut msg.additional_ies, ie),
                        (BEARER_CONTEXT, 0) => slot(
                            &mut msg.bearer_contexts_created,
                            &mut msg.additional_ies,
                            ie,
                        ),
                        (BEARER_CONTEXT, 1) => slot(
                            &mut msg.bearer_contexts_marked_for_removal,
                            &mut msg.additional_ies,
                            ie,
                        ),
                        _ => msg.additional_ies.push(ie),
                    }
                }
                Self::CreateSessionResponse(msg)
            }
            t if t == Gtp2MessageType::ModifyBearerRequest as u8 => {
                let mut msg = ModifyBearerRequest {
                    header,
                    ..Default::default()
                };
                for ie in ies {
                    match (ie.ie_type, ie.instance) {
                        (MEI, 0) => slot(&mut msg.mei, &mut msg.additional_ies, ie),
                        (ULI, 0) => slot(&mut msg.uli, &mut msg.additional_ies, ie),
                        (SERVING_NETWORK, 0) => {
                            slot(&mut msg.serving_network, &mut msg.additional_ies, ie)
                        }
                        (RAT_TYPE, 0) => slot(&mut msg.rat_type, &mut msg.additional_ies, ie),
                        (FTEID, 0) => slot(&mut msg.sender_fteid, &mut msg.additional_ies, ie),
                        (AMBR, 0) => slot(&mut msg.ambr, &mut msg.additional_ies, ie),
                        (RECOVERY, 0) => slot(&mut msg.recovery, &mut msg.additional_ies, ie),
                        (BEARER_CONTEXT, 0) => slot(
                            &mut msg.bearer_contexts_to_be_modified,
                            &mut msg.additional_ies,
                            ie,
                        ),
                        (BEARER_CONTEXT, 1) => slot(
                            &mut msg.bearer_contexts_to_be_removed,
                            &mut msg.additional_ies,
                            ie,
                        ),
                        _ => msg.additional_ies.push(ie),
                    }
                }
                Self::ModifyBearerRequest(msg)
            }
            t if t == Gtp2MessageType::ModifyBearerResponse as u8 => {
                let mut msg = ModifyBearerResponse {
                    header,
                    ..Default::default()
                };
                for ie in ies {
                    match (ie.ie_type, ie.instance) {
                        (CAUSE, 0) => slot(&mut msg.cause, &mut msg.additional_ies, ie),
                        (MSISDN, 0) => slot(&mut msg.msisdn, &mut msg.additional_ies, ie),
                        (RECOVERY, 0) => slot(&mut msg.recovery, &mut msg.additional_ies, ie),
                        (BEARER_CONTEXT, 0) => slot(
                            &mut msg.bearer_contexts_modified,
                            &mut msg.additional_ies,
                            ie,
                        ),
                        (BEARER_CONTEXT, 1) => slot(
                            &mut msg.bearer_contexts_marked_for_removal,
                            &mut msg.additional_ies,
                            ie,
                        ),
                        _ => msg.additional_ies.push(ie),
                    }
                }
                Self::ModifyBearerResponse(msg)
            }
            t if t == Gtp2MessageType::DeleteSessionRequest as u8 => {
                let mut msg = DeleteSessionRequest {
                    header,
                    ..Default::default()
                };
                for ie in ies {
                    match (ie.ie_type, ie.instance) {
                        (EBI, 0) => slot(&mut msg.linked_ebi, &mut msg.additional_ies, ie),
                        (ULI, 0) => slot(&mut msg.uli, &mut msg.additional_ies, ie),
                        (INDICATION, 0) => slot(&mut msg.indication, &mut msg.additional_ies, ie),
                        (FTEID, 0) => slot(&mut msg.sender_fteid, &mut msg.additional_ies, ie),
                        _ => msg.additional_ies.push(ie),
                    }
                }
                Self::DeleteSessionRequest(msg)
            }
            t if t == Gtp2MessageType::DeleteSessionResponse as u8 => {
                let mut msg = DeleteSessionResponse {
                    header,
                    ..Default::default()
                };
                for ie in ies {
                    match (ie.ie_type, ie.instance) {
                        (CAUSE, 0) => slot(&mut msg.cause, &mut msg.additional_ies, ie),
                        (RECOVERY, 0) => slot(&mut msg.recovery, &mut msg.additional_ies, ie),
                        (PCO, 0) => slot(&mut msg.pco, &mut msg.additional_ies, ie),
                        _ => msg.additional_ies.push(ie),
                    }
                }
                Self::DeleteSessionResponse(msg)
            }
            _ => Self::Generic(Generic { header, ies }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v2::types::{interface, rat, Gtp2CauseInfo, Gtp2Fteid, Gtp2Paa};
    use std::net::Ipv4Addr;

    #[test]
    fn test_echo_request_known_vector() {
        // v2 Echo Request with Recovery 0x80
        let raw: &[u8] = &[
            0x40, 0x01, 0x00, 0x09, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x01, 0x00, 0x80,
        ];
        let mut bytes = Bytes::copy_from_slice(raw);
        let msg = Gtp2Message::decode(&mut bytes).unwrap();
        assert_eq!(msg.message_type(), 1);
        match &msg {
            Gtp2Message::EchoRequest(m) => {
                assert_eq!(m.recovery.as_ref().unwrap().as_recovery().unwrap(), 0x80);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert_eq!(&msg.encode()[..], raw);
        assert_eq!(msg.len(), raw.len());
    }

    #[test]
    fn test_echo_response_round_trip() {
        let msg = Gtp2Message::echo_response(0x123456, 0x11);
        let encoded = msg.encode();
        assert_eq!(encoded.len(), msg.len());

        let mut bytes = encoded.clone().freeze();
        let decoded = Gtp2Message::decode(&mut bytes).unwrap();
        assert_eq!(decoded.encode(), encoded);
        assert_eq!(decoded.sequence(), 0x123456);
    }

    #[test]
    fn test_create_session_request_round_trip() {
        let mut req = CreateSessionRequest::new(0, 0x000001);
        req.imsi = Some(Gtp2Ie::imsi("001011234567890").unwrap());
        req.rat_type = Some(Gtp2Ie::rat_type(rat::EUTRAN));
        req.apn = Some(Gtp2Ie::apn("internet").unwrap());
        req.sender_fteid = Some(Gtp2Ie::fteid(Gtp2Fteid::new_v4(
            interface::S11_MME_GTPC,
            0x1111,
            Ipv4Addr::new(10, 0, 0, 1),
        )));
        req.pgw_s5s8_fteid = Some(
            Gtp2Ie::fteid(Gtp2Fteid::new_v4(
                interface::S5S8_PGW_GTPC,
                0x2222,
                Ipv4Addr::new(10, 0, 0, 2),
            ))
            .with_instance(1),
        );
        req.bearer_contexts_to_be_created =
            Some(Gtp2Ie::bearer_context(&[Gtp2Ie::ebi(5)]));

        let msg = Gtp2Message::CreateSessionRequest(req);
        let encoded = msg.encode();
        assert_eq!(encoded.len(), msg.len());

        let mut bytes = encoded.clone().freeze();
        let decoded = Gtp2Message::decode(&mut bytes).unwrap();
        assert_eq!(decoded.encode(), encoded);

        match decoded {
            Gtp2Message::CreateSessionRequest(m) => {
                // instance nibbles routed the two F-TEIDs into distinct slots
                assert_eq!(m.sender_fteid.unwrap().as_fteid().unwrap().teid, 0x1111);
                assert_eq!(m.pgw_s5s8_fteid.unwrap().as_fteid().unwrap().teid, 0x2222);
                let bearers = m.bearer_contexts_to_be_created.unwrap();
                assert_eq!(bearers.child_ies().unwrap()[0].as_ebi().unwrap(), 5);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_create_session_response_round_trip() {
        let mut rsp = CreateSessionResponse::new(0x1111, 1);
        rsp.cause = Some(Gtp2Ie::cause(Gtp2CauseInfo::new(16)));
        rsp.paa = Some(Gtp2Ie::paa(Gtp2Paa::V4(Ipv4Addr::new(10, 45, 0, 2))));
        rsp.bearer_contexts_created = Some(Gtp2Ie::bearer_context(&[Gtp2Ie::ebi(5)]));

        let msg = Gtp2Message::CreateSessionResponse(rsp);
        let encoded = msg.encode();
        let mut bytes = encoded.clone().freeze();
        let decoded = Gtp2Message::decode(&mut bytes).unwrap();
        assert_eq!(decoded.encode(), encoded);
        match decoded {
            Gtp2Message::CreateSessionResponse(m) => {
                assert_eq!(m.cause.unwrap().as_cause().unwrap().value, 16);
                assert!(m.paa.is_some());
                assert!(m.bearer_contexts_created.is_some());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_unexpected_instance_goes_to_additional() {
        // a third F-TEID with instance 2 has no slot in Create Session Request
        let mut req = CreateSessionRequest::new(0, 1);
        req.sender_fteid = Some(Gtp2Ie::fteid(Gtp2Fteid::new_v4(10, 1, Ipv4Addr::LOCALHOST)));
        req.additional_ies.push(
            Gtp2Ie::fteid(Gtp2Fteid::new_v4(11, 2, Ipv4Addr::LOCALHOST)).with_instance(2),
        );

        let msg = Gtp2Message::CreateSessionRequest(req);
        let mut bytes = msg.encode().freeze();
        match Gtp2Message::decode(&mut bytes).unwrap() {
            Gtp2Message::CreateSessionRequest(m) => {
                assert!(m.sender_fteid.is_some());
                assert_eq!(m.additional_ies.len(), 1);
                assert_eq!(m.additional_ies[0].instance, 2);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_message_type_decodes_generic() {
        let mut header = Gtp2Header::new(200, 0x42, 7); // Update PDN Connection Set Request
        header.length = 8 + 5;
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        Gtp2Ie::recovery(1).encode(&mut buf);

        let mut bytes = buf.freeze();
        let decoded = Gtp2Message::decode(&mut bytes).unwrap();
        match &decoded {
            Gtp2Message::Generic(g) => {
                assert_eq!(g.header.message_type, 200);
                assert_eq!(g.ies.len(), 1);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        // unknown types still re-serialize byte-exactly
        assert_eq!(decoded.encode().len(), decoded.len());
    }

    #[test]
    fn test_truncated_ie_section_errors() {
        let msg = Gtp2Message::echo_response(1, 2);
        let encoded = msg.encode();
        let mut truncated = Bytes::copy_from_slice(&encoded[..encoded.len() - 1]);
        assert!(matches!(
            Gtp2Message::decode(&mut truncated),
            Err(GtpError::BufferTooShort { .. })
        ));
    }
}
