//! GTPv0 Information Elements
//!
//! TV (fixed-length) and TLV (explicit-length) IE encoding for GTPv0.
//! The TV/TLV split is by tag value: tags below 128 are TV with lengths
//! from a static table, tags 128 and above are TLV.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{GtpError, GtpResult};

/// GTPv0 IE Types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Gtp0IeType {
    Cause = 1,
    Imsi = 2,
    Rai = 3,
    Tlli = 4,
    PTmsi = 5,
    QualityOfServiceProfile = 6,
    ReorderingRequired = 8,
    AuthenticationTriplet = 9,
    MapCause = 11,
    PTmsiSignature = 12,
    MsValidated = 13,
    Recovery = 14,
    SelectionMode = 15,
    FlowLabelDataI = 16,
    FlowLabelSignalling = 17,
    FlowLabelDataII = 18,
    MsNotReachableReason = 19,
    ChargingId = 127,
    EndUserAddress = 128,
    MmContext = 129,
    PdpContext = 130,
    AccessPointName = 131,
    ProtocolConfigurationOptions = 132,
    GsnAddress = 133,
    Msisdn = 134,
    ChargingGatewayAddress = 251,
    PrivateExtension = 255,
}

/// Check if IE type is TV format (fixed length)
pub fn is_tv_ie(ie_type: u8) -> bool {
    ie_type < 128
}

/// Get TV IE length based on type
pub fn tv_ie_len(ie_type: u8) -> Option<usize> {
    match ie_type {
        1 => Some(1),   // Cause
        2 => Some(8),   // IMSI
        3 => Some(6),   // RAI
        4 => Some(4),   // TLLI
        5 => Some(4),   // P-TMSI
        6 => Some(3),   // QoS Profile
        8 => Some(1),   // Reordering Required
        9 => Some(28),  // Authentication Triplet
        11 => Some(1),  // MAP Cause
        12 => Some(3),  // P-TMSI Signature
        13 => Some(1),  // MS Validated
        14 => Some(1),  // Recovery
        15 => Some(1),  // Selection Mode
        16 => Some(2),  // Flow Label Data I
        17 => Some(2),  // Flow Label Signalling
        18 => Some(3),  // Flow Label Data II
        19 => Some(1),  // MS Not Reachable Reason
        127 => Some(4), // Charging ID
        _ => None,
    }
}

/// Generic GTPv0 Information Element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gtp0Ie {
    /// IE Type
    pub ie_type: u8,
    /// IE Value (raw bytes)
    pub value: Bytes,
}

impl Gtp0Ie {
    /// Create a new IE
    pub fn new(ie_type: u8, value: Bytes) -> Self {
        Self { ie_type, value }
    }

    /// Create a new IE from a slice
    pub fn from_slice(ie_type: u8, value: &[u8]) -> Self {
        Self {
            ie_type,
            value: Bytes::copy_from_slice(value),
        }
    }

    /// Create a Recovery IE
    pub fn recovery(restart_counter: u8) -> Self {
        Self::from_slice(Gtp0IeType::Recovery as u8, &[restart_counter])
    }

    /// Create a Cause IE
    pub fn cause(cause: u8) -> Self {
        Self::from_slice(Gtp0IeType::Cause as u8, &[cause])
    }

    /// Read this IE as a Recovery IE
    pub fn as_recovery(&self) -> GtpResult<u8> {
        self.expect_type(Gtp0IeType::Recovery as u8)?;
        self.byte_at(0)
    }

    /// Read this IE as a Cause IE
    pub fn as_cause(&self) -> GtpResult<u8> {
        self.expect_type(Gtp0IeType::Cause as u8)?;
        self.byte_at(0)
    }

    fn expect_type(&self, expected: u8) -> GtpResult<()> {
        if self.ie_type != expected {
            return Err(GtpError::UnexpectedIeType {
                expected,
                actual: self.ie_type,
            });
        }
        Ok(())
    }

    fn byte_at(&self, idx: usize) -> GtpResult<u8> {
        self.value.get(idx).copied().ok_or(GtpError::BufferTooShort {
            needed: idx + 1,
            available: self.value.len(),
        })
    }

    /// Encode IE to bytes
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.ie_type);
        if !is_tv_ie(self.ie_type) {
            buf.put_u16(self.value.len() as u16);
        }
        buf.put_slice(&self.value);
    }

    /// Decode IE from bytes
    pub fn decode(buf: &mut Bytes) -> GtpResult<Self> {
        if buf.remaining() < 1 {
            return Err(GtpError::BufferTooShort {
                needed: 1,
                available: buf.remaining(),
            });
        }

        let ie_type = buf.get_u8();

        if is_tv_ie(ie_type) {
            let length = tv_ie_len(ie_type).ok_or(GtpError::InvalidIeType(ie_type))?;
            if buf.remaining() < length {
                return Err(GtpError::BufferTooShort {
                    needed: length,
                    available: buf.remaining(),
                });
            }
            let value = buf.copy_to_bytes(length);
            Ok(Self { ie_type, value })
        } else {
            if buf.remaining() < 2 {
                return Err(GtpError::BufferTooShort {
                    needed: 2,
                    available: buf.remaining(),
                });
            }
            let length = buf.get_u16() as usize;
            if buf.remaining() < length {
                return Err(GtpError::BufferTooShort {
                    needed: length,
                    available: buf.remaining(),
                });
            }
            let value = buf.copy_to_bytes(length);
            Ok(Self { ie_type, value })
        }
    }

    /// Decode IEs until the buffer is exhausted
    pub fn decode_multi(buf: &mut Bytes) -> GtpResult<Vec<Self>> {
        let mut ies = Vec::new();
        while buf.has_remaining() {
            ies.push(Self::decode(buf)?);
        }
        Ok(ies)
    }

    /// Get encoded length
    pub fn encoded_len(&self) -> usize {
        if is_tv_ie(self.ie_type) {
            1 + self.value.len()
        } else {
            3 + self.value.len()
        }
    }
}
