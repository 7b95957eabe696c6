//! GTPv1 Information Elements
//!
//! TV and TLV IE encoding/decoding for GTPv1. Tags below 128 are TV with
//! fixed lengths from a static table; tags 128 and above are TLV with an
//! explicit 2-byte length.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::conv;
use crate::error::{GtpError, GtpResult};

/// GTPv1 IE Types (the subset this crate constructs or interprets;
/// any tag still decodes generically)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Gtp1IeType {
    Cause = 1,
    Imsi = 2,
    Rai = 3,
    Tlli = 4,
    PTmsi = 5,
    ReorderingRequired = 8,
    Recovery = 14,
    SelectionMode = 15,
    TeidDataI = 16,
    TeidControlPlane = 17,
    TeidDataII = 18,
    TeardownInd = 19,
    Nsapi = 20,
    ChargingCharacteristics = 26,
    ChargingId = 127,
    EndUserAddress = 128,
    AccessPointName = 131,
    ProtocolConfigurationOptions = 132,
    GsnAddress = 133,
    Msisdn = 134,
    QualityOfServiceProfile = 135,
    CommonFlags = 148,
    RatType = 151,
    UserLocationInformation = 152,
    MsTimeZone = 153,
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
        8 => Some(1),   // Reordering Required
        9 => Some(28),  // Authentication Triplet
        11 => Some(1),  // MAP Cause
        12 => Some(3),  // P-TMSI Signature
        13 => Some(1),  // MS Validated
        14 => Some(1),  // Recovery
        15 => Some(1),  // Selection Mode
        16 => Some(4),  // TEID Data I
        17 => Some(4),  // TEID Control Plane
        18 => Some(5),  // TEID Data II
        19 => Some(1),  // Teardown Ind
        20 => Some(1),  // NSAPI
        21 => Some(1),  // RANAP Cause
        22 => Some(9),  // RAB Context
        23 => Some(1),  // Radio Priority SMS
        24 => Some(1),  // Radio Priority
        25 => Some(2),  // Packet Flow ID
        26 => Some(2),  // Charging Characteristics
        27 => Some(2),  // Trace Reference
        28 => Some(2),  // Trace Type
        29 => Some(1),  // MS Not Reachable Reason
        127 => Some(4), // Charging ID
        _ => None,
    }
}

/// Generic GTPv1 Information Element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gtp1Ie {
    /// IE Type
    pub ie_type: u8,
    /// IE Value (raw bytes)
    pub value: Bytes,
}

impl Gtp1Ie {
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
        Self::from_slice(Gtp1IeType::Recovery as u8, &[restart_counter])
    }

    /// Create a Cause IE
    pub fn cause(cause: u8) -> Self {
        Self::from_slice(Gtp1IeType::Cause as u8, &[cause])
    }

    /// Create a TEID Data I IE
    pub fn teid_data_i(teid: u32) -> Self {
        Self::from_slice(Gtp1IeType::TeidDataI as u8, &teid.to_be_bytes())
    }

    /// Create an IMSI IE (TBCD digits)
    pub fn imsi(digits: &str) -> GtpResult<Self> {
        let mut tbcd = conv::digits_to_tbcd(digits)?;
        tbcd.resize(8, 0xFF);
        Ok(Self::from_slice(Gtp1IeType::Imsi as u8, &tbcd))
    }

    /// Create a GSN Address IE
    pub fn gsn_address(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self::from_slice(Gtp1IeType::GsnAddress as u8, &v4.octets()),
            IpAddr::V6(v6) => Self::from_slice(Gtp1IeType::GsnAddress as u8, &v6.octets()),
        }
    }

    /// Read this IE as a Recovery IE
    pub fn as_recovery(&self) -> GtpResult<u8> {
        self.expect_type(Gtp1IeType::Recovery as u8)?;
        self.byte_at(0)
    }

    /// Read this IE as a Cause IE
    pub fn as_cause(&self) -> GtpResult<u8> {
        self.expect_type(Gtp1IeType::Cause as u8)?;
        self.byte_at(0)
    }

    /// Read this IE as a TEID Data I IE
    pub fn as_teid_data_i(&self) -> GtpResult<u32> {
        self.expect_type(Gtp1IeType::TeidDataI as u8)?;
        if self.value.len() < 4 {
            return Err(GtpError::BufferTooShort {
                needed: 4,
                available: self.value.len(),
            });
        }
        Ok(u32::from_be_bytes([
            self.value[0],
            self.value[1],
            self.value[2],
            self.value[3],
        ]))
    }

    /// Read this IE as an IMSI IE
    pub fn as_imsi(&self) -> GtpResult<String> {
        self.expect_type(Gtp1IeType::Imsi as u8)?;
        Ok(conv::tbcd_to_digits(&self.value))
    }

    /// Read this IE as a GSN Address IE
    pub fn as_gsn_address(&self) -> GtpResult<IpAddr> {
        self.expect_type(Gtp1IeType::GsnAddress as u8)?;
        match self.value.len() {
            4 => {
                let octets: [u8; 4] = self.value[..4].try_into().unwrap();
                Ok(IpAddr::V4(Ipv4Addr::from(octets)))
            }
            16 => {
                let octets: [u8; 16] = self.value[..16].try_into().unwrap();
                Ok(IpAddr::V6(Ipv6Addr::from(octets)))
            }
            n => Err(GtpError::InvalidIeLength {
                expected: 4,
                actual: n,
            }),
        }
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
