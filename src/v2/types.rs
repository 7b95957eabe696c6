//! GTPv2 Types
//!
//! Typed values carried inside GTPv2-C IEs, as specified in 3GPP TS 29.274.

use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{GtpError, GtpResult};

/// GTPv2 Cause values (TS 29.274 Section 8.4), the commonly used subset
pub mod cause {
    pub const LOCAL_DETACH: u8 = 2;
    pub const COMPLETE_DETACH: u8 = 3;
    pub const ISR_DEACTIVATION: u8 = 5;
    pub const ERROR_INDICATION_RECEIVED: u8 = 6;
    pub const REQUEST_ACCEPTED: u8 = 16;
    pub const REQUEST_ACCEPTED_PARTIALLY: u8 = 17;
    pub const CONTEXT_NOT_FOUND: u8 = 64;
    pub const INVALID_MESSAGE_FORMAT: u8 = 65;
    pub const VERSION_NOT_SUPPORTED_BY_NEXT_PEER: u8 = 66;
    pub const INVALID_LENGTH: u8 = 67;
    pub const SERVICE_NOT_SUPPORTED: u8 = 68;
    pub const MANDATORY_IE_INCORRECT: u8 = 69;
    pub const MANDATORY_IE_MISSING: u8 = 70;
    pub const SYSTEM_FAILURE: u8 = 72;
    pub const NO_RESOURCES_AVAILABLE: u8 = 73;
    pub const MISSING_OR_UNKNOWN_APN: u8 = 78;
    pub const ALL_DYNAMIC_ADDRESSES_ARE_OCCUPIED: u8 = 84;
    pub const REQUEST_REJECTED: u8 = 94;
    pub const IMSI_IMEI_NOT_KNOWN: u8 = 96;
    pub const CONDITIONAL_IE_MISSING: u8 = 103;
    pub const INVALID_OVERALL_LENGTH: u8 = 105;
    pub const INVALID_PEER: u8 = 109;
    pub const FALLBACK_TO_GTPV1: u8 = 108;
    pub const TIMED_OUT_REQUEST: u8 = 122;
}

/// F-TEID interface types (TS 29.274 Section 8.22), the commonly used subset
pub mod interface {
    pub const S1U_ENODEB_GTPU: u8 = 0;
    pub const S1U_SGW_GTPU: u8 = 1;
    pub const S5S8_SGW_GTPU: u8 = 4;
    pub const S5S8_PGW_GTPU: u8 = 5;
    pub const S5S8_SGW_GTPC: u8 = 6;
    pub const S5S8_PGW_GTPC: u8 = 7;
    pub const S11_MME_GTPC: u8 = 10;
    pub const S11S4_SGW_GTPC: u8 = 11;
}

/// RAT types (TS 29.274 Section 8.17)
pub mod rat {
    pub const UTRAN: u8 = 1;
    pub const GERAN: u8 = 2;
    pub const WLAN: u8 = 3;
    pub const GAN: u8 = 4;
    pub const HSPA_EVOLUTION: u8 = 5;
    pub const EUTRAN: u8 = 6;
    pub const VIRTUAL: u8 = 7;
    pub const EUTRAN_NB_IOT: u8 = 8;
}

/// PDN types (TS 29.274 Section 8.34)
pub mod pdn {
    pub const IPV4: u8 = 1;
    pub const IPV6: u8 = 2;
    pub const IPV4V6: u8 = 3;
}

/// Decoded Cause IE value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gtp2CauseInfo {
    /// Cause value
    pub value: u8,
    /// PDN Connection IE Error
    pub pce: bool,
    /// Bearer Context IE Error
    pub bce: bool,
    /// Cause Source (originated by the node sending the rejection)
    pub cs: bool,
}

impl Gtp2CauseInfo {
    /// Create a cause with no error flags
    pub fn new(value: u8) -> Self {
        Self {
            value,
            pce: false,
            bce: false,
            cs: false,
        }
    }

    /// True for the accepted cause range
    pub fn is_accepted(&self) -> bool {
        (16..=63).contains(&self.value)
    }

    /// Encode to the 2-byte Cause IE payload
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.value);
        let mut flags = 0u8;
        if self.pce {
            flags |= 0x04;
        }
        if self.bce {
            flags |= 0x02;
        }
        if self.cs {
            flags |= 0x01;
        }
        buf.put_u8(flags);
    }

    /// Decode from a Cause IE payload
    pub fn decode(value: &[u8]) -> GtpResult<Self> {
        if value.len() < 2 {
            return Err(GtpError::BufferTooShort {
                needed: 2,
                available: value.len(),
            });
        }
        Ok(Self {
            value: value[0],
            pce: (value[1] & 0x04) != 0,
            bce: (value[1] & 0x02) != 0,
            cs: (value[1] & 0x01) != 0,
        })
    }
}

/// Fully Qualified TEID (TS 29.274 Section 8.22)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gtp2Fteid {
    /// Interface type (6 bits)
    pub interface_type: u8,
    /// Tunnel Endpoint Identifier
    pub teid: u32,
    /// IPv4 address, when present
    pub ipv4: Option<Ipv4Addr>,
    /// IPv6 address, when present
    pub ipv6: Option<Ipv6Addr>,
}

impl Gtp2Fteid {
    /// Create an IPv4 F-TEID
    pub fn new_v4(interface_type: u8, teid: u32, addr: Ipv4Addr) -> Self {
        Self {
            interface_type,
            teid,
            ipv4: Some(addr),
            ipv6: None,
        }
    }

    /// Encode to an F-TEID IE payload
    pub fn encode(&self, buf: &mut BytesMut) {
        let mut first = self.interface_type & 0x3F;
        if self.ipv4.is_some() {
            first |= 0x80;
        }
        if self.ipv6.is_some() {
            first |= 0x40;
        }
        buf.put_u8(first);
        buf.put_u32(self.teid);
        if let Some(v4) = self.ipv4 {
            buf.put_slice(&v4.octets());
        }
        if let Some(v6) = self.ipv6 {
            buf.put_slice(&v6.octets());
        }
    }

    /// Decode from an F-TEID IE payload
    pub fn decode(value: &[u8]) -> GtpResult<Self> {
        let mut buf = Bytes::copy_from_slice(value);
        if buf.remaining() < 5 {
            return Err(GtpError::BufferTooShort {
                needed: 5,
                available: buf.remaining(),
            });
        }
        let first = buf.get_u8();
        let has_v4 = (first & 0x80) != 0;
        let has_v6 = (first & 0x40) != 0;
        let interface_type = first & 0x3F;
        let teid = buf.get_u32();

        let ipv4 = if has_v4 {
            if buf.remaining() < 4 {
                return Err(GtpError::BufferTooShort {
                    needed: 4,
                    available: buf.remaining(),
                });
            }
            let mut octets = [0u8; 4];
            buf.copy_to_slice(&mut octets);
            Some(Ipv4Addr::from(octets))
        } else {
            None
        };

        let ipv6 = if has_v6 {
            if buf.remaining() < 16 {
                return Err(GtpError::BufferTooShort {
                    needed: 16,
                    available: buf.remaining(),
                });
            }
            let mut octets = [0u8; 16];
            buf.copy_to_slice(&mut octets);
            Some(Ipv6Addr::from(octets))
        } else {
            None
        };

        Ok(Self {
            interface_type,
            teid,
            ipv4,
            ipv6,
        })
    }
}

/// PDN Address Allocation (TS 29.274 Section 8.14)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gtp2Paa {
    V4(Ipv4Addr),
    V6 { prefix_len: u8, addr: Ipv6Addr },
    V4V6 { prefix_len: u8, v6: Ipv6Addr, v4: Ipv4Addr },
}

impl Gtp2Paa {
    /// PDN type value for this allocation
    pub fn pdn_type(&self) -> u8 {
        match self {
            Self::V4(_) => pdn::IPV4,
            Self::V6 { .. } => pdn::IPV6,
            Self::V4V6 { .. } => pdn::IPV4V6,
        }
    }

    /// Encode to a PAA IE payload
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.pdn_type());
        match self {
            Self::V4(v4) => buf.put_slice(&v4.octets()),
            Self::V6 { prefix_len, addr } => {
                buf.put_u8(*prefix_len);
                buf.put_slice(&addr.octets());
            }
            Self::V4V6 { prefix_len, v6, v4 } => {
                buf.put_u8(*prefix_len);
                buf.put_slice(&v6.octets());
                buf.put_slice(&v4.octets());
            }
        }
    }

    /// Decode from a PAA IE payload
    pub fn decode(value: &[u8]) -> GtpResult<Self> {
        let mut buf = Bytes::copy_from_slice(value);
        if buf.remaining() < 1 {
            return Err(GtpError::BufferTooShort {
                needed: 1,
                available: 0,
            });
        }
        let pdn_type = buf.get_u8();
        match pdn_type {
            t if t == pdn::IPV4 => {
                if buf.remaining() < 4 {
                    return Err(GtpError::BufferTooShort {
                        needed: 4,
                        available: buf.remaining(),
                    });
                }
                let mut octets = [0u8; 4];
                buf.copy_to_slice(&mut octets);
                Ok(Self::V4(Ipv4Addr::from(octets)))
            }
            t if t == pdn::IPV6 => {
                if buf.remaining() < 17 {
                    return Err(GtpError::BufferTooShort {
                        needed: 17,
                        available: buf.remaining(),
                    });
                }
                let prefix_len = buf.get_u8();
                let mut octets = [0u8; 16];
                buf.copy_to_slice(&mut octets);
                Ok(Self::V6 {
                    prefix_len,
                    addr: Ipv6Addr::from(octets),
                })
            }
            t if t == pdn::IPV4V6 => {
                if buf.remaining() < 21 {
                    return Err(GtpError::BufferTooShort {
                        needed: 21,
                        available: buf.remaining(),
                    });
                }
                let prefix_len = buf.get_u8();
                let mut v6 = [0u8; 16];
                buf.copy_to_slice(&mut v6);
                let mut v4 = [0u8; 4];
                buf.copy_to_slice(&mut v4);
                Ok(Self::V4V6 {
                    prefix_len,
                    v6: Ipv6Addr::from(v6),
                    v4: Ipv4Addr::from(v4),
                })
            }
            other => Err(GtpError::InvalidFormat(format!(
                "unknown PDN type in PAA: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_round_trip() {
        let c = Gtp2CauseInfo {
            value: cause::CONTEXT_NOT_FOUND,
            pce: true,
            bce: false,
            cs: true,
        };
        let mut buf = BytesMut::new();
        c.encode(&mut buf);
        assert_eq!(Gtp2CauseInfo::decode(&buf).unwrap(), c);
        assert!(!c.is_accepted());
        assert!(Gtp2CauseInfo::new(cause::REQUEST_ACCEPTED).is_accepted());
    }

    #[test]
    fn test_fteid_v4_round_trip() {
        let fteid = Gtp2Fteid::new_v4(
            interface::S11_MME_GTPC,
            0x12345678,
            Ipv4Addr::new(192, 0, 2, 10),
        );
        let mut buf = BytesMut::new();
        fteid.encode(&mut buf);
        assert_eq!(buf.len(), 9);
        assert_eq!(buf[0], 0x80 | interface::S11_MME_GTPC);
        assert_eq!(Gtp2Fteid::decode(&buf).unwrap(), fteid);
    }

    #[test]
    fn test_fteid_dual_stack_round_trip() {
        let fteid = Gtp2Fteid {
            interface_type: interface::S5S8_PGW_GTPU,
            teid: 7,
            ipv4: Some(Ipv4Addr::LOCALHOST),
            ipv6: Some(Ipv6Addr::LOCALHOST),
        };
        let mut buf = BytesMut::new();
        fteid.encode(&mut buf);
        assert_eq!(buf.len(), 25);
        assert_eq!(Gtp2Fteid::decode(&buf).unwrap(), fteid);
    }

    #[test]
    fn test_fteid_truncated() {
        assert!(matches!(
            Gtp2Fteid::decode(&[0x80, 0, 0, 0, 1, 10, 0]),
            Err(GtpError::BufferTooShort { .. })
        ));
    }

    #[test]
    fn test_paa_round_trip() {
        let paa = Gtp2Paa::V4(Ipv4Addr::new(10, 45, 0, 2));
        let mut buf = BytesMut::new();
        paa.encode(&mut buf);
        assert_eq!(Gtp2Paa::decode(&buf).unwrap(), paa);

        let paa6 = Gtp2Paa::V6 {
            prefix_len: 64,
            addr: Ipv6Addr::LOCALHOST,
        };
        let mut buf6 = BytesMut::new();
        paa6.encode(&mut buf6);
        assert_eq!(Gtp2Paa::decode(&buf6).unwrap(), paa6);
    }
}
