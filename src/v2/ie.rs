//! GTPv2 Information Elements
//!
//! GTPv2-C IEs are always TLV with an extra spare/instance byte in the
//! header: type (1), length (2), spare+instance (1), value. The 4-bit
//! instance field disambiguates repeated tags within one message. A
//! subset of tags is grouped: their payload is itself a nested IE
//! sequence.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::conv;
use crate::error::{GtpError, GtpResult};

use super::types::{Gtp2CauseInfo, Gtp2Fteid, Gtp2Paa};

/// GTPv2 IE Types (the subset this crate constructs or interprets;
/// any tag still decodes generically)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Gtp2IeType {
    Imsi = 1,
    Cause = 2,
    Recovery = 3,
    Apn = 71,
    Ambr = 72,
    Ebi = 73,
    IpAddress = 74,
    Mei = 75,
    Msisdn = 76,
    Indication = 77,
    Pco = 78,
    Paa = 79,
    BearerQos = 80,
    RatType = 82,
    ServingNetwork = 83,
    Uli = 86,
    FTeid = 87,
    BearerContext = 93,
    ChargingId = 94,
    PdnType = 99,
    PdnConnection = 109,
    UeTimeZone = 114,
    ApnRestriction = 127,
    SelectionMode = 128,
    NodeType = 135,
    Fqdn = 136,
    OverloadControlInformation = 180,
    LoadControlInformation = 181,
    PrivateExtension = 255,
}

/// Check if a v2 IE type carries nested IEs in its payload
pub fn is_grouped_ie(ie_type: u8) -> bool {
    matches!(ie_type, 93 | 109 | 180 | 181)
}

/// Generic GTPv2 Information Element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gtp2Ie {
    /// IE Type
    pub ie_type: u8,
    /// IE Instance (4 bits)
    pub instance: u8,
    /// IE Value (raw bytes)
    pub value: Bytes,
}

impl Gtp2Ie {
    /// Create a new IE
    pub fn new(ie_type: u8, instance: u8, value: Bytes) -> Self {
        Self {
            ie_type,
            instance: instance & 0x0F,
            value,
        }
    }

    /// Create a new IE from a slice
    pub fn from_slice(ie_type: u8, instance: u8, value: &[u8]) -> Self {
        Self {
            ie_type,
            instance: instance & 0x0F,
            value: Bytes::copy_from_slice(value),
        }
    }

    /// Return the same IE with a different instance value
    pub fn with_instance(mut self, instance: u8) -> Self {
        self.instance = instance & 0x0F;
        self
    }

    // ------------------------------------------------------------------
    // Typed constructors
    // ------------------------------------------------------------------

    /// Create a Recovery IE
    pub fn recovery(restart_counter: u8) -> Self {
        Self::from_slice(Gtp2IeType::Recovery as u8, 0, &[restart_counter])
    }

    /// Create a Cause IE
    pub fn cause(info: Gtp2CauseInfo) -> Self {
        let mut buf = BytesMut::with_capacity(2);
        info.encode(&mut buf);
        Self::new(Gtp2IeType::Cause as u8, 0, buf.freeze())
    }

    /// Create an EBI (EPS Bearer Identity) IE
    pub fn ebi(ebi: u8) -> Self {
        Self::from_slice(Gtp2IeType::Ebi as u8, 0, &[ebi & 0x0F])
    }

    /// Create a RAT Type IE
    pub fn rat_type(rat: u8) -> Self {
        Self::from_slice(Gtp2IeType::RatType as u8, 0, &[rat])
    }

    /// Create an APN IE
    pub fn apn(apn: &str) -> GtpResult<Self> {
        Ok(Self::new(
            Gtp2IeType::Apn as u8,
            0,
            conv::encode_apn(apn)?.into(),
        ))
    }

    /// Create an IMSI IE (TBCD digits)
    pub fn imsi(digits: &str) -> GtpResult<Self> {
        Ok(Self::new(
            Gtp2IeType::Imsi as u8,
            0,
            conv::digits_to_tbcd(digits)?.into(),
        ))
    }

    /// Create an MSISDN IE (TBCD digits)
    pub fn msisdn(digits: &str) -> GtpResult<Self> {
        Ok(Self::new(
            Gtp2IeType::Msisdn as u8,
            0,
            conv::digits_to_tbcd(digits)?.into(),
        ))
    }

    /// Create a Serving Network IE from MCC/MNC digit strings
    pub fn serving_network(mcc: &str, mnc: &str) -> GtpResult<Self> {
        let plmn = encode_plmn(mcc, mnc)?;
        Ok(Self::from_slice(Gtp2IeType::ServingNetwork as u8, 0, &plmn))
    }

    /// Create a Selection Mode IE
    pub fn selection_mode(mode: u8) -> Self {
        Self::from_slice(Gtp2IeType::SelectionMode as u8, 0, &[mode & 0x03])
    }

    /// Create an APN Restriction IE
    pub fn apn_restriction(restriction: u8) -> Self {
        Self::from_slice(Gtp2IeType::ApnRestriction as u8, 0, &[restriction])
    }

    /// Create a PDN Type IE
    pub fn pdn_type(pdn_type: u8) -> Self {
        Self::from_slice(Gtp2IeType::PdnType as u8, 0, &[pdn_type & 0x07])
    }

    /// Create an AMBR IE (uplink/downlink in kbps)
    pub fn ambr(uplink: u32, downlink: u32) -> Self {
        let mut buf = BytesMut::with_capacity(8);
        buf.put_u32(uplink);
        buf.put_u32(downlink);
        Self::new(Gtp2IeType::Ambr as u8, 0, buf.freeze())
    }

    /// Create an F-TEID IE
    pub fn fteid(fteid: Gtp2Fteid) -> Self {
        let mut buf = BytesMut::with_capacity(9);
        fteid.encode(&mut buf);
        Self::new(Gtp2IeType::FTeid as u8, 0, buf.freeze())
    }

    /// Create a PAA IE
    pub fn paa(paa: Gtp2Paa) -> Self {
        let mut buf = BytesMut::with_capacity(5);
        paa.encode(&mut buf);
        Self::new(Gtp2IeType::Paa as u8, 0, buf.freeze())
    }

    /// Create a Charging ID IE
    pub fn charging_id(id: u32) -> Self {
        Self::from_slice(Gtp2IeType::ChargingId as u8, 0, &id.to_be_bytes())
    }

    /// Create a grouped Bearer Context IE from child IEs
    pub fn bearer_context(children: &[Gtp2Ie]) -> Self {
        let mut buf = BytesMut::new();
        for child in children {
            child.encode(&mut buf);
        }
        Self::new(Gtp2IeType::BearerContext as u8, 0, buf.freeze())
    }

    // ------------------------------------------------------------------
    // Typed accessors (bounds-checked; network input is untrusted)
    // ------------------------------------------------------------------

    /// Read this IE as a Recovery IE
    pub fn as_recovery(&self) -> GtpResult<u8> {
        self.expect_type(Gtp2IeType::Recovery as u8)?;
        self.byte_at(0)
    }

    /// Read this IE as a Cause IE
    pub fn as_cause(&self) -> GtpResult<Gtp2CauseInfo> {
        self.expect_type(Gtp2IeType::Cause as u8)?;
        Gtp2CauseInfo::decode(&self.value)
    }

    /// Read this IE as an EBI IE
    pub fn as_ebi(&self) -> GtpResult<u8> {
        self.expect_type(Gtp2IeType::Ebi as u8)?;
        Ok(self.byte_at(0)? & 0x0F)
    }

    /// Read this IE as a RAT Type IE
    pub fn as_rat_type(&self) -> GtpResult<u8> {
        self.expect_type(Gtp2IeType::RatType as u8)?;
        self.byte_at(0)
    }

    /// Read this IE as an APN IE
    pub fn as_apn(&self) -> GtpResult<String> {
        self.expect_type(Gtp2IeType::Apn as u8)?;
        conv::decode_apn(&self.value)
    }

    /// Read this IE as an IMSI IE
    pub fn as_imsi(&self) -> GtpResult<String> {
        self.expect_type(Gtp2IeType::Imsi as u8)?;
        Ok(conv::tbcd_to_digits(&self.value))
    }

    /// Read this IE as an MSISDN IE
    pub fn as_msisdn(&self) -> GtpResult<String> {
        self.expect_type(Gtp2IeType::Msisdn as u8)?;
        Ok(conv::tbcd_to_digits(&self.value))
    }

    /// Read this IE as an AMBR IE, returning (uplink, downlink)
    pub fn as_ambr(&self) -> GtpResult<(u32, u32)> {
        self.expect_type(Gtp2IeType::Ambr as u8)?;
        if self.value.len() < 8 {
            return Err(GtpError::BufferTooShort {
                needed: 8,
                available: self.value.len(),
            });
        }
        let ul = u32::from_be_bytes(self.value[0..4].try_into().unwrap());
        let dl = u32::from_be_bytes(self.value[4..8].try_into().unwrap());
        Ok((ul, dl))
    }

    /// Read this IE as an F-TEID IE
    pub fn as_fteid(&self) -> GtpResult<Gtp2Fteid> {
        self.expect_type(Gtp2IeType::FTeid as u8)?;
        Gtp2Fteid::decode(&self.value)
    }

    /// Read this IE as a PAA IE
    pub fn as_paa(&self) -> GtpResult<Gtp2Paa> {
        self.expect_type(Gtp2IeType::Paa as u8)?;
        Gtp2Paa::decode(&self.value)
    }

    /// Read this IE as a PDN Type IE
    pub fn as_pdn_type(&self) -> GtpResult<u8> {
        self.expect_type(Gtp2IeType::PdnType as u8)?;
        Ok(self.byte_at(0)? & 0x07)
    }

    /// Parse the nested IEs of a grouped IE
    pub fn child_ies(&self) -> GtpResult<Vec<Gtp2Ie>> {
        if !is_grouped_ie(self.ie_type) {
            return Err(GtpError::NotGrouped(self.ie_type));
        }
        let mut buf = self.value.clone();
        Self::decode_multi(&mut buf)
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

    // ------------------------------------------------------------------
    // Wire codec
    // ------------------------------------------------------------------

    /// Encode IE to bytes
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.ie_type);
        buf.put_u16(self.value.len() as u16);
        buf.put_u8(self.instance & 0x0F);
        buf.put_slice(&self.value);
    }

    /// Decode IE from bytes
    pub fn decode(buf: &mut Bytes) -> GtpResult<Self> {
        if buf.remaining() < 4 {
            return Err(GtpError::BufferTooShort {
                needed: 4,
                available: buf.remaining(),
            });
        }

        let ie_type = buf.get_u8();
        let length = buf.get_u16() as usize;
        let instance = buf.get_u8() & 0x0F;

        if buf.remaining() < length {
            return Err(GtpError::BufferTooShort {
                needed: length,
                available: buf.remaining(),
            });
        }

        let value = buf.copy_to_bytes(length);
        Ok(Self {
            ie_type,
            instance,
            value,
        })
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
        4 + self.value.len()
    }
}

/// Encode MCC/MNC digit strings into the 3-byte PLMN format
fn encode_plmn(mcc: &str, mnc: &str) -> GtpResult<[u8; 3]> {
    let mcc_d: Vec<u8> = digits(mcc)?;
    let mnc_d: Vec<u8> = digits(mnc)?;
    if mcc_d.len() != 3 || !(2..=3).contains(&mnc_d.len()) {
        return Err(GtpError::InvalidFormat(format!(
            "bad PLMN digits: mcc={mcc:?} mnc={mnc:?}"
        )));
    }
    let mnc3 = if mnc_d.len() == 3 { mnc_d[2] } else { 0x0F };
    Ok([
        (mcc_d[1] << 4) | mcc_d[0],
        (mnc3 << 4) | mcc_d[2],
        (mnc_d[1] << 4) | mnc_d[0],
    ])
}

fn digits(s: &str) -> GtpResult<Vec<u8>> {
    s.chars()
        .map(|c| {
            c.to_digit(10)
                .map(|d| d as u8)
                .ok_or_else(|| GtpError::InvalidFormat(format!("non-digit in PLMN: {c:?}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_ie_round_trip() {
        let ie = Gtp2Ie::recovery(0x80);
        let mut buf = BytesMut::new();
        ie.encode(&mut buf);
        assert_eq!(&buf[..], &[3, 0x00, 0x01, 0x00, 0x80]);
        assert_eq!(buf.len(), ie.encoded_len());

        let mut bytes = buf.freeze();
        let decoded = Gtp2Ie::decode(&mut bytes).unwrap();
        assert_eq!(decoded, ie);
        assert_eq!(decoded.as_recovery().unwrap(), 0x80);
    }

    #[test]
    fn test_instance_nibble_round_trip() {
        let ie = Gtp2Ie::fteid(Gtp2Fteid::new_v4(7, 1, Ipv4Addr::LOCALHOST)).with_instance(1);
        let mut buf = BytesMut::new();
        ie.encode(&mut buf);
        assert_eq!(buf[3], 0x01);

        let mut bytes = buf.freeze();
        let decoded = Gtp2Ie::decode(&mut bytes).unwrap();
        assert_eq!(decoded.instance, 1);
    }

    #[test]
    fn test_declared_length_exceeds_buffer() {
        let mut bytes = Bytes::from_static(&[3, 0x00, 0x10, 0x00, 0x80]);
        assert!(matches!(
            Gtp2Ie::decode(&mut bytes),
            Err(GtpError::BufferTooShort { .. })
        ));
    }

    #[test]
    fn test_short_header() {
        let mut bytes = Bytes::from_static(&[3, 0x00]);
        assert!(matches!(
            Gtp2Ie::decode(&mut bytes),
            Err(GtpError::BufferTooShort { .. })
        ));
    }

    #[test]
    fn test_grouped_bearer_context() {
        let children = vec![
            Gtp2Ie::ebi(5),
            Gtp2Ie::fteid(Gtp2Fteid::new_v4(0, 0xAABB, Ipv4Addr::new(10, 0, 0, 1))),
        ];
        let grouped = Gtp2Ie::bearer_context(&children);
        assert!(is_grouped_ie(grouped.ie_type));

        let parsed = grouped.child_ies().unwrap();
        assert_eq!(parsed, children);
        assert_eq!(parsed[0].as_ebi().unwrap(), 5);
    }

    #[test]
    fn test_child_ies_on_non_grouped() {
        let ie = Gtp2Ie::recovery(1);
        assert_eq!(ie.child_ies(), Err(GtpError::NotGrouped(3)));
    }

    #[test]
    fn test_apn_round_trip() {
        let ie = Gtp2Ie::apn("internet.mnc001.mcc001.gprs").unwrap();
        assert_eq!(ie.as_apn().unwrap(), "internet.mnc001.mcc001.gprs");
    }

    #[test]
    fn test_imsi_round_trip() {
        let ie = Gtp2Ie::imsi("001011234567890").unwrap();
        assert_eq!(ie.as_imsi().unwrap(), "001011234567890");
    }

    #[test]
    fn test_serving_network_encoding() {
        let ie = Gtp2Ie::serving_network("001", "01").unwrap();
        assert_eq!(&ie.value[..], &[0x00, 0xF1, 0x10]);
    }

    #[test]
    fn test_accessor_on_wrong_type() {
        let ie = Gtp2Ie::recovery(1);
        assert!(matches!(
            ie.as_cause(),
            Err(GtpError::UnexpectedIeType { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_accessor_on_short_payload() {
        let ie = Gtp2Ie::new(Gtp2IeType::Ambr as u8, 0, Bytes::from_static(&[1, 2, 3]));
        assert!(matches!(ie.as_ambr(), Err(GtpError::BufferTooShort { .. })));
    }
}
