//! Layer field values.
//!
//! Values borrow from the frame where the bytes exist verbatim (`Str`,
//! `Bytes`) and own their data when they must be constructed. A decoded frame
//! keeps only owned values ([`OwnedFieldValue`]) so it can outlive the
//! reader's buffer.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use compact_str::CompactString;
use serde_json::Value as JsonValue;

/// A field extracted from one protocol layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'data> {
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    Bool(bool),
    IpAddr(IpAddr),
    MacAddr([u8; 6]),

    /// Static names and text slices of the frame
    Str(&'data str),
    /// Byte slice of the frame
    Bytes(&'data [u8]),
    OwnedString(CompactString),
    OwnedBytes(Vec<u8>),

    /// Multi-valued field, such as the MPLS label stack
    List(Vec<FieldValue<'data>>),

    Null,
}

pub type OwnedFieldValue = FieldValue<'static>;

impl<'data> FieldValue<'data> {
    /// MAC from the first six bytes, or `Null` if short.
    pub fn mac(bytes: &[u8]) -> Self {
        match bytes.get(..6).and_then(|b| <[u8; 6]>::try_from(b).ok()) {
            Some(mac) => FieldValue::MacAddr(mac),
            None => FieldValue::Null,
        }
    }

    /// IPv4 from the first four bytes, or `Null` if short.
    pub fn ipv4(bytes: &[u8]) -> Self {
        match bytes.get(..4).and_then(|b| <[u8; 4]>::try_from(b).ok()) {
            Some(octets) => FieldValue::IpAddr(IpAddr::V4(Ipv4Addr::from(octets))),
            None => FieldValue::Null,
        }
    }

    /// IPv6 from the first sixteen bytes, or `Null` if short.
    pub fn ipv6(bytes: &[u8]) -> Self {
        match bytes.get(..16).and_then(|b| <[u8; 16]>::try_from(b).ok()) {
            Some(octets) => FieldValue::IpAddr(IpAddr::V6(Ipv6Addr::from(octets))),
            None => FieldValue::Null,
        }
    }

    /// Lowercase colon-separated MAC text.
    pub fn format_mac(mac: &[u8; 6]) -> String {
        mac.iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Any unsigned value widened to `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::UInt8(v) => Some(u64::from(*v)),
            FieldValue::UInt16(v) => Some(u64::from(*v)),
            FieldValue::UInt32(v) => Some(u64::from(*v)),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            FieldValue::UInt16(v) => Some(*v),
            FieldValue::UInt8(v) => Some(u16::from(*v)),
            _ => None,
        }
    }

    pub fn as_ip(&self) -> Option<IpAddr> {
        match self {
            FieldValue::IpAddr(addr) => Some(*addr),
            _ => None,
        }
    }

    pub fn as_mac(&self) -> Option<[u8; 6]> {
        match self {
            FieldValue::MacAddr(mac) => Some(*mac),
            _ => None,
        }
    }

    /// Detach from the frame buffer.
    pub fn to_owned(&self) -> OwnedFieldValue {
        match self {
            FieldValue::UInt8(v) => FieldValue::UInt8(*v),
            FieldValue::UInt16(v) => FieldValue::UInt16(*v),
            FieldValue::UInt32(v) => FieldValue::UInt32(*v),
            FieldValue::Bool(v) => FieldValue::Bool(*v),
            FieldValue::IpAddr(v) => FieldValue::IpAddr(*v),
            FieldValue::MacAddr(v) => FieldValue::MacAddr(*v),
            FieldValue::Str(s) => FieldValue::OwnedString(CompactString::new(s)),
            FieldValue::Bytes(b) => FieldValue::OwnedBytes(b.to_vec()),
            FieldValue::OwnedString(s) => FieldValue::OwnedString(s.clone()),
            FieldValue::OwnedBytes(b) => FieldValue::OwnedBytes(b.clone()),
            FieldValue::List(items) => FieldValue::List(items.iter().map(FieldValue::to_owned).collect()),
            FieldValue::Null => FieldValue::Null,
        }
    }

    /// JSON form used in the per-layer detail map.
    ///
    /// Addresses render as text, bytes as lowercase hex.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::UInt8(v) => JsonValue::from(*v),
            FieldValue::UInt16(v) => JsonValue::from(*v),
            FieldValue::UInt32(v) => JsonValue::from(*v),
            FieldValue::Bool(v) => JsonValue::from(*v),
            FieldValue::IpAddr(addr) => JsonValue::from(addr.to_string()),
            FieldValue::MacAddr(mac) => JsonValue::from(Self::format_mac(mac)),
            FieldValue::Str(s) => JsonValue::from(*s),
            FieldValue::OwnedString(s) => JsonValue::from(s.as_str()),
            FieldValue::Bytes(b) => JsonValue::from(hex::encode(b)),
            FieldValue::OwnedBytes(b) => JsonValue::from(hex::encode(b)),
            FieldValue::List(items) => JsonValue::Array(items.iter().map(FieldValue::to_json).collect()),
            FieldValue::Null => JsonValue::Null,
        }
    }
}
