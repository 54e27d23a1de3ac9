//! Envelope types for RPC request/response framing.

use crate::model::WireValue;

/// Kind of an enveloped message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EnvelopeKind {
    /// A request expecting a reply (Thrift "call").
    Unary = 1,
    Reply = 2,
    Exception = 3,
    /// A request with no reply.
    Oneway = 4,
}

impl EnvelopeKind {
    /// Creates an EnvelopeKind from its wire representation.
    pub fn from_u8(v: u8) -> Option<EnvelopeKind> {
        match v {
            1 => Some(EnvelopeKind::Unary),
            2 => Some(EnvelopeKind::Reply),
            3 => Some(EnvelopeKind::Exception),
            4 => Some(EnvelopeKind::Oneway),
            _ => None,
        }
    }
}

/// Header of an enveloped message.
///
/// The default value (empty name, no kind, zero sequence ID) means that no
/// envelope was present on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvelopeHeader {
    /// Method name.
    pub name: String,
    pub kind: Option<EnvelopeKind>,
    /// Correlation number echoed by the reply.
    pub seq_id: i32,
}

impl EnvelopeHeader {
    pub fn new(name: impl Into<String>, kind: EnvelopeKind, seq_id: i32) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind),
            seq_id,
        }
    }

    /// The "no envelope" sentinel.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns true for the "no envelope" sentinel.
    pub fn is_none(&self) -> bool {
        self.kind.is_none() && self.name.is_empty() && self.seq_id == 0
    }
}

/// A complete enveloped message.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub header: EnvelopeHeader,
    pub value: WireValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel() {
        assert!(EnvelopeHeader::none().is_none());
        assert!(EnvelopeHeader::default().is_none());
        assert!(!EnvelopeHeader::new("", EnvelopeKind::Unary, 0).is_none());
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            EnvelopeKind::Unary,
            EnvelopeKind::Reply,
            EnvelopeKind::Exception,
            EnvelopeKind::Oneway,
        ] {
            assert_eq!(EnvelopeKind::from_u8(kind as u8), Some(kind));
        }
        assert_eq!(EnvelopeKind::from_u8(0), None);
        assert_eq!(EnvelopeKind::from_u8(5), None);
    }
}
