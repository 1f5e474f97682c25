//! Domain-specific identifier types.

use rand::Rng;
use sbor::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Globally unique 128-bit template identifier.
///
/// Rendered in the familiar 8-4-4-4-12 hex grouping. Identifiers are only
/// unique across peers that have exchanged allocation notices, so fresh ones
/// should come from the allocator rather than [`TemplateId::random`] directly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BasicSbor)]
#[sbor(transparent)]
pub struct TemplateId(pub u128);

impl TemplateId {
    /// The all-zero identifier. Never produced by allocation in practice.
    pub const NIL: Self = TemplateId(0);

    /// Draw a random candidate identifier.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        TemplateId(rng.gen())
    }

    /// Get the raw value.
    pub fn as_u128(&self) -> u128 {
        self.0
    }

    /// Big-endian byte representation.
    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Build from big-endian bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        TemplateId(u128::from_be_bytes(bytes))
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(self.to_bytes());
        write!(
            f,
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }
}

impl fmt::Debug for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TemplateId({})", self)
    }
}

impl FromStr for TemplateId {
    type Err = IdParseError;

    /// Accepts 32 hex digits, with or without the hyphen grouping.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != '-').collect();
        if digits.len() != 32 {
            return Err(IdParseError::InvalidLength(digits.len()));
        }

        let mut bytes = [0u8; 16];
        hex::decode_to_slice(&digits, &mut bytes).map_err(|_| IdParseError::InvalidHex)?;
        Ok(TemplateId::from_bytes(bytes))
    }
}

/// Errors that can occur when parsing a [`TemplateId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    /// Wrong number of hex digits.
    #[error("Invalid identifier length: expected 32 hex digits, got {0}")]
    InvalidLength(usize),

    /// Non-hex characters.
    #[error("Invalid hex in identifier")]
    InvalidHex,
}
