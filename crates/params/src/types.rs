//! Plain value types shared by the parameter tables and the ledger primitives.

use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ParamsError;

/// A 32-byte hash as used by the ledger for code hashes and transaction hashes.
///
/// It is rendered as `0x`-prefixed lowercase hex, which is how ledger tooling prints hashes.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Byte32(pub [u8; 32]);

impl Byte32 {
    /// The all-zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates a new hash from a byte array.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the hash as a byte array.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns true if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl From<[u8; 32]> for Byte32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Byte32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Byte32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Byte32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Byte32 {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let mut out = [0u8; 32];
        hex::decode_to_slice(raw, &mut out).map_err(|e| ParamsError::InvalidHex(e.to_string()))?;

        Ok(Self(out))
    }
}

impl Serialize for Byte32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Byte32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// How a script's code hash is matched against deployed code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptHashType {
    /// Match the data hash of the code cell, run with VM version 0.
    Data,

    /// Match the type script hash of the code cell.
    Type,

    /// Match the data hash of the code cell, run with VM version 1.
    Data1,

    /// Match the data hash of the code cell, run with VM version 2.
    Data2,
}

impl ScriptHashType {
    /// The byte used for this hash type in the molecule encoding of a script.
    pub const fn as_byte(&self) -> u8 {
        match self {
            ScriptHashType::Data => 0,
            ScriptHashType::Type => 1,
            ScriptHashType::Data1 => 2,
            ScriptHashType::Data2 => 4,
        }
    }
}

/// How a cell dep is resolved by the ledger.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepType {
    /// The referenced cell contains code.
    #[default]
    Code,

    /// The referenced cell contains a list of outpoints to expand.
    DepGroup,
}

impl DepType {
    /// The byte used for this dep type in the molecule encoding of a cell dep.
    pub const fn as_byte(&self) -> u8 {
        match self {
            DepType::Code => 0,
            DepType::DepGroup => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte32_parses_with_and_without_prefix() {
        let hex = "bc6c568a1a0d0a09f6844dc9d74ddb4343c32143ff25f727c59edf4fb72d6936";
        let with_prefix: Byte32 = format!("0x{hex}").parse().unwrap();
        let without_prefix: Byte32 = hex.parse().unwrap();

        assert_eq!(with_prefix, without_prefix);
        assert_eq!(with_prefix.to_string(), format!("0x{hex}"));
    }

    #[test]
    fn byte32_rejects_wrong_length() {
        assert!("0xdeadbeef".parse::<Byte32>().is_err());
    }

    #[test]
    fn hash_type_bytes() {
        assert_eq!(ScriptHashType::Data.as_byte(), 0);
        assert_eq!(ScriptHashType::Type.as_byte(), 1);
        assert_eq!(ScriptHashType::Data1.as_byte(), 2);
        assert_eq!(ScriptHashType::Data2.as_byte(), 4);
    }
}
