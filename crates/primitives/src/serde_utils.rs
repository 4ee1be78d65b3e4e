//! Serde helpers for the ledger's JSON conventions: byte strings and integers are rendered as
//! `0x`-prefixed hex.

/// `Vec<u8>` as `0x`-prefixed hex.
pub mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serializes bytes as a `0x`-prefixed hex string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    /// Deserializes bytes from a hex string with an optional `0x` prefix.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode(&s).map_err(de::Error::custom)
    }

    pub(crate) fn decode(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(s.strip_prefix("0x").unwrap_or(s))
    }
}

/// `u64` as `0x`-prefixed hex.
pub mod hex_u64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serializes an integer as a `0x`-prefixed hex string.
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:#x}"))
    }

    /// Deserializes an integer from a `0x`-prefixed hex string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = s
            .strip_prefix("0x")
            .ok_or_else(|| de::Error::custom("hex integer must start with 0x"))?;

        u64::from_str_radix(raw, 16).map_err(de::Error::custom)
    }
}

/// `u32` as `0x`-prefixed hex.
pub mod hex_u32 {
    use serde::{de, Deserializer, Serializer};

    /// Serializes an integer as a `0x`-prefixed hex string.
    pub fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:#x}"))
    }

    /// Deserializes an integer from a `0x`-prefixed hex string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = super::hex_u64::deserialize(deserializer)?;
        u32::try_from(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "super::hex_u64")]
        capacity: u64,

        #[serde(with = "super::hex_u32")]
        index: u32,

        #[serde(with = "super::hex_bytes")]
        data: Vec<u8>,
    }

    #[test]
    fn hex_fields_round_trip() {
        let sample = Sample {
            capacity: 47_400_000_000,
            index: 1,
            data: vec![0xde, 0xad],
        };

        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(
            json,
            r#"{"capacity":"0xb09429a00","index":"0x1","data":"0xdead"}"#
        );

        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn integer_without_prefix_is_rejected() {
        let json = r#"{"capacity":"10","index":"0x1","data":"0x"}"#;
        assert!(serde_json::from_str::<Sample>(json).is_err());
    }
}
