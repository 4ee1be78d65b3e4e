//! Fungible token encodings: the xUDT amount and the token-info metadata cell.

use bitcoin::Txid;
use serde::{Deserialize, Serialize};

use crate::{
    capacity::{bytes_to_capacity, occupied_bytes},
    constants::{UDT_AMOUNT_SIZE, UNIQUE_TYPE_ARGS_SIZE},
    context::{unlockable_lock_script, NetworkContext},
    errors::{PrimitiveError, PrimitiveResult},
};

/// Encodes an xUDT amount as cell data.
pub const fn encode_udt_amount(amount: u128) -> [u8; UDT_AMOUNT_SIZE] {
    amount.to_le_bytes()
}

/// Reads the xUDT amount from cell data.
///
/// Only the 16-byte prefix is the amount; xUDT extensions may append more data.
pub fn decode_udt_amount(data: &[u8]) -> PrimitiveResult<u128> {
    data.first_chunk::<UDT_AMOUNT_SIZE>()
        .map(|bytes| u128::from_le_bytes(*bytes))
        .ok_or_else(|| {
            PrimitiveError::MalformedArgs(format!(
                "xUDT data must hold at least {UDT_AMOUNT_SIZE} bytes, got {}",
                data.len()
            ))
        })
}

/// Metadata of a fungible token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Number of decimal places.
    pub decimal: u8,

    /// Display name.
    pub name: String,

    /// Ticker symbol.
    pub symbol: String,
}

impl TokenInfo {
    /// Serializes as `decimal ++ len(name) ++ name ++ len(symbol) ++ symbol`.
    pub fn encode(&self) -> PrimitiveResult<Vec<u8>> {
        let name = short_string(&self.name, "name")?;
        let symbol = short_string(&self.symbol, "symbol")?;

        let mut out = Vec::with_capacity(3 + name.len() + symbol.len());
        out.push(self.decimal);
        out.push(name.len() as u8);
        out.extend_from_slice(name);
        out.push(symbol.len() as u8);
        out.extend_from_slice(symbol);

        Ok(out)
    }

    /// Parses the serialized metadata.
    pub fn decode(data: &[u8]) -> PrimitiveResult<Self> {
        let malformed = || PrimitiveError::MalformedArgs("truncated token info".to_string());

        let (&decimal, rest) = data.split_first().ok_or_else(malformed)?;
        let (name, rest) = read_short(rest).ok_or_else(malformed)?;
        let (symbol, rest) = read_short(rest).ok_or_else(malformed)?;

        if !rest.is_empty() {
            return Err(PrimitiveError::MalformedArgs(
                "trailing bytes after token info".to_string(),
            ));
        }

        Ok(Self {
            decimal,
            name: name.to_string(),
            symbol: symbol.to_string(),
        })
    }

    /// The minimum capacity of the token-info cell.
    ///
    /// The cell sits under a timed-unlock lock that releases to the unlockable lock, with a
    /// unique type script.
    pub fn cell_capacity(&self, ctx: &NetworkContext) -> PrimitiveResult<u64> {
        let lock = ctx.btc_time_lock(
            unlockable_lock_script(),
            ctx.protocol().btc_time_lock_confirmations,
            None::<Txid>,
        )?;
        let type_ = ctx.unique_type(vec![0u8; UNIQUE_TYPE_ARGS_SIZE]);

        Ok(bytes_to_capacity(occupied_bytes(
            &lock,
            Some(&type_),
            self.encode()?.len(),
        )))
    }
}

fn short_string<'a>(value: &'a str, field: &str) -> PrimitiveResult<&'a [u8]> {
    let bytes = value.as_bytes();
    if bytes.len() > u8::MAX as usize {
        return Err(PrimitiveError::MalformedArgs(format!(
            "token {field} is longer than 255 bytes"
        )));
    }

    Ok(bytes)
}

fn read_short(data: &[u8]) -> Option<(&str, &[u8])> {
    let (&len, rest) = data.split_first()?;
    let (value, rest) = rest.split_at_checked(len as usize)?;

    Some((std::str::from_utf8(value).ok()?, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> TokenInfo {
        TokenInfo {
            decimal: 8,
            name: "RGBPP Test Token".to_string(),
            symbol: "RTT".to_string(),
        }
    }

    #[test]
    fn token_info_layout() {
        let encoded = info().encode().unwrap();

        assert_eq!(encoded[0], 8);
        assert_eq!(encoded[1] as usize, "RGBPP Test Token".len());
        assert_eq!(&encoded[2..18], b"RGBPP Test Token");
        assert_eq!(encoded[18], 3);
        assert_eq!(&encoded[19..], b"RTT");
        assert_eq!(TokenInfo::decode(&encoded).unwrap(), info());
    }

    #[test]
    fn oversized_name_is_rejected() {
        let mut info = info();
        info.name = "x".repeat(256);

        assert!(info.encode().is_err());
    }

    #[test]
    fn truncated_info_is_rejected() {
        let encoded = info().encode().unwrap();

        assert!(TokenInfo::decode(&encoded[..encoded.len() - 1]).is_err());
        assert!(TokenInfo::decode(&[]).is_err());
    }

    #[test]
    fn info_cell_capacity_counts_time_lock_and_unique_type() {
        let ctx = crate::context::testnet_context();
        let encoded_len = info().encode().unwrap().len();

        // capacity + time lock (33 + 105 args) + unique type (33 + 20 args) + data
        let expected = (8 + 33 + 105 + 33 + 20 + encoded_len) as u64 * 100_000_000;
        assert_eq!(info().cell_capacity(&ctx).unwrap(), expected);
    }

    #[test]
    fn udt_amount_reads_prefix_only() {
        let mut data = encode_udt_amount(2_100_000_000_000_000).to_vec();
        data.extend_from_slice(&[1, 2, 3]);

        assert_eq!(decode_udt_amount(&data).unwrap(), 2_100_000_000_000_000);
        assert!(decode_udt_amount(&data[..15]).is_err());
    }
}
