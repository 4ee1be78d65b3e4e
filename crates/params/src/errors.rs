//! Errors for the RGB++ parameters.

use thiserror::Error;

/// Error while loading or validating parameters.
#[derive(Debug, Error)]
pub enum ParamsError {
    /// The TOML document could not be parsed.
    #[error("invalid params toml: {0}")]
    Toml(#[from] toml::de::Error),

    /// A hex-encoded field is not valid hex or has the wrong length.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The ledger and binding networks do not belong together.
    #[error("ledger network {ledger} cannot be paired with bitcoin network {btc}")]
    NetworkMismatch {
        /// The configured ledger network.
        ledger: String,

        /// The configured bitcoin network.
        btc: String,
    },

    /// A protocol parameter is out of range.
    #[error("invalid protocol parameter: {0}")]
    InvalidParam(&'static str),
}
