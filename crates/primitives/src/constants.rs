//! Sizes and tags fixed by the RGB++ scripts and the ledger's serialization.
//!
//! Changing any of these changes what the on-chain scripts accept.

/// Size of the capacity field of every cell.
pub const CELL_CAPACITY_SIZE: usize = 8;

/// Size of a script without its args: the code hash plus the hash type byte.
pub const SCRIPT_FIXED_SIZE: usize = 32 + 1;

/// Size of a binding-chain transaction id.
pub const TXID_SIZE: usize = 32;

/// Size of the serialized seal reference: a 4-byte index plus the transaction id.
pub const RGBPP_LOCK_ARGS_SIZE: usize = 4 + TXID_SIZE;

/// Size of the amount prefix of UDT cell data.
pub const UDT_AMOUNT_SIZE: usize = 16;

/// Size of the unique type args (a truncated type id).
pub const UNIQUE_TYPE_ARGS_SIZE: usize = 20;

/// Size of a full type id.
pub const TYPE_ID_SIZE: usize = 32;

/// Domain separation tag hashed before every commitment.
pub const COMMITMENT_PREFIX: &[u8] = b"RGB++";

/// Version of the commitment layout.
pub const COMMITMENT_VERSION: [u8; 2] = [0, 0];

/// Version of the seal unlock witness.
pub const RGBPP_UNLOCK_VERSION: u16 = 0;

/// The commitment counts inputs and outputs in a single byte each.
pub const MAX_COMMITTED_CELLS: usize = u8::MAX as usize;
