//! Signing ledger inputs locked by the secp256k1/blake160 lock.

use ckb_hash::{blake2b_256, new_blake2b};
use rgbpp_primitives::{
    packed::{witness_args_placeholder, witness_args_with_lock},
    params::tx::SECP256K1_WITNESS_LOCK_SIZE,
    types::{VirtualTransaction, Witness},
};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

use crate::errors::{FinalizeError, FinalizeResult};

/// Produces recoverable signatures for one secp256k1/blake160 lock.
pub trait LedgerSigner {
    /// The blake160 hash of the public key, which is the lock args.
    fn pubkey_hash(&self) -> [u8; 20];

    /// Signs a 32-byte message, returning the compact signature followed by the recovery id.
    fn sign_recoverable(&self, message: &[u8; 32]) -> FinalizeResult<[u8; SECP256K1_WITNESS_LOCK_SIZE]>;
}

/// A [`LedgerSigner`] holding the secret key in memory.
#[derive(Debug, Clone)]
pub struct Secp256k1Signer {
    secp: Secp256k1<secp256k1::All>,

    secret_key: SecretKey,
}

impl Secp256k1Signer {
    /// Creates a signer for `secret_key`.
    pub fn new(secret_key: SecretKey) -> Self {
        Self {
            secp: Secp256k1::new(),
            secret_key,
        }
    }

    /// The public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_secret_key(&self.secp, &self.secret_key)
    }
}

impl LedgerSigner for Secp256k1Signer {
    fn pubkey_hash(&self) -> [u8; 20] {
        let hash = blake2b_256(self.public_key().serialize());

        let mut out = [0u8; 20];
        out.copy_from_slice(&hash[..20]);
        out
    }

    fn sign_recoverable(&self, message: &[u8; 32]) -> FinalizeResult<[u8; SECP256K1_WITNESS_LOCK_SIZE]> {
        let message = Message::from_digest(*message);
        let signature = self.secp.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let recovery_id = u8::try_from(recovery_id.to_i32())
            .map_err(|_| FinalizeError::Signing("recovery id out of range".to_string()))?;

        let mut out = [0u8; SECP256K1_WITNESS_LOCK_SIZE];
        out[..64].copy_from_slice(&compact);
        out[64] = recovery_id;
        Ok(out)
    }
}

/// Computes the sighash-all message for the lock group whose inputs sit at `group`.
///
/// The first witness of the group must already hold a `WitnessArgs` with a zeroed signature
/// lock.
pub fn sighash_all(tx: &VirtualTransaction, group: &[usize]) -> FinalizeResult<[u8; 32]> {
    let (first, rest) = group
        .split_first()
        .ok_or_else(|| FinalizeError::InvalidVirtualTx("empty signing group".to_string()))?;

    let witness = |index: usize| -> FinalizeResult<Vec<u8>> {
        tx.witnesses
            .get(index)
            .map(Witness::to_bytes)
            .ok_or_else(|| FinalizeError::InvalidVirtualTx(format!("no witness at {index}")))
    };

    let mut hasher = new_blake2b();
    hasher.update(tx.tx_hash().as_bytes());

    for index in std::iter::once(first).chain(rest) {
        let bytes = witness(*index)?;
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }

    for index in tx.inputs.len()..tx.witnesses.len() {
        let bytes = witness(index)?;
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }

    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    Ok(out)
}

/// Signs the inputs at `group` with `signer`, writing the signature into the group's first
/// witness.
pub fn sign_group<S: LedgerSigner>(
    tx: &mut VirtualTransaction,
    group: &[usize],
    signer: &S,
) -> FinalizeResult<()> {
    let first = *group
        .first()
        .ok_or_else(|| FinalizeError::InvalidVirtualTx("empty signing group".to_string()))?;

    if tx.witnesses.len() < tx.inputs.len() {
        tx.witnesses.resize(tx.inputs.len(), Witness::Empty);
    }

    tx.witnesses[first] = witness_args_placeholder(SECP256K1_WITNESS_LOCK_SIZE);
    let message = sighash_all(tx, group)?;
    let signature = signer.sign_recoverable(&message)?;
    tx.witnesses[first] = Witness::Bytes(witness_args_with_lock(&signature));

    Ok(())
}
