//! Deterministic stand-ins for BLS signatures.
//!
//! A signature is derived from the signing root and the public keys of the signers, so aggregate
//! signatures can be produced without secret keys. This is enough to exercise every code path
//! that handles invalid signatures. It provides no security.

use hashing::hash_256_256;
use types::{
    primitives::{PublicKeyBytes, SignatureBytes, H256},
    traits::SszHash,
};

#[must_use]
pub fn signing_root(value: &(impl SszHash + ?Sized)) -> H256 {
    value.hash_tree_root()
}

#[must_use]
pub fn aggregate_signature(public_keys: &[PublicKeyBytes], message: H256) -> SignatureBytes {
    let keys_root = public_keys.hash_tree_root();
    let first = hash_256_256(keys_root, message);
    let second = hash_256_256(first, message);
    let third = hash_256_256(first, keys_root);

    let mut signature = SignatureBytes::zero();

    for (chunk, part) in signature
        .as_bytes_mut()
        .chunks_exact_mut(H256::len_bytes())
        .zip([first, second, third])
    {
        chunk.copy_from_slice(part.as_bytes());
    }

    signature
}

#[must_use]
pub fn sign(value: &(impl SszHash + ?Sized), public_keys: &[PublicKeyBytes]) -> SignatureBytes {
    aggregate_signature(public_keys, signing_root(value))
}
