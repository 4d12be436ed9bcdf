use ethereum_types::H256;
use once_cell::sync::Lazy;
use sha2::{Digest as _, Sha256};

/// Depth of the deepest tree [`merkleize`] is expected to handle.
pub const MAX_DEPTH: usize = 40;

/// `ZERO_HASHES[depth]` is the root of a perfect binary tree of height `depth` with zero leaves.
pub static ZERO_HASHES: Lazy<[H256; MAX_DEPTH + 1]> = Lazy::new(|| {
    let mut zero_hashes = [H256::zero(); MAX_DEPTH + 1];

    for depth in 1..=MAX_DEPTH {
        let lower = zero_hashes[depth - 1];
        zero_hashes[depth] = hash_256_256(lower, lower);
    }

    zero_hashes
});

#[inline]
#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    let digest = Sha256::new()
        .chain_update(left.as_bytes())
        .chain_update(right.as_bytes())
        .finalize();

    H256::from_slice(digest.as_slice())
}

/// Computes the root of a binary tree with `chunks` as leaves, padded with zero chunks up to the
/// next power of 2.
///
/// Padding is never materialized. Whenever a layer has an odd number of nodes, the missing
/// sibling is taken from [`ZERO_HASHES`].
#[must_use]
pub fn merkleize(chunks: &[H256]) -> H256 {
    let Some(first) = chunks.first() else {
        return ZERO_HASHES[0];
    };

    if chunks.len() == 1 {
        return *first;
    }

    let mut layer = chunks.to_vec();
    let mut depth = 0;

    while layer.len() > 1 {
        if layer.len() % 2 == 1 {
            layer.push(ZERO_HASHES[depth]);
        }

        layer = layer
            .chunks_exact(2)
            .map(|pair| hash_256_256(pair[0], pair[1]))
            .collect();

        depth += 1;
    }

    layer[0]
}

/// Splits `bytes` into 32 byte chunks (zero padding the last one) and merkleizes them.
#[must_use]
pub fn merkleize_bytes(bytes: &[u8]) -> H256 {
    let chunks = bytes
        .chunks(H256::len_bytes())
        .map(|chunk| {
            let mut padded = H256::zero();
            padded[..chunk.len()].copy_from_slice(chunk);
            padded
        })
        .collect::<Vec<_>>();

    merkleize(&chunks)
}

#[must_use]
pub fn mix_in_length(root: H256, length: usize) -> H256 {
    let mut length_chunk = H256::zero();
    length_chunk[..size_of::<u64>()].copy_from_slice(&(length as u64).to_le_bytes());
    hash_256_256(root, length_chunk)
}
