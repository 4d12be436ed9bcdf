use hashing::ZERO_HASHES;

use crate::primitives::{PublicKeyBytes, SignatureBytes, H256};

/// Structural hashing in the style of SSZ merkleization.
///
/// Basic values are packed into a single 32 byte chunk, byte vectors are split into chunks,
/// containers are merkleized over the roots of their fields and lists additionally mix in their
/// length. Lists are not packed and have no limit, so roots differ from real SSZ roots.
pub trait SszHash {
    fn hash_tree_root(&self) -> H256;
}

impl SszHash for u64 {
    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk[..size_of::<Self>()].copy_from_slice(&self.to_le_bytes());
        chunk
    }
}

impl SszHash for bool {
    fn hash_tree_root(&self) -> H256 {
        u64::from(*self).hash_tree_root()
    }
}

impl SszHash for H256 {
    fn hash_tree_root(&self) -> H256 {
        *self
    }
}

impl SszHash for PublicKeyBytes {
    fn hash_tree_root(&self) -> H256 {
        hashing::merkleize_bytes(self.as_bytes())
    }
}

impl SszHash for SignatureBytes {
    fn hash_tree_root(&self) -> H256 {
        hashing::merkleize_bytes(self.as_bytes())
    }
}

impl<T: SszHash> SszHash for [T] {
    fn hash_tree_root(&self) -> H256 {
        list_root(self.iter(), self.len())
    }
}

impl<T: SszHash> SszHash for Vec<T> {
    fn hash_tree_root(&self) -> H256 {
        self.as_slice().hash_tree_root()
    }
}

pub fn container_root(field_roots: &[H256]) -> H256 {
    hashing::merkleize(field_roots)
}

pub fn list_root<'elements, T: SszHash + 'elements>(
    elements: impl IntoIterator<Item = &'elements T>,
    length: usize,
) -> H256 {
    let roots = elements
        .into_iter()
        .map(SszHash::hash_tree_root)
        .collect::<Vec<_>>();

    let root = if roots.is_empty() {
        ZERO_HASHES[0]
    } else {
        hashing::merkleize(&roots)
    };

    hashing::mix_in_length(root, length)
}
