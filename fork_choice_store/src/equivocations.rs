use im::OrdSet;
use types::primitives::ValidatorIndex;

/// Validators proven to have equivocated. Their votes are excluded from fork choice.
///
/// The set only grows.
#[derive(Clone, Default, Debug)]
pub struct EquivocatingIndices(OrdSet<ValidatorIndex>);

impl EquivocatingIndices {
    /// Adds `indices` and returns the ones that were not already present.
    pub fn insert_all(
        &mut self,
        indices: impl IntoIterator<Item = ValidatorIndex>,
    ) -> Vec<ValidatorIndex> {
        indices
            .into_iter()
            .filter(|index| self.0.insert(*index).is_none())
            .collect()
    }

    #[must_use]
    pub fn contains(&self, index: ValidatorIndex) -> bool {
        self.0.contains(&index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ValidatorIndex> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_is_idempotent() {
        let mut equivocating_indices = EquivocatingIndices::default();

        assert_eq!(equivocating_indices.insert_all([3, 1, 3]), [3, 1]);
        assert_eq!(equivocating_indices.insert_all([1, 2]), [2]);
        assert!(equivocating_indices.insert_all([1, 2, 3]).is_empty());

        assert_eq!(equivocating_indices.len(), 3);
        assert!(equivocating_indices.contains(2));
        assert!(!equivocating_indices.contains(4));
        assert_eq!(equivocating_indices.iter().collect::<Vec<_>>(), [1, 2, 3]);
    }
}
