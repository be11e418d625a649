//! Spent nullifier set

use std::collections::HashSet;

use crate::crypto::Field;

/// Set of nullifiers that have been spent
#[derive(Debug, Clone, Default)]
pub struct NullifierSet {
    spent: HashSet<Field>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `nullifier`; `false` (and no change) when it was already spent
    pub fn try_spend(&mut self, nullifier: Field) -> bool {
        self.spent.insert(nullifier)
    }

    pub fn contains(&self, nullifier: &Field) -> bool {
        self.spent.contains(nullifier)
    }

    /// Spend every nullifier or none. Returns the first conflict, including
    /// a nullifier repeated within `nullifiers`.
    pub fn try_spend_all(&mut self, nullifiers: &[Field]) -> Result<(), Field> {
        let mut batch = HashSet::with_capacity(nullifiers.len());
        for nullifier in nullifiers {
            if self.spent.contains(nullifier) || !batch.insert(*nullifier) {
                return Err(*nullifier);
            }
        }
        self.spent.extend(batch);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_spend_once() {
        let mut set = NullifierSet::new();
        let n = Field::from(77u64);

        assert!(!set.contains(&n));
        assert!(set.try_spend(n));
        assert!(set.contains(&n));
        assert!(!set.try_spend(n));
        assert!(!set.try_spend(n));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_try_spend_all_is_atomic() {
        let mut set = NullifierSet::new();
        let (a, b, c) = (Field::from(1u64), Field::from(2u64), Field::from(3u64));
        set.try_spend(b);

        assert_eq!(set.try_spend_all(&[a, b]), Err(b));
        assert!(!set.contains(&a));

        assert_eq!(set.try_spend_all(&[c, c]), Err(c));
        assert!(!set.contains(&c));

        assert_eq!(set.try_spend_all(&[a, c]), Ok(()));
        assert_eq!(set.len(), 3);
    }
}
