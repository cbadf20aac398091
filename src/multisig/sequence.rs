//! Proposal sequence counter.

use serde::{Deserialize, Serialize};

use crate::multisig::error::{MultisigError, MultisigResult};

/// Strictly increasing proposal sequence.
///
/// The first assigned sequence is 1. Values are never reused or handed out
/// twice. Reaching `u64::MAX` is fatal for the multisig and reported as
/// [`MultisigError::SequenceExhausted`] instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCounter {
    next: u64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Sequence the next call to [`SequenceCounter::next`] will return.
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Take the next sequence and advance the counter.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> MultisigResult<u64> {
        let assigned = self.next;
        self.next = assigned
            .checked_add(1)
            .ok_or(MultisigError::SequenceExhausted)?;
        Ok(assigned)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_one() {
        let mut counter = SequenceCounter::new();
        assert_eq!(counter.peek(), 1);
        assert_eq!(counter.next().unwrap(), 1);
        assert_eq!(counter.next().unwrap(), 2);
        assert_eq!(counter.peek(), 3);
    }

    #[test]
    fn test_exhaustion_does_not_wrap() {
        let mut counter = SequenceCounter { next: u64::MAX };
        assert_eq!(counter.next(), Err(MultisigError::SequenceExhausted));
        // Failed call leaves the counter untouched
        assert_eq!(counter.peek(), u64::MAX);
    }
}
