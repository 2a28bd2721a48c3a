//! Seen-blocks ledger
//!
//! Records which block id an ant observed at each height. An antfarm compares
//! these ledgers across ants to verify that every node converged on the same
//! chain.
//!
//! The ledger is append-only: once a height is recorded its id never changes.
//! Observing a different id at a recorded height is reported as a fork instead
//! of silently replacing the entry.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::client::{BlockHeight, BlockId};

/// Errors raised by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Fork at height {height}: recorded {recorded}, observed {observed}")]
    Fork {
        height: BlockHeight,
        recorded: BlockId,
        observed: BlockId,
    },
}

/// Outcome of a successful [`SeenBlocks::record`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First observation at this height
    Inserted,
    /// Same id was already recorded at this height
    Known,
}

/// Shared, append-only map from height to block id
///
/// Cloning yields another handle to the same ledger.
#[derive(Debug, Clone, Default)]
pub struct SeenBlocks {
    inner: Arc<RwLock<BTreeMap<BlockHeight, BlockId>>>,
}

impl SeenBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the block observed at `height`
    pub fn record(
        &self,
        height: BlockHeight,
        id: impl Into<BlockId>,
    ) -> Result<RecordOutcome, LedgerError> {
        let id = id.into();
        let mut blocks = self.inner.write();
        match blocks.get(&height) {
            Some(recorded) if *recorded == id => Ok(RecordOutcome::Known),
            Some(recorded) => Err(LedgerError::Fork {
                height,
                recorded: recorded.clone(),
                observed: id,
            }),
            None => {
                blocks.insert(height, id);
                Ok(RecordOutcome::Inserted)
            }
        }
    }

    /// Highest recorded height, or zero when nothing has been seen
    pub fn max_height(&self) -> BlockHeight {
        self.inner
            .read()
            .last_key_value()
            .map_or(0, |(height, _)| *height)
    }

    pub fn get(&self, height: BlockHeight) -> Option<BlockId> {
        self.inner.read().get(&height).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Consistent copy of the whole ledger
    pub fn snapshot(&self) -> BTreeMap<BlockHeight, BlockId> {
        self.inner.read().clone()
    }

    /// Lowest height both ledgers recorded with different ids
    ///
    /// Heights only one side has seen are ignored; they are lag, not
    /// divergence.
    pub fn first_divergence(&self, other: &SeenBlocks) -> Option<BlockHeight> {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return None;
        }
        let ours = self.snapshot();
        let theirs = other.snapshot();
        ours.iter()
            .find(|(height, id)| theirs.get(*height).is_some_and(|other_id| other_id != *id))
            .map(|(height, _)| *height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ledger() {
        let blocks = SeenBlocks::new();
        assert!(blocks.is_empty());
        assert_eq!(blocks.max_height(), 0);
        assert_eq!(blocks.get(0), None);
    }

    #[test]
    fn test_max_height_unordered_inserts() {
        let blocks = SeenBlocks::new();
        blocks.record(3, "c").unwrap();
        blocks.record(7, "g").unwrap();
        blocks.record(5, "e").unwrap();
        assert_eq!(blocks.max_height(), 7);
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn test_record_same_id_is_known() {
        let blocks = SeenBlocks::new();
        assert_eq!(blocks.record(1, "a").unwrap(), RecordOutcome::Inserted);
        assert_eq!(blocks.record(1, "a").unwrap(), RecordOutcome::Known);
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_record_conflicting_id_is_fork() {
        let blocks = SeenBlocks::new();
        blocks.record(4, "main").unwrap();

        let err = blocks.record(4, "orphan").unwrap_err();
        assert_eq!(
            err,
            LedgerError::Fork {
                height: 4,
                recorded: "main".into(),
                observed: "orphan".into(),
            }
        );
        // The original entry is untouched
        assert_eq!(blocks.get(4).as_deref(), Some("main"));
    }

    #[test]
    fn test_clones_share_state() {
        let blocks = SeenBlocks::new();
        let writer = blocks.clone();
        writer.record(9, "i").unwrap();
        assert_eq!(blocks.max_height(), 9);
    }

    #[test]
    fn test_first_divergence() {
        let a = SeenBlocks::new();
        let b = SeenBlocks::new();
        for (height, id) in [(1, "a"), (2, "b"), (3, "c")] {
            a.record(height, id).unwrap();
        }
        b.record(1, "a").unwrap();
        b.record(2, "b").unwrap();
        assert_eq!(a.first_divergence(&b), None);

        b.record(3, "x").unwrap();
        assert_eq!(a.first_divergence(&b), Some(3));
        assert_eq!(b.first_divergence(&a), Some(3));
        assert_eq!(a.first_divergence(&a.clone()), None);
    }

    #[test]
    fn test_concurrent_writers_and_reader() {
        let blocks = SeenBlocks::new();
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let blocks = blocks.clone();
                std::thread::spawn(move || {
                    for h in 0..250u64 {
                        let height = t * 250 + h + 1;
                        blocks.record(height, format!("{height:064x}")).unwrap();
                        // Reader never sees a height above what was written
                        assert!(blocks.max_height() <= 1000);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(blocks.len(), 1000);
        assert_eq!(blocks.max_height(), 1000);
    }
}
