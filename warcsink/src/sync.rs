//! Deciding when to flush written records to stable storage.

/// Decides whether the current file should be synced after a record is written.
///
/// Syncing never rotates the file. The writer resets the policy after every sync and whenever it
/// starts a new file.
pub trait SyncPolicy: Send {
    fn mark(&mut self, offset: u64) -> bool;
    fn reset(&mut self);
}

/// Syncs after every `count` records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountSyncPolicy {
    count: u64,
    executed: u64,
}

impl CountSyncPolicy {
    /// A `count` of zero is treated as one: sync after every record.
    pub fn new(count: u64) -> Self {
        CountSyncPolicy {
            count: count.max(1),
            executed: 0,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Sync every 1000 records.
impl Default for CountSyncPolicy {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl SyncPolicy for CountSyncPolicy {
    fn mark(&mut self, _offset: u64) -> bool {
        self.executed += 1;
        self.executed >= self.count
    }

    fn reset(&mut self) {
        self.executed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{CountSyncPolicy, SyncPolicy};

    #[test]
    fn syncs_every_n_records() {
        let mut policy = CountSyncPolicy::new(3);
        assert!(!policy.mark(10));
        assert!(!policy.mark(20));
        assert!(policy.mark(30));
        policy.reset();
        assert!(!policy.mark(40));

        let mut every = CountSyncPolicy::new(0);
        assert_eq!(every.count(), 1);
        assert!(every.mark(0));
    }
}
