//! Read lock strength for read-then-write sequences

/// Lock strength requested for a read that precedes a dependent write.
///
/// The level only annotates the read; taking the lock (and releasing it) is
/// the job of the backend inside a caller-managed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LockLevel {
    /// Plain read
    #[default]
    None,
    /// Shared lock: other readers allowed, writers wait
    Shared,
    /// Exclusive lock: everyone else waits
    Exclusive,
}

impl core::fmt::Display for LockLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            LockLevel::None => "none",
            LockLevel::Shared => "shared",
            LockLevel::Exclusive => "exclusive",
        })
    }
}
