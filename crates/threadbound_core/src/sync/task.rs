//! Task values queued for the affinity thread.

use std::fmt;

/// Identity of whoever submitted a task.
///
/// Workers use their worker id; the harness uses [`OriginId::HARNESS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OriginId(pub u32);

impl OriginId {
    /// Origin used for work submitted by the harness itself.
    pub const HARNESS: Self = Self(0);
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "origin#{}", self.0)
    }
}

/// One deferred mutation.
///
/// Plain data: the command plus who sent it and when, so ordering can be
/// checked and the stream replayed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task<C> {
    /// Executor-wide submission sequence number.
    pub seq: u64,
    /// Who submitted the task.
    pub origin: OriginId,
    /// What to do.
    pub command: C,
}

/// Journal entry for an executed task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskRecord {
    /// Submission sequence number.
    pub seq: u64,
    /// Who submitted the task.
    pub origin: OriginId,
    /// Whether the model accepted the command.
    pub succeeded: bool,
}
