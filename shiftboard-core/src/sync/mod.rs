//! Mirroring one partition of a collection from the remote store or the
//! local cache.

mod controller;

pub use controller::{Origin, SyncController, View};

/// Where mutations go and snapshots come from. Chosen once, at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Local cache only; mutations apply immediately.
    Local,
    /// Remote store; the mirror only changes when a snapshot arrives.
    Remote,
}
