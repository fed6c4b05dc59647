//! Single-slot holder for the most recently ingested frame.
//!
//! Every producer connection publishes into the same [`LatestFrameCache`] and
//! every HTTP consumer samples it. It is the only mutable state shared between
//! those tasks. A publish replaces the slot wholesale, so readers observe
//! either nothing or one complete frame.
//!
//! Both operations hold a [`Mutex`] for the length of a reference swap or a
//! reference-count clone. No decoding or encoding happens under the lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::frame::Frame;

/// Overwrite-on-write cache of the latest [`Frame`].
///
/// # Examples
///
/// ```
/// use framerelay::{cache::LatestFrameCache, frame::Frame};
///
/// let cache = LatestFrameCache::new();
/// assert!(cache.read_latest().is_none());
///
/// cache.publish(Frame::new(vec![1_u8; 1000]));
/// cache.publish(Frame::new(vec![2_u8; 500]));
/// assert_eq!(cache.read_latest().map(|f| f.len()), Some(500));
/// ```
#[derive(Debug, Default)]
pub struct LatestFrameCache {
    slot: Mutex<Option<Frame>>,
}

impl LatestFrameCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Replace the held frame. The last publish wins.
    pub fn publish(&self, frame: Frame) {
        let previous = self.lock().replace(frame);
        // Drop the superseded frame outside the critical section.
        drop(previous);
    }

    /// Return a snapshot of the latest frame, or `None` if nothing has been
    /// published yet.
    ///
    /// The returned frame shares storage with the cached one but is unaffected
    /// by later publishes.
    #[must_use]
    pub fn read_latest(&self) -> Option<Frame> { self.lock().clone() }

    /// Whether a frame has ever been published.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.lock().is_none() }

    // A poisoned lock cannot hold a torn value: the guarded section is a
    // single `Option` replace or clone.
    fn lock(&self) -> MutexGuard<'_, Option<Frame>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
