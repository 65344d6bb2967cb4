use crate::sqe::{Descriptor, Tag};
use slab::{Slab, VacantEntry};

/// Descriptors the kernel may still be reading from or writing into, keyed by
/// the `user_data` value placed in their submission entry.
///
/// Insertion follows a reserve/commit pattern: a slot is only occupied once the
/// entry has been pushed to the submission queue.
#[derive(Debug)]
pub(crate) struct InFlightSlab {
    slab: Slab<Descriptor>,
    limit: usize,
}

impl InFlightSlab {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            slab: Slab::with_capacity(limit),
            limit,
        }
    }

    /// Reserves a slot, or `None` when `limit` descriptors are in flight.
    pub(crate) fn reserve_entry(&mut self) -> Option<SlabReservedEntry<'_>> {
        if self.slab.len() >= self.limit {
            return None;
        }

        Some(SlabReservedEntry {
            entry: self.slab.vacant_entry(),
        })
    }

    pub(crate) fn try_remove(&mut self, key: usize) -> Option<Descriptor> {
        self.slab.try_remove(key)
    }

    pub(crate) fn contains_tag(&self, tag: Tag) -> bool {
        self.slab.iter().any(|(_, d)| d.tag() == tag)
    }

    pub(crate) fn len(&self) -> usize {
        self.slab.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    /// Forgets every in-flight descriptor without freeing its memory.
    ///
    /// Used when completions can no longer be reaped: the kernel may still
    /// write into these buffers, so they must never be reused.
    pub(crate) fn leak(&mut self) -> usize {
        let leaked = std::mem::take(&mut self.slab);
        let n = leaked.len();
        std::mem::forget(leaked);
        n
    }
}

/// A vacant slot whose key is known before the descriptor is stored.
pub(crate) struct SlabReservedEntry<'a> {
    entry: VacantEntry<'a, Descriptor>,
}

impl SlabReservedEntry<'_> {
    pub(crate) fn key(&self) -> usize {
        self.entry.key()
    }

    pub(crate) fn commit(self, descriptor: Descriptor) {
        self.entry.insert(descriptor);
    }
}
