use super::Ring;
use crate::errors::{RingError, RingResult};
use crate::sqe::{Descriptor, Tag};
use tracing::debug;

impl Ring {
    /// Places `descriptor` in the submission queue and notifies the kernel.
    ///
    /// On success the descriptor is owned by the ring until its completion is
    /// reaped. A full ring hands the descriptor back inside
    /// [`RingError::SubmissionQueueExhausted`] so the caller can reap and
    /// retry.
    pub fn submit(&mut self, mut descriptor: Descriptor) -> RingResult<Tag> {
        let tag = descriptor.tag();
        let kind = descriptor.kind();

        if self.in_flight.contains_tag(tag) || self.parked.iter().any(|c| c.tag() == tag) {
            return Err(RingError::DuplicateTag(tag));
        }

        let outstanding = self.in_flight.len();
        let Some(slot) = self.in_flight.reserve_entry() else {
            return Err(RingError::SubmissionQueueExhausted {
                descriptor: Box::new(descriptor),
                outstanding,
            });
        };

        let key = slot.key();
        let entry = descriptor.to_entry(key as u64);

        // SAFETY: every pointer in `entry` targets heap memory owned by
        // `descriptor`, which is committed to the in-flight slab below and
        // stays there until its completion is reaped.
        if unsafe { self.ring.submission().push(&entry) }.is_err() {
            return Err(RingError::SubmissionQueueExhausted {
                descriptor: Box::new(descriptor),
                outstanding,
            });
        }

        slot.commit(descriptor);

        // From here the kernel may own the entry, so the descriptor stays in
        // flight even if notifying the kernel fails.
        let submitted = self.ring.submit().map_err(RingError::Submission)?;

        debug!(%tag, %kind, key, submitted, "submitted descriptor");
        Ok(tag)
    }
}
