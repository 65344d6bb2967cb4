use super::Ring;
use crate::cqe::Completion;
use crate::errors::{RingError, RingResult};
use crate::sqe::Tag;
use tracing::{debug, warn};

impl Ring {
    /// Blocks until a completion is available and returns it.
    ///
    /// Completions parked by an earlier [`Ring::wait_for`] are returned first.
    /// Arrival order says nothing about submission order; use the tag to match
    /// a completion to its request.
    pub fn wait_one(&mut self) -> RingResult<Completion> {
        if let Some(completion) = self.parked.pop_front() {
            return Ok(completion);
        }
        self.reap_next()
    }

    /// Blocks until the completion tagged `tag` is available.
    ///
    /// Completions for other tags observed meanwhile are parked and handed out
    /// by later `wait_one`/`wait_for` calls. Fails with
    /// [`RingError::NothingOutstanding`] on an idle ring and with
    /// [`RingError::UnknownTag`] when other tags are outstanding but not `tag`.
    pub fn wait_for(&mut self, tag: Tag) -> RingResult<Completion> {
        if self.in_flight.is_empty() && self.parked.is_empty() {
            return Err(RingError::NothingOutstanding);
        }

        if let Some(pos) = self.parked.iter().position(|c| c.tag() == tag) {
            if let Some(completion) = self.parked.remove(pos) {
                return Ok(completion);
            }
        }

        if !self.in_flight.contains_tag(tag) {
            return Err(RingError::UnknownTag(tag));
        }

        loop {
            let completion = self.reap_next()?;
            if completion.tag() == tag {
                return Ok(completion);
            }

            debug!(tag = %completion.tag(), waiting_for = %tag, "parking completion");
            self.parked.push_back(completion);
        }
    }

    /// Pops the next kernel completion, waiting for one if the queue is empty.
    pub(super) fn reap_next(&mut self) -> RingResult<Completion> {
        loop {
            if self.in_flight.is_empty() {
                return Err(RingError::NothingOutstanding);
            }

            let next = self.ring.completion().next();
            let Some(cqe) = next else {
                self.ring
                    .submit_and_wait(1)
                    .map_err(RingError::CompletionWait)?;
                continue;
            };

            let key = cqe.user_data();
            let Some(descriptor) = self.in_flight.try_remove(key as usize) else {
                warn!(
                    user_data = key,
                    result = cqe.result(),
                    "completion matches no outstanding descriptor, skipping"
                );
                continue;
            };

            let completion = Completion::new(descriptor, cqe.result(), cqe.flags());
            debug!(
                tag = %completion.tag(),
                kind = %completion.kind(),
                result = completion.result(),
                "reaped completion"
            );
            return Ok(completion);
        }
    }
}
