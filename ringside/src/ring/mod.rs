use crate::config::{Builder, RingConfig};
use crate::cqe::Completion;
use crate::errors::{RingError, RingResult};
use crate::sqe::Tag;
use io_uring::IoUring;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

mod reap;
mod slab;
mod submit;

use slab::InFlightSlab;

/// One io_uring instance and the descriptors currently outstanding on it.
///
/// The ring is exclusively owned by the session that opened it. Every
/// submitting or reaping operation takes `&mut self`. Closing consumes the ring;
/// dropping it performs the same teardown, so the kernel queues are released
/// exactly once on every exit path.
pub struct Ring {
    ring: IoUring,
    in_flight: InFlightSlab,

    // Completions reaped while waiting for another tag.
    parked: VecDeque<Completion>,

    next_tag: u64,
    config: RingConfig,
    closed: bool,
}

impl Ring {
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Opens a ring with `queue_depth` submission entries and default settings.
    pub fn new(queue_depth: u32) -> RingResult<Self> {
        Self::builder().queue_depth(queue_depth).build()
    }

    pub fn open(config: RingConfig) -> RingResult<Self> {
        let mut builder = IoUring::builder();
        if let Some(entries) = config.cq_entries {
            builder.setup_cqsize(entries);
        }
        if config.single_issuer {
            builder.setup_single_issuer();
        }

        let ring = builder
            .build(config.queue_depth)
            .map_err(RingError::Initialization)?;

        let params = ring.params();
        if !params.is_feature_nodrop() {
            warn!(
                "IORING_FEAT_NODROP is not supported by this kernel, completions are dropped when the completion queue is full"
            );
        }

        info!(
            queue_depth = config.queue_depth,
            sq_entries = params.sq_entries(),
            cq_entries = params.cq_entries(),
            "ring opened"
        );

        Ok(Self {
            ring,
            in_flight: InFlightSlab::new(config.queue_depth as usize),
            parked: VecDeque::new(),
            next_tag: 1,
            config,
            closed: false,
        })
    }

    pub fn config(&self) -> RingConfig {
        self.config
    }

    pub fn queue_depth(&self) -> u32 {
        self.config.queue_depth
    }

    /// Descriptors submitted but not yet returned to the caller, including
    /// completions parked by [`Ring::wait_for`].
    pub fn outstanding(&self) -> usize {
        self.in_flight.len() + self.parked.len()
    }

    /// Hands out increasing tags starting at 1.
    ///
    /// Callers mixing allocated and hand-picked tags are responsible for
    /// keeping them apart.
    pub fn next_tag(&mut self) -> Tag {
        let tag = Tag::new(self.next_tag);
        self.next_tag += 1;
        tag
    }

    /// Drains outstanding descriptors and releases the kernel queues.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if !self.in_flight.is_empty() {
            warn!(
                in_flight = self.in_flight.len(),
                "closing ring with outstanding descriptors, draining"
            );
        }

        while !self.in_flight.is_empty() {
            match self.reap_next() {
                Ok(completion) => debug!(
                    tag = %completion.tag(),
                    kind = %completion.kind(),
                    result = completion.result(),
                    "discarded completion"
                ),
                Err(e) => {
                    // The kernel may still touch these buffers after the ring
                    // is gone, so they are never freed.
                    let leaked = self.in_flight.leak();
                    warn!(error = %e, leaked, "failed to drain ring, leaking in-flight descriptors");
                    break;
                }
            }
        }

        if !self.parked.is_empty() {
            warn!(parked = self.parked.len(), "discarding unclaimed completions");
            self.parked.clear();
        }

        info!(queue_depth = self.config.queue_depth, "ring closed");
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Ring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ring")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight.len())
            .field("parked", &self.parked.len())
            .finish()
    }
}
