use crate::errors::RingResult;
use crate::ring::Ring;

/// Queue depth used when none is configured.
pub const DEFAULT_QUEUE_DEPTH: u32 = 4;

/// Settings applied when a [`Ring`] is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingConfig {
    /// Submission queue entries, which is also the maximum number of
    /// descriptors outstanding at once.
    pub queue_depth: u32,

    /// Completion queue entries. When `None` the kernel picks twice the
    /// submission queue size.
    pub cq_entries: Option<u32>,

    /// Hint the kernel that a single thread submits requests
    /// (`IORING_SETUP_SINGLE_ISSUER`, Linux 6.0+).
    pub single_issuer: bool,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            cq_entries: None,
            single_issuer: false,
        }
    }
}

/// Builds a [`Ring`] with custom settings.
///
/// ```no_run
/// let ring = ringside::Ring::builder().queue_depth(8).build()?;
/// # Ok::<(), ringside::RingError>(())
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    cfg: RingConfig,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of submission queue entries.
    ///
    /// A depth of zero is passed through and rejected by the kernel when the
    /// ring is built.
    pub fn queue_depth(&mut self, val: u32) -> &mut Self {
        self.cfg.queue_depth = val;
        self
    }

    pub fn cq_entries(&mut self, val: u32) -> &mut Self {
        self.cfg.cq_entries = Some(val);
        self
    }

    pub fn single_issuer(&mut self, val: bool) -> &mut Self {
        self.cfg.single_issuer = val;
        self
    }

    pub fn config(&self) -> RingConfig {
        self.cfg
    }

    /// Opens the configured ring.
    pub fn build(&mut self) -> RingResult<Ring> {
        Ring::open(self.cfg)
    }
}
