use crate::sqe::{Descriptor, OpKind, Tag};
use nix::errno::Errno;
use std::io;

pub type RingResult<T> = Result<T, RingError>;

/// A centralized error type for ring setup, submission and completion.
#[derive(thiserror::Error, Debug)]
pub enum RingError {
    /// The kernel could not allocate the shared queues (resource limits,
    /// invalid queue depth, io_uring disabled).
    #[error("failed to set up io_uring: {0}")]
    Initialization(#[source] io::Error),

    /// A field required by the operation kind is missing or unusable.
    #[error("invalid {kind} descriptor: {reason}")]
    InvalidDescriptor { kind: OpKind, reason: &'static str },

    #[error("tag {0} is already outstanding on this ring")]
    DuplicateTag(Tag),

    /// The ring has no free slot. This is a recoverable state: reap
    /// completions, then resubmit the descriptor carried by this error.
    #[error("submission queue is full ({outstanding} outstanding), reap completions first")]
    SubmissionQueueExhausted {
        descriptor: Box<Descriptor>,
        outstanding: usize,
    },

    #[error("kernel rejected submission: {0}")]
    Submission(#[source] io::Error),

    #[error("waiting for completion failed: {0}")]
    CompletionWait(#[source] io::Error),

    #[error("no descriptors are outstanding")]
    NothingOutstanding,

    #[error("tag {0} is not outstanding")]
    UnknownTag(Tag),

    /// A completion carried a negative result.
    #[error("{kind} (tag {tag}) failed: {}", .errno.desc())]
    OperationFailure { kind: OpKind, tag: Tag, errno: Errno },

    #[error(
        "{kind} rejected with preferred flags ({}) and relaxed flags ({})",
        .preferred.desc(),
        .relaxed.desc()
    )]
    FallbackExhausted {
        kind: OpKind,
        preferred: Errno,
        relaxed: Errno,
    },
}

impl RingError {
    /// Kind label shown to users next to the reason string.
    pub fn label(&self) -> &'static str {
        match self {
            RingError::Initialization(_) => "InitializationError",
            RingError::InvalidDescriptor { .. } => "InvalidDescriptor",
            RingError::DuplicateTag(_) => "DuplicateTag",
            RingError::SubmissionQueueExhausted { .. } => "SubmissionQueueExhausted",
            RingError::Submission(_) => "SubmissionFailure",
            RingError::CompletionWait(_) => "CompletionWaitFailure",
            RingError::NothingOutstanding => "NothingOutstanding",
            RingError::UnknownTag(_) => "UnknownTag",
            RingError::OperationFailure { .. } => "OperationFailure",
            RingError::FallbackExhausted { .. } => "FallbackExhausted",
        }
    }

    /// The kernel error behind this failure, if any.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            RingError::Initialization(e) | RingError::Submission(e) | RingError::CompletionWait(e) => {
                e.raw_os_error().map(Errno::from_raw)
            }
            RingError::OperationFailure { errno, .. } => Some(*errno),
            RingError::FallbackExhausted { relaxed, .. } => Some(*relaxed),
            _ => None,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, RingError::SubmissionQueueExhausted { .. })
    }

    /// Fatal errors leave the session unusable; the process should release its
    /// handles and the ring, then exit non-zero.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RingError::Initialization(_)
                | RingError::Submission(_)
                | RingError::CompletionWait(_)
                | RingError::FallbackExhausted { .. }
        )
    }

    pub fn is_operation_failure(&self) -> bool {
        matches!(self, RingError::OperationFailure { .. })
    }

    /// Hands back the descriptor rejected by a full submission queue.
    pub fn into_descriptor(self) -> Option<Descriptor> {
        match self {
            RingError::SubmissionQueueExhausted { descriptor, .. } => Some(*descriptor),
            _ => None,
        }
    }
}
