use super::run;
use crate::errors::{RingError, RingResult};
use crate::ring::Ring;
use crate::sqe::{Descriptor, DirFd, Handle, OpKind};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use std::path::Path;
use tracing::{debug, warn};

/// Opens a file with a restrictive flag when the kernel accepts it, and
/// without it when the kernel rejects the flag.
#[derive(Debug, Clone, Copy)]
pub struct OpenFallback {
    restrictive: OFlag,
}

/// A handle produced by [`OpenFallback::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opened {
    pub handle: Handle,
    /// Flags of the attempt that succeeded.
    pub flags: OFlag,
    /// Whether the restrictive flag was dropped.
    pub relaxed: bool,
}

impl Opened {
    pub fn is_direct(&self) -> bool {
        self.flags.contains(OFlag::O_DIRECT)
    }
}

impl OpenFallback {
    pub fn new(restrictive: OFlag) -> Self {
        Self { restrictive }
    }

    /// Prefers `O_DIRECT`, which tmpfs and some overlay filesystems reject.
    pub fn direct_io() -> Self {
        Self::new(OFlag::O_DIRECT)
    }

    pub fn restrictive(&self) -> OFlag {
        self.restrictive
    }

    /// Opens `path` with `base` plus the restrictive flag, retrying once
    /// without it if the kernel answers `EINVAL` or `EOPNOTSUPP`.
    ///
    /// Other failures of the first attempt are returned unchanged. When the
    /// retry fails too, both reasons are reported in
    /// [`RingError::FallbackExhausted`].
    pub fn open(
        &self,
        ring: &mut Ring,
        dir: DirFd,
        path: impl AsRef<Path>,
        base: OFlag,
        mode: Mode,
    ) -> RingResult<Opened> {
        let path = path.as_ref();

        let preferred = base | self.restrictive;
        let rejected = match open_with(ring, dir, path, preferred, mode) {
            Ok(handle) => {
                debug!(path = %path.display(), %handle, flags = ?preferred, "opened with preferred flags");
                return Ok(Opened {
                    handle,
                    flags: preferred,
                    relaxed: false,
                });
            }
            Err(RingError::OperationFailure { errno, .. }) if is_flag_rejection(errno) => errno,
            Err(e) => return Err(e),
        };

        let relaxed = base.difference(self.restrictive);
        warn!(
            path = %path.display(),
            dropped = ?self.restrictive,
            reason = rejected.desc(),
            "kernel rejected preferred open flags, retrying without them"
        );

        match open_with(ring, dir, path, relaxed, mode) {
            Ok(handle) => Ok(Opened {
                handle,
                flags: relaxed,
                relaxed: true,
            }),
            Err(RingError::OperationFailure { errno, .. }) => Err(RingError::FallbackExhausted {
                kind: OpKind::OpenAt,
                preferred: rejected,
                relaxed: errno,
            }),
            Err(e) => Err(e),
        }
    }
}

fn is_flag_rejection(errno: Errno) -> bool {
    matches!(errno, Errno::EINVAL | Errno::EOPNOTSUPP)
}

fn open_with(ring: &mut Ring, dir: DirFd, path: &Path, flags: OFlag, mode: Mode) -> RingResult<Handle> {
    let tag = ring.next_tag();
    let completion = run(ring, Descriptor::openat(tag, dir, path, flags, mode)?)?;
    Ok(Handle::from_raw(completion.result()))
}
