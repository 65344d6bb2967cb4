use crate::pipeline::{self, OpenFallback, write_verify};
use crate::ring::Ring;
use crate::sqe::DirFd;
use crate::utils::ScopeGuard;
use anyhow::{Result, bail};
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_PATH: &str = "/tmp/ringside_file_io.txt";
pub const PAYLOAD: &[u8] = b"ringside test payload - io_uring path\n";
pub const QUEUE_DEPTH: u32 = 4;

/// Creates `path` (direct I/O when the filesystem allows it), writes
/// [`PAYLOAD`], reads it back, closes and unlinks the file.
pub fn run(path: &Path, queue_depth: u32) -> Result<String> {
    let mut ring = Ring::new(queue_depth)?;

    // Armed before the open: a failed attempt may already have created the file.
    let _unlink = unlink_on_drop(path);

    let opened = OpenFallback::direct_io().open(
        &mut ring,
        DirFd::Cwd,
        path,
        OFlag::O_CREAT | OFlag::O_RDWR | OFlag::O_TRUNC | OFlag::O_CLOEXEC,
        Mode::from_bits_truncate(0o644),
    )?;
    info!(path = %path.display(), direct = opened.is_direct(), "file opened");

    let round_trip = pipeline::with_handle(&mut ring, opened.handle, |ring, fd| {
        write_verify(ring, fd, PAYLOAD, opened.is_direct())
    })?;
    ring.close();

    if !round_trip.matches(PAYLOAD) {
        bail!(
            "read back {:?} instead of the written payload",
            String::from_utf8_lossy(&round_trip.read_back)
        );
    }

    Ok(format!(
        "[URING] File I/O complete on {}: {}",
        path.display(),
        String::from_utf8_lossy(&round_trip.read_back).trim_end()
    ))
}

/// Removes `path`, returning `false` if it did not exist.
fn unlink(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn unlink_on_drop(path: &Path) -> ScopeGuard<impl FnOnce() + '_> {
    ScopeGuard::new(move || match unlink(path) {
        Ok(true) => debug!(path = %path.display(), "unlinked"),
        Ok(false) => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to unlink"),
    })
}
