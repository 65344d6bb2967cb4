//! Sequences of dependent operations.
//!
//! Each stage is submitted only after the completion it depends on has been
//! observed, and values such as a freshly opened [`Handle`] flow to the next
//! stage explicitly.

use crate::cqe::Completion;
use crate::errors::RingResult;
use crate::ring::Ring;
use crate::sqe::{Descriptor, Handle};
use tracing::{debug, warn};

pub mod fallback;
pub use fallback::{OpenFallback, Opened};

pub mod file;
pub use file::{FileRead, RoundTrip, open_read_close, write_verify};

pub mod net;
pub use net::{
    HTTP_REQUEST, NetworkOutcome, RECV_CAPACITY, connect_send_recv, exchange, tcp_socket,
};

/// Submits `descriptor`, waits for its own completion and fails on a negative
/// result.
pub fn run(ring: &mut Ring, descriptor: Descriptor) -> RingResult<Completion> {
    let tag = ring.submit(descriptor)?;
    ring.wait_for(tag)?.check()
}

/// Issues a CLOSE for `handle` through the ring.
pub fn close(ring: &mut Ring, handle: Handle) -> RingResult<()> {
    let tag = ring.next_tag();
    run(ring, Descriptor::close(tag, handle)?)?;
    debug!(%handle, "closed handle");
    Ok(())
}

/// Runs `f` with `handle`, then closes the handle whether `f` succeeded or not.
///
/// An error from `f` takes precedence over an error from the close.
pub fn with_handle<T, F>(ring: &mut Ring, handle: Handle, f: F) -> RingResult<T>
where
    F: FnOnce(&mut Ring, Handle) -> RingResult<T>,
{
    let result = f(ring, handle);
    let closed = close(ring, handle);

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!(%handle, error = %close_err, "failed to close handle after an earlier failure");
            Err(e)
        }
    }
}
