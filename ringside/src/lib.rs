//! Kernel I/O requests issued through a Linux `io_uring` instance.
//!
//! A [`Ring`] owns the shared submission and completion queues. Requests are
//! described by a [`Descriptor`], which owns every buffer and path the kernel
//! touches, and come back as a [`Completion`] matched to its request by
//! [`Tag`]. The [`pipeline`] module chains dependent requests (open, read,
//! close) and retries opens the kernel rejects; [`reference`] performs the
//! same work with plain blocking syscalls.
//!
//! ```no_run
//! use ringside::{Descriptor, Handle, IoBuf, Ring, Tag};
//! use std::os::fd::AsFd;
//!
//! # fn main() -> anyhow::Result<()> {
//! let file = std::fs::File::open("/etc/passwd")?;
//! let mut ring = Ring::new(4)?;
//!
//! let tag = ring.submit(Descriptor::read(
//!     Tag::new(1),
//!     Handle::from(file.as_fd()),
//!     IoBuf::with_capacity(64),
//!     0,
//! )?)?;
//! let completion = ring.wait_for(tag)?.check()?;
//! println!("read {} bytes", completion.result());
//!
//! ring.close();
//! # Ok(())
//! # }
//! ```

mod buf;
pub use buf::IoBuf;

mod config;
pub use config::{Builder, DEFAULT_QUEUE_DEPTH, RingConfig};

mod cqe;
pub use cqe::Completion;

mod errors;
pub use errors::{RingError, RingResult};

mod ring;
pub use ring::Ring;

mod sqe;
pub use sqe::{Descriptor, DescriptorBuilder, DirFd, Handle, Op, OpKind, SockAddrC, Tag};

pub mod cli;
pub mod pipeline;
pub mod programs;
pub mod reference;

pub(crate) mod utils;
pub use utils::CompletionFlags;

#[cfg(test)]
pub(crate) mod test_utils;
