//! The ring-based programs behind the binaries.
//!
//! Each `run` opens its own ring, performs its pipeline and returns the lines
//! to print on success.

pub mod file_io;
pub mod net_connect;
pub mod openat;
