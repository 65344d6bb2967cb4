//! The same work done with plain blocking syscalls.
//!
//! Ring-based results are compared byte for byte against these.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;

/// Creates or truncates `path`, writes `data` and reads the file back from
/// offset 0.
pub fn write_then_read(path: impl AsRef<Path>, data: &[u8]) -> io::Result<Vec<u8>> {
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .read(true)
        .write(true)
        .open(path)?;

    file.write_all(data)?;
    file.seek(SeekFrom::Start(0))?;

    let mut read_back = Vec::with_capacity(data.len());
    file.read_to_end(&mut read_back)?;
    Ok(read_back)
}

/// Reads at most `len` leading bytes of `path`.
pub fn read_prefix(path: impl AsRef<Path>, len: usize) -> io::Result<Vec<u8>> {
    let file = fs::File::open(path)?;

    let mut prefix = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut prefix)?;
    Ok(prefix)
}

/// Connects to `addr`, sends `request` and returns what a single receive of at
/// most `capacity` bytes yields.
pub fn connect_exchange(addr: SocketAddr, request: &[u8], capacity: usize) -> io::Result<Vec<u8>> {
    let mut stream = TcpStream::connect(addr)?;
    stream.write_all(request)?;

    let mut response = vec![0u8; capacity];
    let n = stream.read(&mut response)?;
    response.truncate(n);
    Ok(response)
}
