use crate::config::DEFAULT_QUEUE_DEPTH;
use crate::ring::Ring;
use anyhow::Result;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;
use tempfile::NamedTempFile;

pub(crate) fn init_ring(queue_depth: Option<u32>) -> Result<Ring> {
    Ok(Ring::new(queue_depth.unwrap_or(DEFAULT_QUEUE_DEPTH))?)
}

/// Named scratch file holding `bytes`, removed when dropped.
pub(crate) fn tmp_file_with(bytes: &[u8]) -> Result<NamedTempFile> {
    let mut tmp = NamedTempFile::new()?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    Ok(tmp)
}

/// A loopback address nothing listens on.
pub(crate) fn closed_port() -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?)
}

/// Accepts one connection, reads a request up to the blank line, answers with
/// `response` and returns the request bytes through the join handle.
pub(crate) fn one_shot_responder(
    response: &'static [u8],
) -> Result<(SocketAddr, JoinHandle<io::Result<Vec<u8>>>)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept()?;
        answer(&mut stream, response)
    });

    Ok((addr, handle))
}

/// Like [`one_shot_responder`], then waits up to five seconds for the client
/// to close its end. The join handle yields whether end-of-stream was seen.
pub(crate) fn hangup_responder(
    response: &'static [u8],
) -> Result<(SocketAddr, JoinHandle<io::Result<bool>>)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept()?;
        answer(&mut stream, response)?;

        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        let mut rest = [0u8; 16];
        match stream.read(&mut rest) {
            Ok(0) => Ok(true),
            Ok(_) => Ok(false),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    });

    Ok((addr, handle))
}

fn answer(stream: &mut TcpStream, response: &[u8]) -> io::Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 256];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..n]);
    }

    stream.write_all(response)?;
    Ok(request)
}
