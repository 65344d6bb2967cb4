use super::{run, with_handle};
use crate::buf::IoBuf;
use crate::errors::RingResult;
use crate::ring::Ring;
use crate::sqe::{Descriptor, Handle};
use nix::errno::Errno;
use nix::sys::socket::{AddressFamily, SockFlag, SockType, socket};
use std::net::SocketAddr;
use std::os::fd::{IntoRawFd, OwnedFd};
use tracing::{debug, info};

/// Minimal request sent once connected.
pub const HTTP_REQUEST: &[u8] = b"GET / HTTP/1.0\r\n\r\n";

/// Bytes requested by the single RECV.
pub const RECV_CAPACITY: usize = 127;

/// Terminal state of the CONNECT → SEND → RECV chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkOutcome {
    /// CONNECT completed with a negative result. An expected outcome, not a
    /// failure of the pipeline.
    Unreachable { errno: Errno },

    Exchanged { sent: usize, response: Vec<u8> },
}

impl NetworkOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, NetworkOutcome::Exchanged { .. })
    }
}

/// Creates a blocking TCP socket for `addr`'s address family.
///
/// The socket stays blocking: io_uring performs the CONNECT asynchronously on
/// its own, while a non-blocking socket would complete with `EINPROGRESS`.
pub fn tcp_socket(addr: &SocketAddr) -> nix::Result<OwnedFd> {
    let family = match addr {
        SocketAddr::V4(_) => AddressFamily::Inet,
        SocketAddr::V6(_) => AddressFamily::Inet6,
    };
    socket(family, SockType::Stream, SockFlag::SOCK_CLOEXEC, None)
}

/// Connects `socket` to `addr`, sends `request` and receives at most
/// `recv_capacity` bytes of the answer.
///
/// A failed CONNECT ends the chain with [`NetworkOutcome::Unreachable`]. A
/// failed SEND or RECV is returned as an error.
pub fn connect_send_recv(
    ring: &mut Ring,
    socket: Handle,
    addr: SocketAddr,
    request: &[u8],
    recv_capacity: usize,
) -> RingResult<NetworkOutcome> {
    let tag = ring.next_tag();
    ring.submit(Descriptor::connect(tag, socket, addr)?)?;

    let connected = ring.wait_for(tag)?;
    if let Some(errno) = connected.errno() {
        info!(%addr, reason = errno.desc(), "connect failed");
        return Ok(NetworkOutcome::Unreachable { errno });
    }
    debug!(%addr, %socket, "connected");

    let tag = ring.next_tag();
    let sent = run(ring, Descriptor::send(tag, socket, request)?)?.result() as usize;

    let tag = ring.next_tag();
    let received = run(
        ring,
        Descriptor::recv(tag, socket, IoBuf::with_capacity(recv_capacity))?,
    )?;
    let response = received.into_buf().unwrap_or_default().to_vec();
    debug!(%addr, sent, received = response.len(), "exchange done");

    Ok(NetworkOutcome::Exchanged { sent, response })
}

/// Runs [`connect_send_recv`] on `socket`, then closes the socket with a CLOSE
/// submitted through the ring.
///
/// Ownership of the descriptor passes to the ring, so the socket is closed
/// exactly once even when the exchange fails.
pub fn exchange(
    ring: &mut Ring,
    socket: OwnedFd,
    addr: SocketAddr,
    request: &[u8],
    recv_capacity: usize,
) -> RingResult<NetworkOutcome> {
    let handle = Handle::from_raw(socket.into_raw_fd());
    with_handle(ring, handle, |ring, fd| {
        connect_send_recv(ring, fd, addr, request, recv_capacity)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference;
    use crate::test_utils::*;
    use anyhow::Result;
    use std::os::fd::AsFd;

    #[test]
    fn test_refused_connect_is_an_outcome() -> Result<()> {
        let addr: SocketAddr = "127.0.0.1:1".parse()?;
        let socket = tcp_socket(&addr)?;
        let mut ring = init_ring(Some(8))?;

        let outcome = connect_send_recv(
            &mut ring,
            Handle::from(socket.as_fd()),
            addr,
            HTTP_REQUEST,
            RECV_CAPACITY,
        )?;

        match outcome {
            NetworkOutcome::Unreachable { errno } => {
                assert_eq!(errno, Errno::ECONNREFUSED);
                assert!(errno.desc().to_lowercase().contains("connection refused"));
            }
            other => panic!("connected to a closed port: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_closed_ephemeral_port() -> Result<()> {
        let addr = closed_port()?;
        let socket = tcp_socket(&addr)?;
        let mut ring = init_ring(Some(8))?;

        let outcome =
            connect_send_recv(&mut ring, Handle::from(socket.as_fd()), addr, b"ping", 8)?;

        assert!(!outcome.is_connected());
        assert_eq!(ring.outstanding(), 0);
        Ok(())
    }

    #[test]
    fn test_exchange_with_local_server() -> Result<()> {
        let (addr, server) = one_shot_responder(b"HTTP/1.0 200 OK\r\n\r\nhi")?;
        let socket = tcp_socket(&addr)?;
        let mut ring = init_ring(Some(8))?;

        let outcome = connect_send_recv(
            &mut ring,
            Handle::from(socket.as_fd()),
            addr,
            HTTP_REQUEST,
            RECV_CAPACITY,
        )?;

        let request = server.join().map_err(|_| anyhow::anyhow!("server panicked"))??;
        assert_eq!(request, HTTP_REQUEST);

        match outcome {
            NetworkOutcome::Exchanged { sent, response } => {
                assert_eq!(sent, HTTP_REQUEST.len());
                assert!(response.starts_with(b"HTTP/1.0 200 OK"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_exchange_closes_socket_through_ring() -> Result<()> {
        let (addr, server) = hangup_responder(b"HTTP/1.0 200 OK\r\n\r\n")?;
        let mut ring = init_ring(Some(8))?;

        let outcome = exchange(
            &mut ring,
            tcp_socket(&addr)?,
            addr,
            HTTP_REQUEST,
            RECV_CAPACITY,
        )?;
        assert!(outcome.is_connected());
        assert_eq!(ring.outstanding(), 0);

        // The ring is still open, so only the CLOSE it ran can have ended the
        // connection.
        let saw_hangup = server.join().map_err(|_| anyhow::anyhow!("server panicked"))??;
        assert!(saw_hangup);

        ring.close();
        Ok(())
    }

    #[test]
    fn test_exchange_closes_socket_after_refusal() -> Result<()> {
        let addr: SocketAddr = "127.0.0.1:1".parse()?;
        let mut ring = init_ring(Some(8))?;

        let outcome = exchange(&mut ring, tcp_socket(&addr)?, addr, b"ping", 8)?;

        assert_eq!(outcome, NetworkOutcome::Unreachable { errno: Errno::ECONNREFUSED });
        assert_eq!(ring.outstanding(), 0);
        Ok(())
    }

    #[test]
    fn test_response_matches_blocking_reference() -> Result<()> {
        const RESPONSE: &[u8] = b"HTTP/1.0 204 No Content\r\n\r\n";

        let (addr, server) = one_shot_responder(RESPONSE)?;
        let expected = reference::connect_exchange(addr, HTTP_REQUEST, RECV_CAPACITY)?;
        server.join().map_err(|_| anyhow::anyhow!("server panicked"))??;

        let (addr, server) = one_shot_responder(RESPONSE)?;
        let socket = tcp_socket(&addr)?;
        let mut ring = init_ring(Some(8))?;
        let outcome = connect_send_recv(
            &mut ring,
            Handle::from(socket.as_fd()),
            addr,
            HTTP_REQUEST,
            RECV_CAPACITY,
        )?;
        server.join().map_err(|_| anyhow::anyhow!("server panicked"))??;

        assert_eq!(
            outcome,
            NetworkOutcome::Exchanged {
                sent: HTTP_REQUEST.len(),
                response: expected,
            }
        );
        Ok(())
    }
}
