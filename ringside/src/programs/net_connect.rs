use crate::pipeline::{HTTP_REQUEST, NetworkOutcome, RECV_CAPACITY, exchange, tcp_socket};
use crate::ring::Ring;
use anyhow::Result;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::warn;

pub const DEFAULT_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_PORT: u16 = 8080;
pub const QUEUE_DEPTH: u32 = 8;

/// Connects to `addr`, sends an HTTP/1.0 request and reads the start of the
/// answer. A refused or unreachable connection is reported, not failed.
pub fn run(addr: SocketAddr, queue_depth: u32) -> Result<String> {
    let mut ring = Ring::new(queue_depth)?;
    let socket = tcp_socket(&addr)?;

    let outcome = exchange(&mut ring, socket, addr, HTTP_REQUEST, RECV_CAPACITY);
    ring.close();

    let line = match outcome {
        Ok(NetworkOutcome::Unreachable { errno }) => {
            format!("[URING] connect() to {addr} - {}", errno.desc())
        }
        Ok(NetworkOutcome::Exchanged { sent, response }) => format!(
            "[URING] Network I/O complete to {addr} (sent {sent} bytes, received {} bytes)",
            response.len()
        ),
        // The peer accepted the connection, so a failed exchange is reported
        // like a refused one.
        Err(e) if e.is_operation_failure() => {
            warn!(%addr, error = %e, "exchange failed after connect");
            format!("[URING] Network I/O to {addr} ended early: {e}")
        }
        Err(e) => return Err(e.into()),
    };

    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_refused_connect_succeeds() -> Result<()> {
        let addr: SocketAddr = "127.0.0.1:1".parse()?;

        let output = run(addr, QUEUE_DEPTH)?;

        assert_eq!(output, "[URING] connect() to 127.0.0.1:1 - Connection refused");
        Ok(())
    }

    #[test]
    fn test_exchange() -> Result<()> {
        let (addr, server) = one_shot_responder(b"HTTP/1.0 200 OK\r\n\r\n")?;

        let output = run(addr, QUEUE_DEPTH)?;
        server.join().map_err(|_| anyhow::anyhow!("server panicked"))??;

        assert_eq!(
            output,
            format!("[URING] Network I/O complete to {addr} (sent 18 bytes, received 19 bytes)")
        );
        Ok(())
    }

    #[test]
    fn test_socket_closed_after_run() -> Result<()> {
        let (addr, server) = hangup_responder(b"HTTP/1.0 200 OK\r\n\r\n")?;

        run(addr, QUEUE_DEPTH)?;

        let saw_hangup = server.join().map_err(|_| anyhow::anyhow!("server panicked"))??;
        assert!(saw_hangup);
        Ok(())
    }
}
