use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

// Large enough for either address family, laid out the way the kernel expects.
#[derive(Clone, Copy)]
#[repr(C)]
union SocketAddrCRepr {
    v4: libc::sockaddr_in,
    v6: libc::sockaddr_in6,
}

/// A socket address converted to its C representation.
///
/// The raw address lives on the heap so the pointer handed to the kernel
/// stays valid when the owning descriptor moves into the in-flight table.
pub struct SockAddrC {
    raw: Box<SocketAddrCRepr>,
    len: libc::socklen_t,
}

impl SockAddrC {
    pub(crate) fn new(addr: &SocketAddr) -> Self {
        let (raw, len) = match addr {
            SocketAddr::V4(a) => (
                SocketAddrCRepr {
                    v4: socket_addr_v4_to_c(a),
                },
                size_of::<libc::sockaddr_in>(),
            ),
            SocketAddr::V6(a) => (
                SocketAddrCRepr {
                    v6: socket_addr_v6_to_c(a),
                },
                size_of::<libc::sockaddr_in6>(),
            ),
        };

        Self {
            raw: Box::new(raw),
            len: len as libc::socklen_t,
        }
    }

    pub(crate) fn as_ptr(&self) -> *const libc::sockaddr {
        std::ptr::from_ref(&*self.raw).cast()
    }

    pub(crate) fn len(&self) -> libc::socklen_t {
        self.len
    }

    pub fn to_socket_addr(&self) -> Option<SocketAddr> {
        // SAFETY: `sin_family` is the first field of both variants and has the
        // same type, and the union was initialized from one of them.
        let family = unsafe { self.raw.v4.sin_family } as i32;
        match family {
            libc::AF_INET => {
                let raw = unsafe { self.raw.v4 };
                Some(SocketAddr::V4(socket_addr_v4_from_c(raw)))
            }
            libc::AF_INET6 => {
                let raw = unsafe { self.raw.v6 };
                Some(SocketAddr::V6(socket_addr_v6_from_c(raw)))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for SockAddrC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_socket_addr() {
            Some(addr) => fmt::Debug::fmt(&addr, f),
            None => f.debug_struct("SockAddrC").field("len", &self.len).finish(),
        }
    }
}

fn socket_addr_v4_to_c(addr: &SocketAddrV4) -> libc::sockaddr_in {
    libc::sockaddr_in {
        sin_family: libc::AF_INET as libc::sa_family_t,
        sin_port: addr.port().to_be(),
        // `s_addr` is big endian and `octets()` is already in that order.
        sin_addr: libc::in_addr {
            s_addr: u32::from_ne_bytes(addr.ip().octets()),
        },
        ..unsafe { std::mem::zeroed() }
    }
}

fn socket_addr_v6_to_c(addr: &SocketAddrV6) -> libc::sockaddr_in6 {
    libc::sockaddr_in6 {
        sin6_family: libc::AF_INET6 as libc::sa_family_t,
        sin6_port: addr.port().to_be(),
        sin6_addr: libc::in6_addr {
            s6_addr: addr.ip().octets(),
        },
        sin6_flowinfo: addr.flowinfo(),
        sin6_scope_id: addr.scope_id(),
    }
}

fn socket_addr_v4_from_c(addr: libc::sockaddr_in) -> SocketAddrV4 {
    SocketAddrV4::new(
        Ipv4Addr::from(addr.sin_addr.s_addr.to_ne_bytes()),
        u16::from_be(addr.sin_port),
    )
}

fn socket_addr_v6_from_c(addr: libc::sockaddr_in6) -> SocketAddrV6 {
    SocketAddrV6::new(
        Ipv6Addr::from(addr.sin6_addr.s6_addr),
        u16::from_be(addr.sin6_port),
        addr.sin6_flowinfo,
        addr.sin6_scope_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::v4("127.0.0.1:8080", size_of::<libc::sockaddr_in>())]
    #[case::v6("[::1]:9000", size_of::<libc::sockaddr_in6>())]
    fn test_sockaddr_layout(#[case] addr: &str, #[case] len: usize) -> anyhow::Result<()> {
        let addr: SocketAddr = addr.parse()?;
        let raw = SockAddrC::new(&addr);

        assert_eq!(raw.len() as usize, len);
        assert_eq!(raw.to_socket_addr(), Some(addr));
        Ok(())
    }

    #[test]
    fn test_port_is_network_order() -> anyhow::Result<()> {
        let raw = SockAddrC::new(&"10.0.0.1:1".parse()?);
        let port = unsafe { raw.raw.v4.sin_port };
        assert_eq!(port, 1u16.to_be());
        Ok(())
    }
}
