use crate::buf::IoBuf;
use crate::errors::{RingError, RingResult};
use crate::sqe::{Descriptor, DirFd, Handle, Op, OpKind, SockAddrC, Tag};
use nix::fcntl::OFlag;
use nix::sys::socket::MsgFlags;
use nix::sys::stat::Mode;
use std::ffi::CString;
use std::net::SocketAddr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Collects the fields of one operation and validates them against what its
/// kind requires. Building never touches a ring.
///
/// ```no_run
/// use ringside::{DescriptorBuilder, Handle, IoBuf, OpKind, Tag};
///
/// let descriptor = DescriptorBuilder::new(OpKind::Read)
///     .tag(Tag::new(2))
///     .fd(Handle::from_raw(3))
///     .buf(IoBuf::with_capacity(64))
///     .offset(0)
///     .build()?;
/// # Ok::<(), ringside::RingError>(())
/// ```
#[derive(Debug)]
pub struct DescriptorBuilder {
    kind: OpKind,
    tag: Option<Tag>,
    fd: Option<Handle>,
    buf: Option<IoBuf>,
    offset: u64,
    addr: Option<SocketAddr>,
    dir: Option<DirFd>,
    path: Option<PathBuf>,
    flags: OFlag,
    mode: Mode,
    msg_flags: MsgFlags,
}

impl DescriptorBuilder {
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            tag: None,
            fd: None,
            buf: None,
            offset: 0,
            addr: None,
            dir: None,
            path: None,
            flags: OFlag::empty(),
            mode: Mode::empty(),
            msg_flags: MsgFlags::empty(),
        }
    }

    pub fn tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn fd(mut self, fd: Handle) -> Self {
        self.fd = Some(fd);
        self
    }

    pub fn buf(mut self, buf: impl Into<IoBuf>) -> Self {
        self.buf = Some(buf.into());
        self
    }

    /// Byte offset for WRITE and READ. Ignored by the other kinds.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    pub fn dir(mut self, dir: DirFd) -> Self {
        self.dir = Some(dir);
        self
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Open flags for OPENAT. `O_CLOEXEC` is not added implicitly.
    pub fn flags(mut self, flags: OFlag) -> Self {
        self.flags = flags;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Message flags for SEND and RECV.
    pub fn msg_flags(mut self, flags: MsgFlags) -> Self {
        self.msg_flags = flags;
        self
    }

    pub fn build(self) -> RingResult<Descriptor> {
        let kind = self.kind;
        let invalid = |reason| RingError::InvalidDescriptor { kind, reason };

        let tag = self.tag.ok_or_else(|| invalid("missing tag"))?;

        let op = match kind {
            OpKind::Write | OpKind::Read | OpKind::Send | OpKind::Recv => {
                let fd = self.fd.ok_or_else(|| invalid("missing handle"))?;
                let buf = self.buf.ok_or_else(|| invalid("missing buffer"))?;

                if buf.capacity() > u32::MAX as usize {
                    return Err(invalid("buffer exceeds 4 GiB"));
                }

                match kind {
                    OpKind::Write => Op::Write {
                        fd,
                        buf,
                        offset: self.offset,
                    },
                    OpKind::Send => Op::Send {
                        fd,
                        buf,
                        flags: self.msg_flags,
                    },
                    _ if buf.capacity() == 0 => return Err(invalid("buffer has no capacity")),
                    OpKind::Read => Op::Read {
                        fd,
                        buf,
                        offset: self.offset,
                    },
                    _ => Op::Recv {
                        fd,
                        buf,
                        flags: self.msg_flags,
                    },
                }
            }

            OpKind::Connect => {
                let fd = self.fd.ok_or_else(|| invalid("missing handle"))?;
                let addr = self.addr.ok_or_else(|| invalid("missing address"))?;
                Op::Connect {
                    fd,
                    addr: SockAddrC::new(&addr),
                }
            }

            OpKind::OpenAt => {
                let path = self.path.ok_or_else(|| invalid("missing path"))?;
                if path.as_os_str().is_empty() {
                    return Err(invalid("empty path"));
                }

                let dir = match self.dir {
                    Some(dir) => dir,
                    None if path.is_absolute() => DirFd::Cwd,
                    None => return Err(invalid("relative path requires a directory")),
                };

                let creates = self.flags.contains(OFlag::O_CREAT)
                    || self.flags.contains(OFlag::O_TMPFILE);
                if creates && self.mode.is_empty() {
                    return Err(invalid("O_CREAT requires a mode"));
                }

                let path = CString::new(path.as_os_str().as_bytes())
                    .map_err(|_| invalid("path contains a NUL byte"))?;

                Op::OpenAt {
                    dir,
                    path,
                    flags: self.flags,
                    mode: self.mode,
                }
            }

            OpKind::Close => Op::Close {
                fd: self.fd.ok_or_else(|| invalid("missing handle"))?,
            },
        };

        Ok(Descriptor::from_parts(tag, op))
    }
}
