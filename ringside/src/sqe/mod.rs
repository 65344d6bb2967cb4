use crate::buf::IoBuf;
use crate::errors::RingResult;
use io_uring::{opcode, squeue::Entry, types};
use nix::fcntl::OFlag;
use nix::sys::socket::MsgFlags;
use nix::sys::stat::Mode;
use std::ffi::CString;
use std::fmt;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::path::Path;

mod builder;
pub use builder::DescriptorBuilder;

pub(crate) mod parse;
pub use parse::SockAddrC;

/// Caller-chosen correlation id echoed back by the matching completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(u64);

impl Tag {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Tag {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A raw file descriptor number used as an operation target.
///
/// A `Handle` does not own the descriptor. Handles produced by OPENAT stay
/// open until a CLOSE on them completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(RawFd);

impl Handle {
    pub const fn from_raw(fd: RawFd) -> Self {
        Self(fd)
    }

    pub const fn as_raw(self) -> RawFd {
        self.0
    }
}

impl From<BorrowedFd<'_>> for Handle {
    fn from(fd: BorrowedFd<'_>) -> Self {
        Self(fd.as_raw_fd())
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Directory an OPENAT path is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirFd {
    /// The process working directory (`AT_FDCWD`).
    #[default]
    Cwd,
    Dir(Handle),
}

impl DirFd {
    pub fn as_raw(self) -> RawFd {
        match self {
            DirFd::Cwd => libc::AT_FDCWD,
            DirFd::Dir(handle) => handle.as_raw(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Write,
    Read,
    Connect,
    Send,
    Recv,
    OpenAt,
    Close,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Write => "WRITE",
            OpKind::Read => "READ",
            OpKind::Connect => "CONNECT",
            OpKind::Send => "SEND",
            OpKind::Recv => "RECV",
            OpKind::OpenAt => "OPENAT",
            OpKind::Close => "CLOSE",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operation a descriptor asks the kernel to perform, together with every
/// resource the kernel reads from or writes into while it is outstanding.
#[derive(Debug)]
pub enum Op {
    Write {
        fd: Handle,
        buf: IoBuf,
        offset: u64,
    },
    Read {
        fd: Handle,
        buf: IoBuf,
        offset: u64,
    },
    Connect {
        fd: Handle,
        addr: SockAddrC,
    },
    Send {
        fd: Handle,
        buf: IoBuf,
        flags: MsgFlags,
    },
    Recv {
        fd: Handle,
        buf: IoBuf,
        flags: MsgFlags,
    },
    OpenAt {
        dir: DirFd,
        path: CString,
        flags: OFlag,
        mode: Mode,
    },
    Close {
        fd: Handle,
    },
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Write { .. } => OpKind::Write,
            Op::Read { .. } => OpKind::Read,
            Op::Connect { .. } => OpKind::Connect,
            Op::Send { .. } => OpKind::Send,
            Op::Recv { .. } => OpKind::Recv,
            Op::OpenAt { .. } => OpKind::OpenAt,
            Op::Close { .. } => OpKind::Close,
        }
    }

    /// Target handle, `None` for OPENAT.
    pub fn fd(&self) -> Option<Handle> {
        match self {
            Op::Write { fd, .. }
            | Op::Read { fd, .. }
            | Op::Connect { fd, .. }
            | Op::Send { fd, .. }
            | Op::Recv { fd, .. }
            | Op::Close { fd } => Some(*fd),
            Op::OpenAt { .. } => None,
        }
    }

    pub fn buf(&self) -> Option<&IoBuf> {
        match self {
            Op::Write { buf, .. } | Op::Read { buf, .. } | Op::Send { buf, .. } | Op::Recv { buf, .. } => {
                Some(buf)
            }
            _ => None,
        }
    }

    pub fn into_buf(self) -> Option<IoBuf> {
        match self {
            Op::Write { buf, .. } | Op::Read { buf, .. } | Op::Send { buf, .. } | Op::Recv { buf, .. } => {
                Some(buf)
            }
            _ => None,
        }
    }

    pub(crate) fn buf_mut(&mut self) -> Option<&mut IoBuf> {
        match self {
            Op::Write { buf, .. } | Op::Read { buf, .. } | Op::Send { buf, .. } | Op::Recv { buf, .. } => {
                Some(buf)
            }
            _ => None,
        }
    }
}

/// One validated request, ready to be submitted.
///
/// Build it through [`DescriptorBuilder`] or one of the shortcut constructors.
/// Every pointer placed in the kernel entry targets heap memory owned by the
/// descriptor, so moving the descriptor does not invalidate them.
#[derive(Debug)]
pub struct Descriptor {
    tag: Tag,
    op: Op,
}

impl Descriptor {
    pub(crate) fn from_parts(tag: Tag, op: Op) -> Self {
        Self { tag, op }
    }

    pub fn builder(kind: OpKind) -> DescriptorBuilder {
        DescriptorBuilder::new(kind)
    }

    pub fn write(tag: Tag, fd: Handle, buf: impl Into<IoBuf>, offset: u64) -> RingResult<Self> {
        DescriptorBuilder::new(OpKind::Write)
            .tag(tag)
            .fd(fd)
            .buf(buf)
            .offset(offset)
            .build()
    }

    pub fn read(tag: Tag, fd: Handle, buf: IoBuf, offset: u64) -> RingResult<Self> {
        DescriptorBuilder::new(OpKind::Read)
            .tag(tag)
            .fd(fd)
            .buf(buf)
            .offset(offset)
            .build()
    }

    pub fn connect(tag: Tag, fd: Handle, addr: SocketAddr) -> RingResult<Self> {
        DescriptorBuilder::new(OpKind::Connect)
            .tag(tag)
            .fd(fd)
            .addr(addr)
            .build()
    }

    pub fn send(tag: Tag, fd: Handle, buf: impl Into<IoBuf>) -> RingResult<Self> {
        DescriptorBuilder::new(OpKind::Send).tag(tag).fd(fd).buf(buf).build()
    }

    pub fn recv(tag: Tag, fd: Handle, buf: IoBuf) -> RingResult<Self> {
        DescriptorBuilder::new(OpKind::Recv).tag(tag).fd(fd).buf(buf).build()
    }

    pub fn openat(
        tag: Tag,
        dir: DirFd,
        path: impl AsRef<Path>,
        flags: OFlag,
        mode: Mode,
    ) -> RingResult<Self> {
        DescriptorBuilder::new(OpKind::OpenAt)
            .tag(tag)
            .dir(dir)
            .path(path)
            .flags(flags)
            .mode(mode)
            .build()
    }

    pub fn close(tag: Tag, fd: Handle) -> RingResult<Self> {
        DescriptorBuilder::new(OpKind::Close).tag(tag).fd(fd).build()
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn into_parts(self) -> (Tag, Op) {
        (self.tag, self.op)
    }

    /// Encodes the descriptor as a submission entry carrying `user_data`.
    ///
    /// The entry borrows raw pointers into `self`. The caller must keep the
    /// descriptor alive and in place until the matching completion is reaped.
    pub(crate) fn to_entry(&mut self, user_data: u64) -> Entry {
        let entry = match &mut self.op {
            Op::Write { fd, buf, offset } => {
                opcode::Write::new(types::Fd(fd.as_raw()), buf.as_ptr(), buf.len() as u32)
                    .offset(*offset)
                    .build()
            }
            Op::Read { fd, buf, offset } => {
                let cap = buf.capacity() as u32;
                opcode::Read::new(types::Fd(fd.as_raw()), buf.as_mut_ptr(), cap)
                    .offset(*offset)
                    .build()
            }
            Op::Connect { fd, addr } => {
                opcode::Connect::new(types::Fd(fd.as_raw()), addr.as_ptr(), addr.len()).build()
            }
            Op::Send { fd, buf, flags } => {
                opcode::Send::new(types::Fd(fd.as_raw()), buf.as_ptr(), buf.len() as u32)
                    .flags(flags.bits())
                    .build()
            }
            Op::Recv { fd, buf, flags } => {
                let cap = buf.capacity() as u32;
                opcode::Recv::new(types::Fd(fd.as_raw()), buf.as_mut_ptr(), cap)
                    .flags(flags.bits())
                    .build()
            }
            Op::OpenAt {
                dir,
                path,
                flags,
                mode,
            } => opcode::OpenAt::new(types::Fd(dir.as_raw()), path.as_ptr())
                .flags(flags.bits())
                .mode(mode.bits())
                .build(),
            Op::Close { fd } => opcode::Close::new(types::Fd(fd.as_raw())).build(),
        };

        entry.user_data(user_data)
    }
}
