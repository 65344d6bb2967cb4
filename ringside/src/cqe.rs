use crate::buf::IoBuf;
use crate::errors::{RingError, RingResult};
use crate::sqe::{Descriptor, Handle, Op, OpKind, Tag};
use crate::utils::CompletionFlags;
use nix::errno::Errno;

/// The kernel's answer to one submitted descriptor.
///
/// Carries the descriptor's tag and hands back every resource the descriptor
/// owned, buffers included.
#[derive(Debug)]
pub struct Completion {
    tag: Tag,
    result: i32,
    flags: CompletionFlags,
    op: Op,
}

impl Completion {
    pub(crate) fn new(descriptor: Descriptor, result: i32, flags: u32) -> Self {
        let (tag, mut op) = descriptor.into_parts();

        if result >= 0 && matches!(op.kind(), OpKind::Read | OpKind::Recv) {
            if let Some(buf) = op.buf_mut() {
                let filled = (result as usize).min(buf.capacity());
                // SAFETY: the kernel wrote `result` bytes into the buffer.
                unsafe { buf.set_len(filled) };
            }
        }

        Self {
            tag,
            result,
            flags: flags.into(),
            op,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn kind(&self) -> OpKind {
        self.op.kind()
    }

    /// Raw result: bytes transferred, the new handle for OPENAT, or a negated
    /// errno.
    pub fn result(&self) -> i32 {
        self.result
    }

    pub fn flags(&self) -> CompletionFlags {
        self.flags
    }

    pub fn is_success(&self) -> bool {
        self.result >= 0
    }

    pub fn errno(&self) -> Option<Errno> {
        (self.result < 0).then(|| Errno::from_raw(-self.result))
    }

    /// Human readable reason for a failed operation.
    pub fn reason(&self) -> Option<&'static str> {
        self.errno().map(Errno::desc)
    }

    /// Turns a negative result into [`RingError::OperationFailure`].
    pub fn check(self) -> RingResult<Self> {
        match self.errno() {
            Some(errno) => Err(RingError::OperationFailure {
                kind: self.kind(),
                tag: self.tag,
                errno,
            }),
            None => Ok(self),
        }
    }

    /// Handle produced by a successful OPENAT.
    pub fn handle(&self) -> Option<Handle> {
        match self.op {
            Op::OpenAt { .. } if self.is_success() => Some(Handle::from_raw(self.result)),
            _ => None,
        }
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn into_op(self) -> Op {
        self.op
    }

    pub fn into_buf(self) -> Option<IoBuf> {
        self.op.into_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use nix::fcntl::OFlag;
    use nix::sys::stat::Mode;

    #[test]
    fn test_read_sets_filled_length() -> Result<()> {
        let descriptor =
            Descriptor::read(Tag::new(2), Handle::from_raw(3), IoBuf::with_capacity(8), 0)?;
        let completion = Completion::new(descriptor, 5, 0);

        assert!(completion.is_success());
        assert_eq!(completion.tag(), Tag::new(2));
        assert_eq!(completion.into_buf().map(|b| b.len()), Some(5));
        Ok(())
    }

    #[test]
    fn test_write_keeps_payload() -> Result<()> {
        let descriptor = Descriptor::write(Tag::new(1), Handle::from_raw(3), "hello", 0)?;
        let completion = Completion::new(descriptor, 5, 0);

        assert_eq!(completion.into_buf().map(|b| b.to_vec()), Some(b"hello".to_vec()));
        Ok(())
    }

    #[test]
    fn test_negative_result() -> Result<()> {
        let descriptor = Descriptor::openat(
            Tag::new(9),
            crate::DirFd::Cwd,
            "/missing",
            OFlag::O_RDONLY,
            Mode::empty(),
        )?;
        let completion = Completion::new(descriptor, -libc::ENOENT, 0);

        assert_eq!(completion.errno(), Some(Errno::ENOENT));
        assert_eq!(completion.reason(), Some("No such file or directory"));
        assert_eq!(completion.handle(), None);

        match completion.check() {
            Err(RingError::OperationFailure { kind, tag, errno }) => {
                assert_eq!(kind, OpKind::OpenAt);
                assert_eq!(tag, Tag::new(9));
                assert_eq!(errno, Errno::ENOENT);
            }
            other => panic!("unexpected: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_openat_handle() -> Result<()> {
        let descriptor = Descriptor::openat(
            Tag::new(1),
            crate::DirFd::Cwd,
            "/etc/passwd",
            OFlag::O_RDONLY,
            Mode::empty(),
        )?;
        let completion = Completion::new(descriptor, 7, 0).check()?;

        assert_eq!(completion.handle(), Some(Handle::from_raw(7)));
        Ok(())
    }

    #[test]
    fn test_flags_are_decoded() -> Result<()> {
        let descriptor = Descriptor::close(Tag::new(1), Handle::from_raw(3))?;
        let completion = Completion::new(descriptor, 0, 2);

        assert!(completion.flags().contains(CompletionFlags::MORE));
        Ok(())
    }
}
