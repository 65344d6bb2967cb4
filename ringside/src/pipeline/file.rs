use super::{run, with_handle};
use crate::buf::IoBuf;
use crate::errors::RingResult;
use crate::ring::Ring;
use crate::sqe::{Descriptor, DirFd, Handle};
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use std::path::Path;
use tracing::debug;

/// Result of the OPENAT → READ → CLOSE chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRead {
    /// Handle the file was read through. Already closed.
    pub handle: Handle,
    pub data: Vec<u8>,
}

impl FileRead {
    /// Bytes up to, not including, the first newline.
    pub fn first_line(&self) -> &[u8] {
        self.data.split(|b| *b == b'\n').next().unwrap_or_default()
    }
}

/// Opens `path` read-only, reads up to `len` bytes from offset 0 and closes the
/// handle.
///
/// A failed OPENAT stops the chain before any READ or CLOSE is issued. A failed
/// READ still closes the handle before the failure is returned.
pub fn open_read_close(ring: &mut Ring, path: impl AsRef<Path>, len: usize) -> RingResult<FileRead> {
    let path = path.as_ref();

    let tag = ring.next_tag();
    let opened = run(
        ring,
        Descriptor::openat(
            tag,
            DirFd::Cwd,
            path,
            OFlag::O_RDONLY | OFlag::O_CLOEXEC,
            Mode::empty(),
        )?,
    )?;
    let handle = Handle::from_raw(opened.result());
    debug!(path = %path.display(), %handle, "opened");

    let buf = with_handle(ring, handle, |ring, fd| {
        read_at(ring, fd, IoBuf::with_capacity(len), 0)
    })?;

    Ok(FileRead {
        handle,
        data: buf.to_vec(),
    })
}

/// Bytes written and read back by [`write_verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTrip {
    /// Payload bytes the WRITE reported, padding excluded.
    pub written: usize,
    pub read_back: Vec<u8>,
}

impl RoundTrip {
    pub fn matches(&self, data: &[u8]) -> bool {
        self.written == data.len() && self.read_back == data
    }
}

/// Writes `data` at offset 0 through `handle`, then reads it back.
///
/// With `direct` set both buffers are page-aligned and the write is padded to
/// a whole page, as `O_DIRECT` requires. Only the payload bytes are returned.
pub fn write_verify(
    ring: &mut Ring,
    handle: Handle,
    data: &[u8],
    direct: bool,
) -> RingResult<RoundTrip> {
    let out = if direct {
        IoBuf::page_aligned_from(data)
    } else {
        IoBuf::from_slice(data)
    };
    let out_len = out.len();

    let tag = ring.next_tag();
    let wrote = run(ring, Descriptor::write(tag, handle, out, 0)?)?;
    let written = (wrote.result() as usize).min(data.len());

    let buf = if direct {
        IoBuf::page_aligned(out_len)
    } else {
        IoBuf::with_capacity(out_len.max(1))
    };
    let buf = read_at(ring, handle, buf, 0)?;

    let payload = &buf.as_slice()[..buf.len().min(data.len())];
    debug!(%handle, written, read = buf.len(), direct, "write/verify done");

    Ok(RoundTrip {
        written,
        read_back: payload.to_vec(),
    })
}

fn read_at(ring: &mut Ring, fd: Handle, buf: IoBuf, offset: u64) -> RingResult<IoBuf> {
    let tag = ring.next_tag();
    let completion = run(ring, Descriptor::read(tag, fd, buf, offset)?)?;
    Ok(completion.into_buf().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RingError;
    use crate::reference;
    use crate::sqe::OpKind;
    use crate::test_utils::*;
    use anyhow::Result;
    use nix::errno::Errno;
    use rstest::rstest;
    use std::os::fd::AsFd;

    #[test]
    fn test_write_then_read_hello() -> Result<()> {
        let file = tempfile::tempfile()?;
        let mut ring = init_ring(None)?;

        let round_trip = write_verify(&mut ring, Handle::from(file.as_fd()), b"hello", false)?;

        assert_eq!(round_trip.written, 5);
        assert_eq!(round_trip.read_back, b"hello");
        assert!(round_trip.matches(b"hello"));
        Ok(())
    }

    #[test]
    fn test_round_trip_matches_blocking_reference() -> Result<()> {
        let payload = b"ring and blocking paths agree\n";
        let dir = tempfile::tempdir()?;
        let expected = reference::write_then_read(dir.path().join("reference.txt"), payload)?;

        let file = tempfile::tempfile()?;
        let mut ring = init_ring(None)?;
        let round_trip = write_verify(&mut ring, Handle::from(file.as_fd()), payload, false)?;

        assert_eq!(round_trip.read_back, expected);
        Ok(())
    }

    #[test]
    fn test_aligned_round_trip_strips_padding() -> Result<()> {
        let file = tempfile::tempfile()?;
        let mut ring = init_ring(None)?;

        let round_trip = write_verify(&mut ring, Handle::from(file.as_fd()), b"padded", true)?;

        assert!(round_trip.matches(b"padded"));
        assert_eq!(
            file.metadata()?.len() as usize,
            crate::utils::sys::get_page_size()
        );
        Ok(())
    }

    #[rstest]
    #[case::short(4)]
    #[case::exact(255)]
    #[case::past_end(4096)]
    fn test_matches_reference_prefix(#[case] len: usize) -> Result<()> {
        let contents: Vec<u8> = (0..255u8).collect();
        let tmp = tmp_file_with(&contents)?;
        let mut ring = init_ring(None)?;

        let read = open_read_close(&mut ring, tmp.path(), len)?;

        assert_eq!(read.data, reference::read_prefix(tmp.path(), len)?);
        assert_eq!(ring.outstanding(), 0);
        Ok(())
    }

    #[test]
    fn test_etc_passwd_chain() -> Result<()> {
        let mut ring = init_ring(Some(4))?;

        let read = open_read_close(&mut ring, "/etc/passwd", 255)?;

        assert!(read.handle.as_raw() >= 0);
        assert!(!read.data.is_empty());
        assert_eq!(read.data, reference::read_prefix("/etc/passwd", 255)?);
        assert!(!read.first_line().contains(&b'\n'));
        Ok(())
    }

    #[test]
    fn test_missing_path_stops_before_read() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut ring = init_ring(None)?;

        let err = match open_read_close(&mut ring, dir.path().join("missing"), 16) {
            Err(e) => e,
            Ok(read) => panic!("opened a missing file: {read:?}"),
        };

        match err {
            RingError::OperationFailure { kind, errno, .. } => {
                assert_eq!(kind, OpKind::OpenAt);
                assert_eq!(errno, Errno::ENOENT);
            }
            other => panic!("unexpected: {other:?}"),
        }

        // Only the OPENAT consumed a tag.
        assert_eq!(ring.next_tag(), crate::Tag::new(2));
        Ok(())
    }

    #[test]
    fn test_first_line() {
        let read = FileRead {
            handle: Handle::from_raw(3),
            data: b"root:x:0:0\ndaemon".to_vec(),
        };
        assert_eq!(read.first_line(), b"root:x:0:0");
    }
}
