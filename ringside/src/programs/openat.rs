use crate::pipeline::open_read_close;
use crate::ring::Ring;
use anyhow::Result;
use std::path::Path;

pub const DEFAULT_PATH: &str = "/etc/passwd";
pub const READ_LEN: usize = 255;
pub const QUEUE_DEPTH: u32 = 4;

// Longest first-line preview printed.
const PREVIEW_CHARS: usize = 64;

/// Opens, reads and closes `path` entirely through the ring.
pub fn run(path: &Path, queue_depth: u32) -> Result<String> {
    let mut ring = Ring::new(queue_depth)?;
    let read = open_read_close(&mut ring, path, READ_LEN)?;
    ring.close();

    let first_line = String::from_utf8_lossy(read.first_line());
    let preview: String = first_line.chars().take(PREVIEW_CHARS).collect();

    Ok([
        format!("[URING] Opened {} via io_uring (fd={})", path.display(), read.handle),
        format!("[URING] Read {} bytes (first line): {preview}...", read.data.len()),
        "[URING] File operation complete".to_string(),
    ]
    .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RingError;
    use crate::test_utils::*;
    use nix::errno::Errno;

    #[test]
    fn test_reports_first_line() -> Result<()> {
        let tmp = tmp_file_with(b"line one\nline two\n")?;

        let output = run(tmp.path(), QUEUE_DEPTH)?;
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(&format!("[URING] Opened {} via io_uring (fd=", tmp.path().display())));
        assert_eq!(lines[1], "[URING] Read 18 bytes (first line): line one...");
        Ok(())
    }

    #[test]
    fn test_preview_is_truncated() -> Result<()> {
        let tmp = tmp_file_with(&[b'x'; 100])?;

        let output = run(tmp.path(), QUEUE_DEPTH)?;

        let expected = format!("(first line): {}...", "x".repeat(PREVIEW_CHARS));
        assert!(output.contains(&expected));
        Ok(())
    }

    #[test]
    fn test_missing_file_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;

        let err = match run(&dir.path().join("missing"), QUEUE_DEPTH) {
            Err(e) => e,
            Ok(output) => panic!("unexpected success: {output}"),
        };

        match err.downcast_ref::<RingError>() {
            Some(e @ RingError::OperationFailure { errno, .. }) => {
                assert_eq!(*errno, Errno::ENOENT);
                assert!(!e.is_fatal());
            }
            other => panic!("unexpected: {other:?}"),
        }
        Ok(())
    }
}
