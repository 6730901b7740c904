// LogRelay - app/reader.rs
//
// Incremental reader: fetches only the bytes appended since the last read.
//
// Bounds:
//   - At most MAX_TAIL_READ_BYTES per call, whatever range is requested, so a
//     burst of writes cannot stall the watch thread or balloon memory.
//   - When a read is capped, the chunk is cut back to its last newline so a
//     line (and a multi-byte UTF-8 sequence) is never split across events.
//     The caller advances its offset by `bytes_consumed` only, so the rest is
//     picked up by the next change event.
//
// Decoding is lossy UTF-8: a stray invalid byte must not drop a whole chunk.

use crate::util::constants::MAX_TAIL_READ_BYTES;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Text read from the file plus how far the caller's offset may advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadChunk {
    pub text: String,
    pub bytes_consumed: u64,
    /// True when the requested range exceeded the per-call ceiling.
    pub capped: bool,
}

/// Read the bytes in `[from, to)` of `path`, bounded by `MAX_TAIL_READ_BYTES`.
///
/// Returns `Ok(None)` without touching the file when `to <= from`, and when
/// the file yields no bytes (it shrank between stat and read).
pub fn read_new(path: &Path, from: u64, to: u64) -> io::Result<Option<ReadChunk>> {
    read_new_bounded(path, from, to, MAX_TAIL_READ_BYTES)
}

/// `read_new` with an explicit ceiling, for tests.
pub fn read_new_bounded(
    path: &Path,
    from: u64,
    to: u64,
    ceiling: u64,
) -> io::Result<Option<ReadChunk>> {
    if to <= from {
        return Ok(None);
    }

    let requested = to - from;
    let capped = requested > ceiling;
    let limit = requested.min(ceiling);

    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(from))?;
    let mut buf = Vec::new();
    file.take(limit).read_to_end(&mut buf)?;

    if buf.is_empty() {
        return Ok(None);
    }

    if capped {
        if let Some(last_nl) = buf.iter().rposition(|&b| b == b'\n') {
            buf.truncate(last_nl + 1);
        }
    }

    let bytes_consumed = buf.len() as u64;
    let text = match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };

    Ok(Some(ReadChunk {
        text,
        bytes_consumed,
        capped,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_rejects_empty_or_inverted_range() {
        // The path does not exist: an attempted read would fail.
        let missing = Path::new("/nonexistent/logrelay/reader.log");
        assert!(read_new(missing, 10, 10).unwrap().is_none());
        assert!(read_new(missing, 500, 100).unwrap().is_none());
    }

    #[test]
    fn test_reads_exact_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "old line\nnew line\n").unwrap();

        let chunk = read_new(&path, 9, 18).unwrap().unwrap();
        assert_eq!(chunk.text, "new line\n");
        assert_eq!(chunk.bytes_consumed, 9);
        assert!(!chunk.capped);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_new(&dir.path().join("gone.log"), 0, 10);
        assert!(result.is_err());
    }

    #[test]
    fn test_capped_read_stops_at_last_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "aaaa\nbbbb\ncccc\n").unwrap();

        let chunk = read_new_bounded(&path, 0, 15, 12).unwrap().unwrap();
        assert!(chunk.capped);
        assert_eq!(chunk.text, "aaaa\nbbbb\n");
        assert_eq!(chunk.bytes_consumed, 10);

        let rest = read_new_bounded(&path, 10, 15, 12).unwrap().unwrap();
        assert_eq!(rest.text, "cccc\n");
        assert!(!rest.capped);
    }

    #[test]
    fn test_capped_read_without_newline_keeps_full_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "x".repeat(20)).unwrap();

        let chunk = read_new_bounded(&path, 0, 20, 8).unwrap().unwrap();
        assert_eq!(chunk.bytes_consumed, 8);
        assert_eq!(chunk.text, "xxxxxxxx");
    }

    #[test]
    fn test_file_shorter_than_requested_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        fs::write(&path, "abc").unwrap();

        let chunk = read_new(&path, 0, 100).unwrap().unwrap();
        assert_eq!(chunk.text, "abc");
        assert_eq!(chunk.bytes_consumed, 3);
        assert!(read_new(&path, 3, 100).unwrap().is_none());
    }
}
