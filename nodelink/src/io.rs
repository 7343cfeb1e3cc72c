//! Blocking read helpers shared by the stream framing code.

use std::io::{self, ErrorKind, Read};

/// Result of trying to fill a buffer from a blocking reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The buffer holds the requested number of bytes.
    Complete,
    /// The read timeout elapsed first. Bytes read so far stay in the buffer.
    TimedOut,
    /// The peer closed or reset the connection.
    Closed,
}

/// Reads from `src` until `buf` holds `target` bytes.
///
/// Unlike `Read::read_exact`, nothing is lost on a timeout: whatever arrived
/// is kept in `buf`, so the caller can call again later and continue where
/// this call stopped.
pub fn fill_to<R: Read + ?Sized>(src: &mut R, buf: &mut Vec<u8>, target: usize) -> io::Result<Fill> {
    let mut chunk = [0u8; 4096];
    while buf.len() < target {
        let want = (target - buf.len()).min(chunk.len());
        match src.read(&mut chunk[..want]) {
            Ok(0) => return Ok(Fill::Closed),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if is_timeout(&e) => return Ok(Fill::TimedOut),
            Err(e) if is_disconnect(&e) => return Ok(Fill::Closed),
            Err(e) => return Err(e),
        }
    }
    Ok(Fill::Complete)
}

/// Socket timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// A blocking wait that ended without data: a timeout or a signal.
pub fn is_wait_expired(err: &io::Error) -> bool {
    is_timeout(err) || err.kind() == ErrorKind::Interrupted
}

/// Errors meaning the peer is gone rather than the local socket being broken.
pub fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
    )
}


#[cfg(test)]
mod tests {
    use super::testing::{ScriptedReader, Step};
    use super::*;

    #[test]
    fn test_fill_across_chunks() {
        let mut src = ScriptedReader::new([Step::Data(vec![1, 2]), Step::Data(vec![3, 4, 5])]);
        let mut buf = Vec::new();
        assert_eq!(fill_to(&mut src, &mut buf, 4).unwrap(), Fill::Complete);
        assert_eq!(buf, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_timeout_keeps_partial_bytes() {
        let mut src = ScriptedReader::new([Step::Data(vec![9]), Step::Timeout, Step::Data(vec![8])]);
        let mut buf = Vec::new();
        assert_eq!(fill_to(&mut src, &mut buf, 2).unwrap(), Fill::TimedOut);
        assert_eq!(buf, vec![9]);
        assert_eq!(fill_to(&mut src, &mut buf, 2).unwrap(), Fill::Complete);
        assert_eq!(buf, vec![9, 8]);
    }

    #[test]
    fn test_eof_and_reset_are_closed() {
        let mut src = ScriptedReader::new([Step::Data(vec![1])]);
        let mut buf = Vec::new();
        assert_eq!(fill_to(&mut src, &mut buf, 4).unwrap(), Fill::Closed);

        let mut src = ScriptedReader::new([Step::Reset]);
        assert_eq!(fill_to(&mut src, &mut Vec::new(), 4).unwrap(), Fill::Closed);
    }

    #[test]
    fn test_wait_expired_kinds() {
        for kind in [ErrorKind::WouldBlock, ErrorKind::TimedOut, ErrorKind::Interrupted] {
            assert!(is_wait_expired(&io::Error::from(kind)), "{:?}", kind);
        }
        assert!(!is_wait_expired(&io::Error::from(ErrorKind::ConnectionReset)));
        assert!(!is_timeout(&io::Error::from(ErrorKind::Interrupted)));
    }

    #[test]
    fn test_other_errors_propagate() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(ErrorKind::PermissionDenied, "nope"))
            }
        }
        let err = fill_to(&mut Broken, &mut Vec::new(), 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }
}
