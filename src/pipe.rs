//! Anonymous pipe creation and the line-delimited reader used by the
//! handshake protocol (§4.9, §9).
//!
//! Each pipe end is owned by exactly one process at a time; ownership
//! transfer is the explicit `close()` discipline of §4.1 step 4 / §4.2 step
//! 1, modeled here as consuming the non-owned half of a [`Pipe`].

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, RawFd};

use crate::error::{Error, Result};

/// Largest handshake line the reader will accept, including the trailing
/// `'\n'` (§4.9).
pub const MAX_LINE: usize = 16_384;

pub const MSG_MAPPING_COMPLETE: &str = "user-namespace-mapping-complete\n";
pub const MSG_SETUP_COMPLETE: &str = "container-setup-complete\n";
pub const MSG_EXEC: &str = "exec-process\n";

/// A freshly created anonymous pipe. Exactly one of `rx()`/`tx()` is called
/// in each process that inherits it; the other end is dropped immediately
/// (§4.1 step 4).
pub struct Pipe {
    rx: File,
    tx: File,
}

impl Pipe {
    pub fn new() -> Result<Self> {
        let (rx, tx) = nix::unistd::pipe().map_err(|e| Error::Resource(format!("pipe: {e}")))?;
        Ok(Self {
            rx: unsafe { File::from_raw_fd(std::os::fd::IntoRawFd::into_raw_fd(rx)) },
            tx: unsafe { File::from_raw_fd(std::os::fd::IntoRawFd::into_raw_fd(tx)) },
        })
    }

    /// Takes ownership of the read end, closing the write end in this
    /// process.
    pub fn into_rx(self) -> File {
        drop(self.tx);
        self.rx
    }

    /// Takes ownership of the write end, closing the read end in this
    /// process.
    pub fn into_tx(self) -> File {
        drop(self.rx);
        self.tx
    }

    /// Raw fd numbers for both ends, without consuming `self`. Used to hand
    /// a `Copy`-able pair of integers across a `clone`/`fork` boundary to a
    /// process that will reconstruct and close its own copies explicitly
    /// (§4.1 step 4 / §4.2 step 1), while this process keeps full ownership
    /// to collapse later via `into_rx`/`into_tx`.
    pub fn raw_fds(&self) -> (RawFd, RawFd) {
        (self.rx.as_raw_fd(), self.tx.as_raw_fd())
    }
}

/// Reads exactly one line terminated by `'\n'` from `rx`, one byte at a
/// time, enforcing the [`MAX_LINE`] ceiling (§9: "getline-over-fd"). Leaves
/// the fd positioned at the byte after `'\n'`. Returns the line *including*
/// the trailing `'\n'`, matching the literal message constants above.
pub fn read_line(rx: &mut impl Read) -> Result<String> {
    let mut buf = Vec::with_capacity(512);
    let mut byte = [0u8; 1];
    loop {
        let n = rx
            .read(&mut byte)
            .map_err(|e| Error::protocol(format!("read failed: {e}")))?;
        if n == 0 {
            return Err(Error::protocol("unexpected EOF on handshake pipe"));
        }
        buf.push(byte[0]);
        if byte[0] == b'\n' {
            break;
        }
        if buf.len() >= MAX_LINE {
            return Err(Error::protocol(format!(
                "handshake line exceeds {MAX_LINE} bytes"
            )));
        }
    }
    String::from_utf8(buf).map_err(|e| Error::protocol(format!("non-utf8 handshake line: {e}")))
}

/// Writes `line` (expected to already end in `'\n'`) as a single write.
pub fn write_line(tx: &mut impl Write, line: &str) -> Result<()> {
    tx.write_all(line.as_bytes())
        .map_err(|e| Error::protocol(format!("write failed: {e}")))
}

/// Reads one line and fails unless it equals `expected` exactly, per the
/// "any deviation is fatal to the receiver" rule of §4.9.
pub fn expect_line(rx: &mut impl Read, expected: &str) -> Result<()> {
    let line = read_line(rx)?;
    if line != expected {
        return Err(Error::protocol(format!(
            "expected '{}', got '{}'",
            expected.trim_end(),
            line.trim_end()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_single_line_and_stops_after_newline() {
        let mut cursor = Cursor::new(b"hello\nworld\n".to_vec());
        let line = read_line(&mut cursor).unwrap();
        assert_eq!(line, "hello\n");
        let rest = read_line(&mut cursor).unwrap();
        assert_eq!(rest, "world\n");
    }

    #[test]
    fn eof_before_newline_is_protocol_error() {
        let mut cursor = Cursor::new(b"no newline here".to_vec());
        assert!(read_line(&mut cursor).is_err());
    }

    #[test]
    fn over_length_line_is_rejected() {
        let mut data = vec![b'a'; MAX_LINE + 1];
        data.push(b'\n');
        let mut cursor = Cursor::new(data);
        assert!(read_line(&mut cursor).is_err());
    }

    #[test]
    fn exact_max_length_line_is_accepted() {
        let mut data = vec![b'a'; MAX_LINE - 1];
        data.push(b'\n');
        let mut cursor = Cursor::new(data);
        assert!(read_line(&mut cursor).is_ok());
    }

    #[test]
    fn expect_line_rejects_wrong_message() {
        let mut cursor = Cursor::new(b"exec-process\n".to_vec());
        assert!(expect_line(&mut cursor, MSG_MAPPING_COMPLETE).is_err());
    }

    #[test]
    fn expect_line_accepts_exact_message() {
        let mut cursor = Cursor::new(MSG_SETUP_COMPLETE.as_bytes().to_vec());
        assert!(expect_line(&mut cursor, MSG_SETUP_COMPLETE).is_ok());
    }

    #[test]
    fn real_pipe_roundtrip() {
        let pipe = Pipe::new().unwrap();
        let mut tx = pipe.tx;
        let mut rx_tmp = Some(pipe.rx);
        write_line(&mut tx, MSG_EXEC).unwrap();
        drop(tx);
        let mut rx = rx_tmp.take().unwrap();
        let line = read_line(&mut rx).unwrap();
        assert_eq!(line, MSG_EXEC);
    }
}
