//! Named pipe (FIFO) endpoint for local inter-process messaging.
//!
//! The read end opens non-blocking so a control loop can poll it from a
//! scheduled task without stalling the tick; the write end uses ordinary
//! blocking opens/writes. Whichever end created the FIFO node removes it
//! on drop.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Which end of the FIFO this endpoint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoMode {
    /// Reader; opens `O_NONBLOCK`, reads fail with `WouldBlock` when empty.
    Read,
    /// Writer; the open blocks until a reader exists.
    Write,
}

/// One end of a named pipe.
#[derive(Debug)]
pub struct Fifo {
    file: File,
    path: PathBuf,
    mode: FifoMode,
    created: bool,
}

impl Fifo {
    /// Open one end of the FIFO at `path`, creating the node (mode 0666)
    /// when it does not exist yet.
    pub fn open(path: impl AsRef<Path>, mode: FifoMode) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        let created = if path.exists() {
            false
        } else {
            mkfifo(&path, 0o666)?;
            true
        };

        let file = match mode {
            FifoMode::Read => OpenOptions::new()
                .read(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(&path)?,
            FifoMode::Write => OpenOptions::new().write(true).open(&path)?,
        };

        Ok(Self {
            file,
            path,
            mode,
            created,
        })
    }

    /// Write the whole buffer.
    pub fn send(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)
    }

    /// Read up to `buf.len()` bytes. On an empty non-blocking read end this
    /// fails with [`io::ErrorKind::WouldBlock`]; a return of 0 means the
    /// write end closed.
    pub fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    /// Path of the FIFO node.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Which end this is.
    pub fn mode(&self) -> FifoMode {
        self.mode
    }
}

impl Drop for Fifo {
    fn drop(&mut self) {
        if self.created {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn mkfifo(path: &Path, mode: libc::mode_t) -> io::Result<()> {
    let cpath = CString::new(path.as_os_str().as_encoded_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "fifo path contains NUL"))?;
    // SAFETY: cpath is a valid NUL-terminated string.
    if unsafe { libc::mkfifo(cpath.as_ptr(), mode) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panloop.fifo");

        // Reader first: its non-blocking open succeeds with no writer, and
        // the writer's open then finds a reader.
        let mut reader = Fifo::open(&path, FifoMode::Read).unwrap();
        let mut writer = Fifo::open(&path, FifoMode::Write).unwrap();

        writer.send(b"position 4500").unwrap();

        let mut buf = [0u8; 64];
        let n = reader.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"position 4500");
    }

    #[test]
    fn empty_read_would_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.fifo");

        let mut reader = Fifo::open(&path, FifoMode::Read).unwrap();
        let _writer = Fifo::open(&path, FifoMode::Write).unwrap();

        let mut buf = [0u8; 8];
        let err = reader.recv(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn creator_removes_node_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transient.fifo");
        {
            let reader = Fifo::open(&path, FifoMode::Read).unwrap();
            assert_eq!(reader.mode(), FifoMode::Read);
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
