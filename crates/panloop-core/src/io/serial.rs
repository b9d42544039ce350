//! POSIX serial port in raw 8N1 mode.
//!
//! Configuration goes through termios directly. Reads honor the configured
//! blocking mode and timeout:
//!
//! - blocking, no timeout: wait indefinitely for at least one byte
//!   (`VMIN=1`, `VTIME=0`)
//! - blocking with timeout: return whatever arrives, or nothing after the
//!   timeout (`VMIN=0`, `VTIME` in deciseconds)
//! - non-blocking: `O_NONBLOCK`; reads fail with `WouldBlock` when idle

use std::ffi::CString;
use std::io::{self, Read, Write};
use std::os::fd::RawFd;

/// Which buffered direction to discard in [`SerialPort::discard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDirection {
    Input,
    Output,
    Both,
}

/// An open serial device.
#[derive(Debug)]
pub struct SerialPort {
    fd: RawFd,
    device: String,
    baudrate: u32,
    blocking: bool,
    timeout_ms: u32,
}

impl SerialPort {
    /// Open and configure a serial device in raw 8N1 mode, blocking reads,
    /// no timeout.
    pub fn open(device: &str, baudrate: u32) -> io::Result<Self> {
        let speed = baud_constant(baudrate).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported baud rate {baudrate}"),
            )
        })?;
        let path = CString::new(device)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "device path contains NUL"))?;

        // SAFETY: path is a valid NUL-terminated string. O_NOCTTY keeps the
        // device from becoming our controlling terminal.
        let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDWR | libc::O_NOCTTY) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let port = Self {
            fd,
            device: device.to_string(),
            baudrate,
            blocking: true,
            timeout_ms: 0,
        };
        port.configure(speed)?;
        Ok(port)
    }

    fn configure(&self, speed: libc::speed_t) -> io::Result<()> {
        // SAFETY: fd is open and owned by self; tio is fully initialized by
        // tcgetattr before any field is read.
        unsafe {
            let mut tio: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(self.fd, &mut tio) != 0 {
                return Err(io::Error::last_os_error());
            }

            libc::cfmakeraw(&mut tio);
            libc::cfsetispeed(&mut tio, speed);
            libc::cfsetospeed(&mut tio, speed);

            // 8 data bits, no parity, one stop bit, no flow control;
            // receiver enabled, modem control lines ignored.
            tio.c_cflag &= !(libc::CSTOPB | libc::CRTSCTS | libc::PARENB | libc::CSIZE);
            tio.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;

            tio.c_cc[libc::VMIN] = 1;
            tio.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(self.fd, libc::TCSANOW, &tio) != 0 {
                return Err(io::Error::last_os_error());
            }
            libc::tcflush(self.fd, libc::TCIOFLUSH);
        }
        Ok(())
    }

    /// Set the blocking-read timeout. Zero means block indefinitely.
    /// Ignored while the port is in non-blocking mode.
    pub fn set_timeout(&mut self, timeout_ms: u32) -> io::Result<()> {
        // SAFETY: fd is open; tio fully initialized by tcgetattr.
        unsafe {
            let mut tio: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(self.fd, &mut tio) != 0 {
                return Err(io::Error::last_os_error());
            }
            if timeout_ms == 0 {
                tio.c_cc[libc::VMIN] = 1;
                tio.c_cc[libc::VTIME] = 0;
            } else {
                tio.c_cc[libc::VMIN] = 0;
                // VTIME counts deciseconds and saturates at 255.
                tio.c_cc[libc::VTIME] = (timeout_ms / 100).clamp(1, 255) as u8;
            }
            if libc::tcsetattr(self.fd, libc::TCSANOW, &tio) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        self.timeout_ms = timeout_ms;
        Ok(())
    }

    /// Switch between blocking and non-blocking reads.
    pub fn set_blocking(&mut self, blocking: bool) -> io::Result<()> {
        // SAFETY: fcntl on an owned open descriptor.
        unsafe {
            let flags = libc::fcntl(self.fd, libc::F_GETFL);
            if flags < 0 {
                return Err(io::Error::last_os_error());
            }
            let flags = if blocking {
                flags & !libc::O_NONBLOCK
            } else {
                flags | libc::O_NONBLOCK
            };
            if libc::fcntl(self.fd, libc::F_SETFL, flags) < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        self.blocking = blocking;
        Ok(())
    }

    /// Bytes waiting in the input buffer.
    pub fn bytes_available(&self) -> io::Result<usize> {
        let mut count: libc::c_int = 0;
        // SAFETY: FIONREAD writes one c_int through the provided pointer.
        let rc = unsafe { libc::ioctl(self.fd, libc::FIONREAD as _, &mut count) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(count.max(0) as usize)
    }

    /// Discard buffered but untransmitted/unread data.
    pub fn discard(&self, direction: FlushDirection) -> io::Result<()> {
        let which = match direction {
            FlushDirection::Input => libc::TCIFLUSH,
            FlushDirection::Output => libc::TCOFLUSH,
            FlushDirection::Both => libc::TCIOFLUSH,
        };
        // SAFETY: tcflush on an owned open descriptor.
        if unsafe { libc::tcflush(self.fd, which) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Device path this port was opened with.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Configured baud rate.
    pub fn baudrate(&self) -> u32 {
        self.baudrate
    }

    /// Whether reads currently block.
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// Configured blocking-read timeout in milliseconds (0 = indefinite).
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: buf is a valid writable region of the given length.
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: buf is a valid readable region of the given length.
        let n = unsafe { libc::write(self.fd, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        // SAFETY: tcdrain on an owned open descriptor.
        if unsafe { libc::tcdrain(self.fd) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for SerialPort {
    fn drop(&mut self) {
        // SAFETY: fd was opened by us and is closed exactly once.
        unsafe {
            libc::close(self.fd);
        }
    }
}

fn baud_constant(baudrate: u32) -> Option<libc::speed_t> {
    Some(match baudrate {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Real serial hardware is not available in CI; these cover the argument
    // paths that fail before any device is touched.

    #[test]
    fn rejects_unsupported_baud_rate() {
        let err = SerialPort::open("/dev/null", 1234).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn rejects_nul_in_device_path() {
        let err = SerialPort::open("/dev/\0tty", 9600).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn open_missing_device_fails() {
        assert!(SerialPort::open("/dev/panloop-does-not-exist", 9600).is_err());
    }

    #[test]
    fn baud_table_covers_common_rates() {
        for rate in [1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400] {
            assert!(baud_constant(rate).is_some(), "missing rate {rate}");
        }
        assert!(baud_constant(0).is_none());
        assert!(baud_constant(14400).is_none());
    }
}
