use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Baud rates accepted by [`SerialPort::open`].
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [9_600, 19_200, 38_400, 57_600, 115_200, 230_400];

/// Line settings for a serial device. Always raw 8N1, no flow control.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Line speed. Must be one of [`SUPPORTED_BAUD_RATES`].
    pub baud_rate: u32,
    /// How long a read may wait for the first byte before returning
    /// `TimedOut`. Rounded to tenths of a second (termios `VTIME`).
    /// `None` blocks until data arrives.
    pub poll_interval: Option<Duration>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            poll_interval: Some(Duration::from_millis(100)),
        }
    }
}

/// A serial device opened in raw mode.
///
/// A UART has no end-of-stream, so an idle read interval is reported as
/// `ErrorKind::TimedOut` instead of `Ok(0)`. Callers that loop on reads can
/// use that to poll decoder timeouts or shutdown flags.
pub struct SerialPort {
    file: File,
    path: PathBuf,
    config: SerialConfig,
}

impl SerialPort {
    /// Open `path` and apply `config`.
    pub fn open(path: impl AsRef<Path>, config: SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_constant(config.baud_rate)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        configure_raw(&file, speed, config.poll_interval).map_err(|e| {
            TransportError::Configure {
                path: path.clone(),
                source: e,
            }
        })?;

        info!(?path, baud = config.baud_rate, "opened serial port");

        Ok(Self { file, path, config })
    }

    /// Try to clone this port (creates a new file descriptor).
    ///
    /// Line settings are shared by the device, not per descriptor.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            path: self.path.clone(),
            config: self.config.clone(),
        })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applied line settings.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.file.read(buf)? {
            0 if self.config.poll_interval.is_some() => {
                Err(std::io::Error::from(ErrorKind::TimedOut))
            }
            n => Ok(n),
        }
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let fd = self.file.as_raw_fd();
        // SAFETY: `fd` is an open descriptor owned by `self.file` for the duration of the call.
        let rc = unsafe { libc::tcdrain(fd) };
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("baud_rate", &self.config.baud_rate)
            .finish()
    }
}

fn baud_constant(baud_rate: u32) -> Result<libc::speed_t> {
    let speed = match baud_rate {
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        other => return Err(TransportError::UnsupportedBaud(other)),
    };
    Ok(speed)
}

/// `VTIME` is in deciseconds and capped at 255.
fn vtime_for(interval: Duration) -> libc::cc_t {
    let tenths = interval.as_millis().div_ceil(100).clamp(1, 255);
    tenths as libc::cc_t
}

fn configure_raw(
    file: &File,
    speed: libc::speed_t,
    poll_interval: Option<Duration>,
) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: an all-zero `termios` is a valid value to hand to `tcgetattr`, which overwrites it.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open descriptor and `tio` is a valid writable termios.
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `tio` was initialised by `tcgetattr` above.
    unsafe {
        libc::cfmakeraw(&mut tio);
        if libc::cfsetispeed(&mut tio, speed) != 0 || libc::cfsetospeed(&mut tio, speed) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    tio.c_cflag &= !(libc::CSTOPB | libc::PARENB | libc::CRTSCTS);

    match poll_interval {
        Some(interval) => {
            tio.c_cc[libc::VMIN] = 0;
            tio.c_cc[libc::VTIME] = vtime_for(interval);
        }
        None => {
            tio.c_cc[libc::VMIN] = 1;
            tio.c_cc[libc::VTIME] = 0;
        }
    }

    // SAFETY: `fd` is open and `tio` is a fully initialised termios.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    debug!(fd, "applied raw line settings");
    Ok(())
}
