use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info};
use uartframe_frame::{ErrorKind, FrameConfig, FrameError};
use uartframe_link::Link;

use crate::cmd::input::parse_duration;
use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_error, print_message, print_stats, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = frame_config(&args)?;
    let mut link = Link::with_config(config);

    let printed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&printed);
    let limit = args.count;
    link.on_message(move |id: u8, body: &[u8]| {
        let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if limit.map_or(true, |limit| seen <= limit) {
            print_message(id, body, format);
        }
        true
    })
    .on_error(move |kind: ErrorKind| print_error(kind, format));

    let running = Arc::new(AtomicBool::new(true));
    let mut source = open_input(&args, &running)?;
    info!(
        input = %args.input,
        max_payload = link.config().max_payload_size,
        timeout = ?link.config().receive_timeout,
        "decoding"
    );

    while running.load(Ordering::SeqCst) {
        match link.pump(source.as_mut()) {
            Ok(_) => {}
            Err(FrameError::ConnectionClosed) => {
                debug!("input closed");
                break;
            }
            Err(err) => return Err(frame_error("read failed", err)),
        }

        if let Some(count) = args.count {
            if printed.load(Ordering::SeqCst) >= count {
                break;
            }
        }
    }

    print_stats(&link.stats(), format);
    Ok(SUCCESS)
}

fn frame_config(args: &DecodeArgs) -> CliResult<FrameConfig> {
    let receive_timeout = args.timeout.as_deref().map(parse_duration).transpose()?;
    Ok(FrameConfig {
        max_payload_size: args.max_payload,
        receive_timeout,
        allocation: args.alloc.into(),
    })
}

fn open_input(args: &DecodeArgs, running: &Arc<AtomicBool>) -> CliResult<Box<dyn Read>> {
    if args.input == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }

    let path = Path::new(&args.input);
    if is_serial_device(path) {
        install_ctrlc_handler(Arc::clone(running))?;
        return open_serial(path, args.baud);
    }

    let file = File::open(path)
        .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
    Ok(Box::new(file))
}

#[cfg(unix)]
fn is_serial_device(path: &Path) -> bool {
    use std::os::unix::fs::FileTypeExt;

    std::fs::metadata(path)
        .map(|meta| meta.file_type().is_char_device())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_serial_device(_path: &Path) -> bool {
    false
}

#[cfg(unix)]
fn open_serial(path: &Path, baud: u32) -> CliResult<Box<dyn Read>> {
    use uartframe_transport::{SerialConfig, SerialPort};

    let config = SerialConfig {
        baud_rate: baud,
        ..SerialConfig::default()
    };
    let port = SerialPort::open(path, config)
        .map_err(|err| crate::exit::transport_error("open failed", err))?;
    Ok(Box::new(port))
}

#[cfg(not(unix))]
fn open_serial(path: &Path, _baud: u32) -> CliResult<Box<dyn Read>> {
    Err(CliError::usage(format!(
        "serial devices are not supported on this platform: {}",
        path.display()
    )))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uartframe_frame::BufferAllocation;

    use super::*;
    use crate::cmd::AllocArg;

    fn args(timeout: Option<&str>) -> DecodeArgs {
        DecodeArgs {
            input: "-".to_string(),
            baud: 115_200,
            max_payload: 64,
            timeout: timeout.map(str::to_string),
            alloc: AllocArg::Dynamic,
            count: None,
        }
    }

    #[test]
    fn frame_config_follows_args() {
        let config = frame_config(&args(Some("250ms"))).unwrap();
        assert_eq!(config.max_payload_size, 64);
        assert_eq!(config.receive_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.allocation, BufferAllocation::Dynamic);
    }

    #[test]
    fn timeout_is_optional() {
        assert_eq!(frame_config(&args(None)).unwrap().receive_timeout, None);
    }

    #[test]
    fn bad_timeout_is_usage_error() {
        let err = frame_config(&args(Some("soon"))).unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }

    #[test]
    fn regular_file_is_not_a_serial_device() {
        assert!(!is_serial_device(Path::new(env!("CARGO_MANIFEST_DIR"))));
        assert!(!is_serial_device(Path::new("/definitely/not/here")));
    }
}
