use crate::cmd::input::resolve_payload;
use crate::cmd::SendArgs;
use crate::exit::{CliResult, SUCCESS};

#[cfg(unix)]
pub fn run(args: SendArgs) -> CliResult<i32> {
    use tracing::info;
    use uartframe_frame::{FrameConfig, FrameWriter, MAX_WIRE_PAYLOAD};
    use uartframe_transport::{SerialConfig, SerialPort};

    use crate::exit::{frame_error, transport_error};

    let payload = resolve_payload(&args.payload)?;

    let port = SerialPort::open(
        &args.device,
        SerialConfig {
            baud_rate: args.baud,
            ..SerialConfig::default()
        },
    )
    .map_err(|err| transport_error("open failed", err))?;

    let config = FrameConfig {
        max_payload_size: MAX_WIRE_PAYLOAD,
        ..FrameConfig::default()
    };
    let mut writer = FrameWriter::from_writer(port, config);
    writer
        .send(&payload)
        .map_err(|err| frame_error("send failed", err))?;

    info!(
        device = %args.device.display(),
        baud = args.baud,
        payload_size = payload.len(),
        "frame sent"
    );
    Ok(SUCCESS)
}

#[cfg(not(unix))]
pub fn run(args: SendArgs) -> CliResult<i32> {
    resolve_payload(&args.payload)?;
    Err(crate::exit::CliError::usage(format!(
        "serial devices are not supported on this platform: {}",
        args.device.display()
    )))
}
