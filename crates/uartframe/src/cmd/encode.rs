use std::fs;

use tracing::info;
use uartframe_frame::write_frame;

use crate::cmd::input::resolve_payload;
use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args.payload)?;

    let mut frame = Vec::new();
    write_frame(&payload, &mut frame).map_err(|err| frame_error("encode failed", err))?;

    match &args.out {
        Some(path) => {
            fs::write(path, &frame)
                .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
            info!(
                path = %path.display(),
                payload_size = payload.len(),
                frame_size = frame.len(),
                "frame written"
            );
        }
        None => print_frame(payload.len(), &frame, format),
    }

    Ok(SUCCESS)
}
