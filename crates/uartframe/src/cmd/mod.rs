use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use uartframe_frame::{BufferAllocation, DEFAULT_MAX_PAYLOAD};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod input;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Frame a payload and print or save the wire bytes.
    Encode(EncodeArgs),
    /// Decode frames from a file, stdin or a serial device.
    Decode(DecodeArgs),
    /// Write a single frame to a serial device.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Version(args) => version::run(args),
    }
}

/// Where a payload comes from. Exactly one source is required.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// Payload as hex (whitespace and `0x` prefixes allowed).
    #[arg(long)]
    pub hex: Option<String>,
    /// Payload as a UTF-8 string.
    #[arg(long)]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Write the raw frame to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File path, `-` for stdin, or a serial device.
    pub input: String,
    /// Baud rate when INPUT is a serial device.
    #[arg(long, default_value_t = 115_200, env = "UARTFRAME_BAUD")]
    pub baud: u32,
    /// Largest payload to accept (1 to 65535).
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_PAYLOAD,
        env = "UARTFRAME_MAX_PAYLOAD",
        value_parser = input::parse_max_payload
    )]
    pub max_payload: usize,
    /// Drop a frame that stalls this long (e.g. 500ms, 2s).
    #[arg(long, env = "UARTFRAME_TIMEOUT")]
    pub timeout: Option<String>,
    /// Payload buffer allocation strategy.
    #[arg(long, value_enum, default_value = "fixed")]
    pub alloc: AllocArg,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial device path.
    pub device: PathBuf,
    /// Line speed.
    #[arg(long, default_value_t = 115_200, env = "UARTFRAME_BAUD")]
    pub baud: u32,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AllocArg {
    Fixed,
    Dynamic,
}

impl From<AllocArg> for BufferAllocation {
    fn from(arg: AllocArg) -> Self {
        match arg {
            AllocArg::Fixed => BufferAllocation::Fixed,
            AllocArg::Dynamic => BufferAllocation::Dynamic,
        }
    }
}
