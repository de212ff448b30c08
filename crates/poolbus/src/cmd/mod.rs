use clap::{Args, Subcommand};
use std::path::PathBuf;

use poolbus_device::{DeviceAddress, DeviceFamily};
use poolbus_frame::DEFAULT_MAX_STANDARD_PAYLOAD;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod channels;
pub mod decode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a bus capture and print channel updates.
    Decode(DecodeArgs),
    /// List the channels a device family can report.
    Channels(ChannelsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Channels(args) => channels::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file to read, or `-` for stdin.
    pub input: PathBuf,
    /// Input is whitespace-separated hex text instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
    /// Device to register, as family@address (e.g. pump@0x60). Repeatable.
    #[arg(long = "device", short = 'd', value_name = "FAMILY@ADDR")]
    pub devices: Vec<DeviceAddress>,
    /// JSON device configuration file.
    #[arg(long, value_name = "FILE", env = "POOLBUS_CONFIG")]
    pub config: Option<PathBuf>,
    /// Force devices offline after this much silence (e.g. 30s, 500ms, 2m).
    #[arg(long, value_name = "DURATION")]
    pub offline_after: Option<String>,
    /// Largest Standard payload accepted before a length byte is implausible.
    #[arg(long, default_value_t = DEFAULT_MAX_STANDARD_PAYLOAD)]
    pub max_payload: usize,
    /// Refuse duplicate device registrations instead of replacing them.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct ChannelsArgs {
    /// Device family (controller, pump, chem-controller, chlorine-generator).
    pub family: DeviceFamily,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
