use std::fmt;
use std::io;

use poolbus_device::RouterError;
use poolbus_frame::FrameError;

// Process exit codes. 60 and 64 follow sysexits (data error, usage).
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn router_error(context: &str, err: RouterError) -> CliError {
    match err {
        RouterError::AlreadyRegistered(_)
        | RouterError::InvalidAddress(_)
        | RouterError::FamilyMismatch { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        RouterError::NotRegistered(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolbus_device::{DeviceAddress, DeviceFamily};

    #[test]
    fn io_errors_map_by_kind() {
        let err = io_error("open", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.code, PERMISSION_DENIED);

        let err = io_error("read", io::Error::new(io::ErrorKind::InvalidData, "bad hex"));
        assert_eq!(err.code, DATA_INVALID);
        assert_eq!(err.to_string(), "read: bad hex");
    }

    #[test]
    fn registration_errors_are_usage() {
        let err = router_error(
            "register",
            RouterError::AlreadyRegistered(DeviceAddress::new(DeviceFamily::Pump, 0x60)),
        );
        assert_eq!(err.code, USAGE);
    }
}
