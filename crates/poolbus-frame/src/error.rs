/// A candidate frame whose trailing checksum does not match its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChecksumError {
    /// 16-bit sum mismatch on a Standard frame.
    #[error("standard frame checksum mismatch (expected {expected:#06x}, found {actual:#06x})")]
    Standard { expected: u16, actual: u16 },

    /// 8-bit sum mismatch on a Compact frame.
    #[error("compact frame checksum mismatch (expected {expected:#04x}, found {actual:#04x})")]
    Compact { expected: u8, actual: u8 },
}

/// Errors that can occur while extracting frames from the bus.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The bytes at the cursor do not start with a recognized marker.
    #[error("no frame marker at cursor (found {0:#04x})")]
    NoPreamble(u8),

    /// A Standard length byte exceeds the configured maximum payload.
    #[error("implausible standard frame length ({size} bytes, max {max})")]
    ImplausibleLength { size: usize, max: usize },

    /// A Compact frame names a command with no known payload size.
    #[error("unknown compact frame command {0:#04x}")]
    UnknownCompactCommand(u8),

    /// A marker at the cursor declares more bytes than the input will ever deliver.
    #[error("frame at cursor truncated by end of input ({buffered} bytes buffered)")]
    Truncated { buffered: usize },

    /// The candidate failed checksum validation.
    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    /// An I/O error occurred while reading from the byte source.
    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte source reached EOF.
    #[error("byte source closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
