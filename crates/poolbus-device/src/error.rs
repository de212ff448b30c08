use crate::address::{DeviceAddress, DeviceFamily};

/// A validated frame whose payload does not fit the command it claims.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The payload length differs from what the command implies.
    #[error("command {command:#04x} expects {expected} payload bytes, got {actual}")]
    LengthMismatch {
        command: u8,
        expected: usize,
        actual: usize,
    },
}

/// Errors from registry operations on the device router.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// Strict registration refused to replace a live binding.
    #[error("device {0} is already registered")]
    AlreadyRegistered(DeviceAddress),

    /// No decoder is registered at the address.
    #[error("device {0} is not registered")]
    NotRegistered(DeviceAddress),

    /// The decoder handles a different family than the address names.
    #[error("decoder for {decoder} cannot serve {address}")]
    FamilyMismatch {
        address: DeviceAddress,
        decoder: DeviceFamily,
    },

    /// The bus address is the master (0x00) or broadcast (0x0F) address.
    #[error("bus address {0:#04x} cannot be registered")]
    InvalidAddress(u8),
}

pub type Result<T> = std::result::Result<T, RouterError>;

/// A device address string that is not `family@address`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid device address '{input}': {reason}")]
pub struct ParseAddressError {
    pub input: String,
    pub reason: &'static str,
}
