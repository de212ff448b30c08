/// Controls device registry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouterConfig {
    /// When true, registering over an occupied address returns
    /// `RouterError::AlreadyRegistered` instead of replacing the binding.
    pub strict_registration: bool,
}
