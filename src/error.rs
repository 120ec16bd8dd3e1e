use std::io;
use std::path::PathBuf;

/// Coarse classification of [`Error`], used to decide how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Opening or authenticating the SSH session failed, or the session died.
    Connection,
    /// The device did not return its prompt within the wait budget.
    Timeout,
    /// The device output did not have the expected shape.
    Parse,
    /// The device rejected a command (`% Invalid input ...`).
    Command,
    /// Creating the destination directory or writing the dump failed.
    Filesystem,
    /// Interactive input could not be read or was empty.
    Input,
}

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Password authentication failed")]
    PasswordWrong,
    #[error("Invalid address was provided: {0}")]
    AddressInvalid(io::Error),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("The server host key could not be verified")]
    ServerCheckFailed,
    #[error("Ssh error occured: {0}")]
    SshError(#[from] russh::Error),
    #[error("Invalid prompt pattern: {0}")]
    InvalidPromptPattern(String),
    #[error("Unknown device type '{0}'")]
    UnknownDeviceType(String),
    #[error("The device closed the session")]
    DeviceSessionClosed,
    #[error("Timed out waiting for the device prompt")]
    DeviceTimeout,
    #[error("Device rejected '{command}': {message}")]
    CommandRejected { command: String, message: String },
    #[error("No 'hostname' line found in the output of '{command}'")]
    HostnameNotFound { command: String },
    #[error("Hostname '{0}' cannot be used in a file name")]
    InvalidHostname(String),
    #[error("Failed to write '{}': {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
    #[error("Failed to read {field}: {source}")]
    Prompt {
        field: &'static str,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PasswordWrong
            | Self::AddressInvalid(_)
            | Self::InvalidAddress(_)
            | Self::ServerCheckFailed
            | Self::SshError(_)
            | Self::InvalidPromptPattern(_)
            | Self::UnknownDeviceType(_)
            | Self::DeviceSessionClosed => ErrorKind::Connection,
            Self::DeviceTimeout => ErrorKind::Timeout,
            Self::CommandRejected { .. } => ErrorKind::Command,
            Self::HostnameNotFound { .. } | Self::InvalidHostname(_) => ErrorKind::Parse,
            Self::Filesystem { .. } => ErrorKind::Filesystem,
            Self::EmptyInput(_) | Self::Prompt { .. } => ErrorKind::Input,
        }
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
