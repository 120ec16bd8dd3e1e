//! Seams between the backup workflow and the SSH transport.
//!
//! The workflow only needs "open a session" and "send a command with a wait
//! budget". Keeping that behind two small traits lets tests drive it with a
//! scripted device instead of a switch.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::device::{DeviceCommandResult, DeviceSession, DeviceVendor};
use crate::{AuthMethod, ServerCheckMethod};

/// Everything needed to reach and log into one device.
#[derive(Clone)]
pub struct ConnectionParams {
    pub device_type: DeviceVendor,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Zeroizing<String>,
}

impl ConnectionParams {
    pub fn new(
        device_type: DeviceVendor,
        host: impl Into<String>,
        username: impl Into<String>,
        password: Zeroizing<String>,
    ) -> Self {
        Self {
            device_type,
            host: host.into(),
            port: 22,
            username: username.into(),
            password,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("device_type", &self.device_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An open command-execution channel to one device.
#[async_trait]
pub trait CommandSession: Send {
    /// Send `command` and wait up to `wait_budget` for the device to finish answering.
    async fn send_command(
        &mut self,
        command: &str,
        wait_budget: Duration,
    ) -> Result<DeviceCommandResult, crate::Error>;

    /// The wait budget used for ordinary, fast commands.
    fn default_wait_budget(&self) -> Duration;

    async fn close(&mut self) -> Result<(), crate::Error>;
}

/// Opens [`CommandSession`]s.
#[async_trait]
pub trait SessionOpener: Send + Sync {
    type Session: CommandSession;

    async fn open(&self, params: &ConnectionParams) -> Result<Self::Session, crate::Error>;
}

#[async_trait]
impl CommandSession for DeviceSession {
    async fn send_command(
        &mut self,
        command: &str,
        wait_budget: Duration,
    ) -> Result<DeviceCommandResult, crate::Error> {
        self.send_command_with_timeout(command, wait_budget).await
    }

    fn default_wait_budget(&self) -> Duration {
        self.config().command_timeout
    }

    async fn close(&mut self) -> Result<(), crate::Error> {
        DeviceSession::close(self).await
    }
}

/// Opens real SSH sessions with [`DeviceSession::builder`].
#[derive(Debug, Clone, Default)]
pub struct SshOpener {
    server_check: ServerCheckMethod,
}

impl SshOpener {
    pub fn new(server_check: ServerCheckMethod) -> Self {
        Self { server_check }
    }
}

#[async_trait]
impl SessionOpener for SshOpener {
    type Session = DeviceSession;

    async fn open(&self, params: &ConnectionParams) -> Result<DeviceSession, crate::Error> {
        tracing::info!(
            host = %params.host,
            port = params.port,
            device_type = %params.device_type,
            "connecting"
        );
        DeviceSession::builder()
            .address(params.host.as_str())
            .port(params.port)
            .username(params.username.as_str())
            .auth(AuthMethod::Password(params.password.clone()))
            .server_check(self.server_check.clone())
            .vendor(params.device_type.clone())
            .connect()
            .await
    }
}
