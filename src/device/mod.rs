//! Interactive PTY session support for network devices.
//!
//! Switches do not run commands over an `exec` channel the way a Unix host
//! does. They expect a shell on a PTY, print a prompt, and echo every command
//! back. [`DeviceSession`] drives that conversation: it writes a command,
//! accumulates output until the prompt comes back, and strips the echo and the
//! prompt from the result.

mod cisco;

pub use cisco::CiscoVariant;

use async_trait::async_trait;
use regex::Regex;
use regex::bytes::Regex as BytesRegex;
use russh::Preferred;
use russh::client::Config;
use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::{AuthMethod, Client, ServerCheckMethod, ToSocketAddrsWithHostname};

/// Only this many trailing bytes are searched for the prompt. A device prompt
/// is a single short line, and rescanning a multi-megabyte `show tech` on
/// every chunk would be quadratic.
const PROMPT_SEARCH_WINDOW: usize = 512;

/// A rejected command is answered right away, so error patterns are only
/// looked for in the first lines of the response.
const ERROR_SEARCH_LINES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeviceVendor {
    /// Cisco devices (IOS, IOS-XE, NX-OS, ...)
    Cisco(CiscoVariant),
    /// Custom configuration
    Custom(DeviceConfig),
}

impl DeviceVendor {
    pub fn into_config(self) -> DeviceConfig {
        match self {
            Self::Cisco(variant) => variant.into_config(),
            Self::Custom(config) => config,
        }
    }

    pub fn to_config(&self) -> DeviceConfig {
        self.clone().into_config()
    }
}

impl Default for DeviceVendor {
    fn default() -> Self {
        Self::Cisco(CiscoVariant::default())
    }
}

/// Parses the netmiko-style `device_type` names operators already know
/// (`cisco_ios`, `cisco_nxos`, ...).
impl FromStr for DeviceVendor {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CiscoVariant::from_device_type(s.trim())
            .map(Self::Cisco)
            .ok_or_else(|| crate::Error::UnknownDeviceType(s.to_string()))
    }
}

impl std::fmt::Display for DeviceVendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cisco(variant) => write!(f, "{variant}"),
            Self::Custom(_) => write!(f, "custom device"),
        }
    }
}

impl From<DeviceConfig> for DeviceVendor {
    fn from(config: DeviceConfig) -> Self {
        Self::Custom(config)
    }
}

impl From<CiscoVariant> for DeviceVendor {
    fn from(variant: CiscoVariant) -> Self {
        Self::Cisco(variant)
    }
}

/// SSH algorithm preferences for device connections.
///
/// Different network devices support different SSH algorithms.
/// Legacy devices may require older algorithms like DH_G1_SHA1 or AES_CBC ciphers.
///
/// This struct wraps russh's algorithm types directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshAlgorithms {
    /// Preferred key exchange algorithms
    pub kex: Option<Vec<russh::kex::Name>>,
    /// Preferred cipher algorithms
    pub cipher: Option<Vec<russh::cipher::Name>>,
    /// Preferred MAC algorithms
    pub mac: Option<Vec<russh::mac::Name>>,
}

impl SshAlgorithms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kex(mut self, algorithms: Vec<russh::kex::Name>) -> Self {
        self.kex = Some(algorithms);
        self
    }

    pub fn cipher(mut self, algorithms: Vec<russh::cipher::Name>) -> Self {
        self.cipher = Some(algorithms);
        self
    }

    pub fn mac(mut self, algorithms: Vec<russh::mac::Name>) -> Self {
        self.mac = Some(algorithms);
        self
    }

    /// Convert to russh Preferred configuration.
    pub(crate) fn to_preferred(&self) -> Preferred {
        let mut preferred = Preferred::default();

        if let Some(ref kex) = self.kex {
            preferred.kex = Cow::Owned(kex.clone());
        }

        if let Some(ref cipher) = self.cipher {
            preferred.cipher = Cow::Owned(cipher.clone());
        }

        if let Some(ref mac) = self.mac {
            preferred.mac = Cow::Owned(mac.clone());
        }

        preferred
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Regex pattern to detect the command prompt. It is matched against the
    /// tail of the output, so anchor it with `$`.
    pub prompt_pattern: String,
    /// Default time to wait for the prompt after sending a command
    pub command_timeout: Duration,
    /// Patterns that indicate the device rejected a command
    pub error_patterns: Vec<String>,
    /// Terminal type for PTY request (default: "xterm")
    pub term_type: String,
    pub term_width: u32,
    pub term_height: u32,
    /// Commands to disable pagination. Example: "terminal length 0" for Cisco
    pub disable_paging_commands: Vec<String>,
    /// SSH algorithm preferences for this device type. When dealing with older devices,
    /// you will often need to explicitly set which algorithms the target device supports.
    pub ssh_algorithms: Option<SshAlgorithms>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            prompt_pattern: r"(?:^|[\r\n])[\w\-\.]+[#>$]\s*$".to_string(),
            command_timeout: Duration::from_secs(30),
            error_patterns: vec![],
            term_type: "xterm".to_string(),
            term_width: 200,
            term_height: 24,
            disable_paging_commands: vec![],
            ssh_algorithms: None,
        }
    }
}

impl DeviceConfig {
    pub fn with_prompt(prompt_pattern: impl Into<String>) -> Self {
        Self {
            prompt_pattern: prompt_pattern.into(),
            ..Default::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn add_error_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.error_patterns.push(pattern.into());
        self
    }

    pub fn add_disable_paging_command(mut self, command: impl Into<String>) -> Self {
        self.disable_paging_commands.push(command.into());
        self
    }

    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.term_width = width;
        self.term_height = height;
        self
    }

    pub fn term_type(mut self, term_type: impl Into<String>) -> Self {
        self.term_type = term_type.into();
        self
    }

    pub fn ssh_algorithms(mut self, algorithms: SshAlgorithms) -> Self {
        self.ssh_algorithms = Some(algorithms);
        self
    }

    /// Builds a russh Config from this DeviceConfig
    pub(crate) fn to_ssh_config(&self) -> Config {
        let mut config = Config::default();

        if let Some(ref algorithms) = self.ssh_algorithms {
            config.preferred = algorithms.to_preferred();
        }

        config
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommandResult {
    /// Every byte received (including the command echo and prompt)
    pub raw_output: Vec<u8>,
    /// The bytes between the echoed command line and the final prompt line,
    /// with `\r\n` line endings turned into `\n`. Nothing else is touched:
    /// blank lines, padding and non-UTF-8 bytes are kept as sent.
    pub output: Vec<u8>,
    /// Whether an error pattern was detected near the start of the output.
    pub has_error: bool,
    /// The line that matched an error pattern, if any.
    pub error_match: Option<String>,
}

impl DeviceCommandResult {
    /// The cleaned output as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }
}

/// Prompt and error matchers compiled from a [`DeviceConfig`].
#[derive(Debug, Clone)]
struct Matchers {
    prompt: BytesRegex,
    errors: Vec<Regex>,
}

impl Matchers {
    fn compile(config: &DeviceConfig) -> Result<Self, crate::Error> {
        let prompt = BytesRegex::new(&config.prompt_pattern)
            .map_err(|e| crate::Error::InvalidPromptPattern(e.to_string()))?;

        let errors = config
            .error_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| crate::Error::InvalidPromptPattern(e.to_string())))
            .collect::<Result<Vec<Regex>, _>>()?;

        Ok(Self { prompt, errors })
    }

    /// Position in `buf` where the trailing prompt starts, if the buffer ends with one.
    fn prompt_start(&self, buf: &[u8]) -> Option<usize> {
        let offset = buf.len().saturating_sub(PROMPT_SEARCH_WINDOW);
        self.prompt
            .find(&buf[offset..])
            .map(|mat| offset + mat.start())
    }

    /// Strips the echoed command line from the front and the prompt line from
    /// the back. The line break ending the last output line stays.
    fn clean_output(&self, raw: &[u8], command: &str) -> Vec<u8> {
        let mut start_index = 0;
        let mut end_index = match self.prompt_start(raw) {
            // The match may begin with the line break before the prompt.
            Some(pos) => {
                pos + raw[pos..]
                    .iter()
                    .take_while(|&&b| b == b'\r' || b == b'\n')
                    .count()
            }
            None => raw.len(),
        };

        if let Some(pos) = raw.iter().position(|&b| b == b'\n') {
            let first_line = String::from_utf8_lossy(&raw[..pos]);
            if !command.is_empty() && first_line.contains(command) {
                start_index = pos + 1;
            }
        }

        if start_index >= end_index {
            end_index = start_index;
        }

        normalize_line_endings(&raw[start_index..end_index])
    }

    fn check_for_errors(&self, output: &str) -> Option<String> {
        output.lines().take(ERROR_SEARCH_LINES).find_map(|line| {
            self.errors
                .iter()
                .any(|regex| regex.is_match(line))
                .then(|| line.trim().to_string())
        })
    }
}

/// Something output can be read from in short bursts.
#[async_trait]
trait ChunkSource: Send {
    /// Appends whatever arrives within a short window to `output` and
    /// returns how many bytes were added.
    async fn read_chunk(&mut self, output: &mut Vec<u8>) -> Result<usize, crate::Error>;
}

#[async_trait]
impl ChunkSource for russh::Channel<russh::client::Msg> {
    async fn read_chunk(&mut self, output: &mut Vec<u8>) -> Result<usize, crate::Error> {
        let start_len = output.len();

        loop {
            match timeout(Duration::from_millis(10), self.wait()).await {
                Ok(Some(russh::ChannelMsg::Data { data }))
                | Ok(Some(russh::ChannelMsg::ExtendedData { data, .. })) => {
                    output.extend_from_slice(&data);
                }
                Ok(Some(russh::ChannelMsg::Eof | russh::ChannelMsg::Close)) | Ok(None) => {
                    return Err(crate::Error::DeviceSessionClosed);
                }
                Ok(Some(russh::ChannelMsg::Failure)) if output.len() == start_len => {
                    return Err(crate::Error::DeviceSessionClosed);
                }
                Ok(Some(_)) => {}
                Err(_) => break,
            }
        }
        Ok(output.len() - start_len)
    }
}

/// Accumulates output until the buffer ends with a prompt. A prompt split
/// over several reads is still found, since the whole tail is searched
/// after every read.
async fn read_until_prompt<S: ChunkSource>(
    source: &mut S,
    matchers: &Matchers,
    read_timeout: Duration,
) -> Result<Vec<u8>, crate::Error> {
    timeout(read_timeout, async {
        let mut accumulated = Vec::with_capacity(4096);
        loop {
            source.read_chunk(&mut accumulated).await?;

            if matchers.prompt_start(&accumulated).is_some() {
                return Ok::<_, crate::Error>(accumulated);
            }
        }
    })
    .await
    .map_err(|_| crate::Error::DeviceTimeout)?
}

/// Turns `\r\n` (and the `\r\r\n` some PTYs emit) into `\n`. A lone `\r` is kept.
fn normalize_line_endings(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut pending_cr = 0;

    for &b in bytes {
        match b {
            b'\r' => pending_cr += 1,
            b'\n' => {
                pending_cr = 0;
                out.push(b'\n');
            }
            _ => {
                out.extend(std::iter::repeat(b'\r').take(pending_cr));
                pending_cr = 0;
                out.push(b);
            }
        }
    }
    out.extend(std::iter::repeat(b'\r').take(pending_cr));
    out
}

/// A high level abstraction to interact with network devices over SSH with an interactive pty session.
#[derive(Debug)]
pub struct DeviceSession {
    client: Client,
    channel: russh::Channel<russh::client::Msg>,
    config: Arc<DeviceConfig>,
    matchers: Matchers,
}

impl DeviceSession {
    pub async fn connect<A, V>(
        addr: A,
        username: &str,
        password: &str,
        vendor: V,
    ) -> Result<Self, crate::Error>
    where
        A: ToSocketAddrsWithHostname,
        V: Into<DeviceVendor>,
    {
        let config = vendor.into().into_config();
        let ssh_config = config.to_ssh_config();

        let client = Client::connect_with_config(
            addr,
            username,
            AuthMethod::with_password(password),
            ServerCheckMethod::NoCheck,
            ssh_config,
        )
        .await?;

        Self::from_client(client, config).await
    }

    pub fn builder() -> DeviceSessionBuilder {
        DeviceSessionBuilder::new()
    }

    /// Create a device session from an existing SSH client.
    ///
    /// Opens a shell on a PTY, waits for the first prompt and turns paging off.
    pub async fn from_client(client: Client, config: DeviceConfig) -> Result<Self, crate::Error> {
        let matchers = Matchers::compile(&config)?;
        let channel = client.get_channel().await?;

        channel
            .request_pty(
                true,
                &config.term_type,
                config.term_width,
                config.term_height,
                0,
                0,
                &[],
            )
            .await?;

        channel.request_shell(true).await?;

        let config = Arc::new(config);
        let mut session = Self {
            client,
            channel,
            config: config.clone(),
            matchers,
        };

        session.wait_for_prompt(config.command_timeout).await?;
        tracing::debug!("initial prompt received");

        for cmd in &config.disable_paging_commands {
            session.send_command(cmd).await?;
        }

        Ok(session)
    }

    /// Send a command and wait for the prompt using the configured default timeout.
    pub async fn send_command(
        &mut self,
        command: &str,
    ) -> Result<DeviceCommandResult, crate::Error> {
        let read_timeout = self.config.command_timeout;
        self.send_command_with_timeout(command, read_timeout).await
    }

    /// Send a command and wait up to `read_timeout` for the prompt to come back.
    ///
    /// Use this for slow commands like `show tech` that keep printing for minutes.
    pub async fn send_command_with_timeout(
        &mut self,
        command: &str,
        read_timeout: Duration,
    ) -> Result<DeviceCommandResult, crate::Error> {
        tracing::debug!(command, ?read_timeout, "sending command");

        let cmd_with_newline = format!("{}\n", command);
        self.channel.data(cmd_with_newline.as_bytes()).await?;
        let raw = self.wait_for_prompt(read_timeout).await?;

        let output = self.matchers.clean_output(&raw, command);
        let error_match = self
            .matchers
            .check_for_errors(&String::from_utf8_lossy(&output));
        tracing::debug!(command, bytes = raw.len(), "command finished");

        Ok(DeviceCommandResult {
            raw_output: raw,
            output,
            has_error: error_match.is_some(),
            error_match,
        })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn wait_for_prompt(&mut self, read_timeout: Duration) -> Result<Vec<u8>, crate::Error> {
        read_until_prompt(&mut self.channel, &self.matchers, read_timeout).await
    }

    /// Close resources gracefully. This requires an explicit call; `Drop`
    /// cannot await the SSH disconnect.
    pub async fn close(&mut self) -> Result<(), crate::Error> {
        let _ = self.channel.eof().await;
        let _ = self.channel.close().await;
        self.client.disconnect().await?;
        tracing::debug!("session closed");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DeviceSessionBuilder {
    address: Option<String>,
    port: u16,
    username: Option<String>,
    auth: Option<AuthMethod>,
    server_check: ServerCheckMethod,
    vendor: Option<DeviceVendor>,
    command_timeout: Option<Duration>,
}

impl DeviceSessionBuilder {
    pub fn new() -> Self {
        Self {
            address: None,
            port: 22,
            username: None,
            auth: None,
            server_check: ServerCheckMethod::NoCheck,
            vendor: None,
            command_timeout: None,
        }
    }

    /// Hostname or IP address. `host:port` and `[v6]:port` override [`port`](Self::port).
    pub fn address<A: Into<String>>(mut self, addr: A) -> Self {
        self.address = Some(addr.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password<S: AsRef<str>>(mut self, password: S) -> Self {
        self.auth = Some(AuthMethod::with_password(password.as_ref()));
        self
    }

    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn server_check(mut self, check: ServerCheckMethod) -> Self {
        self.server_check = check;
        self
    }

    pub fn vendor<V: Into<DeviceVendor>>(mut self, vendor: V) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    /// Overrides the vendor's default per-command timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub async fn connect(self) -> Result<DeviceSession, crate::Error> {
        let address = self
            .address
            .ok_or_else(|| crate::Error::InvalidAddress("Address not specified".into()))?;
        let username = self
            .username
            .ok_or_else(|| crate::Error::InvalidAddress("Username not specified".into()))?;
        let auth = self.auth.ok_or_else(|| {
            crate::Error::InvalidAddress("Authentication method not specified".into())
        })?;

        let target = socket_target(&address, self.port)?;

        let mut config = self.vendor.unwrap_or_default().into_config();
        if let Some(command_timeout) = self.command_timeout {
            config.command_timeout = command_timeout;
        }

        let ssh_config = config.to_ssh_config();

        let client =
            Client::connect_with_config(target, &username, auth, self.server_check, ssh_config)
                .await?;

        DeviceSession::from_client(client, config).await
    }
}

impl Default for DeviceSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits what an operator typed into a host and a port.
///
/// A bare IPv6 address contains colons too, so only `host:port` with a
/// numeric port and `[v6]:port` are treated as carrying a port.
fn socket_target(address: &str, default_port: u16) -> Result<(String, u16), crate::Error> {
    let address = address.trim();
    if address.is_empty() {
        return Err(crate::Error::InvalidAddress("Address is empty".into()));
    }

    if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| crate::Error::InvalidAddress(address.to_string()))?;
        let port = match tail.strip_prefix(':') {
            Some(port) => port
                .parse()
                .map_err(|_| crate::Error::InvalidAddress(address.to_string()))?,
            None if tail.is_empty() => default_port,
            None => return Err(crate::Error::InvalidAddress(address.to_string())),
        };
        return Ok((host.to_string(), port));
    }

    match address.split_once(':') {
        Some((host, port)) if !port.contains(':') => {
            let port = port
                .parse()
                .map_err(|_| crate::Error::InvalidAddress(address.to_string()))?;
            Ok((host.to_string(), port))
        }
        _ => Ok((address.to_string(), default_port)),
    }
}
