//! showtech captures the `show tech` diagnostic dump of a network switch over
//! SSH and stores it in a timestamped text file. Sessions are driven through
//! an interactive PTY with [russh](https://github.com/warp-tech/russh), the way
//! an operator would type the commands.
//!
//! # Quick Start
//!
//! ```no_run
//! use showtech::{BackupConfig, CiscoVariant, ConnectionParams, LocalClock, SshOpener};
//! use zeroize::Zeroizing;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), showtech::Error> {
//!     let params = ConnectionParams::new(
//!         CiscoVariant::Ios.into(),
//!         "192.168.1.1",
//!         "admin",
//!         Zeroizing::new("password".to_string()),
//!     );
//!     let config = BackupConfig::new("./show_tech");
//!
//!     let report = showtech::run_backup(&SshOpener::default(), &params, &config, &LocalClock).await?;
//!     println!("Backup config saved as '{}'", report.file_name());
//!     Ok(())
//! }
//! ```
//!
//! # Talking to a device directly
//!
//! ```no_run
//! use showtech::{CiscoVariant, DeviceSession};
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), showtech::Error> {
//!     let mut session = DeviceSession::builder()
//!         .address("192.168.1.1")
//!         .username("admin")
//!         .password("password")
//!         .vendor(CiscoVariant::NxOs)
//!         .connect()
//!         .await?;
//!
//!     let result = session
//!         .send_command_with_timeout("show tech-support", Duration::from_secs(300))
//!         .await?;
//!     println!("{}", result.text());
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Supported device types
//!
//! | `device_type`       | Variant                    |
//! |---------------------|----------------------------|
//! | `cisco_ios`         | `CiscoVariant::Ios`        |
//! | `cisco_xe`          | `CiscoVariant::IosXe`      |
//! | `cisco_xr`          | `CiscoVariant::IosXr`      |
//! | `cisco_nxos`        | `CiscoVariant::NxOs`       |
//! | `cisco_asa`         | `CiscoVariant::Asa`        |
//! | `cisco_wlc`         | `CiscoVariant::Wlc`        |
//! | `cisco_ios_legacy`  | `CiscoVariant::IosLegacy`  |

pub mod backup;
pub mod cli;
pub mod client;
pub mod device;
pub mod error;
pub mod logging;
pub mod prompt;
pub mod session;
mod to_socket_addrs_with_hostname;

pub use backup::{
    run_backup, BackupConfig, BackupReport, Clock, FixedClock, LocalClock, backup_filename,
    extract_hostname, format_timestamp, persist,
};
pub use client::{AuthMethod, Client, ServerCheckMethod};
pub use error::{Error, ErrorKind};
pub use session::{CommandSession, ConnectionParams, SessionOpener, SshOpener};
pub use to_socket_addrs_with_hostname::ToSocketAddrsWithHostname;

pub use device::{
    CiscoVariant, DeviceCommandResult, DeviceConfig, DeviceSession, DeviceSessionBuilder,
    DeviceVendor, SshAlgorithms,
};
