use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::backup::{BackupConfig, DEFAULT_HOSTNAME_COMMAND, DEFAULT_TECH_COMMAND};
use crate::{DeviceVendor, ServerCheckMethod};

/// Credentials and the switch address are always asked for interactively;
/// these flags only tune where and how the capture happens.
#[derive(Parser, Debug)]
#[command(
    name = "showtech",
    version,
    about = "Save the 'show tech' output of a switch to a timestamped file",
    after_help = "EXAMPLES:\n  Default Cisco IOS capture:     showtech\n  NX-OS into a backup share:     showtech --device-type cisco_nxos --output-dir /srv/backups\n  Verify the host key:           showtech --known-hosts"
)]
pub struct Cli {
    #[arg(
        long,
        env = "SHOWTECH_OUTPUT_DIR",
        default_value = "./show_tech",
        help = "Directory the capture is written to (created if missing)"
    )]
    pub output_dir: PathBuf,

    #[arg(
        long,
        env = "SHOWTECH_DEVICE_TYPE",
        default_value = "cisco_ios",
        value_parser = parse_device_type,
        help = "Device type: cisco_ios, cisco_xe, cisco_xr, cisco_nxos, cisco_asa, cisco_wlc, cisco_ios_legacy"
    )]
    pub device_type: DeviceVendor,

    #[arg(short = 'p', long, env = "SHOWTECH_PORT", default_value_t = 22, help = "SSH port")]
    pub port: u16,

    #[arg(
        long,
        env = "SHOWTECH_READ_TIMEOUT",
        default_value_t = 300,
        help = "Seconds to wait for the diagnostic command to finish"
    )]
    pub read_timeout: u64,

    #[arg(long, env = "SHOWTECH_HOSTNAME_COMMAND", default_value = DEFAULT_HOSTNAME_COMMAND)]
    pub hostname_command: String,

    #[arg(long, env = "SHOWTECH_TECH_COMMAND", default_value = DEFAULT_TECH_COMMAND)]
    pub tech_command: String,

    #[arg(
        long,
        env = "SHOWTECH_KNOWN_HOSTS",
        num_args = 0..=1,
        value_name = "FILE",
        help = "Check the host key against known_hosts (~/.ssh/known_hosts when FILE is omitted)"
    )]
    pub known_hosts: Option<Option<PathBuf>>,

    #[arg(short = 'v', long, action = clap::ArgAction::Count, help = "Increase log verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,
}

fn parse_device_type(name: &str) -> Result<DeviceVendor, String> {
    name.parse().map_err(|e: crate::Error| e.to_string())
}

impl Cli {
    pub fn backup_config(&self) -> BackupConfig {
        BackupConfig::new(&self.output_dir)
            .hostname_command(&self.hostname_command)
            .tech_command(&self.tech_command)
            .tech_wait_budget(Duration::from_secs(self.read_timeout))
    }

    pub fn server_check(&self) -> ServerCheckMethod {
        match &self.known_hosts {
            None => ServerCheckMethod::NoCheck,
            Some(None) => ServerCheckMethod::DefaultKnownHostsFile,
            Some(Some(path)) => ServerCheckMethod::with_known_hosts_file(&path.to_string_lossy()),
        }
    }
}
