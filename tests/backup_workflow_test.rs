use async_trait::async_trait;
use chrono::NaiveDate;
use showtech::{
    run_backup, BackupConfig, CiscoVariant, CommandSession, ConnectionParams,
    DeviceCommandResult, Error, ErrorKind, FixedClock, SessionOpener,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zeroize::Zeroizing;

const HOSTNAME_OUTPUT: &str =
    "Building configuration...\ncurrent configuration : 4521 bytes\nhostname SW-CORE-1\n...";

/// Everything the scripted device saw, shared with the test.
#[derive(Debug, Default)]
struct Transcript {
    opened: usize,
    closed: usize,
    commands: Vec<(String, Duration)>,
}

#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Rejected(String),
    Timeout,
}

#[derive(Clone)]
struct ScriptedDevice {
    replies: HashMap<String, Reply>,
    refuse_connection: bool,
    fail_close: bool,
    transcript: Arc<Mutex<Transcript>>,
}

impl ScriptedDevice {
    fn new() -> Self {
        Self {
            replies: HashMap::new(),
            refuse_connection: false,
            fail_close: false,
            transcript: Arc::default(),
        }
    }

    fn reply(mut self, command: &str, reply: Reply) -> Self {
        self.replies.insert(command.to_string(), reply);
        self
    }

    fn switch(dump: &str) -> Self {
        Self::new()
            .reply(
                "show run | include hostname",
                Reply::Output(HOSTNAME_OUTPUT.to_string()),
            )
            .reply("show tech", Reply::Output(dump.to_string()))
    }

    fn transcript(&self) -> std::sync::MutexGuard<'_, Transcript> {
        self.transcript.lock().unwrap()
    }
}

struct ScriptedSession {
    device: ScriptedDevice,
}

#[async_trait]
impl CommandSession for ScriptedSession {
    async fn send_command(
        &mut self,
        command: &str,
        wait_budget: Duration,
    ) -> Result<DeviceCommandResult, Error> {
        self.device
            .transcript()
            .commands
            .push((command.to_string(), wait_budget));

        match self.device.replies.get(command) {
            Some(Reply::Output(output)) => Ok(DeviceCommandResult {
                raw_output: format!("{command}\r\n{output}\r\nSW-CORE-1#").into_bytes(),
                output: output.clone().into_bytes(),
                has_error: false,
                error_match: None,
            }),
            Some(Reply::Rejected(message)) => Ok(DeviceCommandResult {
                raw_output: message.clone().into_bytes(),
                output: message.clone().into_bytes(),
                has_error: true,
                error_match: Some(message.clone()),
            }),
            Some(Reply::Timeout) => Err(Error::DeviceTimeout),
            None => Ok(DeviceCommandResult {
                raw_output: Vec::new(),
                output: Vec::new(),
                has_error: false,
                error_match: None,
            }),
        }
    }

    fn default_wait_budget(&self) -> Duration {
        Duration::from_secs(30)
    }

    async fn close(&mut self) -> Result<(), Error> {
        self.device.transcript().closed += 1;
        if self.device.fail_close {
            return Err(Error::DeviceSessionClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionOpener for ScriptedDevice {
    type Session = ScriptedSession;

    async fn open(&self, _params: &ConnectionParams) -> Result<ScriptedSession, Error> {
        if self.refuse_connection {
            return Err(Error::PasswordWrong);
        }
        self.transcript().opened += 1;
        Ok(ScriptedSession {
            device: self.clone(),
        })
    }
}

fn params() -> ConnectionParams {
    ConnectionParams::new(
        CiscoVariant::Ios.into(),
        "10.0.0.1",
        "admin",
        Zeroizing::new("secret".to_string()),
    )
}

fn clock() -> FixedClock {
    FixedClock(
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap(),
    )
}

fn files_in(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            let mut names: Vec<String> = entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn capture_is_written_verbatim_under_the_expected_name() {
    let tmp = tempfile::tempdir().unwrap();
    let dump = "\n\n------------------ show version ------------------\n\nCisco IOS Software, Version 15.2\n\ttabs\tand  spaces  \n\u{00e9}\n   \n";
    let device = ScriptedDevice::switch(dump);
    let config = BackupConfig::new(tmp.path());

    let report = run_backup(&device, &params(), &config, &clock()).await.unwrap();

    assert_eq!(report.hostname, "SW-CORE-1");
    assert_eq!(report.file_name(), "SW-CORE-1_03_07_24__14_05_show_tech.txt");
    assert_eq!(report.path, tmp.path().join("SW-CORE-1_03_07_24__14_05_show_tech.txt"));
    assert_eq!(report.bytes_written, dump.len());
    assert_eq!(std::fs::read(&report.path).unwrap(), dump.as_bytes());
}

#[tokio::test]
async fn commands_are_sent_in_order_with_their_budgets() {
    let tmp = tempfile::tempdir().unwrap();
    let device = ScriptedDevice::switch("dump");
    let config = BackupConfig::new(tmp.path());

    run_backup(&device, &params(), &config, &clock()).await.unwrap();

    let transcript = device.transcript();
    assert_eq!(
        transcript.commands,
        vec![
            ("show run | include hostname".to_string(), Duration::from_secs(30)),
            ("show tech".to_string(), Duration::from_secs(300)),
        ]
    );
    assert_eq!(transcript.opened, 1);
    assert_eq!(transcript.closed, 1);
}

#[tokio::test]
async fn configured_commands_and_budget_are_used() {
    let tmp = tempfile::tempdir().unwrap();
    let device = ScriptedDevice::new()
        .reply(
            "show running-config | include ^hostname",
            Reply::Output("hostname nx-agg-01".into()),
        )
        .reply("show tech-support brief", Reply::Output("brief".into()));
    let config = BackupConfig::new(tmp.path().join("nested"))
        .hostname_command("show running-config | include ^hostname")
        .tech_command("show tech-support brief")
        .tech_wait_budget(Duration::from_secs(900));

    let report = run_backup(&device, &params(), &config, &clock()).await.unwrap();

    assert_eq!(report.file_name(), "nx-agg-01_03_07_24__14_05_show_tech.txt");
    assert_eq!(
        device.transcript().commands[1],
        ("show tech-support brief".to_string(), Duration::from_secs(900))
    );
}

#[tokio::test]
async fn connection_failure_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    let mut device = ScriptedDevice::switch("dump");
    device.refuse_connection = true;

    let err = run_backup(&device, &params(), &BackupConfig::new(&out), &clock())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(!out.exists());
    assert_eq!(device.transcript().closed, 0);
}

#[tokio::test]
async fn missing_hostname_is_a_parse_error_and_still_closes() {
    let tmp = tempfile::tempdir().unwrap();
    let device = ScriptedDevice::new()
        .reply(
            "show run | include hostname",
            Reply::Output("Building configuration...\n\nend".into()),
        )
        .reply("show tech", Reply::Output("dump".into()));

    let err = run_backup(&device, &params(), &BackupConfig::new(tmp.path()), &clock())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(files_in(tmp.path()).is_empty());
    let transcript = device.transcript();
    assert_eq!(transcript.closed, 1);
    assert_eq!(transcript.commands.len(), 1, "show tech must not run without a hostname");
}

#[tokio::test]
async fn timeout_on_the_dump_still_closes_the_session() {
    let tmp = tempfile::tempdir().unwrap();
    let device = ScriptedDevice::switch("unused").reply("show tech", Reply::Timeout);

    let err = run_backup(&device, &params(), &BackupConfig::new(tmp.path()), &clock())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(files_in(tmp.path()).is_empty());
    assert_eq!(device.transcript().closed, 1);
}

#[tokio::test]
async fn write_failure_still_closes_the_session() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("file-in-the-way");
    std::fs::write(&blocker, b"").unwrap();
    let device = ScriptedDevice::switch("dump");

    let err = run_backup(
        &device,
        &params(),
        &BackupConfig::new(blocker.join("out")),
        &clock(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Filesystem);
    assert_eq!(device.transcript().closed, 1);
}

#[tokio::test]
async fn rejected_command_is_reported_and_closes() {
    let tmp = tempfile::tempdir().unwrap();
    let device = ScriptedDevice::switch("unused").reply(
        "show tech",
        Reply::Rejected("% Invalid input detected at '^' marker.".into()),
    );

    let err = run_backup(&device, &params(), &BackupConfig::new(tmp.path()), &clock())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Command);
    assert!(matches!(&err, Error::CommandRejected { command, .. } if command == "show tech"));
    assert!(files_in(tmp.path()).is_empty());
    assert_eq!(device.transcript().closed, 1);
}

#[tokio::test]
async fn failed_close_after_a_good_capture_keeps_the_capture() {
    let tmp = tempfile::tempdir().unwrap();
    let mut device = ScriptedDevice::switch("dump");
    device.fail_close = true;

    let report = run_backup(&device, &params(), &BackupConfig::new(tmp.path()), &clock())
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&report.path).unwrap(), "dump");
    assert_eq!(device.transcript().closed, 1);
}

#[tokio::test]
async fn failed_close_does_not_mask_the_real_error() {
    let tmp = tempfile::tempdir().unwrap();
    let mut device = ScriptedDevice::switch("unused").reply("show tech", Reply::Timeout);
    device.fail_close = true;

    let err = run_backup(&device, &params(), &BackupConfig::new(tmp.path()), &clock())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DeviceTimeout));
}

#[tokio::test]
async fn same_minute_rerun_keeps_both_captures() {
    let tmp = tempfile::tempdir().unwrap();
    let config = BackupConfig::new(tmp.path());

    let first = run_backup(&ScriptedDevice::switch("first"), &params(), &config, &clock())
        .await
        .unwrap();
    let second = run_backup(&ScriptedDevice::switch("second"), &params(), &config, &clock())
        .await
        .unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(second.file_name(), "SW-CORE-1_03_07_24__14_05_show_tech_2.txt");
    assert_eq!(std::fs::read_to_string(&first.path).unwrap(), "first");
    assert_eq!(std::fs::read_to_string(&second.path).unwrap(), "second");
    assert_eq!(
        files_in(tmp.path()),
        vec![
            "SW-CORE-1_03_07_24__14_05_show_tech.txt".to_string(),
            "SW-CORE-1_03_07_24__14_05_show_tech_2.txt".to_string(),
        ]
    );
}
