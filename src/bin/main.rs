use anyhow::Context;
use clap::Parser;
use showtech::cli::Cli;
use showtech::logging::init_logging;
use showtech::prompt::Credentials;
use showtech::{ConnectionParams, LocalClock, SshOpener};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let credentials = Credentials::prompt().context("Failed to read connection details")?;

    let params = ConnectionParams::new(
        cli.device_type.clone(),
        credentials.address,
        credentials.username,
        credentials.password,
    )
    .port(cli.port);
    let config = cli.backup_config();
    let opener = SshOpener::new(cli.server_check());

    let report = showtech::run_backup(&opener, &params, &config, &LocalClock)
        .await
        .with_context(|| format!("Failed to capture '{}' from {}", config.tech_command, params.host))?;

    println!("Backup config saved as '{}'", report.file_name());
    Ok(())
}
