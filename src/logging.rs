use tracing_subscriber::EnvFilter;

/// Create an environment filter based on verbosity level.
///
/// `RUST_LOG` always wins so russh internals can be traced without a rebuild.
pub fn create_env_filter(verbosity: u8) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(filter_directive(verbosity))
    }
}

fn filter_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "showtech=warn",
        1 => "showtech=info",
        2 => "showtech=debug",
        // -vvv: include russh so key exchange failures against old switches can be diagnosed
        _ => "showtech=trace,russh=debug",
    }
}

/// Logs go to stderr so they never mix with the prompts on stdout.
pub fn init_logging(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(create_env_filter(verbosity))
        .with_target(verbosity > 1)
        .with_writer(std::io::stderr)
        .init();
}
