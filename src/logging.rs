use tracing_subscriber::EnvFilter;

/// Diagnostics go to stderr and stay off unless `--verbose` or `RUST_LOG`
/// asks for them; user facing output goes through the reporter.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("cg=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"))
    };

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
