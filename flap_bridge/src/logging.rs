//! Log setup shared by the binaries.

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber filtered by `RUST_LOG`, or `default` when the
/// variable is unset or unparsable.
///
/// stdout stays free for the monitors' line output.
pub fn init_tracing(default: &str) -> Result<(), ParseError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}
