pub mod logging;

use snafu::Snafu;

pub use logging::setup_logging;

#[derive(Debug, Snafu)]
pub enum SetupError {
    #[snafu(display("failed to set up logging: {summary}"))]
    LogSetupFailed {
        summary: String,
        details: Option<String>,
    },
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
