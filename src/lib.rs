pub mod asset;
pub mod config;
pub mod defaults;
pub mod dump;
pub mod error;
pub mod fields;
pub mod kismet;
pub mod provider;
pub mod resolve;

use snafu::prelude::*;

use error::DisassemblyError;
use provider::ProviderError;

#[derive(Debug, Snafu)]
pub enum DumpError {
    #[snafu(transparent)]
    IoError { source: std::io::Error },
    #[snafu(transparent)]
    ProviderError { source: ProviderError },
    #[snafu(transparent)]
    DisassemblyError { source: DisassemblyError },
    #[snafu(display("no function `{function}` in {asset}"))]
    FunctionNotFound { asset: String, function: String },
}
