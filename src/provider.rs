//! Source of asset graphs.
//!
//! Archive parsing lives outside this crate; whatever does it hands the dumper fully decoded
//! [`AssetGraph`]s through [`AssetGraphProvider`]. [`JsonFileProvider`] reads graphs that were
//! serialized to JSON ahead of time.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use fs_err as fs;
use snafu::prelude::*;
use tracing::*;

use crate::asset::AssetGraph;

#[derive(Debug, Snafu)]
pub enum ProviderError {
    #[snafu(transparent)]
    IoError { source: std::io::Error },
    #[snafu(display("failed to decode asset graph {}: {source}", path.display()))]
    DecodeError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[snafu(display("unknown asset: {asset}"))]
    UnknownAsset { asset: String },
}

#[cfg_attr(test, mockall::automock)]
pub trait AssetGraphProvider {
    /// Identifiers of every asset this provider can load, in dump order.
    fn assets(&self) -> Vec<String>;
    fn load(&self, asset: &str) -> Result<AssetGraph, ProviderError>;
}

/// Serves `*.json` asset graphs from a set of files and directories. Directories are
/// searched recursively. Assets are identified by their file path.
#[derive(Debug)]
pub struct JsonFileProvider {
    files: BTreeSet<PathBuf>,
}

impl JsonFileProvider {
    pub fn new<P: AsRef<Path>>(inputs: &[P]) -> Result<Self, ProviderError> {
        let mut files = BTreeSet::new();
        for input in inputs {
            let input = input.as_ref();
            if input.is_dir() {
                collect_json(input, &mut files)?;
            } else {
                // surface a missing input now rather than on load
                fs::metadata(input)?;
                files.insert(input.to_path_buf());
            }
        }
        debug!("found {} asset graph(s)", files.len());
        Ok(Self { files })
    }
}

fn collect_json(dir: &Path, files: &mut BTreeSet<PathBuf>) -> Result<(), ProviderError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            files.insert(path);
        }
    }
    Ok(())
}

impl AssetGraphProvider for JsonFileProvider {
    fn assets(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }

    fn load(&self, asset: &str) -> Result<AssetGraph, ProviderError> {
        let path = Path::new(asset);
        ensure!(self.files.contains(path), UnknownAssetSnafu { asset });
        let data = fs::read(path)?;
        serde_json::from_slice(&data).context(DecodeSnafu { path })
    }
}
