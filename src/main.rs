use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::*;

use bpdump::config::{ConfigFile, DumpConfig};
use bpdump::dump;
use bpdump::provider::JsonFileProvider;

#[derive(Parser, Debug)]
struct ActionDump {
    /// Asset graph files (JSON) or directories containing them
    #[arg(index = 1, required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory, overrides the config
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ActionDisasm {
    /// Asset graph file (JSON)
    #[arg(index = 1)]
    input: PathBuf,

    /// Name of the function to disassemble
    #[arg(index = 2)]
    function: String,
}

#[derive(Parser, Debug)]
struct ActionExportConfig {
    /// Where to write the config, defaults to the `--config` path
    #[arg(index = 1)]
    path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Write a text report for every export of the given assets
    Dump(ActionDump),
    /// Print the disassembly of one function
    Disasm(ActionDisasm),
    /// Write the effective config to disk
    ExportConfig(ActionExportConfig),
}

#[derive(Parser, Debug)]
#[command(author, version = bpdump_lib::version())]
struct Args {
    /// JSON config file
    #[arg(long, global = true, default_value = "bpdump.json")]
    config: PathBuf,

    /// Log file, defaults to `bpdump.log` in the output directory when dumping and in the
    /// temp directory otherwise
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

/// Only `dump` writes into the output directory.
fn default_log_path(action: &Action, output_dir: &Path) -> PathBuf {
    match action {
        Action::Dump(_) => output_dir.join("bpdump.log"),
        Action::Disasm(_) | Action::ExportConfig(_) => std::env::temp_dir().join("bpdump.log"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = ConfigFile::<DumpConfig>::load_or_default(&args.config)?;
    if let Action::Dump(action) = &args.action {
        if let Some(output) = &action.output {
            config.output_dir = output.clone();
        }
    }

    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| default_log_path(&args.action, &config.output_dir));
    let _guard = bpdump_lib::setup_logging(&log_path, "bpdump")
        .with_context(|| format!("failed to log to {}", log_path.display()))?;
    debug!("bpdump {}", bpdump_lib::version());
    debug!("config: {:?}", *config);

    match args.action {
        Action::Dump(action) => {
            let provider = JsonFileProvider::new(&action.inputs)?;
            let summary = dump::dump_all(&provider, &config)?;
            for failed in &summary.failed {
                match &failed.export {
                    Some(export) => warn!("failed: {}:{export}: {}", failed.asset, failed.error),
                    None => warn!("failed: {}: {}", failed.asset, failed.error),
                }
            }
            info!(
                "{} report(s) written to {}",
                summary.written,
                config.output_dir.display()
            );
        }
        Action::Disasm(action) => {
            let provider = JsonFileProvider::new(&[&action.input])?;
            print!(
                "{}",
                dump::disassemble_asset_function(
                    &provider,
                    &action.input.to_string_lossy(),
                    &action.function,
                    &config
                )?
            );
        }
        Action::ExportConfig(action) => {
            let path = action.path.unwrap_or_else(|| config.path().to_path_buf());
            let config = ConfigFile::new(&path, config.into_inner());
            config.save()?;
            info!("config written to {}", path.display());
        }
    }
    Ok(())
}
