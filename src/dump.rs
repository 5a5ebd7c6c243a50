//! Per-export text reports.
//!
//! Exports of one asset are processed in order. Event stubs are disassembled first so that
//! the graphs they enter can be annotated with the event names; any export that fails to
//! render is logged and skipped without aborting the run.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use fs_err as fs;
use itertools::Itertools;
use tracing::*;

use crate::asset::flags::flag_names;
use crate::asset::{
    AssetGraph, ClassExport, EnumExport, Export, ExportKind, FunctionExport, StructExport,
};
use crate::config::DumpConfig;
use crate::fields::{classify_parameter, describe, FieldDescriptor, ParamRole};
use crate::kismet::{disassemble, DisassemblyError, EventLinks, ScriptFunction, ScriptVersion};
use crate::provider::AssetGraphProvider;
use crate::resolve::SymbolPath;
use crate::DumpError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedExport {
    pub asset: String,
    /// `None` when the whole asset could not be loaded.
    pub export: Option<String>,
    pub error: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DumpSummary {
    pub written: usize,
    pub failed: Vec<FailedExport>,
}

impl DumpSummary {
    fn merge(&mut self, other: DumpSummary) {
        self.written += other.written;
        self.failed.extend(other.failed);
    }
}

/// Writes a report for every export of every asset `provider` knows about.
pub fn dump_all<P>(provider: &P, config: &DumpConfig) -> Result<DumpSummary, DumpError>
where
    P: AssetGraphProvider + ?Sized,
{
    let mut summary = DumpSummary::default();
    for asset in provider.assets() {
        let graph = match provider.load(&asset) {
            Ok(graph) => graph,
            Err(e) => {
                error!("failed to load {asset}: {e}");
                summary.failed.push(FailedExport {
                    asset,
                    export: None,
                    error: e.to_string(),
                });
                continue;
            }
        };
        summary.merge(dump_asset(&graph, config)?);
    }
    info!(
        "wrote {} report(s), {} failure(s)",
        summary.written,
        summary.failed.len()
    );
    Ok(summary)
}

/// Writes the reports of one asset below `config.output_dir`. Only output I/O failures are
/// returned as errors.
pub fn dump_asset(graph: &AssetGraph, config: &DumpConfig) -> Result<DumpSummary, DumpError> {
    info!("dumping {}", graph.path);
    let version = script_version(graph, config);
    let links = collect_event_links(graph, version);
    let dir = asset_dir(&config.output_dir, &graph.path);

    let mut summary = DumpSummary::default();
    for export in &graph.exports {
        if !wanted(config, export.kind()) {
            continue;
        }
        match render_export(export, version, &links, config.divider_width) {
            Ok(report) => {
                fs::create_dir_all(&dir)?;
                let path = dir.join(format!("{}.txt", export.name()));
                fs::write(&path, report)?;
                debug!("wrote {}", path.display());
                summary.written += 1;
            }
            Err(e) => {
                error!("skipping {}:{}: {e}", graph.path, export.name());
                summary.failed.push(FailedExport {
                    asset: graph.path.clone(),
                    export: Some(export.name().to_string()),
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(summary)
}

/// Disassembly of a single function, annotated with the asset's event links.
pub fn disassemble_function(
    graph: &AssetGraph,
    function: &str,
    config: &DumpConfig,
) -> Result<String, DumpError> {
    let version = script_version(graph, config);
    let export = graph
        .exports
        .iter()
        .find_map(|e| match e {
            Export::Function(f) if f.name == function => Some(f),
            _ => None,
        })
        .ok_or_else(|| DumpError::FunctionNotFound {
            asset: graph.path.clone(),
            function: function.to_string(),
        })?;
    let links = collect_event_links(graph, version);
    Ok(disassemble(export.into(), version, &links_into(&links, &export.name))?.text)
}

/// Loads `asset` from `provider` and disassembles one of its functions.
pub fn disassemble_asset_function<P>(
    provider: &P,
    asset: &str,
    function: &str,
    config: &DumpConfig,
) -> Result<String, DumpError>
where
    P: AssetGraphProvider + ?Sized,
{
    let graph = provider.load(asset)?;
    disassemble_function(&graph, function, config)
}

pub fn script_version(graph: &AssetGraph, config: &DumpConfig) -> ScriptVersion {
    let mut version = graph.script_version();
    if let Some(lwc) = config.large_world_coordinates {
        version.large_world_coordinates = lwc;
    }
    if let Some(legacy) = config.legacy_set_array {
        version.legacy_set_array = legacy;
    }
    version
}

/// Event links of one asset, grouped by the graph they enter.
pub type GraphLinks = BTreeMap<String, EventLinks>;

/// First pass: links found in every event function of the asset. Event functions that fail
/// here are reported by the second pass.
pub fn collect_event_links(graph: &AssetGraph, version: ScriptVersion) -> GraphLinks {
    let mut links = GraphLinks::new();
    for export in &graph.exports {
        let Export::Function(function) = export else {
            continue;
        };
        if !function.is_event() {
            continue;
        }
        match disassemble(function.into(), version, &EventLinks::new()) {
            Ok(dis) => {
                for (entry, link) in dis.links {
                    let Some(target) = link.target.clone() else {
                        continue;
                    };
                    if let Some(prev) = links.entry(target).or_default().insert(entry, link) {
                        warn!(
                            "entry point {entry} of {}:{} is entered by more than one event, dropping {}",
                            graph.path,
                            prev.target.as_deref().unwrap_or("None"),
                            prev.name
                        );
                    }
                }
            }
            Err(e) => trace!("no links from {}: {e}", function.name),
        }
    }
    links
}

/// Links whose implementing graph is `function`.
fn links_into(links: &GraphLinks, function: &str) -> EventLinks {
    links.get(function).cloned().unwrap_or_default()
}

fn wanted(config: &DumpConfig, kind: ExportKind) -> bool {
    match kind {
        ExportKind::Class => config.kinds.classes,
        ExportKind::Function => config.kinds.functions,
        ExportKind::Struct => config.kinds.structs,
        ExportKind::Enum => config.kinds.enums,
    }
}

/// `<output>/<asset path>`, ignoring empty and relative segments of the asset path.
fn asset_dir(output: &Path, asset: &str) -> PathBuf {
    asset
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .fold(output.to_path_buf(), |dir, s| dir.join(s))
}

pub fn render_export(
    export: &Export,
    version: ScriptVersion,
    links: &GraphLinks,
    divider_width: usize,
) -> Result<String, DisassemblyError> {
    let mut report = Report::new(divider_width);
    match export {
        Export::Class(class) => class_report(&mut report, class),
        Export::Function(function) => function_report(&mut report, function, version, links)?,
        Export::Struct(r#struct) => struct_report(&mut report, r#struct),
        Export::Enum(r#enum) => enum_report(&mut report, r#enum),
    }
    Ok(report.finish())
}

fn class_report(report: &mut Report, class: &ClassExport) {
    report.header("Name", &class.name);
    if let Some(super_struct) = &class.super_struct.resolve() {
        report.header("Super", super_struct);
    }
    report.header("Flags", &flag_names(&class.flags()));

    if !class.interfaces.is_empty() {
        report.section("Interfaces");
        for interface in &class.interfaces {
            report.line(&interface.resolve_or_none());
        }
    }
    if !class.properties.is_empty() {
        report.section("Properties");
        report.fields(
            class
                .properties
                .iter()
                .map(|p| describe(p, class.defaults.get(&p.name))),
        );
    }
    if !class.functions.is_empty() {
        report.section("Functions");
        for function in &class.functions {
            report.line(function);
        }
    }
}

fn struct_report(report: &mut Report, r#struct: &StructExport) {
    report.header("Name", &r#struct.name);
    if let Some(super_struct) = &r#struct.super_struct.resolve() {
        report.header("Super", super_struct);
    }
    if !r#struct.properties.is_empty() {
        report.section("Properties");
        report.fields(
            r#struct
                .properties
                .iter()
                .map(|p| describe(p, r#struct.defaults.get(&p.name))),
        );
    }
}

fn enum_report(report: &mut Report, r#enum: &EnumExport) {
    report.header("Name", &r#enum.name);
    report.section("Entries");
    for (name, value) in &r#enum.entries {
        report.line(&format!("{name} = {value}"));
    }
}

fn function_report(
    report: &mut Report,
    function: &FunctionExport,
    version: ScriptVersion,
    links: &GraphLinks,
) -> Result<(), DisassemblyError> {
    // disassemble first so a failure leaves nothing behind
    let code = disassemble(
        ScriptFunction::from(function),
        version,
        &links_into(links, &function.name),
    )?;

    report.header("Name", &function.name);
    if let Some(outer) = &function.outer {
        report.header("Outer", outer);
    }
    report.header("Flags", &flag_names(&function.flags()));

    let params = function
        .properties
        .iter()
        .map(|p| (classify_parameter(p.flags()), p))
        .into_group_map();
    for (role, title) in [
        (ParamRole::Input, "Inputs"),
        (ParamRole::Output, "Outputs"),
        (ParamRole::Local, "Locals"),
    ] {
        if let Some(properties) = params.get(&role) {
            report.section(title);
            report.fields(properties.iter().map(|p| describe(p, None)));
        }
    }

    report.section("Code");
    report.raw(&code.text);
    Ok(())
}

struct Report {
    divider: String,
    out: String,
}

impl Report {
    fn new(divider_width: usize) -> Self {
        Self {
            divider: "=".repeat(divider_width),
            out: String::new(),
        }
    }

    fn header(&mut self, label: &str, value: &str) {
        let _ = writeln!(self.out, "{label}: {value}");
    }

    fn section(&mut self, title: &str) {
        let _ = writeln!(self.out, "\n{}\n{title}\n{}\n", self.divider, self.divider);
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn fields(&mut self, fields: impl Iterator<Item = FieldDescriptor>) {
        let blocks = fields.map(|field| {
            let mut block = format!("Name: {}\nType: {}\n", field.name, field.type_label);
            if let Some(default) = &field.default {
                let _ = writeln!(block, "Default: {default}");
            }
            if !field.flags.is_empty() {
                let _ = writeln!(block, "Flags: {}", flag_names(&field.flags));
            }
            block
        });
        self.out.push_str(&blocks.collect::<Vec<_>>().join("\n"));
    }

    fn finish(self) -> String {
        self.out
    }
}
