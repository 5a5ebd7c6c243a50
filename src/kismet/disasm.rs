//! Offset-annotated listing of a function's script bytecode.
//!
//! The provider hands over already decoded [`Expr`] trees, so byte offsets are rebuilt by
//! replaying the serialized size of every tag and operand: names are 12 bytes, object
//! and field pointers 8, code offsets 4, vector components 4 or 8 depending on the asset,
//! and every operand list ends in a one byte closing tag.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::trace;

use crate::asset::{FunctionExport, ObjectRef};
use crate::resolve::SymbolPath;

use super::{
    Assignment, ContextOperands, DisassemblyError, EExprToken, Expr, ScriptText, ScriptVersion,
    SwitchCase, TextLiteralType,
};

type Result<T> = std::result::Result<T, DisassemblyError>;

const NAME_SIZE: u32 = 12;
const POINTER_SIZE: u32 = 8;
const CODE_OFFSET_SIZE: u32 = 4;
const TERMINATOR_SIZE: u32 = 1;

const MAX_DEPTH: usize = 256;
/// Eight hex digits and two spaces.
const OFFSET_COLUMN: usize = 10;

/// `EScriptInstrumentation::InlineEvent`
const INSTRUMENTATION_INLINE_EVENT: u8 = 4;

/// The event stub named `name` enters its implementing graph `target` at the entry point
/// this link is keyed by. `offset` is the call site inside the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLink {
    pub name: String,
    pub offset: u32,
    pub target: Option<String>,
}

/// Event links keyed by entry point.
pub type EventLinks = BTreeMap<i32, EventLink>;

#[derive(Debug, Clone, Copy)]
pub struct ScriptFunction<'a> {
    pub name: &'a str,
    pub is_event: bool,
    pub bytecode: Option<&'a [Expr]>,
}

impl<'a> From<&'a FunctionExport> for ScriptFunction<'a> {
    fn from(function: &'a FunctionExport) -> Self {
        Self {
            name: &function.name,
            is_event: function.is_event(),
            bytecode: function.bytecode.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembly {
    pub text: String,
    /// Links found in this function, only ever filled for event functions.
    pub links: EventLinks,
    /// Serialized size of the whole script.
    pub size: u32,
}

/// Renders `function`'s bytecode, one line per instruction. Lines whose offset is a key of
/// `events` are preceded by an `Event:` annotation.
pub fn disassemble(
    function: ScriptFunction<'_>,
    version: ScriptVersion,
    events: &EventLinks,
) -> Result<Disassembly> {
    let bytecode = function
        .bytecode
        .ok_or_else(|| DisassemblyError::BytecodeUnavailable {
            function: function.name.to_string(),
        })?;

    let mut cx = Context {
        version,
        function: function.name,
        is_event: function.is_event,
        events,
        offset: 0,
        depth: 0,
        out: String::new(),
        found: EventLinks::new(),
    };
    for ex in bytecode {
        expr(&mut cx, ex)?;
    }
    trace!(
        "disassembled {} ({} statements, {} bytes)",
        function.name,
        bytecode.len(),
        cx.offset
    );

    Ok(Disassembly {
        text: cx.out,
        links: cx.found,
        size: cx.offset,
    })
}

/// State of one disassembly pass.
struct Context<'a> {
    version: ScriptVersion,
    function: &'a str,
    is_event: bool,
    events: &'a EventLinks,
    offset: u32,
    depth: usize,
    out: String,
    found: EventLinks,
}

impl Context<'_> {
    fn skip(&mut self, size: u32) {
        self.offset += size;
    }
    fn skip_name(&mut self) {
        self.skip(NAME_SIZE);
    }
    fn skip_pointer(&mut self) {
        self.skip(POINTER_SIZE);
    }
    fn skip_code_offset(&mut self) {
        self.skip(CODE_OFFSET_SIZE);
    }
    fn skip_coords(&mut self, count: u32) {
        let width = if self.version.large_world_coordinates {
            8
        } else {
            4
        };
        self.skip(width * count);
    }
    /// One byte per character, Latin-1 on disk.
    fn skip_ansi(&mut self, value: &str) {
        self.skip(value.chars().count() as u32 + 1);
    }
    fn skip_unicode(&mut self, value: &str) {
        self.skip((value.encode_utf16().count() as u32 + 1) * 2);
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }

    fn line(&mut self, offset: u32, token: EExprToken, detail: Option<String>) {
        let indent = self.indent();
        let _ = write!(
            self.out,
            "{offset:08X}  {indent}[{:02X}] {}",
            token.value(),
            token.name()
        );
        if let Some(detail) = detail {
            let _ = write!(self.out, ": {detail}");
        }
        self.out.push('\n');
    }

    fn annotate(&mut self, text: &str) {
        let indent = self.indent();
        let _ = writeln!(self.out, "{:OFFSET_COLUMN$}{indent}{text}", "");
    }

    fn separator(&mut self) {
        self.out.push('\n');
    }

    fn malformed(&self, reason: impl Into<String>) -> DisassemblyError {
        DisassemblyError::MalformedStream {
            offset: self.offset,
            reason: reason.into(),
        }
    }
}

fn child(cx: &mut Context, ex: &Expr) -> Result<()> {
    cx.depth += 1;
    let res = expr(cx, ex);
    cx.depth -= 1;
    res
}

/// Elements followed by the list's closing tag.
fn list(cx: &mut Context, elements: &[Expr]) -> Result<()> {
    for ex in elements {
        child(cx, ex)?;
    }
    cx.skip(TERMINATOR_SIZE);
    Ok(())
}

/// An event stub enters its ubergraph through a single `IntConst` entry point argument.
fn link_event(cx: &mut Context, offset: u32, stack_node: &Option<ObjectRef>, parameters: &[Expr]) {
    if !cx.is_event {
        return;
    }
    if let [Expr::IntConst(entry)] = parameters {
        cx.found.insert(
            *entry,
            EventLink {
                name: cx.function.to_string(),
                offset,
                target: stack_node.as_ref().map(|node| node.name.clone()),
            },
        );
    }
}

fn missing(cx: &Context, token: EExprToken, operand: &str) -> DisassemblyError {
    cx.malformed(format!("{} is missing its {operand}", token.name()))
}

fn hex(value: u32) -> String {
    format!("0x{value:08X}")
}

/// Up to four decimals, trailing zeros dropped.
fn float(value: f64) -> String {
    let s = format!("{value:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" => "0".to_string(),
        s => s.to_string(),
    }
}

fn cast_name(conversion: u8) -> String {
    match conversion {
        0x46 => "ObjectToInterface".to_string(),
        0x47 => "ObjectToBool".to_string(),
        0x49 => "InterfaceToBool".to_string(),
        0x4A => "DoubleToFloat".to_string(),
        0x4B => "FloatToDouble".to_string(),
        other => format!("0x{other:02X}"),
    }
}

fn instrumentation_name(event_type: u8) -> String {
    const NAMES: [&str; 17] = [
        "Class",
        "ClassScope",
        "Instance",
        "Event",
        "InlineEvent",
        "ResumeEvent",
        "PureNodeEntry",
        "NodeDebugSite",
        "NodeEntry",
        "NodeExit",
        "PushState",
        "RestoreState",
        "ResetState",
        "SuspendState",
        "PopState",
        "TunnelEndOfThread",
        "Stop",
    ];
    NAMES
        .get(event_type as usize)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("0x{event_type:02X}"))
}

fn expr(cx: &mut Context, ex: &Expr) -> Result<()> {
    if cx.depth > MAX_DEPTH {
        return Err(cx.malformed(format!("nesting deeper than {MAX_DEPTH}")));
    }
    let offset = cx.offset;
    let token = match ex.token() {
        Some(token) => token,
        None => {
            let token = match ex {
                Expr::Unsupported { token } => *token,
                _ => 0xFF,
            };
            return Err(DisassemblyError::UnsupportedOpcode { token, offset });
        }
    };
    if token.is_terminator() {
        return Err(cx.malformed(format!("{} outside of its list", token.name())));
    }

    if let Some(link) = i32::try_from(offset).ok().and_then(|k| cx.events.get(&k)) {
        let text = format!("Event: {}", link.name);
        cx.annotate(&text);
    }

    cx.skip(1);
    match ex {
        Expr::LocalVariable { variable }
        | Expr::InstanceVariable { variable }
        | Expr::DefaultVariable { variable }
        | Expr::LocalOutVariable { variable }
        | Expr::ClassSparseDataVariable { variable } => {
            cx.line(offset, token, Some(variable.resolve_or_none()));
            cx.skip_pointer();
        }
        Expr::Return { expression } => {
            cx.line(offset, token, None);
            child(cx, expression)?;
        }
        Expr::Jump { code_offset } => {
            cx.line(offset, token, Some(hex(*code_offset)));
            cx.skip_code_offset();
            if cx.depth == 0 {
                cx.separator();
            }
        }
        Expr::JumpIfNot {
            code_offset,
            condition,
        } => {
            cx.line(offset, token, Some(hex(*code_offset)));
            cx.skip_code_offset();
            child(cx, condition)?;
        }
        Expr::Assert {
            line_number,
            debug_mode,
            condition,
        } => {
            cx.line(
                offset,
                token,
                Some(format!("line {line_number}, debug {debug_mode}")),
            );
            cx.skip(2 + 1);
            child(cx, condition)?;
        }
        Expr::NothingInt32 { value } => {
            cx.line(offset, token, Some(value.to_string()));
            cx.skip(4);
        }
        Expr::Let {
            value: _,
            variable,
            expression,
        } => {
            cx.line(offset, token, Some("Variable = Expression".to_string()));
            cx.skip_pointer();
            child(cx, variable)?;
            child(cx, expression)?;
        }
        Expr::LetBool(assignment)
        | Expr::LetObj(assignment)
        | Expr::LetWeakObjPtr(assignment)
        | Expr::LetDelegate(assignment)
        | Expr::LetMulticastDelegate(assignment) => {
            let Assignment {
                variable,
                expression,
            } = assignment;
            cx.line(offset, token, Some("Variable = Expression".to_string()));
            child(cx, variable)?;
            child(cx, expression)?;
        }
        Expr::ClassContext(operands)
        | Expr::Context(operands)
        | Expr::ContextFailSilent(operands) => {
            let ContextOperands {
                object,
                skip_offset,
                r_value,
                context,
            } = operands;
            cx.line(
                offset,
                token,
                Some(format!(
                    "skip {}, r-value {}",
                    hex(*skip_offset),
                    r_value.resolve_or_none()
                )),
            );
            child(cx, object)?;
            cx.skip_code_offset();
            cx.skip_pointer();
            child(cx, context)?;
        }
        Expr::MetaCast { class, target }
        | Expr::DynamicCast { class, target }
        | Expr::ObjToInterfaceCast { class, target }
        | Expr::CrossInterfaceCast { class, target }
        | Expr::InterfaceToObjCast { class, target } => {
            cx.line(offset, token, Some(class.resolve_or_none()));
            cx.skip_pointer();
            child(cx, target)?;
        }
        Expr::PrimitiveCast { conversion, target } => {
            cx.line(offset, token, Some(cast_name(*conversion)));
            cx.skip(1);
            child(cx, target)?;
        }
        Expr::Skip {
            skip_offset,
            expression,
        } => {
            cx.line(offset, token, Some(hex(*skip_offset)));
            cx.skip_code_offset();
            child(cx, expression)?;
        }
        Expr::VirtualFunction { name, parameters }
        | Expr::LocalVirtualFunction { name, parameters } => {
            cx.line(offset, token, Some(name.clone()));
            cx.skip_name();
            list(cx, parameters)?;
        }
        Expr::FinalFunction {
            stack_node,
            parameters,
        }
        | Expr::LocalFinalFunction {
            stack_node,
            parameters,
        } => {
            cx.line(offset, token, Some(stack_node.resolve_or_none()));
            link_event(cx, offset, stack_node, parameters);
            cx.skip_pointer();
            list(cx, parameters)?;
        }
        Expr::CallMath {
            stack_node,
            parameters,
        } => {
            cx.line(offset, token, Some(stack_node.resolve_or_none()));
            cx.skip_pointer();
            list(cx, parameters)?;
        }
        Expr::CallMulticastDelegate {
            stack_node,
            delegate,
            parameters,
        } => {
            cx.line(offset, token, Some(stack_node.resolve_or_none()));
            cx.skip_pointer();
            child(cx, delegate)?;
            list(cx, parameters)?;
        }
        Expr::IntConst(value) => {
            cx.line(offset, token, Some(value.to_string()));
            cx.skip(4);
        }
        Expr::FloatConst(value) => {
            cx.line(offset, token, Some(float(f64::from(*value))));
            cx.skip(4);
        }
        Expr::DoubleConst(value) => {
            cx.line(offset, token, Some(float(*value)));
            cx.skip(8);
        }
        Expr::Int64Const(value) => {
            cx.line(offset, token, Some(value.to_string()));
            cx.skip(8);
        }
        Expr::UInt64Const(value) => {
            cx.line(offset, token, Some(value.to_string()));
            cx.skip(8);
        }
        Expr::StringConst(value) => {
            cx.line(offset, token, Some(format!("\"{value}\"")));
            cx.skip_ansi(value);
        }
        Expr::UnicodeStringConst(value) => {
            cx.line(offset, token, Some(format!("\"{value}\"")));
            cx.skip_unicode(value);
        }
        Expr::NameConst(value) => {
            cx.line(offset, token, Some(value.clone()));
            cx.skip_name();
        }
        Expr::ObjectConst(value) => {
            cx.line(offset, token, Some(value.resolve_or_none()));
            cx.skip_pointer();
        }
        Expr::PropertyConst(property) => {
            cx.line(offset, token, Some(property.resolve_or_none()));
            cx.skip_pointer();
        }
        Expr::ByteConst(value) | Expr::IntConstByte(value) => {
            cx.line(offset, token, Some(format!("0x{value:02X}")));
            cx.skip(1);
        }
        Expr::SkipOffsetConst(value) => {
            cx.line(offset, token, Some(hex(*value)));
            cx.skip_code_offset();
        }
        Expr::RotationConst { pitch, yaw, roll } => {
            cx.line(
                offset,
                token,
                Some(format!(
                    "Pitch={}, Yaw={}, Roll={}",
                    float(*pitch),
                    float(*yaw),
                    float(*roll)
                )),
            );
            cx.skip_coords(3);
        }
        Expr::VectorConst { x, y, z } => {
            cx.line(
                offset,
                token,
                Some(format!("X={}, Y={}, Z={}", float(*x), float(*y), float(*z))),
            );
            cx.skip_coords(3);
        }
        Expr::Vector3fConst { x, y, z } => {
            cx.line(
                offset,
                token,
                Some(format!(
                    "X={}, Y={}, Z={}",
                    float(f64::from(*x)),
                    float(f64::from(*y)),
                    float(f64::from(*z))
                )),
            );
            cx.skip(3 * 4);
        }
        Expr::TransformConst {
            rotation,
            translation,
            scale,
        } => {
            let join = |values: &[f64]| {
                values
                    .iter()
                    .map(|v| float(*v))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            cx.line(
                offset,
                token,
                Some(format!(
                    "Rotation=({}), Translation=({}), Scale=({})",
                    join(rotation),
                    join(translation),
                    join(scale)
                )),
            );
            cx.skip_coords(4 + 3 + 3);
        }
        Expr::TextConst(text) => text_const(cx, offset, token, text)?,
        Expr::StructConst {
            r#struct,
            struct_size,
            members,
        } => {
            cx.line(
                offset,
                token,
                Some(format!("{} (size {struct_size})", r#struct.resolve_or_none())),
            );
            cx.skip_pointer();
            cx.skip(4);
            list(cx, members)?;
        }
        Expr::SetArray {
            assigning_property,
            array_inner_prop,
            elements,
        } => {
            if cx.version.legacy_set_array {
                cx.line(offset, token, Some(array_inner_prop.resolve_or_none()));
                cx.skip_pointer();
            } else {
                let assigning = assigning_property
                    .as_deref()
                    .ok_or_else(|| missing(cx, token, "assigning expression"))?;
                cx.line(offset, token, Some(format!("{} elements", elements.len())));
                child(cx, assigning)?;
            }
            list(cx, elements)?;
        }
        Expr::SetSet { set, elements } => {
            cx.line(offset, token, Some(format!("{} elements", elements.len())));
            child(cx, set)?;
            cx.skip(4);
            list(cx, elements)?;
        }
        Expr::SetMap { map, elements } => {
            cx.line(offset, token, Some(format!("{} entries", elements.len() / 2)));
            child(cx, map)?;
            cx.skip(4);
            list(cx, elements)?;
        }
        Expr::SetConst {
            inner_property,
            elements,
        }
        | Expr::ArrayConst {
            inner_property,
            elements,
        } => {
            cx.line(
                offset,
                token,
                Some(format!(
                    "{} ({} elements)",
                    inner_property.resolve_or_none(),
                    elements.len()
                )),
            );
            cx.skip_pointer();
            cx.skip(4);
            list(cx, elements)?;
        }
        Expr::MapConst {
            key_property,
            value_property,
            elements,
        } => {
            cx.line(
                offset,
                token,
                Some(format!(
                    "{} -> {} ({} entries)",
                    key_property.resolve_or_none(),
                    value_property.resolve_or_none(),
                    elements.len() / 2
                )),
            );
            cx.skip_pointer();
            cx.skip_pointer();
            cx.skip(4);
            list(cx, elements)?;
        }
        Expr::StructMemberContext {
            member,
            struct_expression,
        } => {
            cx.line(offset, token, Some(member.resolve_or_none()));
            cx.skip_pointer();
            child(cx, struct_expression)?;
        }
        Expr::InstanceDelegate { function_name } => {
            cx.line(offset, token, Some(function_name.clone()));
            cx.skip_name();
        }
        Expr::PushExecutionFlow { pushing_address } => {
            cx.line(offset, token, Some(hex(*pushing_address)));
            cx.skip_code_offset();
        }
        Expr::PopExecutionFlow => {
            cx.line(offset, token, None);
            if cx.depth == 0 {
                cx.separator();
            }
        }
        Expr::ComputedJump {
            offset_expression: ex,
        }
        | Expr::PopExecutionFlowIfNot { condition: ex }
        | Expr::InterfaceContext {
            interface_value: ex,
        }
        | Expr::ClearMulticastDelegate { delegate: ex }
        | Expr::SoftObjectConst { value: ex }
        | Expr::FieldPathConst { value: ex } => {
            cx.line(offset, token, None);
            child(cx, ex)?;
        }
        Expr::AddMulticastDelegate {
            delegate,
            delegate_to_add: other,
        }
        | Expr::RemoveMulticastDelegate {
            delegate,
            delegate_to_remove: other,
        } => {
            cx.line(offset, token, None);
            child(cx, delegate)?;
            child(cx, other)?;
        }
        Expr::ArrayGetByRef { array, index } => {
            cx.line(offset, token, None);
            child(cx, array)?;
            child(cx, index)?;
        }
        Expr::BindDelegate {
            function_name,
            delegate,
            object_term,
        } => {
            cx.line(offset, token, Some(function_name.clone()));
            cx.skip_name();
            child(cx, delegate)?;
            child(cx, object_term)?;
        }
        Expr::LetValueOnPersistentFrame {
            destination,
            expression,
        } => {
            cx.line(offset, token, Some(destination.resolve_or_none()));
            cx.skip_pointer();
            child(cx, expression)?;
        }
        Expr::SwitchValue {
            end_goto_offset,
            index,
            cases,
            default,
        } => switch_value(cx, offset, token, *end_goto_offset, index, cases, default)?,
        Expr::InstrumentationEvent {
            event_type,
            event_name,
        } => {
            let mut detail = instrumentation_name(*event_type);
            cx.skip(1);
            if *event_type == INSTRUMENTATION_INLINE_EVENT {
                detail = format!(
                    "{detail} {}",
                    event_name.as_deref().unwrap_or("None")
                );
                cx.skip_name();
            }
            cx.line(offset, token, Some(detail));
        }
        Expr::Nothing
        | Expr::SelfRef
        | Expr::IntZero
        | Expr::IntOne
        | Expr::True
        | Expr::False
        | Expr::NoObject
        | Expr::NoInterface
        | Expr::DeprecatedOp4A
        | Expr::Breakpoint
        | Expr::EndOfScript
        | Expr::WireTracepoint
        | Expr::Tracepoint => {
            cx.line(offset, token, None);
        }
        Expr::EndParmValue
        | Expr::EndFunctionParms
        | Expr::EndStructConst
        | Expr::EndArray
        | Expr::EndSet
        | Expr::EndMap
        | Expr::EndSetConst
        | Expr::EndMapConst
        | Expr::EndArrayConst
        | Expr::Unsupported { .. } => unreachable!("rejected before dispatch"),
    }
    Ok(())
}

fn text_const(cx: &mut Context, offset: u32, token: EExprToken, text: &ScriptText) -> Result<()> {
    let literal_type = TextLiteralType::try_from(text.literal_type).map_err(|value| {
        cx.malformed(format!("unknown text literal type {value}"))
    })?;
    let name: &'static str = literal_type.into();

    match literal_type {
        TextLiteralType::Empty => {
            cx.line(offset, token, Some(name.to_string()));
            cx.skip(1);
        }
        TextLiteralType::LocalizedText => {
            let source = operand(cx, token, &text.localized_source, "localized source")?;
            let key = operand(cx, token, &text.localized_key, "localized key")?;
            let namespace = operand(cx, token, &text.localized_namespace, "localized namespace")?;
            cx.line(offset, token, Some(name.to_string()));
            cx.skip(1);
            child(cx, source)?;
            child(cx, key)?;
            child(cx, namespace)?;
        }
        TextLiteralType::InvariantText => {
            let literal = operand(cx, token, &text.invariant_literal, "invariant literal")?;
            cx.line(offset, token, Some(name.to_string()));
            cx.skip(1);
            child(cx, literal)?;
        }
        TextLiteralType::LiteralString => {
            let literal = operand(cx, token, &text.literal_string, "literal string")?;
            cx.line(offset, token, Some(name.to_string()));
            cx.skip(1);
            child(cx, literal)?;
        }
        TextLiteralType::StringTableEntry => {
            let table_id = operand(cx, token, &text.string_table_id, "string table id")?;
            let key = operand(cx, token, &text.string_table_key, "string table key")?;
            cx.line(
                offset,
                token,
                Some(format!(
                    "{name} {}",
                    text.string_table_asset.resolve_or_none()
                )),
            );
            cx.skip(1);
            cx.skip_pointer();
            child(cx, table_id)?;
            child(cx, key)?;
        }
    }
    Ok(())
}

fn operand<'e>(
    cx: &Context,
    token: EExprToken,
    ex: &'e Option<Box<Expr>>,
    what: &str,
) -> Result<&'e Expr> {
    ex.as_deref().ok_or_else(|| missing(cx, token, what))
}

fn switch_value(
    cx: &mut Context,
    offset: u32,
    token: EExprToken,
    end_goto_offset: u32,
    index: &Expr,
    cases: &[SwitchCase],
    default: &Expr,
) -> Result<()> {
    cx.line(
        offset,
        token,
        Some(format!("{} cases, end {}", cases.len(), hex(end_goto_offset))),
    );
    // case count (u16) and end offset
    cx.skip(2);
    cx.skip_code_offset();
    child(cx, index)?;
    cx.depth += 1;
    for case in cases {
        let text = format!("Case: next {}", hex(case.next_offset));
        cx.annotate(&text);
        child(cx, &case.value)?;
        cx.skip_code_offset();
        child(cx, &case.term)?;
    }
    cx.annotate("Default:");
    cx.depth -= 1;
    child(cx, default)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::asset::{FieldPath, ObjectRef, PropertyRef};

    const UE4: ScriptVersion = ScriptVersion {
        large_world_coordinates: false,
        legacy_set_array: false,
    };
    const UE5: ScriptVersion = ScriptVersion {
        large_world_coordinates: true,
        legacy_set_array: false,
    };

    fn function<'a>(name: &'a str, bytecode: &'a [Expr]) -> ScriptFunction<'a> {
        ScriptFunction {
            name,
            is_event: false,
            bytecode: Some(bytecode),
        }
    }

    fn run(bytecode: &[Expr], version: ScriptVersion) -> Disassembly {
        disassemble(function("Test", bytecode), version, &EventLinks::new()).unwrap()
    }

    fn local(name: &str) -> Expr {
        Expr::LocalVariable {
            variable: PropertyRef::Field(FieldPath::new([name])),
        }
    }

    #[test]
    fn test_line_format() {
        let code = [
            Expr::Let {
                value: PropertyRef::field(["Temp"]),
                variable: local("Temp").into(),
                expression: Expr::IntConst(5).into(),
            },
            Expr::Return {
                expression: Expr::Nothing.into(),
            },
            Expr::EndOfScript,
        ];
        let dis = run(&code, UE4);
        assert_eq!(
            dis.text,
            "00000000  [0F] Let: Variable = Expression\n\
             00000009    [00] LocalVariable: Temp\n\
             00000012    [1D] IntConst: 5\n\
             00000017  [04] Return\n\
             00000018    [0B] Nothing\n\
             00000019  [53] EndOfScript\n"
        );
        assert_eq!(dis.size, 0x1A);
    }

    #[test]
    fn test_coordinate_width() {
        let code = [Expr::VectorConst {
            x: 1.0,
            y: 2.5,
            z: -3.0,
        }];
        assert_eq!(run(&code, UE4).size, 1 + 12);
        assert_eq!(run(&code, UE5).size, 1 + 24);

        let code = [Expr::TransformConst {
            rotation: [0.0, 0.0, 0.0, 1.0],
            translation: [0.0; 3],
            scale: [1.0; 3],
        }];
        assert_eq!(run(&code, UE4).size, 1 + 40);
        assert_eq!(run(&code, UE5).size, 1 + 80);

        let code = [Expr::Vector3fConst {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }];
        assert_eq!(run(&code, UE5).size, 1 + 12);
    }

    #[test]
    fn test_float_format() {
        assert_eq!(float(1.5), "1.5");
        assert_eq!(float(2.0), "2");
        assert_eq!(float(0.123456), "0.1235");
        assert_eq!(float(-0.00001), "0");
        assert_eq!(float(f64::from(0.1f32)), "0.1");
    }

    #[test]
    fn test_string_sizes() {
        let code = [Expr::StringConst("abc".to_string())];
        assert_eq!(run(&code, UE4).size, 1 + 4);
        let code = [Expr::UnicodeStringConst("abc".to_string())];
        assert_eq!(run(&code, UE4).size, 1 + 8);
        let code = [Expr::NameConst("None".to_string())];
        assert_eq!(run(&code, UE4).size, 1 + 12);
    }

    #[test]
    fn test_call_parameter_list() {
        let params = vec![Expr::IntConst(1), Expr::True, local("A")];
        let code = [Expr::CallMath {
            stack_node: Some(ObjectRef::with_outer("Add_IntInt", "KismetMathLibrary")),
            parameters: params,
        }];
        let dis = run(&code, UE4);
        // tag + stack node + (5 + 1 + 9) + terminator
        assert_eq!(dis.size, 1 + 8 + 15 + 1);
        assert!(dis
            .text
            .starts_with("00000000  [68] CallMath: KismetMathLibrary::Add_IntInt\n"));
        assert!(dis.text.contains("0000000E    [27] True\n"));
    }

    #[test]
    fn test_list_terminator_accounting() {
        for n in 0..6 {
            let elements = vec![Expr::IntConst(7); n];
            let code = [Expr::ArrayConst {
                inner_property: PropertyRef::field(["Inner"]),
                elements,
            }];
            let dis = run(&code, UE4);
            assert_eq!(dis.size, 1 + 8 + 4 + 5 * n as u32 + 1);
        }
    }

    #[test]
    fn test_jump_separator() {
        let code = [
            Expr::Jump { code_offset: 0x10 },
            Expr::PopExecutionFlow,
            Expr::JumpIfNot {
                code_offset: 0x20,
                condition: Expr::False.into(),
            },
        ];
        let dis = run(&code, UE4);
        assert_eq!(
            dis.text,
            "00000000  [06] Jump: 0x00000010\n\
             \n\
             00000005  [4D] PopExecutionFlow\n\
             \n\
             00000006  [07] JumpIfNot: 0x00000020\n\
             0000000B    [28] False\n"
        );
    }

    #[test]
    fn test_unsupported_opcode() {
        let code = [Expr::True, Expr::Unsupported { token: 0x7E }];
        let err = disassemble(function("Bad", &code), UE4, &EventLinks::new()).unwrap_err();
        assert_eq!(
            err,
            DisassemblyError::UnsupportedOpcode {
                token: 0x7E,
                offset: 1
            }
        );
    }

    #[test]
    fn test_terminator_outside_list() {
        let code = [Expr::Return {
            expression: Expr::EndFunctionParms.into(),
        }];
        let err = disassemble(function("Bad", &code), UE4, &EventLinks::new()).unwrap_err();
        assert!(matches!(err, DisassemblyError::MalformedStream { offset: 1, .. }));

        let code = [Expr::VirtualFunction {
            name: "Foo".to_string(),
            parameters: vec![Expr::EndParmValue],
        }];
        let err = disassemble(function("Bad", &code), UE4, &EventLinks::new()).unwrap_err();
        assert!(matches!(err, DisassemblyError::MalformedStream { .. }));
    }

    #[test]
    fn test_bytecode_unavailable() {
        let f = ScriptFunction {
            name: "NotLoaded",
            is_event: false,
            bytecode: None,
        };
        assert_eq!(
            disassemble(f, UE4, &EventLinks::new()).unwrap_err(),
            DisassemblyError::BytecodeUnavailable {
                function: "NotLoaded".to_string()
            }
        );
    }

    #[test]
    fn test_text_const() {
        let text = ScriptText {
            literal_type: TextLiteralType::LocalizedText as u8,
            localized_source: Some(Expr::StringConst("Hi".to_string()).into()),
            localized_key: Some(Expr::StringConst("K".to_string()).into()),
            localized_namespace: Some(Expr::StringConst("".to_string()).into()),
            ..Default::default()
        };
        let dis = run(&[Expr::TextConst(text)], UE4);
        assert_eq!(dis.size, 1 + 1 + (1 + 3) + (1 + 2) + (1 + 1));
        assert!(dis.text.starts_with("00000000  [29] TextConst: LocalizedText\n"));

        let bad = ScriptText {
            literal_type: 9,
            ..Default::default()
        };
        let err = disassemble(function("Bad", &[Expr::TextConst(bad)]), UE4, &EventLinks::new())
            .unwrap_err();
        assert!(matches!(err, DisassemblyError::MalformedStream { .. }));
    }

    #[test]
    fn test_legacy_set_array() {
        let code = [Expr::SetArray {
            assigning_property: None,
            array_inner_prop: Some(ObjectRef::new("Inner")),
            elements: vec![Expr::IntZero],
        }];
        let legacy = ScriptVersion {
            large_world_coordinates: false,
            legacy_set_array: true,
        };
        assert_eq!(run(&code, legacy).size, 1 + 8 + 1 + 1);
        let err = disassemble(function("Bad", &code), UE4, &EventLinks::new()).unwrap_err();
        assert!(matches!(err, DisassemblyError::MalformedStream { .. }));
    }

    #[test]
    fn test_switch_value() {
        let code = [Expr::SwitchValue {
            end_goto_offset: 0x40,
            index: local("Index").into(),
            cases: vec![SwitchCase {
                value: Expr::IntZero,
                next_offset: 0x30,
                term: Expr::StringConst("a".to_string()),
            }],
            default: Expr::StringConst("b".to_string()).into(),
        }];
        let dis = run(&code, UE4);
        assert_eq!(dis.size, 1 + 2 + 4 + 9 + (1 + 4 + 3) + 3);
        assert!(dis.text.contains("    Case: next 0x00000030\n"));
        assert!(dis.text.contains("    Default:\n"));
    }

    #[test]
    fn test_event_linkage() {
        let stub = [
            Expr::FinalFunction {
                stack_node: Some(ObjectRef::new("ExecuteUbergraph_BP_Test")),
                parameters: vec![Expr::IntConst(15)],
            },
            Expr::Return {
                expression: Expr::Nothing.into(),
            },
        ];
        let event = ScriptFunction {
            name: "ReceiveBeginPlay",
            is_event: true,
            bytecode: Some(&stub),
        };
        let dis = disassemble(event, UE4, &EventLinks::new()).unwrap();
        assert_eq!(
            dis.links.get(&15),
            Some(&EventLink {
                name: "ReceiveBeginPlay".to_string(),
                offset: 0,
                target: Some("ExecuteUbergraph_BP_Test".to_string()),
            })
        );

        // three 5 byte statements put the fourth at offset 15
        let graph = [
            Expr::IntConst(0),
            Expr::IntConst(1),
            Expr::IntConst(2),
            Expr::IntConst(3),
        ];
        let dis = disassemble(function("ExecuteUbergraph_BP_Test", &graph), UE4, &dis.links)
            .unwrap();
        assert!(dis.text.contains(
            "0000000A  [1D] IntConst: 2\n          Event: ReceiveBeginPlay\n0000000F  [1D] IntConst: 3\n"
        ));
    }

    #[test]
    fn test_no_linkage_outside_events() {
        let stub = [Expr::FinalFunction {
            stack_node: Some(ObjectRef::new("ExecuteUbergraph_BP_Test")),
            parameters: vec![Expr::IntConst(15)],
        }];
        assert!(run(&stub, UE4).links.is_empty());

        let stub = [Expr::FinalFunction {
            stack_node: Some(ObjectRef::new("ExecuteUbergraph_BP_Test")),
            parameters: vec![Expr::IntConst(15), Expr::True],
        }];
        let event = ScriptFunction {
            name: "ReceiveTick",
            is_event: true,
            bytecode: Some(&stub),
        };
        let dis = disassemble(event, UE4, &EventLinks::new()).unwrap();
        assert!(dis.links.is_empty());
    }

    #[test]
    fn test_local_final_function_linkage() {
        let stub = [
            Expr::LocalFinalFunction {
                stack_node: Some(ObjectRef::new("ExecuteUbergraph_BP_Test")),
                parameters: vec![Expr::IntConst(15)],
            },
            Expr::Return {
                expression: Expr::Nothing.into(),
            },
        ];
        let event = ScriptFunction {
            name: "ReceiveTick",
            is_event: true,
            bytecode: Some(&stub),
        };
        let dis = disassemble(event, UE4, &EventLinks::new()).unwrap();
        assert_eq!(
            dis.links.get(&15),
            Some(&EventLink {
                name: "ReceiveTick".to_string(),
                offset: 0,
                target: Some("ExecuteUbergraph_BP_Test".to_string()),
            })
        );

        let math = [Expr::CallMath {
            stack_node: Some(ObjectRef::new("Add_IntInt")),
            parameters: vec![Expr::IntConst(15)],
        }];
        let event = ScriptFunction {
            name: "ReceiveTick",
            is_event: true,
            bytecode: Some(&math),
        };
        assert!(disassemble(event, UE4, &EventLinks::new())
            .unwrap()
            .links
            .is_empty());
    }

    #[test]
    fn test_latin1_string_size() {
        let code = [Expr::StringConst("café".to_string()), Expr::True];
        let dis = run(&code, UE4);
        assert_eq!(dis.size, 1 + 4 + 1 + 1);
        assert!(dis.text.ends_with("00000006  [27] True\n"));
    }

    #[test]
    fn test_depth_cap() {
        let nested = |levels: usize| {
            (0..levels).fold(Expr::Nothing, |inner, _| Expr::Return {
                expression: inner.into(),
            })
        };

        let dis = run(&[nested(MAX_DEPTH)], UE4);
        assert_eq!(dis.size, MAX_DEPTH as u32 + 1);

        let err = disassemble(function("Deep", &[nested(MAX_DEPTH + 1)]), UE4, &EventLinks::new())
            .unwrap_err();
        assert!(matches!(err, DisassemblyError::MalformedStream { .. }));
    }

    #[test]
    fn test_deterministic() {
        let code = [
            Expr::Context(ContextOperands {
                object: Expr::SelfRef.into(),
                skip_offset: 0x11,
                r_value: PropertyRef::Object(None),
                context: Expr::VirtualFunction {
                    name: "K2_DestroyActor".to_string(),
                    parameters: vec![],
                }
                .into(),
            }),
            Expr::EndOfScript,
        ];
        let a = run(&code, UE5);
        let b = run(&code, UE5);
        assert_eq!(a, b);
        assert_eq!(a.size, 1 + 1 + 4 + 8 + (1 + 12 + 1) + 1);
    }

    /// Minimal linear congruential generator so the tree shapes are reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: u64) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 33) % bound
        }
    }

    /// Builds a random tree of fixed-size opcodes, returning it with its expected size.
    fn random_tree(rng: &mut Lcg, depth: u32) -> (Expr, u32) {
        let leaf = depth == 0 || rng.next(3) == 0;
        if leaf {
            return match rng.next(6) {
                0 => (Expr::IntConst(1), 5),
                1 => (Expr::True, 1),
                2 => (Expr::Int64Const(-1), 9),
                3 => (local("L"), 9),
                4 => (Expr::NameConst("N".to_string()), 13),
                _ => (Expr::ObjectConst(None), 9),
            };
        }
        match rng.next(4) {
            0 => {
                let (inner, size) = random_tree(rng, depth - 1);
                (
                    Expr::Return {
                        expression: inner.into(),
                    },
                    1 + size,
                )
            }
            1 => {
                let (inner, size) = random_tree(rng, depth - 1);
                (
                    Expr::JumpIfNot {
                        code_offset: 0,
                        condition: inner.into(),
                    },
                    1 + 4 + size,
                )
            }
            2 => {
                let (a, sa) = random_tree(rng, depth - 1);
                let (b, sb) = random_tree(rng, depth - 1);
                (
                    Expr::Let {
                        value: PropertyRef::Object(None),
                        variable: a.into(),
                        expression: b.into(),
                    },
                    1 + 8 + sa + sb,
                )
            }
            _ => {
                let count = rng.next(4);
                let mut size = 1 + 8 + 1;
                let mut parameters = vec![];
                for _ in 0..count {
                    let (p, sp) = random_tree(rng, depth - 1);
                    size += sp;
                    parameters.push(p);
                }
                (
                    Expr::CallMath {
                        stack_node: None,
                        parameters,
                    },
                    size,
                )
            }
        }
    }

    #[test]
    fn test_random_fixed_size_trees() {
        let mut rng = Lcg(0x5eed);
        for _ in 0..200 {
            let mut code = vec![];
            let mut expected = 0;
            for _ in 0..rng.next(5) + 1 {
                let (ex, size) = random_tree(&mut rng, 5);
                expected += size;
                code.push(ex);
            }
            let dis = run(&code, UE4);
            assert_eq!(dis.size, expected);

            let offsets = dis
                .text
                .lines()
                .filter(|l| !l.is_empty())
                .map(|l| u32::from_str_radix(&l[..8], 16).unwrap())
                .collect::<Vec<_>>();
            assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
