//! Blueprint script bytecode: the closed instruction set and its disassembler.

pub mod disasm;

use serde::{Deserialize, Serialize};

use crate::asset::{ObjectRef, PropertyRef};

pub use crate::error::DisassemblyError;
pub use disasm::{disassemble, Disassembly, EventLink, EventLinks, ScriptFunction};

/// `ObjectVersion::VER_UE4_CHANGE_SETARRAY_BYTECODE`
const VER_UE4_CHANGE_SETARRAY_BYTECODE: i32 = 434;
/// `ObjectVersionUE5::LARGE_WORLD_COORDINATES`
const VER_UE5_LARGE_WORLD_COORDINATES: i32 = 1004;

/// Version-dependent encoding switches of one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptVersion {
    /// Vector/rotator/transform components are doubles instead of floats.
    pub large_world_coordinates: bool,
    /// `SetArray` carries the inner property instead of an assigning expression.
    pub legacy_set_array: bool,
}

impl ScriptVersion {
    pub fn new(object_version: i32, object_version_ue5: i32) -> Self {
        Self {
            large_world_coordinates: object_version_ue5 >= VER_UE5_LARGE_WORLD_COORDINATES,
            legacy_set_array: object_version < VER_UE4_CHANGE_SETARRAY_BYTECODE,
        }
    }
}

/// Opcode tags of the script VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::IntoStaticStr)]
#[repr(u8)]
pub enum EExprToken {
    ExLocalVariable = 0x00,
    ExInstanceVariable = 0x01,
    ExDefaultVariable = 0x02,
    ExReturn = 0x04,
    ExJump = 0x06,
    ExJumpIfNot = 0x07,
    ExAssert = 0x09,
    ExNothing = 0x0B,
    ExNothingInt32 = 0x0C,
    ExLet = 0x0F,
    ExClassContext = 0x12,
    ExMetaCast = 0x13,
    ExLetBool = 0x14,
    ExEndParmValue = 0x15,
    ExEndFunctionParms = 0x16,
    ExSelf = 0x17,
    ExSkip = 0x18,
    ExContext = 0x19,
    ExContextFailSilent = 0x1A,
    ExVirtualFunction = 0x1B,
    ExFinalFunction = 0x1C,
    ExIntConst = 0x1D,
    ExFloatConst = 0x1E,
    ExStringConst = 0x1F,
    ExObjectConst = 0x20,
    ExNameConst = 0x21,
    ExRotationConst = 0x22,
    ExVectorConst = 0x23,
    ExByteConst = 0x24,
    ExIntZero = 0x25,
    ExIntOne = 0x26,
    ExTrue = 0x27,
    ExFalse = 0x28,
    ExTextConst = 0x29,
    ExNoObject = 0x2A,
    ExTransformConst = 0x2B,
    ExIntConstByte = 0x2C,
    ExNoInterface = 0x2D,
    ExDynamicCast = 0x2E,
    ExStructConst = 0x2F,
    ExEndStructConst = 0x30,
    ExSetArray = 0x31,
    ExEndArray = 0x32,
    ExPropertyConst = 0x33,
    ExUnicodeStringConst = 0x34,
    ExInt64Const = 0x35,
    ExUInt64Const = 0x36,
    ExDoubleConst = 0x37,
    ExPrimitiveCast = 0x38,
    ExSetSet = 0x39,
    ExEndSet = 0x3A,
    ExSetMap = 0x3B,
    ExEndMap = 0x3C,
    ExSetConst = 0x3D,
    ExEndSetConst = 0x3E,
    ExMapConst = 0x3F,
    ExEndMapConst = 0x40,
    ExVector3fConst = 0x41,
    ExStructMemberContext = 0x42,
    ExLetMulticastDelegate = 0x43,
    ExLetDelegate = 0x44,
    ExLocalVirtualFunction = 0x45,
    ExLocalFinalFunction = 0x46,
    ExLocalOutVariable = 0x48,
    ExDeprecatedOp4A = 0x4A,
    ExInstanceDelegate = 0x4B,
    ExPushExecutionFlow = 0x4C,
    ExPopExecutionFlow = 0x4D,
    ExComputedJump = 0x4E,
    ExPopExecutionFlowIfNot = 0x4F,
    ExBreakpoint = 0x50,
    ExInterfaceContext = 0x51,
    ExObjToInterfaceCast = 0x52,
    ExEndOfScript = 0x53,
    ExCrossInterfaceCast = 0x54,
    ExInterfaceToObjCast = 0x55,
    ExWireTracepoint = 0x5A,
    ExSkipOffsetConst = 0x5B,
    ExAddMulticastDelegate = 0x5C,
    ExClearMulticastDelegate = 0x5D,
    ExTracepoint = 0x5E,
    ExLetObj = 0x5F,
    ExLetWeakObjPtr = 0x60,
    ExBindDelegate = 0x61,
    ExRemoveMulticastDelegate = 0x62,
    ExCallMulticastDelegate = 0x63,
    ExLetValueOnPersistentFrame = 0x64,
    ExArrayConst = 0x65,
    ExEndArrayConst = 0x66,
    ExSoftObjectConst = 0x67,
    ExCallMath = 0x68,
    ExSwitchValue = 0x69,
    ExInstrumentationEvent = 0x6A,
    ExArrayGetByRef = 0x6B,
    ExClassSparseDataVariable = 0x6C,
    ExFieldPathConst = 0x6D,
}

impl EExprToken {
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Opcode name without the `Ex` prefix.
    pub fn name(self) -> &'static str {
        let name: &'static str = self.into();
        name.strip_prefix("Ex").unwrap_or(name)
    }

    /// Closing tags of variable-length operand lists.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            EExprToken::ExEndParmValue
                | EExprToken::ExEndFunctionParms
                | EExprToken::ExEndStructConst
                | EExprToken::ExEndArray
                | EExprToken::ExEndSet
                | EExprToken::ExEndMap
                | EExprToken::ExEndSetConst
                | EExprToken::ExEndMapConst
                | EExprToken::ExEndArrayConst
        )
    }
}

/// Operands shared by `Context`, `ContextFailSilent` and `ClassContext`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextOperands {
    pub object: Box<Expr>,
    pub skip_offset: u32,
    pub r_value: PropertyRef,
    pub context: Box<Expr>,
}

/// Operands shared by the typed assignment opcodes (`LetBool`, `LetObj`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub variable: Box<Expr>,
    pub expression: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub value: Expr,
    pub next_offset: u32,
    pub term: Expr,
}

/// `EBlueprintTextLiteralType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr)]
#[repr(u8)]
pub enum TextLiteralType {
    Empty = 0,
    LocalizedText = 1,
    InvariantText = 2,
    LiteralString = 3,
    StringTableEntry = 4,
}

impl TryFrom<u8> for TextLiteralType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Empty,
            1 => Self::LocalizedText,
            2 => Self::InvariantText,
            3 => Self::LiteralString,
            4 => Self::StringTableEntry,
            other => return Err(other),
        })
    }
}

/// `FScriptText`. Which operands are present depends on `literal_type`; it stays a raw
/// byte so that out-of-range values coming from a provider can be reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptText {
    pub literal_type: u8,
    #[serde(default)]
    pub localized_source: Option<Box<Expr>>,
    #[serde(default)]
    pub localized_key: Option<Box<Expr>>,
    #[serde(default)]
    pub localized_namespace: Option<Box<Expr>>,
    #[serde(default)]
    pub invariant_literal: Option<Box<Expr>>,
    #[serde(default)]
    pub literal_string: Option<Box<Expr>>,
    #[serde(default)]
    pub string_table_asset: Option<ObjectRef>,
    #[serde(default)]
    pub string_table_id: Option<Box<Expr>>,
    #[serde(default)]
    pub string_table_key: Option<Box<Expr>>,
}

/// One decoded script instruction together with its operands.
///
/// Variable-length operand lists (call parameters, struct members, container elements)
/// hold only their elements: the closing tag is implied by the owning list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    LocalVariable {
        variable: PropertyRef,
    },
    InstanceVariable {
        variable: PropertyRef,
    },
    DefaultVariable {
        variable: PropertyRef,
    },
    Return {
        expression: Box<Expr>,
    },
    Jump {
        code_offset: u32,
    },
    JumpIfNot {
        code_offset: u32,
        condition: Box<Expr>,
    },
    Assert {
        line_number: u16,
        debug_mode: bool,
        condition: Box<Expr>,
    },
    Nothing,
    NothingInt32 {
        value: i32,
    },
    Let {
        value: PropertyRef,
        variable: Box<Expr>,
        expression: Box<Expr>,
    },
    ClassContext(ContextOperands),
    MetaCast {
        class: Option<ObjectRef>,
        target: Box<Expr>,
    },
    LetBool(Assignment),
    EndParmValue,
    EndFunctionParms,
    #[serde(rename = "Self")]
    SelfRef,
    Skip {
        skip_offset: u32,
        expression: Box<Expr>,
    },
    Context(ContextOperands),
    ContextFailSilent(ContextOperands),
    VirtualFunction {
        name: String,
        parameters: Vec<Expr>,
    },
    FinalFunction {
        stack_node: Option<ObjectRef>,
        parameters: Vec<Expr>,
    },
    IntConst(i32),
    FloatConst(f32),
    StringConst(String),
    ObjectConst(Option<ObjectRef>),
    NameConst(String),
    RotationConst {
        pitch: f64,
        yaw: f64,
        roll: f64,
    },
    VectorConst {
        x: f64,
        y: f64,
        z: f64,
    },
    ByteConst(u8),
    IntZero,
    IntOne,
    True,
    False,
    TextConst(ScriptText),
    NoObject,
    TransformConst {
        rotation: [f64; 4],
        translation: [f64; 3],
        scale: [f64; 3],
    },
    IntConstByte(u8),
    NoInterface,
    DynamicCast {
        class: Option<ObjectRef>,
        target: Box<Expr>,
    },
    StructConst {
        r#struct: Option<ObjectRef>,
        struct_size: i32,
        members: Vec<Expr>,
    },
    EndStructConst,
    SetArray {
        /// Present for current assets.
        #[serde(default)]
        assigning_property: Option<Box<Expr>>,
        /// Present for assets predating the `SetArray` encoding change.
        #[serde(default)]
        array_inner_prop: Option<ObjectRef>,
        elements: Vec<Expr>,
    },
    EndArray,
    PropertyConst(PropertyRef),
    UnicodeStringConst(String),
    Int64Const(i64),
    UInt64Const(u64),
    DoubleConst(f64),
    PrimitiveCast {
        conversion: u8,
        target: Box<Expr>,
    },
    SetSet {
        set: Box<Expr>,
        elements: Vec<Expr>,
    },
    EndSet,
    /// `elements` alternates key and value.
    SetMap {
        map: Box<Expr>,
        elements: Vec<Expr>,
    },
    EndMap,
    SetConst {
        inner_property: PropertyRef,
        elements: Vec<Expr>,
    },
    EndSetConst,
    /// `elements` alternates key and value.
    MapConst {
        key_property: PropertyRef,
        value_property: PropertyRef,
        elements: Vec<Expr>,
    },
    EndMapConst,
    Vector3fConst {
        x: f32,
        y: f32,
        z: f32,
    },
    StructMemberContext {
        member: PropertyRef,
        struct_expression: Box<Expr>,
    },
    LetMulticastDelegate(Assignment),
    LetDelegate(Assignment),
    LocalVirtualFunction {
        name: String,
        parameters: Vec<Expr>,
    },
    LocalFinalFunction {
        stack_node: Option<ObjectRef>,
        parameters: Vec<Expr>,
    },
    LocalOutVariable {
        variable: PropertyRef,
    },
    DeprecatedOp4A,
    InstanceDelegate {
        function_name: String,
    },
    PushExecutionFlow {
        pushing_address: u32,
    },
    PopExecutionFlow,
    ComputedJump {
        offset_expression: Box<Expr>,
    },
    PopExecutionFlowIfNot {
        condition: Box<Expr>,
    },
    Breakpoint,
    InterfaceContext {
        interface_value: Box<Expr>,
    },
    ObjToInterfaceCast {
        class: Option<ObjectRef>,
        target: Box<Expr>,
    },
    EndOfScript,
    CrossInterfaceCast {
        class: Option<ObjectRef>,
        target: Box<Expr>,
    },
    InterfaceToObjCast {
        class: Option<ObjectRef>,
        target: Box<Expr>,
    },
    WireTracepoint,
    SkipOffsetConst(u32),
    AddMulticastDelegate {
        delegate: Box<Expr>,
        delegate_to_add: Box<Expr>,
    },
    ClearMulticastDelegate {
        delegate: Box<Expr>,
    },
    Tracepoint,
    LetObj(Assignment),
    LetWeakObjPtr(Assignment),
    BindDelegate {
        function_name: String,
        delegate: Box<Expr>,
        object_term: Box<Expr>,
    },
    RemoveMulticastDelegate {
        delegate: Box<Expr>,
        delegate_to_remove: Box<Expr>,
    },
    CallMulticastDelegate {
        stack_node: Option<ObjectRef>,
        delegate: Box<Expr>,
        parameters: Vec<Expr>,
    },
    LetValueOnPersistentFrame {
        destination: PropertyRef,
        expression: Box<Expr>,
    },
    ArrayConst {
        inner_property: PropertyRef,
        elements: Vec<Expr>,
    },
    EndArrayConst,
    SoftObjectConst {
        value: Box<Expr>,
    },
    CallMath {
        stack_node: Option<ObjectRef>,
        parameters: Vec<Expr>,
    },
    SwitchValue {
        end_goto_offset: u32,
        index: Box<Expr>,
        cases: Vec<SwitchCase>,
        default: Box<Expr>,
    },
    /// `event_name` is only serialized for inline events.
    InstrumentationEvent {
        event_type: u8,
        #[serde(default)]
        event_name: Option<String>,
    },
    ArrayGetByRef {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    ClassSparseDataVariable {
        variable: PropertyRef,
    },
    FieldPathConst {
        value: Box<Expr>,
    },
    /// Tag the provider decoded but could not map onto the table above.
    Unsupported {
        token: u8,
    },
}

impl Expr {
    /// `None` for [`Expr::Unsupported`].
    pub fn token(&self) -> Option<EExprToken> {
        use EExprToken as T;
        Some(match self {
            Expr::LocalVariable { .. } => T::ExLocalVariable,
            Expr::InstanceVariable { .. } => T::ExInstanceVariable,
            Expr::DefaultVariable { .. } => T::ExDefaultVariable,
            Expr::Return { .. } => T::ExReturn,
            Expr::Jump { .. } => T::ExJump,
            Expr::JumpIfNot { .. } => T::ExJumpIfNot,
            Expr::Assert { .. } => T::ExAssert,
            Expr::Nothing => T::ExNothing,
            Expr::NothingInt32 { .. } => T::ExNothingInt32,
            Expr::Let { .. } => T::ExLet,
            Expr::ClassContext(_) => T::ExClassContext,
            Expr::MetaCast { .. } => T::ExMetaCast,
            Expr::LetBool(_) => T::ExLetBool,
            Expr::EndParmValue => T::ExEndParmValue,
            Expr::EndFunctionParms => T::ExEndFunctionParms,
            Expr::SelfRef => T::ExSelf,
            Expr::Skip { .. } => T::ExSkip,
            Expr::Context(_) => T::ExContext,
            Expr::ContextFailSilent(_) => T::ExContextFailSilent,
            Expr::VirtualFunction { .. } => T::ExVirtualFunction,
            Expr::FinalFunction { .. } => T::ExFinalFunction,
            Expr::IntConst(_) => T::ExIntConst,
            Expr::FloatConst(_) => T::ExFloatConst,
            Expr::StringConst(_) => T::ExStringConst,
            Expr::ObjectConst(_) => T::ExObjectConst,
            Expr::NameConst(_) => T::ExNameConst,
            Expr::RotationConst { .. } => T::ExRotationConst,
            Expr::VectorConst { .. } => T::ExVectorConst,
            Expr::ByteConst(_) => T::ExByteConst,
            Expr::IntZero => T::ExIntZero,
            Expr::IntOne => T::ExIntOne,
            Expr::True => T::ExTrue,
            Expr::False => T::ExFalse,
            Expr::TextConst(_) => T::ExTextConst,
            Expr::NoObject => T::ExNoObject,
            Expr::TransformConst { .. } => T::ExTransformConst,
            Expr::IntConstByte(_) => T::ExIntConstByte,
            Expr::NoInterface => T::ExNoInterface,
            Expr::DynamicCast { .. } => T::ExDynamicCast,
            Expr::StructConst { .. } => T::ExStructConst,
            Expr::EndStructConst => T::ExEndStructConst,
            Expr::SetArray { .. } => T::ExSetArray,
            Expr::EndArray => T::ExEndArray,
            Expr::PropertyConst(_) => T::ExPropertyConst,
            Expr::UnicodeStringConst(_) => T::ExUnicodeStringConst,
            Expr::Int64Const(_) => T::ExInt64Const,
            Expr::UInt64Const(_) => T::ExUInt64Const,
            Expr::DoubleConst(_) => T::ExDoubleConst,
            Expr::PrimitiveCast { .. } => T::ExPrimitiveCast,
            Expr::SetSet { .. } => T::ExSetSet,
            Expr::EndSet => T::ExEndSet,
            Expr::SetMap { .. } => T::ExSetMap,
            Expr::EndMap => T::ExEndMap,
            Expr::SetConst { .. } => T::ExSetConst,
            Expr::EndSetConst => T::ExEndSetConst,
            Expr::MapConst { .. } => T::ExMapConst,
            Expr::EndMapConst => T::ExEndMapConst,
            Expr::Vector3fConst { .. } => T::ExVector3fConst,
            Expr::StructMemberContext { .. } => T::ExStructMemberContext,
            Expr::LetMulticastDelegate(_) => T::ExLetMulticastDelegate,
            Expr::LetDelegate(_) => T::ExLetDelegate,
            Expr::LocalVirtualFunction { .. } => T::ExLocalVirtualFunction,
            Expr::LocalFinalFunction { .. } => T::ExLocalFinalFunction,
            Expr::LocalOutVariable { .. } => T::ExLocalOutVariable,
            Expr::DeprecatedOp4A => T::ExDeprecatedOp4A,
            Expr::InstanceDelegate { .. } => T::ExInstanceDelegate,
            Expr::PushExecutionFlow { .. } => T::ExPushExecutionFlow,
            Expr::PopExecutionFlow => T::ExPopExecutionFlow,
            Expr::ComputedJump { .. } => T::ExComputedJump,
            Expr::PopExecutionFlowIfNot { .. } => T::ExPopExecutionFlowIfNot,
            Expr::Breakpoint => T::ExBreakpoint,
            Expr::InterfaceContext { .. } => T::ExInterfaceContext,
            Expr::ObjToInterfaceCast { .. } => T::ExObjToInterfaceCast,
            Expr::EndOfScript => T::ExEndOfScript,
            Expr::CrossInterfaceCast { .. } => T::ExCrossInterfaceCast,
            Expr::InterfaceToObjCast { .. } => T::ExInterfaceToObjCast,
            Expr::WireTracepoint => T::ExWireTracepoint,
            Expr::SkipOffsetConst(_) => T::ExSkipOffsetConst,
            Expr::AddMulticastDelegate { .. } => T::ExAddMulticastDelegate,
            Expr::ClearMulticastDelegate { .. } => T::ExClearMulticastDelegate,
            Expr::Tracepoint => T::ExTracepoint,
            Expr::LetObj(_) => T::ExLetObj,
            Expr::LetWeakObjPtr(_) => T::ExLetWeakObjPtr,
            Expr::BindDelegate { .. } => T::ExBindDelegate,
            Expr::RemoveMulticastDelegate { .. } => T::ExRemoveMulticastDelegate,
            Expr::CallMulticastDelegate { .. } => T::ExCallMulticastDelegate,
            Expr::LetValueOnPersistentFrame { .. } => T::ExLetValueOnPersistentFrame,
            Expr::ArrayConst { .. } => T::ExArrayConst,
            Expr::EndArrayConst => T::ExEndArrayConst,
            Expr::SoftObjectConst { .. } => T::ExSoftObjectConst,
            Expr::CallMath { .. } => T::ExCallMath,
            Expr::SwitchValue { .. } => T::ExSwitchValue,
            Expr::InstrumentationEvent { .. } => T::ExInstrumentationEvent,
            Expr::ArrayGetByRef { .. } => T::ExArrayGetByRef,
            Expr::ClassSparseDataVariable { .. } => T::ExClassSparseDataVariable,
            Expr::FieldPathConst { .. } => T::ExFieldPathConst,
            Expr::Unsupported { .. } => return None,
        })
    }
}
