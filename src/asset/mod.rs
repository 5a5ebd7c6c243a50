//! In-memory object graph handed over by an asset provider.
//!
//! Nothing here reads game archives: a provider builds these values (see
//! [`crate::provider`]) and the dumper only ever reads them.

pub mod flags;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::kismet::{Expr, ScriptVersion};

use self::flags::{EClassFlags, EFunctionFlags, EPropertyFlags};

/// Reference to an import or export, already resolved to its name and outer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer: Option<String>,
}

impl ObjectRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outer: None,
        }
    }
    pub fn with_outer(name: impl Into<String>, outer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outer: Some(outer.into()),
        }
    }
}

/// Name path of an `FField`. An empty path is a null field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPath {
    pub path: Vec<String>,
}

impl FieldPath {
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
        }
    }
}

/// Property operand of a script instruction: either a pre-FField `UProperty` object or a
/// field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyRef {
    Object(Option<ObjectRef>),
    Field(FieldPath),
}

impl PropertyRef {
    pub fn field<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Field(FieldPath::new(path))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetGraph {
    pub path: String,
    #[serde(default = "default_object_version")]
    pub object_version: i32,
    #[serde(default)]
    pub object_version_ue5: i32,
    pub exports: Vec<Export>,
}

fn default_object_version() -> i32 {
    // VER_UE4_CORRECT_LICENSEE_FLAG, the last UE4 package version
    522
}

impl AssetGraph {
    pub fn script_version(&self) -> ScriptVersion {
        ScriptVersion::new(self.object_version, self.object_version_ue5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Class,
    Function,
    Struct,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Export {
    Class(ClassExport),
    Function(FunctionExport),
    Struct(StructExport),
    Enum(EnumExport),
}

impl Export {
    pub fn name(&self) -> &str {
        match self {
            Export::Class(e) => &e.name,
            Export::Function(e) => &e.name,
            Export::Struct(e) => &e.name,
            Export::Enum(e) => &e.name,
        }
    }
    pub fn kind(&self) -> ExportKind {
        match self {
            Export::Class(_) => ExportKind::Class,
            Export::Function(_) => ExportKind::Function,
            Export::Struct(_) => ExportKind::Struct,
            Export::Enum(_) => ExportKind::Enum,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassExport {
    pub name: String,
    #[serde(default)]
    pub super_struct: Option<ObjectRef>,
    #[serde(default)]
    pub class_flags: u32,
    #[serde(default)]
    pub interfaces: Vec<ObjectRef>,
    #[serde(default)]
    pub properties: Vec<Property>,
    /// Values stored on the class default object, keyed by property name.
    #[serde(default)]
    pub defaults: IndexMap<String, PropertyValue>,
    #[serde(default)]
    pub functions: Vec<String>,
}

impl ClassExport {
    pub fn flags(&self) -> EClassFlags {
        EClassFlags::from_bits_retain(self.class_flags)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionExport {
    pub name: String,
    #[serde(default)]
    pub outer: Option<String>,
    #[serde(default)]
    pub function_flags: u32,
    #[serde(default)]
    pub properties: Vec<Property>,
    /// `None` when the provider did not load the script bytecode.
    #[serde(default)]
    pub bytecode: Option<Vec<Expr>>,
}

impl FunctionExport {
    pub fn flags(&self) -> EFunctionFlags {
        EFunctionFlags::from_bits_retain(self.function_flags)
    }
    pub fn is_event(&self) -> bool {
        self.flags().contains(EFunctionFlags::FUNC_Event)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructExport {
    pub name: String,
    #[serde(default)]
    pub super_struct: Option<ObjectRef>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub defaults: IndexMap<String, PropertyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumExport {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<(String, i64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
    #[serde(default)]
    pub flags: u64,
    #[serde(default = "default_array_dim")]
    pub array_dim: i32,
}

fn default_array_dim() -> i32 {
    1
}

impl Property {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            flags: 0,
            array_dim: 1,
        }
    }
    pub fn with_flags(mut self, flags: EPropertyFlags) -> Self {
        self.flags = flags.bits();
        self
    }
    pub fn flags(&self) -> EPropertyFlags {
        EPropertyFlags::from_bits_retain(self.flags)
    }
}

/// Mirror of the engine's `FProperty` class hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyKind {
    Bool,
    Int8,
    Int16,
    Int,
    Int64,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    Byte {
        #[serde(default)]
        r#enum: Option<ObjectRef>,
    },
    Enum {
        #[serde(default)]
        r#enum: Option<ObjectRef>,
        underlying: Box<PropertyKind>,
    },
    Str,
    Name,
    Text,
    Struct {
        r#struct: Option<ObjectRef>,
    },
    Object {
        property_class: Option<ObjectRef>,
    },
    WeakObject {
        property_class: Option<ObjectRef>,
    },
    LazyObject {
        property_class: Option<ObjectRef>,
    },
    SoftObject {
        property_class: Option<ObjectRef>,
    },
    Class {
        meta_class: Option<ObjectRef>,
    },
    SoftClass {
        meta_class: Option<ObjectRef>,
    },
    Interface {
        interface_class: Option<ObjectRef>,
    },
    Array {
        inner: Box<PropertyKind>,
    },
    Set {
        element: Box<PropertyKind>,
    },
    Map {
        key: Box<PropertyKind>,
        value: Box<PropertyKind>,
    },
    Delegate {
        signature_function: Option<ObjectRef>,
    },
    MulticastDelegate {
        signature_function: Option<ObjectRef>,
    },
    MulticastInlineDelegate {
        signature_function: Option<ObjectRef>,
    },
    MulticastSparseDelegate {
        signature_function: Option<ObjectRef>,
    },
    /// Property class the provider does not model, e.g. `FieldPathProperty`.
    Other {
        kind: String,
    },
}

/// Stored value of a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Name(String),
    Text(String),
    Enum(String),
    Object(Option<ObjectRef>),
    /// `fields` is `None` when the struct layout could not be resolved.
    Struct {
        type_name: String,
        fields: Option<IndexMap<String, PropertyValue>>,
    },
    Array(Vec<PropertyValue>),
    Set(Vec<PropertyValue>),
    Map(Vec<(PropertyValue, PropertyValue)>),
}
