//! Type labels for properties and triage of function parameters.

use crate::asset::flags::EPropertyFlags;
use crate::asset::{ObjectRef, Property, PropertyKind, PropertyValue};
use crate::defaults;

/// One property as it is listed in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_label: String,
    pub flags: EPropertyFlags,
    pub default: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamRole {
    Input,
    Output,
    Local,
}

pub fn describe(property: &Property, default: Option<&PropertyValue>) -> FieldDescriptor {
    let mut type_label = type_label(&property.kind);
    if property.array_dim > 1 {
        type_label = format!("{type_label}[{}]", property.array_dim);
    }
    FieldDescriptor {
        name: property.name.clone(),
        type_label,
        flags: property.flags(),
        default: default.map(|v| defaults::render(v, 0)),
    }
}

/// Role of a function-owned property. The output flag wins over the parameter flag.
pub fn classify_parameter(flags: EPropertyFlags) -> ParamRole {
    if flags.contains(EPropertyFlags::CPF_OutParm) {
        ParamRole::Output
    } else if flags.contains(EPropertyFlags::CPF_Parm) {
        ParamRole::Input
    } else {
        ParamRole::Local
    }
}

fn name_of(obj: &Option<ObjectRef>) -> &str {
    obj.as_ref().map(|o| o.name.as_str()).unwrap_or("None")
}

pub fn type_label(kind: &PropertyKind) -> String {
    match kind {
        PropertyKind::Bool => "bool".into(),
        PropertyKind::Int8 => "int8".into(),
        PropertyKind::Int16 => "int16".into(),
        PropertyKind::Int => "int32".into(),
        PropertyKind::Int64 => "int64".into(),
        PropertyKind::UInt16 => "uint16".into(),
        PropertyKind::UInt32 => "uint32".into(),
        PropertyKind::UInt64 => "uint64".into(),
        PropertyKind::Float => "float".into(),
        PropertyKind::Double => "double".into(),
        PropertyKind::Byte { r#enum: Some(e) } => e.name.clone(),
        PropertyKind::Byte { r#enum: None } => "uint8".into(),
        PropertyKind::Enum {
            r#enum: Some(e), ..
        } => e.name.clone(),
        PropertyKind::Enum {
            r#enum: None,
            underlying,
        } => type_label(underlying),
        PropertyKind::Str => "FString".into(),
        PropertyKind::Name => "FName".into(),
        PropertyKind::Text => "FText".into(),
        PropertyKind::Struct { r#struct } => name_of(r#struct).into(),
        PropertyKind::Object { property_class } => name_of(property_class).into(),
        PropertyKind::WeakObject { property_class } => {
            format!("{} weak object", name_of(property_class))
        }
        PropertyKind::LazyObject { property_class } => {
            format!("{} lazy object", name_of(property_class))
        }
        PropertyKind::SoftObject { property_class } => {
            format!("{} soft object", name_of(property_class))
        }
        PropertyKind::Class { meta_class } => format!("{} class", name_of(meta_class)),
        PropertyKind::SoftClass { meta_class } => format!("{} soft class", name_of(meta_class)),
        PropertyKind::Interface { interface_class } => {
            format!("{} interface", name_of(interface_class))
        }
        PropertyKind::Array { inner } => format!("Array<{}>", type_label(inner)),
        PropertyKind::Set { element } => format!("Set<{}>", type_label(element)),
        PropertyKind::Map { key, value } => {
            format!("Map<{},{}>", type_label(key), type_label(value))
        }
        PropertyKind::Delegate { signature_function } => {
            format!("{} (Delegate)", name_of(signature_function))
        }
        PropertyKind::MulticastDelegate { signature_function } => {
            format!("{} (Multicast Delegate)", name_of(signature_function))
        }
        PropertyKind::MulticastInlineDelegate { signature_function } => {
            format!("{} (Multicast Inline Delegate)", name_of(signature_function))
        }
        PropertyKind::MulticastSparseDelegate { signature_function } => {
            format!("{} (Multicast Sparse Delegate)", name_of(signature_function))
        }
        PropertyKind::Other { kind } => kind.strip_suffix("Property").unwrap_or(kind).into(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn object(name: &str) -> Option<ObjectRef> {
        Some(ObjectRef::new(name))
    }

    #[test]
    fn test_scalar_labels() {
        assert_eq!(type_label(&PropertyKind::Int), "int32");
        assert_eq!(type_label(&PropertyKind::Byte { r#enum: None }), "uint8");
        assert_eq!(
            type_label(&PropertyKind::Byte {
                r#enum: object("ESlateVisibility")
            }),
            "ESlateVisibility"
        );
        assert_eq!(
            type_label(&PropertyKind::Enum {
                r#enum: None,
                underlying: PropertyKind::UInt32.into()
            }),
            "uint32"
        );
        assert_eq!(type_label(&PropertyKind::Str), "FString");
    }

    #[test]
    fn test_container_labels() {
        let kind = PropertyKind::Array {
            inner: PropertyKind::Interface {
                interface_class: object("SomeInterface"),
            }
            .into(),
        };
        assert_eq!(type_label(&kind), "Array<SomeInterface interface>");

        let kind = PropertyKind::Map {
            key: PropertyKind::Name.into(),
            value: PropertyKind::Set {
                element: PropertyKind::SoftClass {
                    meta_class: object("Actor"),
                }
                .into(),
            }
            .into(),
        };
        assert_eq!(type_label(&kind), "Map<FName,Set<Actor soft class>>");
    }

    #[test]
    fn test_delegate_labels() {
        assert_eq!(
            type_label(&PropertyKind::MulticastInlineDelegate {
                signature_function: object("OnDied__DelegateSignature")
            }),
            "OnDied__DelegateSignature (Multicast Inline Delegate)"
        );
        assert_eq!(
            type_label(&PropertyKind::Delegate {
                signature_function: None
            }),
            "None (Delegate)"
        );
    }

    #[test]
    fn test_fallback_label() {
        assert_eq!(
            type_label(&PropertyKind::Other {
                kind: "FieldPathProperty".to_string()
            }),
            "FieldPath"
        );
        assert_eq!(
            type_label(&PropertyKind::Other {
                kind: "Custom".to_string()
            }),
            "Custom"
        );
    }

    #[test]
    fn test_classify_parameter() {
        let both = EPropertyFlags::CPF_Parm | EPropertyFlags::CPF_OutParm;
        assert_eq!(classify_parameter(both), ParamRole::Output);
        assert_eq!(classify_parameter(EPropertyFlags::CPF_Parm), ParamRole::Input);
        assert_eq!(classify_parameter(EPropertyFlags::empty()), ParamRole::Local);
    }

    #[test]
    fn test_describe() {
        let mut property = Property::new("Ammo", PropertyKind::Int)
            .with_flags(EPropertyFlags::CPF_Parm);
        property.array_dim = 4;
        let field = describe(&property, Some(&PropertyValue::Int(30)));
        assert_eq!(
            field,
            FieldDescriptor {
                name: "Ammo".to_string(),
                type_label: "int32[4]".to_string(),
                flags: EPropertyFlags::CPF_Parm,
                default: Some("30".to_string()),
            }
        );
        assert_eq!(describe(&property, None).default, None);
    }
}
