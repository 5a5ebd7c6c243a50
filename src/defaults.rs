//! Text form of stored property values.

use crate::asset::PropertyValue;
use crate::resolve::SymbolPath;

const INDENT: &str = "  ";

/// Renders `value` as it appears on the `Default:` line of a report. `indent` is the nesting
/// level of the line the value starts on; nested entries are placed one level deeper and
/// the closing brace back at `indent`.
pub fn render(value: &PropertyValue, indent: usize) -> String {
    match value {
        PropertyValue::Bool(v) => v.to_string(),
        PropertyValue::Int(v) => v.to_string(),
        PropertyValue::UInt(v) => v.to_string(),
        PropertyValue::Float(v) => v.to_string(),
        PropertyValue::Str(v) | PropertyValue::Text(v) => format!("\"{v}\""),
        PropertyValue::Name(v) | PropertyValue::Enum(v) => v.clone(),
        PropertyValue::Object(obj) => obj.resolve_or_none(),
        PropertyValue::Struct { type_name, fields } => match fields {
            None => format!("{{ {type_name} }}"),
            Some(fields) => block(
                fields
                    .iter()
                    .map(|(name, v)| format!("{name} = {}", render(v, indent + 1))),
                indent,
            ),
        },
        PropertyValue::Array(elements) | PropertyValue::Set(elements) => {
            block(elements.iter().map(|v| render(v, indent + 1)), indent)
        }
        PropertyValue::Map(entries) => block(
            entries.iter().map(|(k, v)| {
                format!("{} = {}", render(k, indent + 1), render(v, indent + 1))
            }),
            indent,
        ),
    }
}

fn block(entries: impl Iterator<Item = String>, indent: usize) -> String {
    let inner = INDENT.repeat(indent + 1);
    let entries = entries
        .map(|e| format!("{inner}{e}"))
        .collect::<Vec<_>>();
    if entries.is_empty() {
        return "{ }".to_string();
    }
    format!("{{\n{}\n{}}}", entries.join(",\n"), INDENT.repeat(indent))
}

#[cfg(test)]
mod test {
    use indexmap::IndexMap;

    use super::*;
    use crate::asset::ObjectRef;

    fn vector(x: f64, y: f64, z: f64) -> PropertyValue {
        PropertyValue::Struct {
            type_name: "Vector".to_string(),
            fields: Some(IndexMap::from([
                ("X".to_string(), PropertyValue::Float(x)),
                ("Y".to_string(), PropertyValue::Float(y)),
                ("Z".to_string(), PropertyValue::Float(z)),
            ])),
        }
    }

    #[test]
    fn test_scalars() {
        assert_eq!(render(&PropertyValue::Bool(true), 0), "true");
        assert_eq!(render(&PropertyValue::Int(-3), 0), "-3");
        assert_eq!(render(&PropertyValue::Float(0.5), 0), "0.5");
        assert_eq!(render(&PropertyValue::Str("hi".to_string()), 0), "\"hi\"");
        assert_eq!(render(&PropertyValue::Name("None".to_string()), 0), "None");
        assert_eq!(render(&PropertyValue::Object(None), 0), "None");
        assert_eq!(
            render(
                &PropertyValue::Object(Some(ObjectRef::with_outer("Default", "BP_C"))),
                0
            ),
            "BP_C::Default"
        );
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(render(&PropertyValue::Array(vec![]), 0), "{ }");
        assert_eq!(render(&PropertyValue::Set(vec![]), 3), "{ }");
        assert_eq!(render(&PropertyValue::Map(vec![]), 0), "{ }");
        let empty = PropertyValue::Struct {
            type_name: "Empty".to_string(),
            fields: Some(IndexMap::new()),
        };
        assert_eq!(render(&empty, 0), "{ }");
    }

    #[test]
    fn test_struct() {
        let value = PropertyValue::Struct {
            type_name: "Pair".to_string(),
            fields: Some(IndexMap::from([
                ("a".to_string(), PropertyValue::Int(1)),
                ("b".to_string(), PropertyValue::Int(2)),
            ])),
        };
        assert_eq!(render(&value, 0), "{\n  a = 1,\n  b = 2\n}");
    }

    #[test]
    fn test_opaque_struct() {
        let value = PropertyValue::Struct {
            type_name: "GameplayTagContainer".to_string(),
            fields: None,
        };
        assert_eq!(render(&value, 2), "{ GameplayTagContainer }");
    }

    #[test]
    fn test_nested() {
        let value = PropertyValue::Array(vec![vector(1.0, 2.0, 3.0), vector(0.0, 0.0, 1.5)]);
        assert_eq!(
            render(&value, 0),
            "{
  {
    X = 1,
    Y = 2,
    Z = 3
  },
  {
    X = 0,
    Y = 0,
    Z = 1.5
  }
}"
        );
    }

    #[test]
    fn test_map() {
        let value = PropertyValue::Map(vec![
            (
                PropertyValue::Name("Health".to_string()),
                PropertyValue::Float(100.0),
            ),
            (
                PropertyValue::Name("Armor".to_string()),
                PropertyValue::Float(25.0),
            ),
        ]);
        assert_eq!(render(&value, 1), "{\n    Health = 100,\n    Armor = 25\n  }");
    }
}
