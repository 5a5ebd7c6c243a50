//! Display names for object, field and property references.

use crate::asset::{FieldPath, ObjectRef, PropertyRef};

pub trait SymbolPath {
    /// Qualified display string, `None` for a null reference.
    fn resolve(&self) -> Option<String>;

    fn resolve_or_none(&self) -> String {
        self.resolve().unwrap_or_else(|| "None".to_string())
    }
}

impl SymbolPath for ObjectRef {
    fn resolve(&self) -> Option<String> {
        Some(match &self.outer {
            Some(outer) => format!("{outer}::{}", self.name),
            None => self.name.clone(),
        })
    }
}

impl SymbolPath for FieldPath {
    fn resolve(&self) -> Option<String> {
        (!self.path.is_empty()).then(|| self.path.join("."))
    }
}

impl SymbolPath for PropertyRef {
    fn resolve(&self) -> Option<String> {
        match self {
            PropertyRef::Object(obj) => obj.resolve(),
            PropertyRef::Field(path) => path.resolve(),
        }
    }
}

impl<T: SymbolPath> SymbolPath for Option<T> {
    fn resolve(&self) -> Option<String> {
        self.as_ref().and_then(SymbolPath::resolve)
    }
}
