//! Type-erased values and the small type language used by annotations.

use crate::utils::error::{DiError, Result};
use indexmap::IndexMap;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Nominal type identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeInfo {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Value carried by `Injected::none()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoneType;

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Any,
    Named(TypeInfo),
    Optional(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
}

impl TypeExpr {
    pub fn of<T: 'static>() -> Self {
        TypeExpr::Named(TypeInfo::of::<T>())
    }

    pub fn optional_of<T: 'static>() -> Self {
        TypeExpr::Optional(Box::new(TypeExpr::of::<T>()))
    }

    fn is_none_type(&self) -> bool {
        matches!(self, TypeExpr::Named(t) if t.id == TypeId::of::<NoneType>())
    }

    /// Whether this annotation only admits `target` (ignoring `None`).
    ///
    /// `Optional<T>` and unions count when every non-`None` member is `target`.
    /// `Any` never counts.
    pub fn is_subtype_of(&self, target: &TypeInfo) -> bool {
        match self {
            TypeExpr::Any => false,
            TypeExpr::Named(t) => t.id == target.id,
            TypeExpr::Optional(inner) => inner.is_subtype_of(target),
            TypeExpr::Union(members) => {
                let mut saw_target = false;
                for member in members {
                    if member.is_none_type() {
                        continue;
                    }
                    if !member.is_subtype_of(target) {
                        return false;
                    }
                    saw_target = true;
                }
                saw_target
            }
        }
    }

    /// Whether `value` fits this annotation, without coercion.
    pub fn accepts(&self, value: &Injected) -> bool {
        match self {
            TypeExpr::Any => true,
            TypeExpr::Named(t) => t.id == value.type_info().id,
            TypeExpr::Optional(inner) => value.is_none() || inner.accepts(value),
            TypeExpr::Union(members) => members.iter().any(|m| m.accepts(value)),
        }
    }

    /// The single nominal type behind this annotation, if there is one.
    pub fn primary_type(&self) -> Option<TypeInfo> {
        match self {
            TypeExpr::Named(t) => Some(*t),
            TypeExpr::Optional(inner) => inner.primary_type(),
            _ => None,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Any => f.write_str("Any"),
            TypeExpr::Named(t) if t.id == TypeId::of::<NoneType>() => f.write_str("None"),
            TypeExpr::Named(t) => write!(f, "{}", t),
            TypeExpr::Optional(inner) => write!(f, "Option<{}>", inner),
            TypeExpr::Union(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", m)?;
                }
                Ok(())
            }
        }
    }
}

/// A type-erased injected value.
#[derive(Clone)]
pub struct Injected {
    type_info: TypeInfo,
    value: Arc<dyn Any + Send + Sync>,
}

impl Injected {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            value: Arc::new(value),
        }
    }

    pub fn none() -> Self {
        Self::new(NoneType)
    }

    pub fn is_none(&self) -> bool {
        self.type_info.id == TypeId::of::<NoneType>()
    }

    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::downcast::<T>(self.value.clone()).ok()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_info.id == TypeId::of::<T>()
    }

    /// Identity comparison (same underlying allocation).
    pub fn ptr_eq(&self, other: &Injected) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Injected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Injected<{}>", self.type_info.name)
    }
}

/// Ordered keyword arguments: external inputs and solved mappings alike.
#[derive(Debug, Clone, Default)]
pub struct Kwargs {
    values: IndexMap<String, Injected>,
}

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, Injected::new(value));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Injected) {
        self.values.insert(name.into(), value);
    }

    pub fn get_raw(&self, name: &str) -> Option<&Injected> {
        self.values.get(name)
    }

    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.values.get(name).and_then(|v| v.downcast::<T>())
    }

    /// Typed lookup for callable bodies.
    pub fn require<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        let raw = self
            .values
            .get(name)
            .ok_or_else(|| DiError::MissingArgument {
                parameter: name.to_string(),
            })?;
        raw.downcast::<T>().ok_or_else(|| DiError::DowncastFailed {
            name: name.to_string(),
            required_type: type_name::<T>(),
            actual_type: raw.type_info().name,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Injected)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
