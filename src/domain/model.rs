use crate::core::types::Injected;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 測試用領域物件，以型別 `TestObj` 或參數名稱 `test` 注入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestObj {
    pub id: i64,
}

impl TestObj {
    pub fn new(id: i64) -> Self {
        Self { id }
    }
}

/// 以型別 `Person` 或參數名稱 `person` 注入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Default state of a param or field.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    Required,
    HasDefault(Injected),
    Undefined,
}

impl DefaultValue {
    pub fn is_required(&self) -> bool {
        matches!(self, DefaultValue::Required)
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Required => f.write_str("Required"),
            DefaultValue::HasDefault(v) => write!(f, "{:?}", v),
            DefaultValue::Undefined => f.write_str("Undefined"),
        }
    }
}

/// What a param yields when solved.
#[derive(Debug, Clone)]
pub enum Solved {
    Value(Injected),
    Undefined,
}
