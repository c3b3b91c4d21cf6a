//! Callable signatures and annotation resolution.
//!
//! Rust has no runtime signature reflection, so a [`Callable`] carries an
//! explicit parameter list next to its body. Everything that inspects that
//! list lives here; the rest of the engine only sees [`TypedParameter`]s.

use crate::core::params::DependsMarker;
use crate::core::types::{Injected, Kwargs, NoneType, TypeExpr, TypeInfo};
use crate::domain::ports::Param;
use crate::utils::error::{DiError, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// 參數的型別註解 (尚未解析)
#[derive(Debug, Clone)]
pub enum Annotation {
    Unspecified,
    Resolved(TypeExpr),
    /// Forward reference, resolved against the callable's scope, e.g. `"Option<Person>"`.
    Deferred(String),
}

/// 參數的原始預設值
#[derive(Debug, Clone)]
pub enum RawDefault {
    Empty,
    Value(Injected),
    Depends(DependsMarker),
    /// A pre-built param that skips classification.
    Param(Arc<dyn Param>),
}

/// One entry of a callable's declared signature.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub annotation: Annotation,
    pub default: RawDefault,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: Annotation::Unspecified,
            default: RawDefault::Empty,
        }
    }

    pub fn annotated<T: 'static>(mut self) -> Self {
        self.annotation = Annotation::Resolved(TypeExpr::of::<T>());
        self
    }

    pub fn annotation(mut self, expr: TypeExpr) -> Self {
        self.annotation = Annotation::Resolved(expr);
        self
    }

    pub fn deferred(mut self, text: impl Into<String>) -> Self {
        self.annotation = Annotation::Deferred(text.into());
        self
    }

    pub fn default_value<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.default = RawDefault::Value(Injected::new(value));
        self
    }

    pub fn depends(mut self, marker: DependsMarker) -> Self {
        self.default = RawDefault::Depends(marker);
        self
    }

    pub fn param(mut self, param: Arc<dyn Param>) -> Self {
        self.default = RawDefault::Param(param);
        self
    }
}

/// Parameter after introspection. `annotation == None` means unspecified.
#[derive(Debug, Clone)]
pub struct TypedParameter {
    pub name: String,
    pub annotation: Option<TypeExpr>,
    pub default: RawDefault,
}

impl TypedParameter {
    pub fn has_default(&self) -> bool {
        !matches!(self.default, RawDefault::Empty)
    }

    pub fn annotation_display(&self) -> String {
        self.annotation
            .as_ref()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "<unspecified>".to_string())
    }
}

/// 可呼叫物件的定義範圍：命名型別與各型別的工廠
///
/// Callables built with [`CallableBuilder::in_scope`] keep their scope alive.
/// The scope only holds weak links to the factories registered with it.
#[derive(Default)]
pub struct Scope {
    name: String,
    types: RwLock<HashMap<String, TypeExpr>>,
    factories: RwLock<HashMap<TypeId, Weak<CallableInner>>>,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let scope = Scope {
            name: name.into(),
            ..Default::default()
        };
        scope.register_expr("Any", TypeExpr::Any);
        scope.register_expr("None", TypeExpr::of::<NoneType>());
        Arc::new(scope)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_type<T: 'static>(&self, alias: impl Into<String>) {
        self.register_expr(alias, TypeExpr::of::<T>());
    }

    pub fn register_expr(&self, alias: impl Into<String>, expr: TypeExpr) {
        self.types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(alias.into(), expr);
    }

    /// Register `factory` as the provider of its declared return type.
    /// The caller keeps ownership; a dropped factory is no longer found.
    pub fn provide(&self, factory: &Callable) {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(factory.returns().id, Arc::downgrade(&factory.inner));
    }

    pub fn lookup_type(&self, alias: &str) -> Option<TypeExpr> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(alias)
            .cloned()
    }

    pub fn factory_for(&self, ty: &TypeInfo) -> Option<Callable> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ty.id)
            .and_then(Weak::upgrade)
            .map(|inner| Callable { inner })
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope").field("name", &self.name).finish()
    }
}

type CallFn = dyn Fn(&Kwargs) -> Result<Injected> + Send + Sync;

struct CallableInner {
    name: String,
    params: Vec<Parameter>,
    returns: TypeInfo,
    scope: Option<Arc<Scope>>,
    body: Box<CallFn>,
}

/// Handle to an invocable unit with an inspectable parameter list.
#[derive(Clone)]
pub struct Callable {
    inner: Arc<CallableInner>,
}

/// Identity of a [`Callable`] handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallableId(usize);

impl Callable {
    pub fn builder(name: impl Into<String>) -> CallableBuilder {
        CallableBuilder {
            name: name.into(),
            params: Vec::new(),
            scope: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn id(&self) -> CallableId {
        CallableId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.inner.params
    }

    pub fn returns(&self) -> TypeInfo {
        self.inner.returns
    }

    pub fn scope(&self) -> Option<&Arc<Scope>> {
        self.inner.scope.as_ref()
    }

    /// Run the body with already-resolved keyword arguments.
    pub fn invoke(&self, kwargs: &Kwargs) -> Result<Injected> {
        (self.inner.body)(kwargs).map_err(|e| e.within(self.name()))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<callable {}>", self.inner.name)
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

pub struct CallableBuilder {
    name: String,
    params: Vec<Parameter>,
    scope: Option<Arc<Scope>>,
}

impl CallableBuilder {
    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn in_scope(mut self, scope: &Arc<Scope>) -> Self {
        self.scope = Some(Arc::clone(scope));
        self
    }

    pub fn build<T, F>(self, body: F) -> Callable
    where
        T: Any + Send + Sync,
        F: Fn(&Kwargs) -> Result<T> + Send + Sync + 'static,
    {
        Callable {
            inner: Arc::new(CallableInner {
                name: self.name,
                params: self.params,
                returns: TypeInfo::of::<T>(),
                scope: self.scope,
                body: Box::new(move |kwargs| body(kwargs).map(Injected::new)),
            }),
        }
    }
}

/// 取得可呼叫物件的簽名，並解析所有延遲型別註解
pub fn get_typed_signature(call: &Callable) -> Result<Vec<TypedParameter>> {
    call.parameters()
        .iter()
        .map(|param| {
            Ok(TypedParameter {
                name: param.name.clone(),
                annotation: get_typed_annotation(call, param)?,
                default: param.default.clone(),
            })
        })
        .collect()
}

fn get_typed_annotation(call: &Callable, param: &Parameter) -> Result<Option<TypeExpr>> {
    match &param.annotation {
        Annotation::Unspecified => Ok(None),
        Annotation::Resolved(expr) => Ok(Some(expr.clone())),
        Annotation::Deferred(text) => {
            let fail = |reason: String| DiError::AnnotationResolution {
                callable: call.name().to_string(),
                parameter: param.name.clone(),
                annotation: text.clone(),
                reason,
            };
            let scope = call
                .scope()
                .ok_or_else(|| fail("callable has no defining scope".to_string()))?;
            let expr = evaluate_forward_ref(text, scope).map_err(fail)?;
            tracing::debug!(
                "Resolved '{}' of {}.{} to {}",
                text,
                call.name(),
                param.name,
                expr
            );
            Ok(Some(expr))
        }
    }
}

/// Evaluate a forward reference such as `Person`, `Option<Person>` or `TestObj | None`.
pub fn evaluate_forward_ref(text: &str, scope: &Scope) -> std::result::Result<TypeExpr, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty annotation".to_string());
    }

    let members = split_union(text)?;
    if members.len() > 1 {
        let parsed = members
            .into_iter()
            .map(|m| evaluate_forward_ref(m, scope))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        return Ok(TypeExpr::Union(parsed));
    }

    if let Some(rest) = text.strip_prefix("Option<") {
        let inner = rest
            .strip_suffix('>')
            .ok_or_else(|| format!("unbalanced brackets in '{}'", text))?;
        return Ok(TypeExpr::Optional(Box::new(evaluate_forward_ref(
            inner, scope,
        )?)));
    }

    scope
        .lookup_type(text)
        .ok_or_else(|| format!("name '{}' is not defined in scope '{}'", text, scope.name()))
}

// 只在最外層切割 `|`
fn split_union(text: &str) -> std::result::Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unbalanced brackets in '{}'", text))?;
            }
            '|' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(format!("unbalanced brackets in '{}'", text));
    }
    parts.push(text[start..].trim());
    if parts.iter().any(|p| p.is_empty()) {
        return Err(format!("empty union member in '{}'", text));
    }
    Ok(parts)
}
