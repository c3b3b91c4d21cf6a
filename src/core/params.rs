//! Param variants and the ordered registry that classifies parameters.

use crate::core::dependent::{Dependent, ParseContext};
use crate::core::signature::{Callable, RawDefault, TypedParameter};
use crate::core::types::{Injected, Kwargs, TypeExpr, TypeInfo};
use crate::domain::model::{DefaultValue, Person, Solved, TestObj};
use crate::domain::ports::{Param, ParamFactory};
use crate::utils::error::{DiError, Result};
use std::fmt;
use std::sync::Arc;

pub const TEST_PARAM_NAME: &str = "test";
pub const PERSON_PARAM_NAME: &str = "person";

/// 按型別或保留名稱注入的葉節點參數，值取自外部輸入的保留名稱鍵
pub struct LeafParam {
    ty: TypeInfo,
    key: String,
    default: DefaultValue,
}

impl LeafParam {
    pub fn new(ty: TypeInfo, key: impl Into<String>) -> Self {
        Self {
            ty,
            key: key.into(),
            default: DefaultValue::Required,
        }
    }
}

impl Param for LeafParam {
    fn default_value(&self) -> &DefaultValue {
        &self.default
    }

    fn solve(&self, inputs: &Kwargs) -> Result<Solved> {
        Ok(match inputs.get_raw(&self.key) {
            Some(value) => Solved::Value(value.clone()),
            None => Solved::Undefined,
        })
    }

    fn accepts_annotation(&self, annotation: &TypeExpr) -> bool {
        *annotation == TypeExpr::Any || annotation.is_subtype_of(&self.ty)
    }
}

impl fmt::Debug for LeafParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LeafParam<{}>({})", self.ty, self.default)
    }
}

/// Matches parameters without a default whose type is `ty`, or untyped
/// parameters named `reserved_name`.
#[derive(Debug, Clone)]
pub struct LeafFactory {
    ty: TypeInfo,
    reserved_name: String,
}

impl LeafFactory {
    pub fn new<T: 'static>(reserved_name: impl Into<String>) -> Self {
        Self {
            ty: TypeInfo::of::<T>(),
            reserved_name: reserved_name.into(),
        }
    }
}

impl ParamFactory for LeafFactory {
    fn check_param(
        &self,
        _ctx: &mut ParseContext<'_>,
        _call: &Callable,
        param: &TypedParameter,
    ) -> Result<Option<Arc<dyn Param>>> {
        if param.has_default() {
            return Ok(None);
        }
        let matched = match &param.annotation {
            // 可加子類檢查，按照型別注入
            Some(annotation) => annotation.is_subtype_of(&self.ty),
            // 沒有標注但變數名稱相符，按照名稱注入
            None => param.name == self.reserved_name,
        };
        if !matched {
            return Ok(None);
        }
        Ok(Some(Arc::new(LeafParam::new(self.ty, self.reserved_name.clone()))))
    }
}

/// 使用者自訂依賴的包裝，作為參數預設值使用
#[derive(Debug, Clone, Default)]
pub struct DependsMarker {
    pub dependency: Option<Callable>,
}

/// Declare a parameter as a sub-dependency. With `None`, the factory
/// registered for the parameter's declared type is used.
pub fn depends(dependency: Option<Callable>) -> DependsMarker {
    DependsMarker { dependency }
}

/// 子依賴參數
pub struct DependParam {
    dependent: Dependent,
    default: DefaultValue,
}

impl DependParam {
    pub fn new(dependent: Dependent) -> Self {
        Self {
            dependent,
            default: DefaultValue::Required,
        }
    }
}

impl Param for DependParam {
    fn default_value(&self) -> &DefaultValue {
        &self.default
    }

    fn solve(&self, inputs: &Kwargs) -> Result<Solved> {
        // 先解析出巢狀依賴的值，再呼叫子依賴本身
        let sub_values = self.dependent.solve(inputs)?;
        let solved = self.dependent.call_with(&sub_values)?;
        Ok(Solved::Value(solved))
    }
}

impl fmt::Debug for DependParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DependParam({}, call={})",
            self.default,
            self.dependent.callable().name()
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct DependsFactory;

impl DependsFactory {
    fn target(call: &Callable, param: &TypedParameter, marker: &DependsMarker) -> Result<Callable> {
        if let Some(explicit) = &marker.dependency {
            return Ok(explicit.clone());
        }
        let missing = || DiError::MissingDependencyTarget {
            callable: call.name().to_string(),
            parameter: param.name.clone(),
        };
        let ty = param
            .annotation
            .as_ref()
            .and_then(TypeExpr::primary_type)
            .ok_or_else(missing)?;
        call.scope()
            .and_then(|scope| scope.factory_for(&ty))
            .ok_or_else(missing)
    }
}

impl ParamFactory for DependsFactory {
    fn check_param(
        &self,
        ctx: &mut ParseContext<'_>,
        call: &Callable,
        param: &TypedParameter,
    ) -> Result<Option<Arc<dyn Param>>> {
        let RawDefault::Depends(marker) = &param.default else {
            return Ok(None);
        };
        let target = Self::target(call, param, marker)?;
        let sub_dependent = ctx.parse(&target)?;
        Ok(Some(Arc::new(DependParam::new(sub_dependent))))
    }
}

/// Pre-built param reading an arbitrary input key. Placed directly as a
/// parameter default, it bypasses classification.
pub struct ValueParam {
    key: String,
    expected: Option<TypeExpr>,
    default: DefaultValue,
}

impl ValueParam {
    pub fn required(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expected: None,
            default: DefaultValue::Required,
        }
    }

    pub fn with_default<T: std::any::Any + Send + Sync>(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            expected: None,
            default: DefaultValue::HasDefault(Injected::new(value)),
        }
    }

    pub fn optional(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expected: None,
            default: DefaultValue::Undefined,
        }
    }

    pub fn expecting(mut self, expr: TypeExpr) -> Self {
        self.expected = Some(expr);
        self
    }
}

impl Param for ValueParam {
    fn default_value(&self) -> &DefaultValue {
        &self.default
    }

    fn solve(&self, inputs: &Kwargs) -> Result<Solved> {
        Ok(match inputs.get_raw(&self.key) {
            Some(value) => Solved::Value(value.clone()),
            None => Solved::Undefined,
        })
    }

    fn accepts_annotation(&self, annotation: &TypeExpr) -> bool {
        match &self.expected {
            Some(expected) => *annotation == TypeExpr::Any || annotation == expected,
            None => true,
        }
    }
}

impl fmt::Debug for ValueParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueParam[{}]({})", self.key, self.default)
    }
}

/// Ordered list of param variants. The first variant that claims a
/// parameter wins.
#[derive(Debug, Default)]
pub struct ParamRegistry {
    factories: Vec<Box<dyn ParamFactory>>,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `TestObj`/`test`, then `Person`/`person`, then `depends()`.
    pub fn standard() -> Self {
        Self::with_reserved_names(TEST_PARAM_NAME, PERSON_PARAM_NAME)
    }

    pub fn with_reserved_names(test: &str, person: &str) -> Self {
        Self::new()
            .with(LeafFactory::new::<TestObj>(test))
            .with(LeafFactory::new::<Person>(person))
            .with(DependsFactory)
    }

    pub fn with<F: ParamFactory + 'static>(mut self, factory: F) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// 將未知參數轉為依賴注入 Param
    pub fn classify(
        &self,
        ctx: &mut ParseContext<'_>,
        call: &Callable,
        param: &TypedParameter,
    ) -> Result<Arc<dyn Param>> {
        for factory in &self.factories {
            if let Some(found) = factory.check_param(ctx, call, param)? {
                tracing::debug!("{}.{} -> {:?}", call.name(), param.name, found);
                return Ok(found);
            }
        }
        Err(DiError::UnknownParameter {
            callable: call.name().to_string(),
            parameter: param.name.clone(),
            annotation: param.annotation_display(),
        })
    }
}
