//! The resolver graph node: a callable plus its classified parameters.

use crate::core::params::ParamRegistry;
use crate::core::resolver::Resolver;
use crate::core::signature::{get_typed_signature, Callable, RawDefault};
use crate::core::types::{Injected, Kwargs, TypeExpr};
use crate::core::validator::check_field_type;
use crate::domain::model::{DefaultValue, Solved};
use crate::domain::ports::Param;
use crate::utils::error::{DiError, Result};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub detect_cycles: bool,
    /// 允許的子依賴巢狀層數，根節點不計入
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            detect_cycles: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// State of one `parse` call: the registry in use and the callables
/// currently being parsed.
pub struct ParseContext<'a> {
    registry: &'a ParamRegistry,
    options: &'a ParseOptions,
    stack: Vec<Callable>,
}

impl<'a> ParseContext<'a> {
    pub fn new(registry: &'a ParamRegistry, options: &'a ParseOptions) -> Self {
        Self {
            registry,
            options,
            stack: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'a ParamRegistry {
        self.registry
    }

    /// Nesting level of the next callable to be parsed; the root is at 0.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Parse `call` as a child of whatever is on the stack.
    pub fn parse(&mut self, call: &Callable) -> Result<Dependent> {
        if self.options.detect_cycles {
            if let Some(pos) = self.stack.iter().position(|c| c.id() == call.id()) {
                let chain = self.stack[pos..]
                    .iter()
                    .map(Callable::name)
                    .chain(std::iter::once(call.name()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(DiError::CyclicDependency { chain });
            }
        }
        if self.depth() > self.options.max_depth {
            return Err(DiError::DepthLimitExceeded {
                callable: call.name().to_string(),
                limit: self.options.max_depth,
            });
        }

        tracing::debug!("Parsing {} (depth {})", call.name(), self.depth());
        self.stack.push(call.clone());
        let result = Dependent::build(self, call);
        self.stack.pop();
        result
    }
}

/// Finalized binding of one parameter.
#[derive(Debug, Clone)]
pub struct ModelField {
    pub name: String,
    pub annotation: TypeExpr,
    pub required: bool,
    pub default: DefaultValue,
    pub param: Arc<dyn Param>,
}

impl ModelField {
    pub fn type_display(&self) -> String {
        self.annotation.to_string()
    }
}

/// Structural summary of a field, used to compare parsed graphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldShape {
    pub name: String,
    pub annotation: String,
    pub required: bool,
}

/// 依賴注入容器
pub struct Dependent {
    call: Callable,
    params: Vec<ModelField>,
}

impl Dependent {
    /// 對 Callable 解析出容器，使用標準的參數註冊表
    pub fn parse(call: &Callable) -> Result<Self> {
        Resolver::default().parse(call)
    }

    fn build(ctx: &mut ParseContext<'_>, call: &Callable) -> Result<Self> {
        let signature = get_typed_signature(call)?;
        let mut dependent = Dependent {
            call: call.clone(),
            params: Vec::with_capacity(signature.len()),
        };

        for param in signature {
            let field_info = match &param.default {
                // param 本身就是 Param，直接沿用
                RawDefault::Param(prebuilt) => prebuilt.clone(),
                _ => {
                    let registry = ctx.registry();
                    registry.classify(ctx, call, &param)?
                }
            };

            let default = field_info.default_value().clone();
            let required = default.is_required();
            let annotation = param.annotation.clone().unwrap_or(TypeExpr::Any);

            if !field_info.accepts_annotation(&annotation) {
                return Err(DiError::IncompatibleAnnotation {
                    callable: call.name().to_string(),
                    parameter: param.name,
                    annotation: annotation.to_string(),
                    param: format!("{:?}", field_info),
                });
            }

            dependent.params.push(ModelField {
                name: param.name,
                annotation,
                required,
                default,
                param: field_info,
            });
        }

        Ok(dependent)
    }

    pub fn callable(&self) -> &Callable {
        &self.call
    }

    pub fn params(&self) -> &[ModelField] {
        &self.params
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.params.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn shape(&self) -> Vec<FieldShape> {
        self.params
            .iter()
            .map(|f| FieldShape {
                name: f.name.clone(),
                annotation: f.type_display(),
                required: f.required,
            })
            .collect()
    }

    /// Resolve every field against `inputs`, in declaration order.
    pub fn solve(&self, inputs: &Kwargs) -> Result<Kwargs> {
        let mut values = Kwargs::new();

        for field in &self.params {
            let value = match field.param.solve(inputs)? {
                Solved::Value(value) => value,
                Solved::Undefined => self.field_default(field)?,
            };

            match check_field_type(field, value) {
                Ok(checked) => values.insert(field.name.clone(), checked),
                Err(mismatch) => {
                    tracing::error!(
                        "{:?} type {} not match depends {} annotation {}",
                        field.param,
                        mismatch.actual,
                        self.call.name(),
                        mismatch.expected
                    );
                    return Err(DiError::TypeMismatch {
                        field: mismatch.field,
                        callable: self.call.name().to_string(),
                        expected: mismatch.expected,
                        actual: mismatch.actual.to_string(),
                    });
                }
            }
        }

        Ok(values)
    }

    fn field_default(&self, field: &ModelField) -> Result<Injected> {
        match &field.default {
            DefaultValue::HasDefault(value) => Ok(value.clone()),
            DefaultValue::Undefined => Ok(Injected::none()),
            DefaultValue::Required => Err(DiError::MissingInput {
                callable: self.call.name().to_string(),
                parameter: field.name.clone(),
            }),
        }
    }

    /// Call the wrapped callable with an already-solved mapping.
    pub fn call_with(&self, values: &Kwargs) -> Result<Injected> {
        tracing::debug!("Calling {} with {:?}", self.call.name(), values.keys().collect::<Vec<_>>());
        self.call.invoke(values)
    }

    /// 解析出函數所需的值後注入參數計算返回
    pub fn call(&self, inputs: &Kwargs) -> Result<Injected> {
        let values = self.solve(inputs)?;
        self.call_with(&values)
    }

    pub fn call_as<T: Any + Send + Sync>(&self, inputs: &Kwargs) -> Result<Arc<T>> {
        let result = self.call(inputs)?;
        result.downcast::<T>().ok_or_else(|| DiError::DowncastFailed {
            name: self.call.name().to_string(),
            required_type: type_name::<T>(),
            actual_type: result.type_info().name,
        })
    }
}

impl fmt::Debug for Dependent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependent call={}", self.call.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::{depends, LeafParam, ValueParam};
    use crate::core::signature::{Parameter, Scope};
    use crate::core::types::TypeInfo;
    use crate::domain::model::{Person, TestObj};

    fn greet() -> Callable {
        Callable::builder("greet")
            .param(Parameter::new("person"))
            .param(Parameter::new("t").annotated::<TestObj>())
            .build(|kw| {
                let person = kw.require::<Person>("person")?;
                let t = kw.require::<TestObj>("t")?;
                Ok(format!("{}#{}", person.name, t.id))
            })
    }

    #[test]
    fn test_leaf_only_solve_keys_match_parameters() {
        let dependent = Dependent::parse(&greet()).unwrap();
        let inputs = Kwargs::new()
            .with("test", TestObj::new(3))
            .with("person", Person::new("ann"))
            .with("unrelated", 1u8);

        let values = dependent.solve(&inputs).unwrap();
        let keys: Vec<&str> = values.keys().collect();
        assert_eq!(keys, vec!["person", "t"]);
        assert_eq!(dependent.field_names(), vec!["person", "t"]);
    }

    #[test]
    fn test_call_equals_invoke_of_solve() {
        let call = greet();
        let dependent = Dependent::parse(&call).unwrap();
        let inputs = Kwargs::new()
            .with("test", TestObj::new(9))
            .with("person", Person::new("bo"));

        let direct = dependent.call_as::<String>(&inputs).unwrap();
        let manual = call.invoke(&dependent.solve(&inputs).unwrap()).unwrap();
        assert_eq!(*direct, "bo#9");
        assert_eq!(*manual.downcast::<String>().unwrap(), *direct);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let call = greet();
        let first = Dependent::parse(&call).unwrap();
        let second = Dependent::parse(&call).unwrap();
        assert_eq!(first.shape(), second.shape());
        assert!(first.shape().iter().all(|f| f.required));
    }

    #[test]
    fn test_missing_required_input() {
        let dependent = Dependent::parse(&greet()).unwrap();
        let inputs = Kwargs::new().with("person", Person::new("ann"));
        match dependent.solve(&inputs) {
            Err(DiError::MissingInput {
                callable,
                parameter,
            }) => {
                assert_eq!(callable, "greet");
                assert_eq!(parameter, "t");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_type_mismatch_is_fatal() {
        let dependent = Dependent::parse(&greet()).unwrap();
        let inputs = Kwargs::new()
            .with("test", "not a TestObj")
            .with("person", Person::new("ann"));
        match dependent.call(&inputs) {
            Err(DiError::TypeMismatch {
                field, callable, ..
            }) => {
                assert_eq!(field, "t");
                assert_eq!(callable, "greet");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_prebuilt_param_bypasses_classification() {
        let call = Callable::builder("count")
            .param(Parameter::new("limit").param(Arc::new(ValueParam::with_default("limit", 10u32))))
            .param(
                Parameter::new("note")
                    .annotation(TypeExpr::optional_of::<String>())
                    .param(Arc::new(ValueParam::optional("note"))),
            )
            .build(|kw| {
                let limit = kw.require::<u32>("limit")?;
                Ok((*limit, kw.get::<String>("note").is_some()))
            });

        let dependent = Dependent::parse(&call).unwrap();
        assert!(dependent.params().iter().all(|f| !f.required));

        let out = dependent.call_as::<(u32, bool)>(&Kwargs::new()).unwrap();
        assert_eq!(*out, (10, false));

        let inputs = Kwargs::new().with("limit", 3u32).with("note", "hi".to_string());
        assert_eq!(*dependent.call_as::<(u32, bool)>(&inputs).unwrap(), (3, true));
    }

    #[test]
    fn test_prebuilt_param_with_conflicting_annotation() {
        let call = Callable::builder("count")
            .param(
                Parameter::new("limit")
                    .annotated::<String>()
                    .param(Arc::new(ValueParam::required("limit").expecting(TypeExpr::of::<u32>()))),
            )
            .build(|_| Ok(()));
        assert!(matches!(
            Dependent::parse(&call),
            Err(DiError::IncompatibleAnnotation { .. })
        ));
    }

    fn person_leaf() -> Arc<LeafParam> {
        Arc::new(LeafParam::new(TypeInfo::of::<Person>(), "person"))
    }

    #[test]
    fn test_prebuilt_leaf_with_conflicting_annotation() {
        let call = Callable::builder("count")
            .param(Parameter::new("n").annotated::<u8>().param(person_leaf()))
            .build(|_| Ok(()));

        match Dependent::parse(&call) {
            Err(DiError::IncompatibleAnnotation {
                callable,
                parameter,
                annotation,
                ..
            }) => {
                assert_eq!(callable, "count");
                assert_eq!(parameter, "n");
                assert_eq!(annotation, "u8");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_prebuilt_leaf_accepts_optional_and_any() {
        let call = Callable::builder("names")
            .param(
                Parameter::new("maybe")
                    .annotation(TypeExpr::optional_of::<Person>())
                    .param(person_leaf()),
            )
            .param(
                Parameter::new("anything")
                    .annotation(TypeExpr::Any)
                    .param(person_leaf()),
            )
            .build(|kw| {
                let maybe = kw.require::<Person>("maybe")?;
                let anything = kw.require::<Person>("anything")?;
                Ok(format!("{}/{}", maybe.name, anything.name))
            });

        let dependent = Dependent::parse(&call).unwrap();
        let out = dependent
            .call_as::<String>(&Kwargs::new().with("person", Person::new("cy")))
            .unwrap();
        assert_eq!(*out, "cy/cy");
    }

    #[test]
    fn test_depends_without_target_uses_scope_factory() {
        let scope = Scope::new("app");
        let make_person = Callable::builder("make_person")
            .build(|_| Ok(Person::new("from factory")));
        scope.provide(&make_person);

        let call = Callable::builder("hello")
            .param(Parameter::new("who").annotated::<Person>().depends(depends(None)))
            .in_scope(&scope)
            .build(|kw| Ok(kw.require::<Person>("who")?.name.clone()));

        let dependent = Dependent::parse(&call).unwrap();
        let out = dependent.call_as::<String>(&Kwargs::new()).unwrap();
        assert_eq!(*out, "from factory");
    }

    #[test]
    fn test_depth_limit() {
        let leaf = Callable::builder("leaf").build(|_| Ok(0u8));
        let mid = Callable::builder("mid")
            .param(Parameter::new("x").depends(depends(Some(leaf))))
            .build(|_| Ok(1u8));
        let top = Callable::builder("top")
            .param(Parameter::new("y").depends(depends(Some(mid))))
            .build(|_| Ok(2u8));

        let limited = |max_depth| {
            Resolver::new(
                ParamRegistry::standard(),
                ParseOptions {
                    detect_cycles: true,
                    max_depth,
                },
            )
        };

        // top -> mid -> leaf 需要兩層子依賴
        assert!(limited(2).parse(&top).is_ok());
        match limited(1).parse(&top) {
            Err(DiError::DepthLimitExceeded { callable, limit }) => {
                assert_eq!(callable, "leaf");
                assert_eq!(limit, 1);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_depth_one_allows_a_single_sub_dependency() {
        let leaf = Callable::builder("leaf").build(|_| Ok(0u8));
        let top = Callable::builder("top")
            .param(Parameter::new("x").depends(depends(Some(leaf))))
            .build(|kw| Ok(*kw.require::<u8>("x")? + 1));

        let resolver = Resolver::new(
            ParamRegistry::standard(),
            ParseOptions {
                detect_cycles: true,
                max_depth: 1,
            },
        );
        let dependent = resolver.parse(&top).unwrap();
        assert_eq!(*dependent.call_as::<u8>(&Kwargs::new()).unwrap(), 1);
    }
}
