use small_di::utils::error::ErrorCategory;
use small_di::{
    depends, parse, Callable, DiError, Kwargs, ParamRegistry, ParseOptions, Parameter, Person,
    Resolver, Scope, TestObj,
};

#[test]
fn test_unknown_parameter_fails_parse() {
    let call = Callable::builder("handler")
        .param(Parameter::new("person"))
        .param(Parameter::new("count").annotated::<u32>())
        .build(|_| Ok(()));

    match parse(&call) {
        Err(DiError::UnknownParameter {
            callable,
            parameter,
            annotation,
        }) => {
            assert_eq!(callable, "handler");
            assert_eq!(parameter, "count");
            assert_eq!(annotation, "u32");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_plain_default_is_not_silently_accepted() {
    let call = Callable::builder("handler")
        .param(Parameter::new("retries").default_value(3u8))
        .build(|_| Ok(()));
    assert!(matches!(parse(&call), Err(DiError::UnknownParameter { .. })));
}

#[test]
fn test_provider_returning_wrong_type_is_type_mismatch() {
    let provider = Callable::builder("provider").build(|_| Ok("not a number"));
    let call = Callable::builder("consumer")
        .param(
            Parameter::new("n")
                .annotated::<i64>()
                .depends(depends(Some(provider))),
        )
        .build(|_| Ok(()));

    let dependent = parse(&call).unwrap();
    let err = dependent.call(&Kwargs::new()).unwrap_err();
    match &err {
        DiError::TypeMismatch {
            field,
            callable,
            expected,
            actual,
        } => {
            assert_eq!(field, "n");
            assert_eq!(callable, "consumer");
            assert_eq!(expected, "i64");
            assert_eq!(actual, "&str");
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(err.category(), ErrorCategory::Data);
}

#[test]
fn test_mismatch_in_nested_dependency_stops_the_parent() {
    let inner = Callable::builder("inner").build(|_| Ok(1u8));
    let middle = Callable::builder("middle")
        .param(Parameter::new("x").annotated::<u16>().depends(depends(Some(inner))))
        .build(|_| Ok(2u16));
    let outer = Callable::builder("outer")
        .param(Parameter::new("y").depends(depends(Some(middle))))
        .build(|_| -> small_di::Result<()> { panic!("outer must not run") });

    match parse(&outer).unwrap().call(&Kwargs::new()) {
        Err(DiError::TypeMismatch { callable, .. }) => assert_eq!(callable, "middle"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_unresolvable_forward_reference() {
    let scope = Scope::new("app");
    let call = Callable::builder("handler")
        .param(Parameter::new("p").deferred("Persn"))
        .in_scope(&scope)
        .build(|_| Ok(()));

    assert!(matches!(
        parse(&call),
        Err(DiError::AnnotationResolution { .. })
    ));
}

#[test]
fn test_forward_reference_to_domain_type_is_injected_by_type() {
    let scope = Scope::new("app");
    scope.register_type::<Person>("Person");
    let call = Callable::builder("hello")
        .param(Parameter::new("someone").deferred("Option<Person>"))
        .in_scope(&scope)
        .build(|kw| Ok(kw.require::<Person>("someone")?.name.clone()));

    let out = parse(&call)
        .unwrap()
        .call_as::<String>(&Kwargs::new().with("person", Person::new("Ada")))
        .unwrap();
    assert_eq!(*out, "Ada");
}

fn make_hello() -> Callable {
    let scope = Scope::new("app");
    scope.register_type::<Person>("Person");
    Callable::builder("hello")
        .param(Parameter::new("someone").deferred("Person"))
        .in_scope(&scope)
        .build(|kw| Ok(kw.require::<Person>("someone")?.name.clone()))
}

#[test]
fn test_forward_reference_outlives_local_scope_handle() {
    // make_hello 內的 scope 已離開作用域
    let hello = make_hello();
    let dependent = parse(&hello).unwrap();
    assert_eq!(dependent.field_names(), vec!["someone"]);

    let out = dependent
        .call_as::<String>(&Kwargs::new().with("person", Person::new("Grace")))
        .unwrap();
    assert_eq!(*out, "Grace");
}

#[test]
fn test_missing_lookup_in_body_names_the_callable() {
    let call = Callable::builder("lonely")
        .build(|kw| Ok(*kw.require::<u8>("ghost")?));

    match call.invoke(&Kwargs::new()) {
        Err(DiError::MissingInput {
            callable,
            parameter,
        }) => {
            assert_eq!(callable, "lonely");
            assert_eq!(parameter, "ghost");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_depends_on_type_without_factory() {
    let scope = Scope::new("app");
    let call = Callable::builder("handler")
        .param(Parameter::new("p").annotated::<TestObj>().depends(depends(None)))
        .in_scope(&scope)
        .build(|_| Ok(()));

    match parse(&call) {
        Err(DiError::MissingDependencyTarget {
            callable,
            parameter,
        }) => {
            assert_eq!(callable, "handler");
            assert_eq!(parameter, "p");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_body_errors_propagate_unchanged() {
    let failing = Callable::builder("failing").build(|_| -> small_di::Result<u8> {
        Err(DiError::CallFailed {
            callable: "failing".to_string(),
            message: "boom".to_string(),
        })
    });
    let call = Callable::builder("top")
        .param(Parameter::new("x").depends(depends(Some(failing))))
        .build(|_| Ok(()));

    match parse(&call).unwrap().call(&Kwargs::new()) {
        Err(DiError::CallFailed { message, .. }) => assert_eq!(message, "boom"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_substituted_registry_changes_matching() {
    // 沒有葉節點變體時，保留名稱不再有效
    let registry = ParamRegistry::new().with(small_di::core::params::DependsFactory);
    let resolver = Resolver::new(registry, ParseOptions::default());
    let call = Callable::builder("handler")
        .param(Parameter::new("person"))
        .build(|_| Ok(()));

    assert!(matches!(
        resolver.parse(&call),
        Err(DiError::UnknownParameter { .. })
    ));
    assert!(parse(&call).is_ok());
}
