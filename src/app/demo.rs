//! Demo wiring: `test_func(test, dep=depends(provider2))`,
//! `provider2(dep=depends(provider1))`, `provider1(person)`.

use crate::config::toml_config::{DemoConfig, ResolverConfig};
use crate::core::params::depends;
use crate::core::resolver::Resolver;
use crate::core::signature::{Callable, Parameter, Scope};
use crate::core::types::Kwargs;
use crate::domain::model::{Person, TestObj};
use crate::utils::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

pub type Deps = BTreeMap<String, i64>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestFuncOutput {
    pub test_id: i64,
    pub dep: Deps,
}

/// Records which callables ran, in order.
#[derive(Debug, Clone, Default)]
pub struct CallTrace(Arc<Mutex<Vec<String>>>);

impl CallTrace {
    pub fn record(&self, name: &str) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

pub struct DemoGraph {
    pub scope: Arc<Scope>,
    pub provider1: Callable,
    pub provider2: Callable,
    pub test_func: Callable,
}

/// 建立示範用的依賴圖；`person_param` 是 provider1 未標注參數的名稱
pub fn build_demo(trace: &CallTrace, test_param: &str, person_param: &str) -> DemoGraph {
    let scope = Scope::new("demo");
    scope.register_type::<TestObj>("TestObj");
    scope.register_type::<Person>("Person");
    scope.register_type::<Deps>("Deps");

    let provider1 = {
        let trace = trace.clone();
        let key = person_param.to_string();
        Callable::builder("provider1")
            .param(Parameter::new(person_param))
            .in_scope(&scope)
            .build(move |kw| {
                trace.record("provider1");
                let person = kw.require::<Person>(&key)?;
                tracing::info!("in provider1: person's name: {}", person.name);
                Ok(Deps::from([("c".to_string(), 123), ("d".to_string(), 999)]))
            })
    };

    let provider2 = {
        let trace = trace.clone();
        Callable::builder("provider2")
            .param(
                Parameter::new("dep")
                    .deferred("Deps")
                    .depends(depends(Some(provider1.clone()))),
            )
            .in_scope(&scope)
            .build(move |kw| {
                trace.record("provider2");
                let dep = kw.require::<Deps>("dep")?;
                tracing::info!("in provider2: dep are: {:?}", dep);
                let mut return_values = Deps::from([("a".to_string(), 123), ("b".to_string(), 999)]);
                return_values.extend(dep.iter().map(|(k, v)| (k.clone(), *v)));
                Ok(return_values)
            })
    };

    let test_func = {
        let trace = trace.clone();
        let key = test_param.to_string();
        Callable::builder("test_func")
            .param(Parameter::new(test_param).deferred("TestObj"))
            .param(
                Parameter::new("dep")
                    .deferred("Deps")
                    .depends(depends(Some(provider2.clone()))),
            )
            .in_scope(&scope)
            .build(move |kw| {
                trace.record("test_func");
                let test = kw.require::<TestObj>(&key)?;
                let dep = kw.require::<Deps>("dep")?;
                tracing::info!("in test_func: testparam's id: {}", test.id);
                Ok(TestFuncOutput {
                    test_id: test.id,
                    dep: (*dep).clone(),
                })
            })
    };

    DemoGraph {
        scope,
        provider1,
        provider2,
        test_func,
    }
}

/// 執行前註冊，再直接執行原函數
pub fn run_demo(config: &ResolverConfig, trace: &CallTrace) -> Result<TestFuncOutput> {
    let demo = config.demo.clone().unwrap_or(DemoConfig {
        person_name: "test person".to_string(),
        test_id: 6,
    });

    let graph = build_demo(trace, &config.names.test, &config.names.person);
    let resolver = Resolver::from_config(config);
    let dependent = resolver.parse(&graph.test_func)?;

    let inputs = Kwargs::new()
        .with(config.names.test.clone(), TestObj::new(demo.test_id))
        .with(config.names.person.clone(), Person::new(demo.person_name));

    let output = dependent.call_as::<TestFuncOutput>(&inputs)?;
    Ok((*output).clone())
}
