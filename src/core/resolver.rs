use crate::config::toml_config::ResolverConfig;
use crate::core::dependent::{Dependent, ParseContext, ParseOptions};
use crate::core::params::ParamRegistry;
use crate::core::signature::Callable;
use crate::utils::error::Result;

/// Parses callables into [`Dependent`] graphs with a fixed registry and options.
#[derive(Debug)]
pub struct Resolver {
    registry: ParamRegistry,
    options: ParseOptions,
}

impl Resolver {
    pub fn new(registry: ParamRegistry, options: ParseOptions) -> Self {
        Self { registry, options }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.registry(), config.parse_options())
    }

    pub fn registry(&self) -> &ParamRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn parse(&self, call: &Callable) -> Result<Dependent> {
        let mut ctx = ParseContext::new(&self.registry, &self.options);
        let dependent = ctx.parse(call)?;
        tracing::debug!(
            "Parsed {} with fields {:?}",
            call.name(),
            dependent.field_names()
        );
        Ok(dependent)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(ParamRegistry::standard(), ParseOptions::default())
    }
}

/// 以標準設定建立依賴圖
pub fn parse(call: &Callable) -> Result<Dependent> {
    Resolver::default().parse(call)
}
