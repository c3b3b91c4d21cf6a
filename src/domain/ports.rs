use crate::core::dependent::ParseContext;
use crate::core::signature::{Callable, TypedParameter};
use crate::core::types::{Kwargs, TypeExpr};
use crate::domain::model::{DefaultValue, Solved};
use crate::utils::error::Result;
use std::fmt;
use std::sync::Arc;

/// 依賴注入單元的參數：描述一個參數的值如何取得
pub trait Param: fmt::Debug + Send + Sync {
    fn default_value(&self) -> &DefaultValue;

    /// Extract this param's value from the external inputs.
    fn solve(&self, inputs: &Kwargs) -> Result<Solved>;

    /// Whether a parameter declared as `annotation` can carry this param.
    fn accepts_annotation(&self, _annotation: &TypeExpr) -> bool {
        true
    }
}

/// One entry of the classifier's ordered variant list.
pub trait ParamFactory: fmt::Debug + Send + Sync {
    /// Return `Some` when this variant claims the parameter.
    fn check_param(
        &self,
        ctx: &mut ParseContext<'_>,
        call: &Callable,
        param: &TypedParameter,
    ) -> Result<Option<Arc<dyn Param>>>;
}
