use crate::core::dependent::ModelField;
use crate::core::types::Injected;
use std::fmt;

/// A value that does not fit its field's declared type.
#[derive(Debug, Clone)]
pub struct TypeMisMatch {
    pub field: String,
    pub expected: String,
    pub actual: &'static str,
    pub value: Injected,
}

impl fmt::Display for TypeMisMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}' expects {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

impl std::error::Error for TypeMisMatch {}

/// 檢查型別與值是否對應；任意非基本型別皆允許
pub fn check_field_type(field: &ModelField, value: Injected) -> Result<Injected, TypeMisMatch> {
    if field.annotation.accepts(&value) {
        return Ok(value);
    }
    Err(TypeMisMatch {
        field: field.name.clone(),
        expected: field.type_display(),
        actual: value.type_info().name,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::ValueParam;
    use crate::core::types::{TypeExpr, TypeInfo};
    use crate::domain::model::{DefaultValue, Person};
    use std::sync::Arc;

    fn field(annotation: TypeExpr) -> ModelField {
        ModelField {
            name: "who".to_string(),
            annotation,
            required: true,
            default: DefaultValue::Required,
            param: Arc::new(ValueParam::required("who")),
        }
    }

    #[test]
    fn test_accepts_arbitrary_domain_types() {
        let f = field(TypeExpr::of::<Person>());
        let value = Injected::new(Person::new("ann"));
        let checked = check_field_type(&f, value.clone()).unwrap();
        assert!(checked.ptr_eq(&value));
    }

    #[test]
    fn test_rejects_wrong_type_with_details() {
        let f = field(TypeExpr::of::<Person>());
        let err = check_field_type(&f, Injected::new(42i64)).unwrap_err();
        assert_eq!(err.field, "who");
        assert_eq!(err.actual, "i64");
        assert_eq!(err.expected, TypeInfo::of::<Person>().name);
        assert!(err.value.is::<i64>());
    }

    #[test]
    fn test_optional_field_accepts_none() {
        let f = field(TypeExpr::optional_of::<Person>());
        assert!(check_field_type(&f, Injected::none()).is_ok());
        assert!(check_field_type(&field(TypeExpr::of::<Person>()), Injected::none()).is_err());
    }

    #[test]
    fn test_any_field_accepts_everything() {
        let f = field(TypeExpr::Any);
        assert!(check_field_type(&f, Injected::new(vec![1u8, 2, 3])).is_ok());
    }
}
