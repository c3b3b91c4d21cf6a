use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiError {
    #[error("Cannot resolve annotation '{annotation}' of parameter '{parameter}' in {callable}: {reason}")]
    AnnotationResolution {
        callable: String,
        parameter: String,
        annotation: String,
        reason: String,
    },

    #[error("Unknown parameter {parameter} for function {callable} with type {annotation}")]
    UnknownParameter {
        callable: String,
        parameter: String,
        annotation: String,
    },

    #[error("Dependency cannot be empty: parameter '{parameter}' of {callable} has no target and no usable annotation")]
    MissingDependencyTarget { callable: String, parameter: String },

    #[error("Type mismatch for field '{field}' of {callable}: expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        callable: String,
        expected: String,
        actual: String,
    },

    #[error("Cyclic dependency detected: {chain}")]
    CyclicDependency { chain: String },

    #[error("Dependency depth limit {limit} exceeded while parsing {callable}")]
    DepthLimitExceeded { callable: String, limit: usize },

    #[error("Parameter '{parameter}' of {callable} is annotated {annotation}, which conflicts with {param}")]
    IncompatibleAnnotation {
        callable: String,
        parameter: String,
        annotation: String,
        param: String,
    },

    #[error("Missing required input '{parameter}' for {callable}")]
    MissingInput { callable: String, parameter: String },

    /// Raised by [`Kwargs::require`](crate::Kwargs::require); [`Callable::invoke`](crate::Callable::invoke)
    /// turns it into [`DiError::MissingInput`] naming the callable.
    #[error("Missing keyword argument '{parameter}'")]
    MissingArgument { parameter: String },

    #[error("Failed to downcast '{name}', required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        name: String,
        required_type: &'static str,
        actual_type: &'static str,
    },

    #[error("Call to {callable} failed: {message}")]
    CallFailed { callable: String, message: String },

    #[error("Configuration validation error in field '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid configuration value for '{field}' = '{value}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// 錯誤分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 依賴圖接線錯誤 (parse 階段)
    Wiring,
    /// 數據與型別契約錯誤 (solve 階段)
    Data,
    Config,
    System,
}

impl DiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DiError::AnnotationResolution { .. }
            | DiError::UnknownParameter { .. }
            | DiError::MissingDependencyTarget { .. }
            | DiError::CyclicDependency { .. }
            | DiError::DepthLimitExceeded { .. }
            | DiError::IncompatibleAnnotation { .. } => ErrorCategory::Wiring,
            DiError::TypeMismatch { .. }
            | DiError::MissingInput { .. }
            | DiError::MissingArgument { .. }
            | DiError::DowncastFailed { .. }
            | DiError::CallFailed { .. } => ErrorCategory::Data,
            DiError::ConfigValidationError { .. } | DiError::InvalidConfigValueError { .. } => {
                ErrorCategory::Config
            }
            DiError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DiError::AnnotationResolution { .. } => {
                "Register the annotated type in the callable's scope or use a concrete type"
            }
            DiError::UnknownParameter { .. } => {
                "Annotate the parameter with an injectable type, rename it to a reserved name, or give it a depends() default"
            }
            DiError::MissingDependencyTarget { .. } => {
                "Pass an explicit callable to depends() or register a factory for the annotated type"
            }
            DiError::TypeMismatch { .. } => {
                "Check that the provider returns the type declared on the parameter"
            }
            DiError::CyclicDependency { .. } | DiError::DepthLimitExceeded { .. } => {
                "Break the dependency chain so that no callable depends on itself"
            }
            DiError::IncompatibleAnnotation { .. } => {
                "Align the parameter annotation with the type the pre-built param produces"
            }
            DiError::MissingInput { .. } => "Supply the value in the external inputs",
            DiError::MissingArgument { .. } => {
                "Look the value up under a parameter the callable declares"
            }
            DiError::DowncastFailed { .. } => "Request the value with the type it was injected as",
            DiError::CallFailed { .. } => "Inspect the failing callable body",
            DiError::ConfigValidationError { .. } | DiError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and try again"
            }
            DiError::IoError(_) => "Check that the file exists and is readable",
        }
    }

    /// Attribute a body-level lookup failure to the callable that made it.
    pub fn within(self, callable: &str) -> Self {
        match self {
            DiError::MissingArgument { parameter } => DiError::MissingInput {
                callable: callable.to_string(),
                parameter,
            },
            other => other,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Wiring => format!("Dependency wiring error: {}", self),
            ErrorCategory::Data => format!("Dependency resolution failed: {}", self),
            ErrorCategory::Config => format!("Configuration error: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = DiError::UnknownParameter {
            callable: "f".to_string(),
            parameter: "x".to_string(),
            annotation: "i32".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Wiring);

        let err = DiError::TypeMismatch {
            field: "x".to_string(),
            callable: "f".to_string(),
            expected: "i32".to_string(),
            actual: "u8".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Data);
        assert!(err.user_friendly_message().starts_with("Dependency resolution failed"));
    }

    #[test]
    fn test_unknown_parameter_message_names_everything() {
        let err = DiError::UnknownParameter {
            callable: "handler".to_string(),
            parameter: "count".to_string(),
            annotation: "u32".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("handler"));
        assert!(msg.contains("count"));
        assert!(msg.contains("u32"));
    }

    #[test]
    fn test_missing_argument_is_attributed_to_callable() {
        let err = DiError::MissingArgument {
            parameter: "dep".to_string(),
        }
        .within("test_func");
        match err {
            DiError::MissingInput {
                callable,
                parameter,
            } => {
                assert_eq!(callable, "test_func");
                assert_eq!(parameter, "dep");
            }
            other => panic!("unexpected: {:?}", other),
        }

        let untouched = DiError::CyclicDependency {
            chain: "a -> a".to_string(),
        }
        .within("b");
        assert!(matches!(untouched, DiError::CyclicDependency { .. }));
    }
}
