use crate::core::dependent::{ParseOptions, DEFAULT_MAX_DEPTH};
use crate::core::params::{ParamRegistry, PERSON_PARAM_NAME, TEST_PARAM_NAME};
use crate::utils::error::{DiError, Result};
use crate::utils::validation::{
    validate_identifier, validate_non_empty_string, validate_range, validate_unique_names,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

const MAX_DEPTH_CEILING: usize = 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub resolver: ResolverSection,
    #[serde(default)]
    pub names: NamesConfig,
    pub demo: Option<DemoConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSection {
    #[serde(default = "default_detect_cycles")]
    pub detect_cycles: bool,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            detect_cycles: default_detect_cycles(),
            max_depth: default_max_depth(),
        }
    }
}

/// 葉節點參數的保留名稱
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamesConfig {
    #[serde(default = "default_test_name")]
    pub test: String,
    #[serde(default = "default_person_name")]
    pub person: String,
}

impl Default for NamesConfig {
    fn default() -> Self {
        Self {
            test: default_test_name(),
            person: default_person_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    pub person_name: String,
    pub test_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,
    pub format: Option<String>,
}

fn default_detect_cycles() -> bool {
    true
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_test_name() -> String {
    TEST_PARAM_NAME.to_string()
}

fn default_person_name() -> String {
    PERSON_PARAM_NAME.to_string()
}

impl ResolverConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DiError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DiError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PERSON_NAME})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DiError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_range("resolver.max_depth", self.resolver.max_depth, 1, MAX_DEPTH_CEILING)?;

        validate_identifier("names.test", &self.names.test)?;
        validate_identifier("names.person", &self.names.person)?;
        validate_unique_names(
            "names",
            &[self.names.test.as_str(), self.names.person.as_str()],
        )?;

        if let Some(demo) = &self.demo {
            validate_non_empty_string("demo.person_name", &demo.person_name)?;
        }

        if let Some(format) = self.logging.as_ref().and_then(|l| l.format.as_deref()) {
            let valid_formats = ["compact", "json"];
            if !valid_formats.contains(&format) {
                return Err(DiError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.to_string(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        valid_formats.join(", ")
                    ),
                });
            }
        }

        Ok(())
    }

    pub fn registry(&self) -> ParamRegistry {
        ParamRegistry::with_reserved_names(&self.names.test, &self.names.person)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            detect_cycles: self.resolver.detect_cycles,
            max_depth: self.resolver.max_depth,
        }
    }

    pub fn verbose(&self) -> bool {
        self.logging.as_ref().map(|l| l.verbose).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .map(|f| f == "json")
            .unwrap_or(false)
    }
}

impl Validate for ResolverConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
