use crate::config::toml_config::{DemoConfig, ResolverConfig};
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "small-di")]
#[command(about = "Resolve and invoke the demo dependency graph")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub person_name: Option<String>,

    #[arg(long)]
    pub test_id: Option<i64>,

    #[arg(long, help = "Emit JSON logs")]
    pub json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Load the TOML file (if any) and apply command-line overrides on top.
    pub fn resolve(&self) -> Result<ResolverConfig> {
        let mut config = match &self.config {
            Some(path) => ResolverConfig::from_file(path)?,
            None => ResolverConfig::default(),
        };

        let mut demo = config.demo.take().unwrap_or(DemoConfig {
            person_name: "test person".to_string(),
            test_id: 6,
        });
        if let Some(name) = &self.person_name {
            demo.person_name = name.clone();
        }
        if let Some(id) = self.test_id {
            demo.test_id = id;
        }
        config.demo = Some(demo);

        let logging = config.logging.get_or_insert_with(Default::default);
        logging.verbose |= self.verbose;
        if self.json {
            logging.format = Some("json".to_string());
        }

        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.config {
            validate_non_empty_string("config", path)?;
        }
        if let Some(name) = &self.person_name {
            validate_non_empty_string("person_name", name)?;
        }
        Ok(())
    }
}
