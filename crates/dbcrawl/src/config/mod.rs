//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use crate::retrieve::{GrepFilter, InclusionRules, NameFilter};
use crate::strategy::{DetailLevels, LevelDefinition};
use sha2::{Digest, Sha256};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration for crawl reports.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl CrawlConfig {
    /// Built-in levels, or the custom ones when configured.
    pub fn detail_levels(&self) -> Result<DetailLevels> {
        if self.custom_levels.is_empty() {
            Ok(DetailLevels::builtin())
        } else {
            DetailLevels::custom(self.custom_levels.iter().map(LevelDefinition::from).collect())
        }
    }

    /// Compiled inclusion rules.
    pub fn inclusion_rules(&self) -> Result<InclusionRules> {
        let filter = |p: &PatternConfig| NameFilter::new(&p.include, &p.exclude);
        Ok(InclusionRules {
            schemas: filter(&self.schemas)?,
            tables: filter(&self.tables)?,
            routines: filter(&self.routines)?,
            sequences: filter(&self.sequences)?,
            synonyms: filter(&self.synonyms)?,
            table_types: self.table_types.clone(),
        })
    }

    /// Compiled column grep, if configured.
    pub fn grep_filter(&self) -> Result<Option<GrepFilter>> {
        self.grep
            .as_ref()
            .map(|g| GrepFilter::new(&g.columns, g.invert))
            .transpose()
    }
}
