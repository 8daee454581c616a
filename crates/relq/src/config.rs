// Engine configuration: planner knobs plus the catalog description, loaded
// from one JSON document.

use std::fs;
use std::path::Path;

use relq_catalog::{MemoryCatalog, Relation};
use relq_error::{RelqError, Result};
use relq_planner::PlannerConfig;
use serde::{Deserialize, Serialize};

/// Everything needed to compile statements outside of code:
///
/// ```json
/// {
///   "planner": { "predicate_scope": "relation" },
///   "relations": [
///     { "name": "users", "columns": [ { "name": "id", "type": "INTEGER" } ] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub planner: PlannerConfig,
    pub relations: Vec<Relation>,
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| RelqError::config(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text).map_err(|err| match err {
            RelqError::Config(msg) => RelqError::config(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        tracing::debug!(
            target: "relq.config",
            path = %path.display(),
            relations = config.relations.len(),
            "loaded engine config"
        );
        Ok(config)
    }

    /// Build the in-memory catalog described by `relations`.
    #[must_use]
    pub fn catalog(&self) -> MemoryCatalog {
        self.relations.iter().cloned().collect()
    }
}
