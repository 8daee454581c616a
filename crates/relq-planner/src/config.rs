use serde::{Deserialize, Serialize};

/// Where identifiers in a WHERE predicate are looked up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateScope {
    /// Any relation in the catalog ([`relq_catalog::Catalog::has_column`]).
    #[default]
    Catalog,
    /// The FROM relation and the relations joined to it. A `rel.col` name is
    /// checked against `rel` only.
    Relation,
}

/// Planner knobs. Deserializes from `{"predicate_scope": "relation"}`; every
/// field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub predicate_scope: PredicateScope,
}

impl PlannerConfig {
    #[must_use]
    pub const fn with_predicate_scope(mut self, scope: PredicateScope) -> Self {
        self.predicate_scope = scope;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scope_is_catalog() {
        assert_eq!(PlannerConfig::default().predicate_scope, PredicateScope::Catalog);
    }

    #[test]
    fn test_deserialize() {
        let cfg: PlannerConfig =
            serde_json::from_str(r#"{"predicate_scope": "relation"}"#).expect("valid config");
        assert_eq!(cfg.predicate_scope, PredicateScope::Relation);

        let empty: PlannerConfig = serde_json::from_str("{}").expect("all fields optional");
        assert_eq!(empty, PlannerConfig::default());

        assert!(serde_json::from_str::<PlannerConfig>(r#"{"predicate_scope": "global"}"#).is_err());
    }
}
