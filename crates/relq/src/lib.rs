//! Public API facade for relq.
//!
//! Compiles SQL `SELECT` text into a validated logical plan in one call and
//! re-exports the pipeline crates for callers that need the stages
//! separately.

mod config;

pub use config::EngineConfig;
pub use relq_ast as ast;
pub use relq_catalog::{Catalog, Column, DataType, MemoryCatalog, Relation};
pub use relq_error::{ErrorKind, RelqError, Result};
pub use relq_parser::{Lexeme, ParseError, Parser, Scanner, Token, parse, parse_statement};
pub use relq_planner::{PlanNode, Planner, PlannerConfig, PredicateScope};

/// Parse and plan one statement with the default planner configuration.
pub fn compile(sql: &str, catalog: &dyn Catalog) -> Result<PlanNode> {
    compile_with(sql, catalog, &PlannerConfig::default())
}

/// Parse and plan one statement.
pub fn compile_with(sql: &str, catalog: &dyn Catalog, config: &PlannerConfig) -> Result<PlanNode> {
    let stmt = parse_statement(sql)?;
    Planner::with_config(catalog, *config).plan(&stmt)
}
