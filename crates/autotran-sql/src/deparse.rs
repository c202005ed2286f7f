//! Deparsing: statement nodes back to formatted SQL text

use crate::parser::{ParseError, StatementNode};
use crate::pretty::{ensure_terminated, join_tokens, prettify};
use crate::routine::RoutineDefinition;

/// Re-serialize a parsed node as pretty-printed SQL
pub trait Deparse {
    /// Pretty-printed text, without a trailing terminator
    fn deparse(&self) -> Result<String, ParseError>;

    /// Pretty-printed text ending with `;`
    fn deparse_statement(&self) -> Result<String, ParseError> {
        self.deparse().map(ensure_terminated)
    }
}

impl Deparse for RoutineDefinition {
    fn deparse(&self) -> Result<String, ParseError> {
        prettify(&self.to_string())
    }
}

impl Deparse for StatementNode {
    fn deparse(&self) -> Result<String, ParseError> {
        match self {
            Self::Routine(routine) => routine.deparse(),
            Self::Sql(sql) => Ok(join_tokens(&sql.tokens)),
            Self::Raw(raw) => Ok(join_tokens(&raw.tokens)),
        }
    }
}
