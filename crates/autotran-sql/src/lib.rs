//! PostgreSQL script parsing and deparsing
//!
//! This crate handles:
//! - Tokenizing scripts with datafusion-sqlparser-rs and splitting statements
//! - Reading `CREATE FUNCTION` / `CREATE PROCEDURE` headers
//! - Re-serializing statements as pretty-printed SQL

pub mod parser;
pub mod routine;
pub mod pretty;
pub mod deparse;

pub use parser::{ScriptParser, ParsedScript, StatementNode, SqlStatement, RawStatement, ParseError};
pub use routine::{RoutineDefinition, Parameter, ParameterMode, ResultShape, TypeName, is_routine_header};
pub use pretty::{prettify, ensure_terminated, join_tokens, TERMINATOR};
pub use deparse::Deparse;
pub use sqlparser::ast::Ident;
