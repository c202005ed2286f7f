//! SQL script parsing using datafusion-sqlparser-rs
//!
//! Scripts are tokenized with the PostgreSQL dialect and split on top-level
//! semicolons. Routine definitions are read by [`RoutineDefinition`]; every
//! other statement goes through the sqlparser AST when it can model it and is
//! otherwise kept as its tokens.

use autotran_core::{Diagnostic, DiagnosticCode, Location, Severity};
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::fmt;

use crate::pretty::join_tokens;
use crate::routine::{is_routine_header, is_word, RoutineDefinition};

/// Tokenize SQL with the PostgreSQL dialect, dropping whitespace and comments
pub(crate) fn tokenize(sql: &str) -> Result<Vec<Token>, ParseError> {
    tokenize_with(&PostgreSqlDialect {}, sql)
}

fn tokenize_with(dialect: &PostgreSqlDialect, sql: &str) -> Result<Vec<Token>, ParseError> {
    let tokens = Tokenizer::new(dialect, sql)
        .with_unescape(false)
        .tokenize()
        .map_err(|e| ParseError::Tokenize {
            message: e.message.clone(),
            line: e.location.line,
            column: e.location.column,
        })?;

    Ok(tokens
        .into_iter()
        .filter(|t| !matches!(t, Token::Whitespace(_) | Token::EOF))
        .collect())
}

/// Significant tokens of one statement
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StatementTokens {
    pub tokens: Vec<Token>,
    /// Followed by `;` in the source
    pub terminated: bool,
}

/// Split a token stream on top-level semicolons
///
/// Semicolons inside a `BEGIN ATOMIC ... END` body do not end the statement.
/// Empty statements are dropped.
pub(crate) fn split_statements(tokens: Vec<Token>) -> Vec<StatementTokens> {
    let mut statements = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut atomic_depth = 0usize;

    for token in tokens {
        if atomic_depth > 0 {
            if is_word(Some(&token), "CASE") {
                atomic_depth += 1;
            } else if is_word(Some(&token), "END") {
                atomic_depth -= 1;
            }
        } else if is_word(Some(&token), "ATOMIC") && is_word(current.last(), "BEGIN") {
            atomic_depth = 1;
        }

        if token == Token::SemiColon && atomic_depth == 0 {
            if !current.is_empty() {
                statements.push(StatementTokens {
                    tokens: std::mem::take(&mut current),
                    terminated: true,
                });
            }
            continue;
        }

        current.push(token);
    }

    if !current.is_empty() {
        statements.push(StatementTokens {
            tokens: current,
            terminated: false,
        });
    }

    statements
}

/// A statement sqlparser cannot model, kept as its tokens
#[derive(Debug, Clone, PartialEq)]
pub struct RawStatement {
    pub tokens: Vec<Token>,
}

impl fmt::Display for RawStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_tokens(&self.tokens))
    }
}

/// A statement sqlparser models, with the tokens it was read from
///
/// The AST classifies the statement; the tokens are what gets re-emitted,
/// since the AST's `Display` does not always reproduce the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub statement: Box<Statement>,
    pub tokens: Vec<Token>,
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_tokens(&self.tokens))
    }
}

/// One top-level statement of a script
#[derive(Debug, Clone, PartialEq)]
pub enum StatementNode {
    /// `CREATE [OR REPLACE] FUNCTION | PROCEDURE`
    Routine(RoutineDefinition),

    /// Any other statement sqlparser models
    Sql(SqlStatement),

    /// Any other statement, as tokens
    Raw(RawStatement),
}

impl StatementNode {
    fn from_tokens(dialect: &PostgreSqlDialect, tokens: Vec<Token>) -> Result<Self, ParseError> {
        if is_routine_header(&tokens) {
            return RoutineDefinition::parse(&tokens).map(Self::Routine);
        }

        let text = join_tokens(&tokens);
        match Parser::parse_sql(dialect, &text) {
            Ok(mut statements) if statements.len() == 1 => Ok(Self::Sql(SqlStatement {
                statement: Box::new(statements.remove(0)),
                tokens,
            })),
            Ok(_) | Err(_) => {
                tracing::debug!(statement = %text, "statement kept as tokens");
                Ok(Self::Raw(RawStatement { tokens }))
            }
        }
    }

    /// Significant source tokens of a non-routine statement
    pub fn tokens(&self) -> Option<&[Token]> {
        match self {
            Self::Routine(_) => None,
            Self::Sql(sql) => Some(&sql.tokens),
            Self::Raw(raw) => Some(&raw.tokens),
        }
    }

    /// The routine definition, if this is one
    pub fn as_routine(&self) -> Option<&RoutineDefinition> {
        match self {
            Self::Routine(routine) => Some(routine),
            _ => None,
        }
    }
}

impl fmt::Display for StatementNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Routine(routine) => write!(f, "{}", routine),
            Self::Sql(sql) => write!(f, "{}", sql),
            Self::Raw(raw) => write!(f, "{}", raw),
        }
    }
}

/// Parser for PostgreSQL scripts
pub struct ScriptParser {
    dialect: PostgreSqlDialect,
}

impl ScriptParser {
    /// Create a new script parser
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Parse a script into its ordered statements
    pub fn parse(&self, sql: &str, script: Option<&str>) -> Result<ParsedScript, ParseError> {
        let tokens = tokenize_with(&self.dialect, sql)?;

        let statements = split_statements(tokens)
            .into_iter()
            .map(|stmt| StatementNode::from_tokens(&self.dialect, stmt.tokens))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            script = script.unwrap_or("<inline>"),
            statements = statements.len(),
            "parsed script"
        );

        Ok(ParsedScript {
            sql: sql.to_string(),
            statements,
            script: script.map(str::to_string),
        })
    }
}

impl Default for ScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Successfully parsed script
#[derive(Debug, Clone)]
pub struct ParsedScript {
    /// Original SQL string
    pub sql: String,

    /// Parsed statements, in source order
    pub statements: Vec<StatementNode>,

    /// Script identifier (if parsed from a file)
    pub script: Option<String>,
}

impl ParsedScript {
    /// Count the number of statements
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// More than one top-level statement
    pub fn is_multi_statement(&self) -> bool {
        self.statements.len() > 1
    }

    /// Routine definitions with their statement index
    pub fn routines(&self) -> impl Iterator<Item = (usize, &RoutineDefinition)> {
        self.statements
            .iter()
            .enumerate()
            .filter_map(|(i, stmt)| stmt.as_routine().map(|r| (i, r)))
    }
}

/// SQL parsing error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to tokenize SQL at line {line}, column {column}: {message}")]
    Tokenize { message: String, line: u64, column: u64 },

    #[error("malformed {kind} definition: {message}")]
    MalformedRoutine { kind: &'static str, message: String },

    #[error("could not resolve the {kind} name")]
    UnresolvedName { kind: &'static str },
}

impl ParseError {
    pub(crate) fn malformed(kind: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedRoutine {
            kind,
            message: message.into(),
        }
    }

    /// Convert to an autotran diagnostic
    pub fn to_diagnostic(&self, script: Option<&str>) -> Diagnostic {
        let mut diag = Diagnostic::new(DiagnosticCode::ScriptParseError, Severity::Error, self.to_string());

        if let Some(script) = script {
            let location = match self {
                Self::Tokenize { line, column, .. } => {
                    Location::with_position(script, *line as usize, *column as usize)
                }
                _ => Location::new(script),
            };
            diag = diag.with_location(location);
        }

        diag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_procedure() {
        let parser = ScriptParser::new();
        let sql = r#"
            CREATE OR REPLACE PROCEDURE app.write_audit(p_msg text)
            LANGUAGE plpgsql
            AS $$
            DECLARE
                PRAGMA AUTONOMOUS_TRANSACTION;
            BEGIN
                INSERT INTO audit(msg) VALUES (p_msg);
            END;
            $$;
        "#;

        let parsed = parser.parse(sql, Some("write_audit.sql")).unwrap();
        assert_eq!(parsed.statement_count(), 1);
        assert!(!parsed.is_multi_statement());
        assert_eq!(parsed.routines().count(), 1);
        assert_eq!(parsed.script.as_deref(), Some("write_audit.sql"));
    }

    #[test]
    fn parse_keeps_statement_order() {
        let parser = ScriptParser::new();
        let sql = "CREATE TABLE t (id int); \
                   CREATE PROCEDURE p() LANGUAGE sql AS $$ SELECT 1; $$; \
                   GRANT EXECUTE ON p TO app_role;";

        let parsed = parser.parse(sql, None).unwrap();
        assert_eq!(parsed.statement_count(), 3);
        assert!(matches!(parsed.statements[0], StatementNode::Sql(_)));
        assert!(matches!(parsed.statements[1], StatementNode::Routine(_)));
        assert!(parsed.statements[2].as_routine().is_none());
        assert_eq!(parsed.routines().next().unwrap().0, 1);
    }

    #[test]
    fn modelled_statements_keep_their_source_tokens() {
        let parser = ScriptParser::new();
        let parsed = parser
            .parse(
                "CREATE TRIGGER t_audit AFTER INSERT ON t FOR EACH ROW EXECUTE FUNCTION audit_trg(); \
                 ALTER TABLE app.log ALTER COLUMN msg TYPE varchar(200);",
                None,
            )
            .unwrap();

        let texts: Vec<String> = parsed.statements.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            texts,
            vec![
                "CREATE TRIGGER t_audit AFTER INSERT ON t FOR EACH ROW EXECUTE FUNCTION audit_trg()",
                "ALTER TABLE app.log ALTER COLUMN msg TYPE varchar(200)",
            ]
        );

        if let StatementNode::Sql(sql) = &parsed.statements[1] {
            assert!(matches!(*sql.statement, Statement::AlterTable { .. }));
        }
        assert!(parsed.statements.iter().all(|s| s.tokens().is_some()));
    }

    #[test]
    fn unmodelled_statements_are_kept_as_tokens() {
        let parser = ScriptParser::new();
        let parsed = parser
            .parse("SECURITY LABEL FOR selinux ON PROCEDURE app.p(integer) IS 'proc_exec_t';", None)
            .unwrap();

        match &parsed.statements[0] {
            StatementNode::Raw(raw) => {
                assert_eq!(
                    raw.to_string(),
                    "SECURITY LABEL FOR selinux ON PROCEDURE app.p(integer) IS 'proc_exec_t'"
                )
            }
            other => panic!("expected a raw statement, got {:?}", other),
        }
    }

    #[test]
    fn atomic_bodies_are_not_split() {
        let tokens = tokenize(
            "CREATE FUNCTION f() RETURNS int BEGIN ATOMIC SELECT CASE WHEN true THEN 1 END; SELECT 2; END; SELECT 3;",
        )
        .unwrap();

        let statements = split_statements(tokens);
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|s| s.terminated));
    }

    #[test]
    fn empty_statements_are_dropped() {
        let statements = split_statements(tokenize(";; SELECT 1;;").unwrap());
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn parse_unterminated_string() {
        let parser = ScriptParser::new();
        let result = parser.parse("CREATE FUNCTION f() RETURNS text AS 'oops", Some("bad.sql"));

        let error = result.unwrap_err();
        assert!(matches!(error, ParseError::Tokenize { .. }));

        let diag = error.to_diagnostic(Some("bad.sql"));
        assert_eq!(diag.code, DiagnosticCode::ScriptParseError);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.location.unwrap().file, "bad.sql");
    }

    #[test]
    fn comments_are_ignored() {
        let parser = ScriptParser::new();
        let parsed = parser
            .parse("-- AUTONOMOUS_TRANSACTION helper\n/* header */ SELECT 1;", None)
            .unwrap();

        assert_eq!(parsed.statement_count(), 1);
        assert_eq!(parsed.routines().count(), 0);
    }
}
