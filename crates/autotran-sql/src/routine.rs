//! Routine-creation statements
//!
//! `CREATE [OR REPLACE] FUNCTION | PROCEDURE` headers are read at the token
//! level: the qualified name, the parameter list and the return clause are
//! modelled, everything after them (language, body, volatility, `SET`, ...)
//! is carried as an opaque token sequence.

use sqlparser::ast::{Ident, ObjectName};
use sqlparser::tokenizer::{Token, Word};
use std::fmt;

use crate::parser::ParseError;
use crate::pretty::join_tokens;

/// Words that start a routine clause after the signature
const CLAUSE_KEYWORDS: &[&str] = &[
    "RETURNS", "LANGUAGE", "AS", "IMMUTABLE", "STABLE", "VOLATILE", "STRICT", "CALLED",
    "SECURITY", "EXTERNAL", "LEAKPROOF", "NOT", "PARALLEL", "COST", "ROWS", "SUPPORT", "SET",
    "WINDOW", "TRANSFORM", "RETURN", "BEGIN",
];

/// First words of multi-word type names (`double precision`, `character varying`, ...)
const MULTIWORD_TYPE_HEADS: &[&str] = &[
    "DOUBLE", "CHARACTER", "CHAR", "NATIONAL", "BIT", "TIME", "TIMESTAMP", "INTERVAL",
];

const MULTIWORD_TYPE_TAILS: &[&str] = &[
    "PRECISION", "VARYING", "WITH", "WITHOUT", "CHARACTER", "CHAR", "YEAR", "MONTH", "DAY",
    "HOUR", "MINUTE", "SECOND",
];

/// Check whether a token is the given unquoted keyword
pub(crate) fn is_word(token: Option<&Token>, keyword: &str) -> bool {
    matches!(token, Some(Token::Word(w)) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(keyword))
}

fn is_any_word(token: Option<&Token>, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| is_word(token, kw))
}

pub(crate) fn is_clause_keyword(token: &Token) -> bool {
    is_any_word(Some(token), CLAUSE_KEYWORDS)
}

/// Check whether significant tokens start a `CREATE [OR REPLACE] FUNCTION | PROCEDURE` statement
pub fn is_routine_header(tokens: &[Token]) -> bool {
    if !is_word(tokens.first(), "CREATE") {
        return false;
    }

    let mut i = 1;
    if is_word(tokens.get(i), "OR") && is_word(tokens.get(i + 1), "REPLACE") {
        i += 2;
    }

    is_word(tokens.get(i), "FUNCTION") || is_word(tokens.get(i), "PROCEDURE")
}

fn word_to_ident(word: &Word) -> Ident {
    match word.quote_style {
        Some(quote) => Ident::with_quote(quote, word.value.clone()),
        None => Ident::new(word.value.clone()),
    }
}

/// Parameter mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterMode {
    In,
    Out,
    InOut,
    Variadic,
}

impl ParameterMode {
    fn from_token(token: Option<&Token>) -> Option<Self> {
        if is_word(token, "IN") {
            Some(Self::In)
        } else if is_word(token, "OUT") {
            Some(Self::Out)
        } else if is_word(token, "INOUT") {
            Some(Self::InOut)
        } else if is_word(token, "VARIADIC") {
            Some(Self::Variadic)
        } else {
            None
        }
    }
}

impl fmt::Display for ParameterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => write!(f, "IN"),
            Self::Out => write!(f, "OUT"),
            Self::InOut => write!(f, "INOUT"),
            Self::Variadic => write!(f, "VARIADIC"),
        }
    }
}

/// A type reference, kept as the tokens that spell it
#[derive(Debug, Clone, PartialEq)]
pub struct TypeName(Vec<Token>);

impl TypeName {
    /// Wrap the tokens of a type reference
    pub fn new(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }

    /// A single-word type such as `record` or `void`
    pub fn named(name: &str) -> Self {
        Self(vec![Token::make_word(name, None)])
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_tokens(&self.0))
    }
}

/// How a function hands back its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// One value of the return type
    Value,
    /// `RETURNS void`
    Void,
    /// `RETURNS record` without output parameters
    Record,
    /// `RETURNS SETOF ...` or `RETURNS TABLE (...)`
    Set,
    /// Result carried by `OUT`/`INOUT` parameters
    OutParameters,
}

impl fmt::Display for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => write!(f, "a single value"),
            Self::Void => write!(f, "void"),
            Self::Record => write!(f, "record"),
            Self::Set => write!(f, "a set of rows"),
            Self::OutParameters => write!(f, "output parameters"),
        }
    }
}

/// One entry of a routine's parameter list
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub mode: Option<ParameterMode>,
    pub name: Option<Ident>,
    pub data_type: TypeName,
    /// Default expression (`DEFAULT expr` or `= expr`)
    pub default: Option<Vec<Token>>,
}

impl Parameter {
    /// `OUT` or `INOUT`
    pub fn is_output(&self) -> bool {
        matches!(self.mode, Some(ParameterMode::Out) | Some(ParameterMode::InOut))
    }

    /// Parse `[mode] [name] type [{DEFAULT | =} expr]` (also `name mode type`)
    fn parse(tokens: &[Token], kind: &'static str) -> Result<Self, ParseError> {
        let (mut decl, default) = split_default(tokens);

        if let Some(default) = default {
            if default.is_empty() {
                return Err(ParseError::malformed(kind, "parameter default has no expression"));
            }
        }

        let mut mode = None;
        if decl.len() > 1 {
            if let Some(m) = ParameterMode::from_token(decl.first()) {
                mode = Some(m);
                decl = &decl[1..];
            }
        }

        let (name, data_type) = match (mode, ParameterMode::from_token(decl.get(1))) {
            (None, Some(m)) if decl.len() > 2 => {
                mode = Some(m);
                let name = match &decl[0] {
                    Token::Word(w) => Some(word_to_ident(w)),
                    other => {
                        return Err(ParseError::malformed(
                            kind,
                            format!("unexpected parameter name `{}`", other),
                        ))
                    }
                };
                (name, &decl[2..])
            }
            _ => split_name(decl),
        };

        if data_type.is_empty() {
            return Err(ParseError::malformed(
                kind,
                format!("parameter `{}` has no type", join_tokens(tokens)),
            ));
        }

        Ok(Self {
            mode,
            name,
            data_type: TypeName::new(data_type.to_vec()),
            default: default.map(|d| d.to_vec()),
        })
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(mode) = &self.mode {
            write!(f, "{} ", mode)?;
        }
        if let Some(name) = &self.name {
            write!(f, "{} ", name)?;
        }
        write!(f, "{}", self.data_type)?;
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", join_tokens(default))?;
        }
        Ok(())
    }
}

/// Split at the first top-level `DEFAULT` / `=`
fn split_default(tokens: &[Token]) -> (&[Token], Option<&[Token]>) {
    let mut depth = 0usize;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen | Token::LBracket => depth += 1,
            Token::RParen | Token::RBracket => depth = depth.saturating_sub(1),
            Token::Eq if depth == 0 => return (&tokens[..i], Some(&tokens[i + 1..])),
            _ if depth == 0 && is_word(Some(token), "DEFAULT") => {
                return (&tokens[..i], Some(&tokens[i + 1..]))
            }
            _ => {}
        }
    }

    (tokens, None)
}

/// Separate an optional leading parameter name from the type
fn split_name(decl: &[Token]) -> (Option<Ident>, &[Token]) {
    if decl.len() < 2 {
        return (None, decl);
    }

    match (&decl[0], &decl[1]) {
        (Token::Word(first), Token::Word(_)) => {
            let continues_type = first.quote_style.is_none()
                && is_any_word(decl.first(), MULTIWORD_TYPE_HEADS)
                && is_any_word(decl.get(1), MULTIWORD_TYPE_TAILS);

            if continues_type {
                (None, decl)
            } else {
                (Some(word_to_ident(first)), &decl[1..])
            }
        }
        _ => (None, decl),
    }
}

/// A `CREATE [OR REPLACE] FUNCTION | PROCEDURE` statement
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineDefinition {
    pub is_procedure: bool,
    /// `CREATE OR REPLACE`
    pub replace: bool,
    /// Leading name parts; the first one is the schema
    pub qualifier: Vec<Ident>,
    /// Simple name (last name part)
    pub name: Ident,
    pub parameters: Vec<Parameter>,
    /// `RETURNS` clause, functions only
    pub return_type: Option<TypeName>,
    /// Everything after the signature and return clause
    pub attributes: Vec<Token>,
}

impl RoutineDefinition {
    /// `PROCEDURE` or `FUNCTION`
    pub fn kind(&self) -> &'static str {
        if self.is_procedure {
            "PROCEDURE"
        } else {
            "FUNCTION"
        }
    }

    /// Schema segment, present when the name has more than one part
    pub fn schema(&self) -> Option<&Ident> {
        self.qualifier.first()
    }

    /// Full name as a sqlparser object name
    pub fn qualified_name(&self) -> ObjectName {
        let mut parts = self.qualifier.clone();
        parts.push(self.name.clone());
        ObjectName(parts)
    }

    /// Same routine under another simple name
    pub fn with_name(&self, name: Ident) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }

    /// Result type of a function
    ///
    /// Without a `RETURNS` clause PostgreSQL derives it from the output
    /// parameters: one gives its type, several give `record`, none gives `void`.
    /// Procedures have no result type.
    pub fn effective_return_type(&self) -> Option<TypeName> {
        if self.is_procedure {
            return None;
        }
        if let Some(return_type) = &self.return_type {
            return Some(return_type.clone());
        }

        let outputs: Vec<&Parameter> = self.parameters.iter().filter(|p| p.is_output()).collect();
        match outputs.as_slice() {
            [] => Some(TypeName::named("void")),
            [single] => Some(single.data_type.clone()),
            _ => Some(TypeName::named("record")),
        }
    }

    /// Result shape of a function; `None` for procedures
    pub fn result_shape(&self) -> Option<ResultShape> {
        if self.is_procedure {
            return None;
        }
        if self.parameters.iter().any(Parameter::is_output) {
            return Some(ResultShape::OutParameters);
        }

        let shape = match self.return_type.as_ref().map(TypeName::tokens) {
            Some([first, ..]) if is_word(Some(first), "SETOF") || is_word(Some(first), "TABLE") => ResultShape::Set,
            Some([single]) if is_word(Some(single), "void") => ResultShape::Void,
            Some([single]) if is_word(Some(single), "record") => ResultShape::Record,
            Some(_) => ResultShape::Value,
            None => ResultShape::Void,
        };
        Some(shape)
    }

    /// Parse the significant tokens of one statement
    pub(crate) fn parse(tokens: &[Token]) -> Result<Self, ParseError> {
        let mut cursor = Cursor { tokens, pos: 0 };

        cursor.expect_word("CREATE", "routine")?;
        let replace = cursor.consume_words(&["OR", "REPLACE"]);
        let is_procedure = if cursor.consume_word("PROCEDURE") {
            true
        } else {
            cursor.expect_word("FUNCTION", "routine")?;
            false
        };
        let kind = if is_procedure { "procedure" } else { "function" };

        let (qualifier, name) = cursor.parse_qualified_name(kind)?;
        let parameters = cursor.parse_parameter_list(kind)?;

        let return_type = if !is_procedure && cursor.consume_word("RETURNS") {
            Some(cursor.parse_return_type(kind)?)
        } else {
            None
        };

        Ok(Self {
            is_procedure,
            replace,
            qualifier,
            name,
            parameters,
            return_type,
            attributes: cursor.rest().to_vec(),
        })
    }
}

impl fmt::Display for RoutineDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE ")?;
        if self.replace {
            write!(f, "OR REPLACE ")?;
        }
        write!(f, "{} {}(", self.kind(), self.qualified_name())?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")?;
        if let Some(return_type) = &self.return_type {
            write!(f, " RETURNS {}", return_type)?;
        }
        if !self.attributes.is_empty() {
            write!(f, " {}", join_tokens(&self.attributes))?;
        }
        Ok(())
    }
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn rest(&self) -> &'a [Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    fn consume_word(&mut self, keyword: &str) -> bool {
        if is_word(self.peek(), keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn consume_words(&mut self, keywords: &[&str]) -> bool {
        let matched = keywords
            .iter()
            .enumerate()
            .all(|(offset, kw)| is_word(self.tokens.get(self.pos + offset), kw));
        if matched {
            self.pos += keywords.len();
        }
        matched
    }

    fn expect_word(&mut self, keyword: &str, kind: &'static str) -> Result<(), ParseError> {
        if self.consume_word(keyword) {
            Ok(())
        } else {
            Err(ParseError::malformed(kind, format!("expected {}, found {}", keyword, describe(self.peek()))))
        }
    }

    fn parse_qualified_name(&mut self, kind: &'static str) -> Result<(Vec<Ident>, Ident), ParseError> {
        let mut parts = Vec::new();

        loop {
            match self.next() {
                Some(Token::Word(w)) if !w.value.is_empty() => parts.push(word_to_ident(w)),
                _ if parts.is_empty() => return Err(ParseError::UnresolvedName { kind }),
                other => {
                    return Err(ParseError::malformed(
                        kind,
                        format!("expected a name part after `.`, found {}", describe(other)),
                    ))
                }
            }

            if matches!(self.peek(), Some(Token::Period)) {
                self.pos += 1;
            } else {
                break;
            }
        }

        match parts.pop() {
            Some(name) => Ok((parts, name)),
            None => Err(ParseError::UnresolvedName { kind }),
        }
    }

    fn parse_parameter_list(&mut self, kind: &'static str) -> Result<Vec<Parameter>, ParseError> {
        match self.next() {
            Some(Token::LParen) => {}
            other => {
                return Err(ParseError::malformed(
                    kind,
                    format!("expected `(` after the name, found {}", describe(other)),
                ))
            }
        }

        let start = self.pos;
        let mut depth = 0usize;
        let mut groups = Vec::new();
        let mut group_start = start;

        loop {
            let Some(token) = self.next() else {
                return Err(ParseError::malformed(kind, "unterminated parameter list"));
            };

            match token {
                Token::LParen | Token::LBracket => depth += 1,
                Token::RBracket => depth = depth.saturating_sub(1),
                Token::RParen if depth == 0 => {
                    groups.push(&self.tokens[group_start..self.pos - 1]);
                    break;
                }
                Token::RParen => depth -= 1,
                Token::Comma if depth == 0 => {
                    groups.push(&self.tokens[group_start..self.pos - 1]);
                    group_start = self.pos;
                }
                _ => {}
            }
        }

        if groups.len() == 1 && groups[0].is_empty() {
            return Ok(Vec::new());
        }

        groups
            .into_iter()
            .map(|group| {
                if group.is_empty() {
                    Err(ParseError::malformed(kind, "empty parameter declaration"))
                } else {
                    Parameter::parse(group, kind)
                }
            })
            .collect()
    }

    fn parse_return_type(&mut self, kind: &'static str) -> Result<TypeName, ParseError> {
        let start = self.pos;
        let mut depth = 0usize;

        while let Some(token) = self.peek() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                _ if depth == 0 && is_clause_keyword(token) => break,
                _ => {}
            }
            self.pos += 1;
        }

        if self.pos == start {
            return Err(ParseError::malformed(kind, "RETURNS without a type"));
        }

        Ok(TypeName::new(self.tokens[start..self.pos].to_vec()))
    }
}

fn describe(token: Option<&Token>) -> String {
    match token {
        Some(token) => format!("`{}`", token),
        None => "end of statement".to_string(),
    }
}
