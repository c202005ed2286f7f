//! SQL pretty printing
//!
//! Works on the token stream produced by the sqlparser tokenizer: comments and
//! original whitespace are dropped, tokens are re-joined with canonical
//! spacing, and routine definitions get one clause per line. Dollar-quoted
//! bodies are reproduced verbatim.

use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use crate::parser::{split_statements, tokenize, ParseError};
use crate::routine::{is_clause_keyword, is_routine_header, is_word};

/// Keywords that keep a space before a following `(`
const SPACED_BEFORE_PAREN: &[&str] = &[
    "AS", "IN", "AND", "OR", "NOT", "VALUES", "EXISTS", "ON", "USING", "WHERE", "SELECT",
    "THEN", "ELSE", "WHEN", "RETURN", "FROM", "JOIN", "ATOMIC",
];

/// Statement terminator
pub const TERMINATOR: char = ';';

/// Re-join significant tokens with canonical spacing
pub fn join_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();

    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && needs_space(tokens, i) {
            out.push(' ');
        }
        match token {
            Token::EscapedStringLiteral(value) => push_escaped_literal(&mut out, value),
            other => out.push_str(&other.to_string()),
        }
    }

    out
}

/// `E'...'` literal; the tokenizer always unescapes these, so escape again
fn push_escaped_literal(out: &mut String, value: &str) {
    out.push_str("E'");
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if c.is_ascii_control() => out.push_str(&format!("\\x{:02X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
}

fn needs_space(tokens: &[Token], i: usize) -> bool {
    let prev = &tokens[i - 1];
    let next = &tokens[i];

    if matches!(
        next,
        Token::Comma | Token::RParen | Token::RBracket | Token::SemiColon | Token::Period | Token::DoubleColon
    ) {
        return false;
    }

    if matches!(prev, Token::LParen | Token::LBracket | Token::Period | Token::DoubleColon) {
        return false;
    }

    match next {
        Token::LParen => {
            if let Token::Word(w) = prev {
                return w.quote_style.is_none()
                    && SPACED_BEFORE_PAREN.iter().any(|kw| w.value.eq_ignore_ascii_case(kw));
            }
            !matches!(prev, Token::RBracket)
        }
        Token::LBracket => !matches!(prev, Token::Word(_) | Token::RBracket | Token::RParen),
        // tbl.col%TYPE
        Token::Mod => !is_type_reference_suffix(tokens.get(i + 1)),
        _ => {
            if matches!(prev, Token::Mod) && is_type_reference_suffix(Some(next)) {
                return false;
            }
            if matches!(prev, Token::Minus) && is_unary_minus(tokens, i - 1) {
                return matches!(next, Token::Minus);
            }
            true
        }
    }
}

fn is_type_reference_suffix(token: Option<&Token>) -> bool {
    is_word(token, "TYPE") || is_word(token, "ROWTYPE")
}

fn is_unary_minus(tokens: &[Token], minus: usize) -> bool {
    if minus == 0 {
        return true;
    }

    !matches!(
        &tokens[minus - 1],
        Token::Number(_, _)
            | Token::SingleQuotedString(_)
            | Token::RParen
            | Token::RBracket
            | Token::Placeholder(_)
    ) && !matches!(&tokens[minus - 1], Token::Word(w) if w.keyword == Keyword::NoKeyword || w.quote_style.is_some())
}

/// Pretty-print one or more SQL statements
///
/// Statements terminated in the input stay terminated; statements are
/// separated by a newline.
pub fn prettify(sql: &str) -> Result<String, ParseError> {
    let statements = split_statements(tokenize(sql)?);

    let rendered: Vec<String> = statements
        .iter()
        .map(|stmt| {
            let mut text = if is_routine_header(&stmt.tokens) {
                layout_routine(&stmt.tokens)
            } else {
                join_tokens(&stmt.tokens)
            };
            if stmt.terminated {
                text.push(TERMINATOR);
            }
            text
        })
        .collect();

    Ok(rendered.join("\n"))
}

/// Append the statement terminator unless the text already ends with one
pub fn ensure_terminated(mut text: String) -> String {
    if !text.ends_with(TERMINATOR) {
        text.push(TERMINATOR);
    }
    text
}

/// Lay out a routine definition: signature on the first line, then one
/// clause per line. Nothing after `BEGIN ATOMIC` is broken up.
fn layout_routine(tokens: &[Token]) -> String {
    let signature_end = signature_end(tokens);
    let mut lines: Vec<&[Token]> = Vec::new();
    let mut line_start = 0;
    let mut depth = 0usize;
    let mut in_atomic = false;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ => {}
        }

        if i <= signature_end || depth > 0 || in_atomic {
            continue;
        }

        let after_modifier = is_word(tokens.get(i - 1), "EXTERNAL") || is_word(tokens.get(i - 1), "NOT");
        if is_clause_keyword(token) && !after_modifier {
            lines.push(&tokens[line_start..i]);
            line_start = i;
        }

        if is_word(Some(token), "BEGIN") && is_word(tokens.get(i + 1), "ATOMIC") {
            in_atomic = true;
        }
    }
    lines.push(&tokens[line_start..]);

    lines
        .into_iter()
        .filter(|line| !line.is_empty())
        .map(join_tokens)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Index of the `)` closing the parameter list, or the last index when absent
fn signature_end(tokens: &[Token]) -> usize {
    let mut depth = 0usize;
    let mut opened = false;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => {
                depth += 1;
                opened = true;
            }
            Token::RParen => {
                depth = depth.saturating_sub(1);
                if opened && depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }

    tokens.len().saturating_sub(1)
}
