//! Re-emitting the statements around the routine

use autotran_sql::{Deparse, ParsedScript};

use crate::error::ConvertError;

/// Every statement except the routine at `routine_index`, formatted and
/// terminated, one per line block, in source order
pub fn reemit_passthrough(script: &ParsedScript, routine_index: usize) -> Result<String, ConvertError> {
    let rendered = script
        .statements
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != routine_index)
        .map(|(_, stmt)| stmt.deparse_statement())
        .collect::<Result<Vec<_>, _>>()
        .map_err(ConvertError::render("passthrough statement"))?;

    Ok(rendered.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use autotran_sql::ScriptParser;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_statement_script_has_no_passthrough() {
        let script = ScriptParser::new()
            .parse("CREATE PROCEDURE p() LANGUAGE sql AS $$ SELECT 1 $$;", None)
            .unwrap();
        assert_eq!(reemit_passthrough(&script, 0).unwrap(), "");
    }

    #[test]
    fn keeps_order_and_skips_routine() {
        let script = ScriptParser::new()
            .parse(
                "SET search_path = app; \
                 CREATE PROCEDURE p() LANGUAGE sql AS $$ SELECT 1 $$; \
                 GRANT EXECUTE ON p TO app_role; \
                 COMMENT ON TABLE app.log IS 'audit';",
                None,
            )
            .unwrap();

        let text = reemit_passthrough(&script, 1).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("SET search_path"));
        assert_eq!(lines[1], "GRANT EXECUTE ON p TO app_role;");
        assert!(lines[2].starts_with("COMMENT ON TABLE app.log IS 'audit'"));
        assert!(lines.iter().all(|l| l.ends_with(';')));
        assert!(!text.contains("PROCEDURE"));
    }
}
