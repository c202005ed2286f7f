//! Locating the routine-creation statement of a script

use autotran_sql::ParsedScript;

/// Find the index of the script's only routine definition
///
/// A script with several routine definitions is rejected rather than
/// resolved by position.
pub fn locate_routine(script: &ParsedScript) -> Result<usize, LocateError> {
    let routines: Vec<_> = script.routines().collect();

    match routines.as_slice() {
        [] => Err(LocateError::NotFound),
        [(index, _)] => Ok(*index),
        many => Err(LocateError::Ambiguous {
            names: many
                .iter()
                .map(|(_, routine)| routine.qualified_name().to_string())
                .collect(),
        }),
    }
}

/// Routine location errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    #[error("no CREATE FUNCTION or CREATE PROCEDURE statement found")]
    NotFound,

    #[error("expected one routine definition, found {}: {}", .names.len(), .names.join(", "))]
    Ambiguous { names: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use autotran_sql::ScriptParser;

    fn parse(sql: &str) -> ParsedScript {
        ScriptParser::new().parse(sql, None).unwrap()
    }

    #[test]
    fn finds_single_routine() {
        let script = parse(
            "CREATE TABLE log (msg text); \
             CREATE PROCEDURE app.p() LANGUAGE sql AS $$ INSERT INTO log VALUES ('x') $$;",
        );
        assert_eq!(locate_routine(&script), Ok(1));
    }

    #[test]
    fn missing_routine() {
        let script = parse("CREATE TABLE log (msg text);");
        assert_eq!(locate_routine(&script), Err(LocateError::NotFound));
    }

    #[test]
    fn empty_script() {
        let script = parse("-- PRAGMA AUTONOMOUS_TRANSACTION only in a comment\n");
        assert_eq!(locate_routine(&script), Err(LocateError::NotFound));
    }

    #[test]
    fn several_routines_are_ambiguous() {
        let script = parse(
            "CREATE PROCEDURE app.first() LANGUAGE sql AS $$ SELECT 1 $$; \
             CREATE FUNCTION app.second() RETURNS int LANGUAGE sql AS $$ SELECT 1 $$;",
        );

        let error = locate_routine(&script).unwrap_err();
        assert_eq!(
            error,
            LocateError::Ambiguous {
                names: vec!["app.first".to_string(), "app.second".to_string()]
            }
        );
        assert_eq!(
            error.to_string(),
            "expected one routine definition, found 2: app.first, app.second"
        );
    }
}
