//! Per-script conversion pipeline
//!
//! parse → locate → synthesize caller → rename → passthrough → assemble

use autotran_sql::{ParsedScript, ResultShape, RoutineDefinition, ScriptParser};

use crate::assembler::assemble;
use crate::caller::CallerSynthesizer;
use crate::error::{ConvertError, ScriptFailure};
use crate::locator::{locate_routine, LocateError};
use crate::passthrough::reemit_passthrough;
use crate::renamer::render_renamed;
use crate::template::TemplateSet;

/// Result of converting one script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Qualified name of the converted routine
    pub routine: String,

    /// Number of statements re-emitted after the routine
    pub passthrough_statements: usize,

    /// Output document
    pub output: String,

    /// Things worth a look that did not stop the conversion
    pub warnings: Vec<String>,
}

/// Converts single scripts with a shared template set
pub struct ScriptConverter<'a> {
    parser: ScriptParser,
    templates: &'a TemplateSet,
}

impl<'a> ScriptConverter<'a> {
    pub fn new(templates: &'a TemplateSet) -> Self {
        Self {
            parser: ScriptParser::new(),
            templates,
        }
    }

    /// Convert the text of one script
    pub fn convert(&self, sql: &str, script: &str) -> Result<Conversion, ScriptFailure> {
        let parsed = self
            .parser
            .parse(sql, Some(script))
            .map_err(|e| ScriptFailure::new(script, e))?;

        self.convert_parsed(&parsed)
            .map_err(|e| ScriptFailure::new(script, e))
    }

    fn convert_parsed(&self, parsed: &ParsedScript) -> Result<Conversion, ConvertError> {
        let index = locate_routine(parsed)?;
        let routine = parsed.statements[index]
            .as_routine()
            .ok_or(LocateError::NotFound)?;

        let caller = CallerSynthesizer::new(self.templates).synthesize(routine)?;
        let renamed = render_renamed(routine)?;

        let passthrough = if parsed.is_multi_statement() {
            Some(reemit_passthrough(parsed, index)?)
        } else {
            None
        };

        Ok(Conversion {
            routine: routine.qualified_name().to_string(),
            passthrough_statements: parsed.statement_count() - 1,
            output: assemble(&caller, &renamed, passthrough.as_deref()),
            warnings: result_shape_warning(routine).into_iter().collect(),
        })
    }
}

/// The shipped function template returns exactly one value
fn result_shape_warning(routine: &RoutineDefinition) -> Option<String> {
    match routine.result_shape()? {
        ResultShape::Value => None,
        shape => Some(format!(
            "function {} returns {}; the function template must handle more than a single value",
            routine.qualified_name(),
            shape
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Template;
    use pretty_assertions::assert_eq;

    fn templates() -> TemplateSet {
        TemplateSet {
            procedure: Template::new(
                "procedure",
                "{obj_action} PROCEDURE {obj_schema_prefix}{obj_name}({obj_parameters}) \
                 LANGUAGE sql AS $c$ CALL {obj_schema_prefix}{obj_renamed_name}() $c$",
            ),
            function: Template::new(
                "function",
                "{obj_action} FUNCTION {obj_schema_prefix}{obj_name}({obj_parameters}) \
                 RETURNS {obj_return_type} LANGUAGE sql AS $c$ SELECT NULL $c$",
            ),
        }
    }

    #[test]
    fn converts_single_routine_into_two_sections() {
        let set = templates();
        let conversion = ScriptConverter::new(&set)
            .convert("CREATE PROCEDURE app.p() LANGUAGE sql AS $$ SELECT 1 $$;", "p.sql")
            .unwrap();

        assert_eq!(conversion.routine, "app.p");
        assert_eq!(conversion.passthrough_statements, 0);
        assert!(conversion.warnings.is_empty());
        assert_eq!(
            conversion.output,
            "CREATE PROCEDURE app.p()\nLANGUAGE sql\nAS $c$ CALL app.xx_p() $c$;\n\n\n\
             CREATE PROCEDURE app.xx_p()\nLANGUAGE sql\nAS $$ SELECT 1 $$;"
        );
    }

    #[test]
    fn converts_function_with_passthrough() {
        let set = templates();
        let conversion = ScriptConverter::new(&set)
            .convert(
                "CREATE FUNCTION app.f() RETURNS int LANGUAGE sql AS $$ SELECT 1 $$;\n\
                 GRANT EXECUTE ON FUNCTION app.f() TO app_role;",
                "f.sql",
            )
            .unwrap();

        let sections: Vec<&str> = conversion.output.split("\n\n").collect();
        assert_eq!(conversion.passthrough_statements, 1);
        assert!(sections[0].starts_with("CREATE FUNCTION app.f()\nRETURNS int\n"));
        assert!(conversion.output.contains("\n\n\nCREATE FUNCTION app.xx_f()\n"));
        assert!(conversion.output.ends_with("\n\nGRANT EXECUTE ON FUNCTION app.f() TO app_role;"));
    }

    #[test]
    fn warns_when_the_function_result_is_not_a_single_value() {
        let set = templates();
        let converter = ScriptConverter::new(&set);

        let scalar = converter
            .convert("CREATE FUNCTION app.f() RETURNS int LANGUAGE sql AS $$ SELECT 1 $$;", "f.sql")
            .unwrap();
        assert!(scalar.warnings.is_empty());

        let void = converter
            .convert("CREATE FUNCTION app.touch() RETURNS void LANGUAGE sql AS $$ SELECT $$;", "touch.sql")
            .unwrap();
        assert_eq!(
            void.warnings,
            vec!["function app.touch returns void; the function template must handle more than a single value"]
        );

        let rows = converter
            .convert(
                "CREATE FUNCTION app.names() RETURNS SETOF text LANGUAGE sql AS $$ SELECT 'a' $$;",
                "names.sql",
            )
            .unwrap();
        assert_eq!(rows.warnings.len(), 1);
        assert!(rows.warnings[0].contains("returns a set of rows"));
    }

    #[test]
    fn failures_name_the_script() {
        let set = templates();
        let converter = ScriptConverter::new(&set);

        let missing = converter.convert("SELECT 1;", "none.sql").unwrap_err();
        assert_eq!(missing.script, "none.sql");
        assert!(matches!(missing.error, ConvertError::Locate(LocateError::NotFound)));

        let broken = converter.convert("CREATE PROCEDURE p( LANGUAGE", "broken.sql").unwrap_err();
        assert!(matches!(broken.error, ConvertError::Parse(_)));
    }
}
