//! Caller synthesis
//!
//! The caller keeps the routine's name and signature and hands the call over
//! to the renamed routine through the kind's template.

use autotran_sql::{ensure_terminated, prettify, Parameter, ParameterMode, RoutineDefinition};
use std::collections::BTreeMap;

use crate::error::ConvertError;
use crate::renamer::renamed_identifier;
use crate::template::TemplateSet;

/// Call-argument marker handed to `format()` for each forwarded parameter
const LITERAL_MARKER: &str = "%L";

/// Placeholder values derived from one routine definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerFields {
    pub action: String,
    pub schema: String,
    pub schema_prefix: String,
    pub name: String,
    pub renamed_name: String,
    pub parameters: String,
    pub parameter_names: String,
    pub formatted_parameter_names: String,
    /// Functions only
    pub return_type: Option<String>,
}

impl CallerFields {
    pub fn from_routine(routine: &RoutineDefinition) -> Self {
        let schema = routine.schema().map(ToString::to_string).unwrap_or_default();
        let schema_prefix = if schema.is_empty() {
            String::new()
        } else {
            format!("{}.", schema)
        };

        let forwarded = forwarded_arguments(routine);
        let (parameter_names, formatted_parameter_names) = if forwarded.is_empty() {
            (String::new(), String::new())
        } else {
            let names: Vec<&str> = forwarded.iter().map(|a| a.expression.as_str()).collect();
            let formatted: Vec<&str> = forwarded.iter().map(|a| a.formatted.as_str()).collect();
            (format!(", {}", names.join(", ")), formatted.join(", "))
        };

        Self {
            action: if routine.replace {
                "CREATE OR REPLACE".to_string()
            } else {
                "CREATE".to_string()
            },
            schema,
            schema_prefix,
            name: routine.name.to_string(),
            renamed_name: renamed_identifier(&routine.name).to_string(),
            parameters: routine
                .parameters
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            parameter_names,
            formatted_parameter_names,
            return_type: routine.effective_return_type().map(|t| t.to_string()),
        }
    }

    /// Template values keyed by placeholder name
    pub fn values(&self) -> BTreeMap<&'static str, String> {
        let mut values = BTreeMap::from([
            ("obj_action", self.action.clone()),
            ("obj_schema", self.schema.clone()),
            ("obj_schema_prefix", self.schema_prefix.clone()),
            ("obj_name", self.name.clone()),
            ("obj_renamed_name", self.renamed_name.clone()),
            ("obj_parameters", self.parameters.clone()),
            ("obj_parameters_names", self.parameter_names.clone()),
            ("formatted_obj_parameters_names", self.formatted_parameter_names.clone()),
        ]);

        if let Some(return_type) = &self.return_type {
            values.insert("obj_return_type", return_type.clone());
        }

        values
    }
}

/// One argument the caller passes on
struct ForwardedArgument {
    /// Value handed to `format()` (`p_id`, `$1`)
    expression: String,
    /// Marker inside the formatted call text (`p_id => %L`, `VARIADIC p_ids => %L`, `%L`)
    formatted: String,
}

/// Arguments of the call to the renamed routine
///
/// Function `OUT` parameters are not call arguments. Named notation is used
/// unless a forwarded parameter has no name.
fn forwarded_arguments(routine: &RoutineDefinition) -> Vec<ForwardedArgument> {
    let forwarded: Vec<(usize, &Parameter)> = routine
        .parameters
        .iter()
        .enumerate()
        .filter(|(_, p)| routine.is_procedure || p.mode != Some(ParameterMode::Out))
        .map(|(i, p)| (i + 1, p))
        .collect();

    let positional = forwarded.iter().any(|(_, p)| p.name.is_none());

    forwarded
        .into_iter()
        .map(|(position, param)| {
            let variadic = if param.mode == Some(ParameterMode::Variadic) {
                "VARIADIC "
            } else {
                ""
            };

            match (&param.name, positional) {
                (Some(name), false) => ForwardedArgument {
                    expression: name.to_string(),
                    formatted: format!("{}{} => {}", variadic, name, LITERAL_MARKER),
                },
                _ => ForwardedArgument {
                    expression: format!("${}", position),
                    formatted: format!("{}{}", variadic, LITERAL_MARKER),
                },
            }
        })
        .collect()
}

/// Renders caller statements from the run's templates
pub struct CallerSynthesizer<'a> {
    templates: &'a TemplateSet,
}

impl<'a> CallerSynthesizer<'a> {
    pub fn new(templates: &'a TemplateSet) -> Self {
        Self { templates }
    }

    /// Formatted, terminated caller statement for `routine`
    pub fn synthesize(&self, routine: &RoutineDefinition) -> Result<String, ConvertError> {
        let template = self.templates.for_routine(routine.is_procedure);
        let fields = CallerFields::from_routine(routine);

        tracing::debug!(
            routine = %routine.qualified_name(),
            template = template.name(),
            "synthesizing caller"
        );

        let rendered = template.render(&fields.values())?;
        let pretty = prettify(&rendered).map_err(ConvertError::render("caller"))?;

        Ok(ensure_terminated(pretty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Template, TemplateError};
    use autotran_sql::ScriptParser;
    use pretty_assertions::assert_eq;

    fn routine(sql: &str) -> RoutineDefinition {
        let parsed = ScriptParser::new().parse(sql, None).unwrap();
        parsed.statements[0].as_routine().unwrap().clone()
    }

    fn templates(procedure: &str, function: &str) -> TemplateSet {
        TemplateSet {
            procedure: Template::new("procedure", procedure),
            function: Template::new("function", function),
        }
    }

    #[test]
    fn fields_for_named_parameters() {
        let fields = CallerFields::from_routine(&routine(
            "CREATE OR REPLACE PROCEDURE app.log_event(p_id int, p_msg text DEFAULT 'n/a') \
             LANGUAGE plpgsql AS $$ BEGIN NULL; END $$",
        ));

        assert_eq!(fields.action, "CREATE OR REPLACE");
        assert_eq!(fields.schema, "app");
        assert_eq!(fields.schema_prefix, "app.");
        assert_eq!(fields.name, "log_event");
        assert_eq!(fields.renamed_name, "xx_log_event");
        assert_eq!(fields.parameters, "p_id int, p_msg text DEFAULT 'n/a'");
        assert_eq!(fields.parameter_names, ", p_id, p_msg");
        assert_eq!(fields.formatted_parameter_names, "p_id => %L, p_msg => %L");
        assert_eq!(fields.return_type, None);
        assert!(!fields.values().contains_key("obj_return_type"));
    }

    #[test]
    fn fields_without_parameters_or_schema() {
        let fields = CallerFields::from_routine(&routine(
            "CREATE PROCEDURE flush() LANGUAGE sql AS $$ SELECT 1 $$",
        ));

        assert_eq!(fields.action, "CREATE");
        assert_eq!(fields.schema, "");
        assert_eq!(fields.schema_prefix, "");
        assert_eq!(fields.parameters, "");
        assert_eq!(fields.parameter_names, "");
        assert_eq!(fields.formatted_parameter_names, "");
    }

    #[test]
    fn function_out_parameters_are_not_forwarded() {
        let fields = CallerFields::from_routine(&routine(
            "CREATE FUNCTION app.split(p_in text, OUT p_head text, OUT p_tail text) \
             LANGUAGE sql AS $$ SELECT 'a', 'b' $$",
        ));

        assert_eq!(fields.parameters, "p_in text, OUT p_head text, OUT p_tail text");
        assert_eq!(fields.parameter_names, ", p_in");
        assert_eq!(fields.formatted_parameter_names, "p_in => %L");
        assert_eq!(fields.return_type.as_deref(), Some("record"));
    }

    #[test]
    fn unnamed_parameters_switch_to_positional_forwarding() {
        let fields = CallerFields::from_routine(&routine(
            "CREATE FUNCTION app.add(int, p_b int) RETURNS int LANGUAGE sql AS $$ SELECT $1 + $2 $$",
        ));

        assert_eq!(fields.parameter_names, ", $1, $2");
        assert_eq!(fields.formatted_parameter_names, "%L, %L");
        assert_eq!(fields.return_type.as_deref(), Some("int"));
    }

    #[test]
    fn variadic_keyword_only_in_the_formatted_call() {
        let fields = CallerFields::from_routine(&routine(
            "CREATE PROCEDURE app.tag(p_id int, VARIADIC p_tags text[]) LANGUAGE sql AS $$ SELECT 1 $$",
        ));

        assert_eq!(fields.parameter_names, ", p_id, p_tags");
        assert_eq!(fields.formatted_parameter_names, "p_id => %L, VARIADIC p_tags => %L");

        let positional = CallerFields::from_routine(&routine(
            "CREATE PROCEDURE app.tag(int, VARIADIC text[]) LANGUAGE sql AS $$ SELECT 1 $$",
        ));
        assert_eq!(positional.parameter_names, ", $1, $2");
        assert_eq!(positional.formatted_parameter_names, "%L, VARIADIC %L");
    }

    #[test]
    fn synthesize_procedure_caller() {
        let set = templates(
            "{obj_action} PROCEDURE {obj_schema_prefix}{obj_name}({obj_parameters}) LANGUAGE plpgsql \
             AS $caller$ BEGIN PERFORM dblink_exec(current_database(), \
             format('CALL {obj_schema_prefix}{obj_renamed_name}({formatted_obj_parameters_names})'{obj_parameters_names})); END $caller$",
            "unused",
        );
        let caller = CallerSynthesizer::new(&set)
            .synthesize(&routine(
                "CREATE PROCEDURE app.p(a int) LANGUAGE sql AS $$ SELECT 1 $$",
            ))
            .unwrap();

        assert_eq!(
            caller,
            "CREATE PROCEDURE app.p(a int)\nLANGUAGE plpgsql\nAS $caller$ BEGIN PERFORM dblink_exec(current_database(), \
             format('CALL app.xx_p(a => %L)', a)); END $caller$;"
        );
    }

    #[test]
    fn procedure_template_cannot_use_return_type() {
        let set = templates("CREATE PROCEDURE {obj_name}() RETURNS {obj_return_type}", "unused");
        let error = CallerSynthesizer::new(&set)
            .synthesize(&routine("CREATE PROCEDURE p() LANGUAGE sql AS $$ SELECT 1 $$"))
            .unwrap_err();

        assert!(matches!(
            error,
            ConvertError::Template(TemplateError::UnknownPlaceholder { .. })
        ));
    }

    #[test]
    fn unparsable_render_is_an_error() {
        let set = templates("unused", "SELECT '{obj_name}");
        let error = CallerSynthesizer::new(&set)
            .synthesize(&routine("CREATE FUNCTION f() RETURNS int LANGUAGE sql AS $$ SELECT 1 $$"))
            .unwrap_err();

        assert!(matches!(error, ConvertError::Render { fragment: "caller", .. }));
    }
}
