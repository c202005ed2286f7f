//! Renaming the original routine

use autotran_sql::{Deparse, Ident, RoutineDefinition};

use crate::error::ConvertError;

/// Prefix given to the original routine
pub const RENAMED_PREFIX: &str = "xx_";

/// `xx_<name>`, keeping the identifier's quoting
pub fn renamed_identifier(name: &Ident) -> Ident {
    let value = format!("{}{}", RENAMED_PREFIX, name.value);
    match name.quote_style {
        Some(quote) => Ident::with_quote(quote, value),
        None => Ident::new(value),
    }
}

/// The routine under its new name; schema, parameters and body are untouched
pub fn rename_routine(routine: &RoutineDefinition) -> RoutineDefinition {
    routine.with_name(renamed_identifier(&routine.name))
}

/// Formatted, terminated text of the renamed routine
pub fn render_renamed(routine: &RoutineDefinition) -> Result<String, ConvertError> {
    rename_routine(routine)
        .deparse_statement()
        .map_err(ConvertError::render("renamed routine"))
}
