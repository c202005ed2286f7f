//! Assembling the output document

/// Between the caller and the renamed routine (two blank lines)
pub const CALLER_SEPARATOR: &str = "\n\n\n";

/// Before the passthrough statements (one blank line)
pub const PASSTHROUGH_SEPARATOR: &str = "\n\n";

/// Caller, renamed routine and, for multi-statement scripts, the passthrough block
pub fn assemble(caller: &str, renamed: &str, passthrough: Option<&str>) -> String {
    let mut document = String::with_capacity(
        caller.len() + renamed.len() + passthrough.map_or(0, str::len) + 8,
    );

    document.push_str(caller);
    document.push_str(CALLER_SEPARATOR);
    document.push_str(renamed);

    if let Some(passthrough) = passthrough {
        document.push_str(PASSTHROUGH_SEPARATOR);
        document.push_str(passthrough);
    }

    document
}
