//! Autotran engine - script conversion
//!
//! This crate turns a script that defines one autonomous routine into:
//! - a caller with the routine's original name and signature
//! - the original routine renamed to `xx_<name>`
//! - the script's other statements, re-emitted in order
//!
//! plus the batch runner that applies this to a directory of scripts.

pub mod assembler;
pub mod batch;
pub mod caller;
pub mod converter;
pub mod error;
pub mod locator;
pub mod passthrough;
pub mod renamer;
pub mod template;

pub use assembler::assemble;
pub use batch::{
    BatchError, BatchRunner, DirectorySink, DirectorySource, Discovery, ScriptSink, ScriptSource, ScriptText,
};
pub use caller::{CallerFields, CallerSynthesizer};
pub use converter::{Conversion, ScriptConverter};
pub use error::{ConvertError, ScriptFailure};
pub use locator::{locate_routine, LocateError};
pub use passthrough::reemit_passthrough;
pub use renamer::{rename_routine, render_renamed, renamed_identifier, RENAMED_PREFIX};
pub use template::{Template, TemplateError, TemplateSet};
