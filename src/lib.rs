//! packmap - add-on pack assembler
//!
//! A library for turning module directories with declarative mapping files
//! into a finished resource/behavior pack tree: target path conventions,
//! conflict policies, scoped templating and glyph texture generation.

pub mod cli;
pub mod discovery;
pub mod error;
pub mod glyph;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod resolve;
pub mod template;
pub mod types;

pub use discovery::{load_project, Manifest, MapFile, Project};
pub use error::{PackError, Result};
pub use glyph::{generate, GlyphOptions, GlyphReport, GlyphSpec};
pub use pipeline::{build, plan, BuildSummary, Plan};
pub use report::{Diagnostic, Report, Severity};
pub use resolve::{merge_json, resolve_path, DestinationRules, MappingResolver, OutputTree};
pub use template::{render_json, render_text, RenderOptions, Scope, ScopeMap};
pub use types::{Colour, ConflictPolicy, Content, MappingEntry, ModuleContext, TargetSpec};
