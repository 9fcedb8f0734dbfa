//! Core domain types for packmap.
//!
//! - `MappingEntry` / `ConcreteEntry` - declared and expanded units of work
//! - `TargetSpec`, `ConflictPolicy` - closed sets validated at load time
//! - `Content` - materialized file content (JSON, text or binary)
//! - `Colour` - RGBA colour values for glyph rendering

mod colour;
mod content;
mod entry;

pub use colour::Colour;
pub use content::{Content, ContentKind};
pub use entry::{
    ConcreteEntry, ConflictPolicy, ForEach, MappingEntry, ModuleContext, PathPart, Provenance,
    TargetSpec,
};
