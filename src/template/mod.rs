//! Scoped templating for text and JSON sources.
//!
//! Placeholders use `{{ name }}` syntax with dotted paths (`{{ pack.name }}`)
//! and list indices (`{{ letters.0 }}`). Text sources may repeat a block with
//! `{{#each letters as letter}} ... {{/each}}`; JSON sources fan out with
//! `$each` directive objects:
//!
//! ```json
//! {
//!     "textures": { "$each": "letters", "as": "letter", "do": "textures/{{letter}}" }
//! }
//! ```
//!
//! A reference to a variable that no scope layer defines is always an
//! error; nothing is ever substituted with an empty string.

mod json;
mod text;

use serde_json::Value;

use crate::error::{PackError, Result};
use crate::types::Content;

pub use json::render_json;
pub use text::render_text;

/// Variable bindings of one scope layer.
pub type ScopeMap = serde_json::Map<String, Value>;

/// Upper bound on re-rendering passes when subfunctions are enabled.
pub const MAX_TEMPLATE_DEPTH: usize = 8;

/// Options controlling a render.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Render the result again while directives remain.
    pub subfunctions: bool,
}

impl RenderOptions {
    pub fn with_subfunctions() -> Self {
        Self { subfunctions: true }
    }
}

/// A stack of scope layers; inner layers shadow outer ones.
#[derive(Debug, Clone, Default)]
pub struct Scope<'a> {
    layers: Vec<&'a ScopeMap>,
}

impl<'a> Scope<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scope from layers ordered outermost first.
    pub fn from_layers(layers: impl IntoIterator<Item = &'a ScopeMap>) -> Self {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// A scope with one more (innermost) layer.
    pub fn child<'b>(&self, layer: &'b ScopeMap) -> Scope<'b>
    where
        'a: 'b,
    {
        let mut layers: Vec<&'b ScopeMap> = self
            .layers
            .iter()
            .map(|&outer| -> &'b ScopeMap { outer })
            .collect();
        layers.push(layer);
        Scope { layers }
    }

    /// Look up a top-level variable.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.layers.iter().rev().find_map(|layer| layer.get(name))
    }

    /// Resolve a dotted path such as `pack.name` or `letters.0`.
    pub fn lookup(&self, path: &str) -> Result<&'a Value> {
        let undefined = || PackError::UndefinedScopeVariable {
            name: path.to_string(),
        };

        let mut segments = path.split('.');
        let head = segments.next().filter(|s| !s.is_empty()).ok_or_else(undefined)?;
        let mut value = self.get(head).ok_or_else(undefined)?;

        for segment in segments {
            value = match value {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            }
            .ok_or_else(undefined)?;
        }

        Ok(value)
    }
}

/// Render materialized content; binary content passes through untouched.
pub fn render_content(content: Content, scope: &Scope, options: RenderOptions) -> Result<Content> {
    match content {
        Content::Json(value) => render_json(&value, scope, options).map(Content::Json),
        Content::Text(text) => render_text(&text, scope, options).map(Content::Text),
        binary @ Content::Binary(_) => Ok(binary),
    }
}

/// Render a scope value as text: strings verbatim, other values as compact JSON.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
