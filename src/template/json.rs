//! JSON templates.
//!
//! String leaves and object keys are rendered as text templates. A string
//! leaf that consists of exactly one placeholder is replaced by the typed
//! scope value, so `"{{letters}}"` becomes a real array. `$each` directive
//! objects fan a sub-template out over a scope list.

use serde_json::{Map, Value};

use crate::error::{PackError, Result};
use crate::resolve::merge_json;

use super::text::{has_directive, render_once, sole_placeholder};
use super::{RenderOptions, Scope, ScopeMap, MAX_TEMPLATE_DEPTH};

const EACH_KEY: &str = "$each";
const DIRECTIVE_KEYS: &[&str] = &[EACH_KEY, "as", "do", "into", "index"];

/// Render a JSON template against a scope.
pub fn render_json(value: &Value, scope: &Scope, options: RenderOptions) -> Result<Value> {
    let mut out = render_value(value, scope)?;

    if options.subfunctions {
        let mut passes = 1;
        while json_has_directive(&out) {
            if passes >= MAX_TEMPLATE_DEPTH {
                return Err(PackError::Template {
                    message: format!("directives still present after {} passes", MAX_TEMPLATE_DEPTH),
                });
            }
            out = render_value(&out, scope)?;
            passes += 1;
        }
    }

    Ok(out)
}

fn render_value(value: &Value, scope: &Scope) -> Result<Value> {
    match value {
        Value::String(s) => render_leaf(s, scope),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match EachDirective::parse(item)? {
                    Some(each) if each.into == Collect::Array => out.extend(each.expand(scope)?),
                    Some(each) => out.push(each.render(scope)?),
                    None => out.push(render_value(item, scope)?),
                }
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            if let Some(each) = EachDirective::parse(value)? {
                return each.render(scope);
            }
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                let rendered = render_once(key, scope)?;
                if out.contains_key(&rendered) {
                    return Err(PackError::Template {
                        message: format!("key '{}' renders to '{}', which is already present", key, rendered),
                    });
                }
                out.insert(rendered, render_value(item, scope)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn render_leaf(s: &str, scope: &Scope) -> Result<Value> {
    if let Some(path) = sole_placeholder(s) {
        return scope.lookup(&path).cloned();
    }
    render_once(s, scope).map(Value::String)
}

fn json_has_directive(value: &Value) -> bool {
    match value {
        Value::String(s) => has_directive(s),
        Value::Array(items) => items.iter().any(json_has_directive),
        Value::Object(map) => {
            map.contains_key(EACH_KEY)
                || map
                    .iter()
                    .any(|(key, item)| has_directive(key) || json_has_directive(item))
        }
        _ => false,
    }
}

/// How `$each` results are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collect {
    Array,
    Object,
}

/// `{"$each": "letters", "as": "letter", "do": <template>, "into": "array", "index": "i"}`
#[derive(Debug)]
struct EachDirective<'v> {
    list: &'v str,
    binding: &'v str,
    index: Option<&'v str>,
    body: &'v Value,
    into: Collect,
}

impl<'v> EachDirective<'v> {
    /// Recognise a directive object; `None` for ordinary values.
    fn parse(value: &'v Value) -> Result<Option<Self>> {
        let Some(map) = value.as_object().filter(|m| m.contains_key(EACH_KEY)) else {
            return Ok(None);
        };

        if let Some(unknown) = map.keys().find(|k| !DIRECTIVE_KEYS.contains(&k.as_str())) {
            return Err(invalid(format!("unknown key '{}' in $each directive", unknown)));
        }

        let string_field = move |key: &str| -> Result<Option<&'v str>> {
            match map.get(key) {
                None => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.as_str())),
                Some(other) => Err(invalid(format!("'{}' must be a string, found {}", key, other))),
            }
        };

        let list = string_field(EACH_KEY)?.unwrap_or_default();
        let binding = string_field("as")?.unwrap_or("item");
        let index = string_field("index")?;
        let into = match string_field("into")? {
            None | Some("array") => Collect::Array,
            Some("object") => Collect::Object,
            Some(other) => return Err(invalid(format!("'into' must be array or object, found '{}'", other))),
        };
        let body = map
            .get("do")
            .ok_or_else(|| invalid(format!("$each over '{}' has no 'do' template", list)))?;

        Ok(Some(Self {
            list,
            binding,
            index,
            body,
            into,
        }))
    }

    /// Render the body once per list element.
    fn expand(&self, scope: &Scope) -> Result<Vec<Value>> {
        let items = match scope.lookup(self.list)? {
            Value::Array(items) => items,
            other => return Err(invalid(format!("'{}' is not a list (found {})", self.list, other))),
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let mut layer = ScopeMap::new();
            layer.insert(self.binding.to_string(), item.clone());
            if let Some(index) = self.index {
                layer.insert(index.to_string(), Value::from(i));
            }
            out.push(render_value(self.body, &scope.child(&layer))?);
        }
        Ok(out)
    }

    /// Render into a single value according to `into`.
    fn render(&self, scope: &Scope) -> Result<Value> {
        let rendered = self.expand(scope)?;
        match self.into {
            Collect::Array => Ok(Value::Array(rendered)),
            Collect::Object => {
                let mut merged = Value::Object(Map::new());
                for part in rendered {
                    if !part.is_object() {
                        return Err(invalid(format!(
                            "$each over '{}' with into=object must yield objects, found {}",
                            self.list, part
                        )));
                    }
                    merge_json(&mut merged, part);
                }
                Ok(merged)
            }
        }
    }
}

fn invalid(message: String) -> PackError {
    PackError::Template { message }
}
