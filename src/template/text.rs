//! Text templates: `{{ var }}` placeholders and `{{#each}}` blocks.

use serde_json::Value;

use crate::error::{PackError, Result};

use super::{value_to_text, RenderOptions, Scope, ScopeMap, MAX_TEMPLATE_DEPTH};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A parsed template fragment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Var(String),
    Each {
        list: String,
        binding: String,
        body: Vec<Node>,
    },
}

/// Render a text template against a scope.
pub fn render_text(text: &str, scope: &Scope, options: RenderOptions) -> Result<String> {
    let mut out = render_once(text, scope)?;

    if options.subfunctions {
        let mut passes = 1;
        while has_directive(&out) {
            if passes >= MAX_TEMPLATE_DEPTH {
                return Err(PackError::Template {
                    message: format!(
                        "directives still present after {} passes; check for self-referencing variables",
                        MAX_TEMPLATE_DEPTH
                    ),
                });
            }
            out = render_once(&out, scope)?;
            passes += 1;
        }
    }

    Ok(out)
}

/// Single substitution pass; inserted values are not rescanned.
pub(crate) fn render_once(text: &str, scope: &Scope) -> Result<String> {
    if !has_directive(text) {
        return Ok(text.to_string());
    }
    let nodes = parse(text)?;
    let mut out = String::with_capacity(text.len());
    render_nodes(&nodes, scope, &mut out)?;
    Ok(out)
}

pub(crate) fn has_directive(text: &str) -> bool {
    text.contains(OPEN)
}

/// If the whole string is a single placeholder, return its variable path.
pub(crate) fn sole_placeholder(text: &str) -> Option<String> {
    let inner = text.trim().strip_prefix(OPEN)?.strip_suffix(CLOSE)?;
    if inner.contains(OPEN) || inner.contains(CLOSE) {
        return None;
    }
    let name = inner.trim();
    if name.is_empty() || name.starts_with('#') || name.starts_with('/') {
        return None;
    }
    Some(name.to_string())
}

fn render_nodes(nodes: &[Node], scope: &Scope, out: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => out.push_str(&value_to_text(scope.lookup(path)?)),
            Node::Each { list, binding, body } => {
                let items = match scope.lookup(list)? {
                    Value::Array(items) => items,
                    other => {
                        return Err(PackError::Template {
                            message: format!("'{}' is not a list (found {})", list, other),
                        })
                    }
                };
                for item in items {
                    let mut layer = ScopeMap::new();
                    layer.insert(binding.clone(), item.clone());
                    let child = scope.child(&layer);
                    render_nodes(body, &child, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Parse a template into nodes.
pub(crate) fn parse(text: &str) -> Result<Vec<Node>> {
    let mut rest = text;
    let (nodes, closed) = parse_until_close(&mut rest)?;
    if closed {
        return Err(PackError::Template {
            message: "'{{/each}}' without a matching '{{#each}}'".to_string(),
        });
    }
    Ok(nodes)
}

/// Parse nodes until end of input or a `{{/each}}` tag.
/// Returns the nodes and whether a closing tag ended the run.
fn parse_until_close(rest: &mut &str) -> Result<(Vec<Node>, bool)> {
    let mut nodes = Vec::new();

    loop {
        let current: &str = *rest;
        let Some(start) = current.find(OPEN) else {
            if !current.is_empty() {
                nodes.push(Node::Text(current.to_string()));
            }
            *rest = "";
            return Ok((nodes, false));
        };

        if start > 0 {
            nodes.push(Node::Text(current[..start].to_string()));
        }

        let after_open = &current[start + OPEN.len()..];
        let end = after_open.find(CLOSE).ok_or_else(|| PackError::Template {
            message: format!("unclosed '{{{{' near '{}'", excerpt(&current[start..])),
        })?;
        let tag = after_open[..end].trim();
        *rest = &after_open[end + CLOSE.len()..];

        if let Some(block) = tag.strip_prefix('#') {
            let (list, binding) = parse_each_header(block)?;
            let (body, closed) = parse_until_close(rest)?;
            if !closed {
                return Err(PackError::Template {
                    message: format!("'{{{{#{}}}}}' is never closed with '{{{{/each}}}}'", block.trim()),
                });
            }
            nodes.push(Node::Each { list, binding, body });
        } else if let Some(closing) = tag.strip_prefix('/') {
            if closing.trim() != "each" {
                return Err(PackError::Template {
                    message: format!("unknown closing tag '{{{{/{}}}}}'", closing.trim()),
                });
            }
            return Ok((nodes, true));
        } else if tag.is_empty() {
            return Err(PackError::Template {
                message: "empty placeholder '{{}}'".to_string(),
            });
        } else {
            nodes.push(Node::Var(tag.to_string()));
        }
    }
}

/// Parse `each <list> as <name>`.
fn parse_each_header(block: &str) -> Result<(String, String)> {
    let words: Vec<&str> = block.split_whitespace().collect();
    match words.as_slice() {
        ["each", list, "as", binding] => Ok((list.to_string(), binding.to_string())),
        _ => Err(PackError::Template {
            message: format!("invalid block '{{{{#{}}}}}'", block.trim()),
        }),
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(24).collect()
}
