//! Generic render context and strict path resolution

use serde::Serialize;
use serde_json::Value;

use super::errors::TemplateError;

/// Context handed to templates, as a generic tagged tree
///
/// Any `Serialize` value becomes a `RenderContext`. Null values are
/// dropped on the way in so a template can never print a null-like
/// placeholder: referencing one is an undefined reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    root: Value,
}

impl RenderContext {
    /// Build from any serializable value
    pub fn from_serialize<C: Serialize + ?Sized>(ctx: &C) -> Result<Self, TemplateError> {
        let root = serde_json::to_value(ctx)
            .map_err(|e| TemplateError::invalid_context(e.to_string()))?;
        Ok(Self {
            root: prune_nulls(root),
        })
    }

    /// The underlying tree
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Resolve a dotted path (`tasks.draft.output`)
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.root, path)
    }

    /// Every dotted path that resolves, for suggestions
    pub fn known_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_paths(&self.root, "", &mut paths);
        paths
    }

    /// Convert to a minijinja value for rendering
    pub fn to_value(&self) -> minijinja::Value {
        minijinja::Value::from_serialize(&self.root)
    }
}

/// Walk a dotted path through nested mappings
///
/// Numeric segments index into sequences.
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    let next = match root {
        Value::Object(map) => map.get(head)?,
        Value::Array(items) => items.get(head.parse::<usize>().ok()?)?,
        _ => return None,
    };

    if next.is_null() {
        return None;
    }

    match rest {
        Some(rest) => lookup_path(next, rest),
        None => Some(next),
    }
}

fn collect_paths(value: &Value, prefix: &str, out: &mut Vec<String>) {
    if let Value::Object(map) = value {
        for (key, child) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            collect_paths(child, &path, out);
            out.push(path);
        }
    }
}

fn prune_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, prune_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune_nulls).collect()),
        other => other,
    }
}
