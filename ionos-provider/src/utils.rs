//! Utility functions for value conversion and path handling

use std::collections::HashMap;
use std::sync::LazyLock;

use ionos_core::resource::{Attributes, Value};
use regex::Regex;
use serde_json::json;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("valid placeholder pattern"));

/// Convert a JSON value to an attribute Value
pub fn json_to_value(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Int(i))
            } else {
                n.as_f64().map(|f| Value::Int(f as i64))
            }
        }
        serde_json::Value::Array(arr) => {
            let items: Vec<Value> = arr.iter().filter_map(json_to_value).collect();
            Some(Value::List(items))
        }
        serde_json::Value::Object(map) => {
            let entries: HashMap<String, Value> = map
                .iter()
                .filter_map(|(k, v)| json_to_value(v).map(|v| (k.clone(), v)))
                .collect();
            Some(Value::Map(entries))
        }
        serde_json::Value::Null => None,
    }
}

/// Convert an attribute Value to JSON
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => json!(s),
        Value::Bool(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

/// Look up a dotted path (e.g. "metadata.state") in a JSON document
pub fn get_path<'a>(doc: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.').try_fold(doc, |node, key| node.get(key))
}

/// Set a dotted path, creating intermediate objects as needed
pub fn set_path(doc: &mut serde_json::Value, path: &str, value: serde_json::Value) {
    let mut node = doc;
    let mut keys = path.split('.').peekable();
    while let Some(key) = keys.next() {
        if !node.is_object() {
            *node = json!({});
        }
        let Some(map) = node.as_object_mut() else {
            return;
        };
        if keys.peek().is_none() {
            map.insert(key.to_string(), value);
            return;
        }
        node = map.entry(key.to_string()).or_insert_with(|| json!({}));
    }
}

/// Names of the `{placeholder}` segments of a path template, in order
pub fn path_params(template: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Fill `{placeholder}` segments of a path template from attributes
pub fn render_path(template: &str, attributes: &Attributes) -> Result<String, String> {
    let mut missing = Vec::new();
    let rendered = PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
        let name = &caps[1];
        match attributes.get(name).and_then(Value::as_str) {
            Some(v) => v.to_string(),
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });
    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(format!("missing path parameter(s): {}", missing.join(", ")))
    }
}

/// Split an import id ("<parent>/.../<id>") against a path template.
///
/// Returns the parent attributes and the resource id.
pub fn parse_import_id(template: &str, import_id: &str) -> Result<(Attributes, String), String> {
    let params = path_params(template);
    let parts: Vec<&str> = import_id.split('/').collect();
    if parts.len() != params.len() + 1 || parts.iter().any(|p| p.is_empty()) {
        let mut expected: Vec<String> = params.iter().map(|p| format!("{{{}}}", p)).collect();
        expected.push("{id}".to_string());
        return Err(format!(
            "invalid import id '{}', expected {}",
            import_id,
            expected.join("/")
        ));
    }

    let attributes = params
        .iter()
        .zip(&parts)
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect();
    Ok((attributes, parts[parts.len() - 1].to_string()))
}
