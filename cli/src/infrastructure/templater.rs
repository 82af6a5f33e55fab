//! Helm argument templating
//!
//! Arguments may reference configuration values with `{{ .key }}` (or
//! `{{ key }}`, or dotted paths like `{{ .image.tag }}`). A reference to a
//! missing key is an error; it is never replaced with an empty string.

use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::TemplateError;

pub type TemplateValues = serde_json::Map<String, Value>;

const PLACEHOLDER_PATTERN: &str = r"\{\{\s*\.?([A-Za-z_][A-Za-z0-9_\-]*(?:\.[A-Za-z0-9_\-]+)*)\s*\}\}";

/// Renders a text template against a value map
pub trait Templater: Send + Sync {
    fn render(&self, text: &str, name: &str, values: &TemplateValues) -> Result<String, TemplateError>;
}

/// `{{ .key }}` placeholder substitution
pub struct PlaceholderTemplater {
    pattern: Regex,
}

impl PlaceholderTemplater {
    pub fn new() -> Result<Self, TemplateError> {
        let pattern = Regex::new(PLACEHOLDER_PATTERN).map_err(|e| TemplateError::Pattern {
            message: e.to_string(),
        })?;
        Ok(Self { pattern })
    }
}

fn lookup<'a>(values: &'a TemplateValues, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let first = values.get(parts.next()?)?;
    parts.try_fold(first, |value, part| match value {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Templater for PlaceholderTemplater {
    fn render(&self, text: &str, name: &str, values: &TemplateValues) -> Result<String, TemplateError> {
        let mut missing = None;

        let rendered = self.pattern.replace_all(text, |caps: &Captures| {
            let key = &caps[1];
            match lookup(values, key) {
                Some(value) => to_text(value),
                None => {
                    missing.get_or_insert_with(|| key.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(key) => Err(TemplateError::MissingKey {
                template: name.to_string(),
                key,
            }),
            None => Ok(rendered.into_owned()),
        }
    }
}
