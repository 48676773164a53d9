//! `${path}` label and tooltip templates

use crate::error::SchemaError;
use crate::path::{self, ArrayStep, PropertyPath};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(String),
    Field(PropertyPath),
}

/// A compiled template such as `"${subject} (${owner.name})"`
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    parts: Vec<Part>,
}

impl Template {
    /// Compile a template. An unterminated `${` is kept as literal text.
    pub fn parse(source: &str) -> Result<Self, SchemaError> {
        let mut parts = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("${") {
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                break;
            };
            if start > 0 {
                parts.push(Part::Literal(rest[..start].to_string()));
            }
            parts.push(Part::Field(PropertyPath::parse(&after[..end])?));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self { parts })
    }

    /// Render against a record, resolving placeholders inside `context`
    ///
    /// Placeholders that still fan out are joined with `", "`; missing
    /// values render as the empty string.
    pub fn render(&self, record: &Value, context: &[ArrayStep]) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Field(field) => {
                    let values: Vec<String> = path::resolve_within(record, field, context)
                        .into_iter()
                        .map(|r| path::value_key(r.value))
                        .collect();
                    out.push_str(&values.join(", "));
                }
            }
        }
        out
    }

    /// Whether the template contains any placeholder
    pub fn has_fields(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::Field(_)))
    }
}
