//! Declarative grouping schema
//!
//! A [`Schema`] is plain configuration (deserializable from TOML or JSON).
//! [`Schema::compile`] validates it and resolves every formatter name
//! against a [`FormatterRegistry`] once, producing a [`CompiledSchema`] the
//! engine walks on every refresh.

use crate::error::SchemaError;
use crate::path::{self, ArrayStep, PropertyPath};
use crate::template::Template;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Ordered list of grouping levels; level 0 holds the roots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub levels: Vec<LevelSpec>,
}

/// One level of the tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Property of the previous level that children attach under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Field descriptors producing nodes at this level
    pub children: Vec<FieldEntry>,
}

/// A field descriptor, or a bare property path as shorthand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    Property(String),
    Spec(FieldSpec),
}

impl FieldEntry {
    fn into_spec(self) -> FieldSpec {
        match self {
            Self::Property(property) => FieldSpec {
                property,
                ..FieldSpec::default()
            },
            Self::Spec(spec) => spec,
        }
    }
}

/// Field descriptor: how one property becomes nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    pub property: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(alias = "hasContextMenu")]
    pub has_context_menu: bool,
    #[serde(alias = "tracksChanges")]
    pub tracks_changes: bool,
}

/// Icon selection for a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IconSpec {
    /// Fixed icon name, or a `${path}` template
    Name(String),
    /// Icon chosen by the value of another property
    Map {
        property: String,
        cases: BTreeMap<String, String>,
        #[serde(default)]
        default: Option<String>,
    },
}

/// Formatter: `(record, resolved value) -> label`
pub type Formatter = Arc<dyn Fn(&Value, &Value) -> String + Send + Sync>;

/// Named formatters available to schemas
#[derive(Clone)]
pub struct FormatterRegistry {
    formatters: AHashMap<String, Formatter>,
}

impl FormatterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            formatters: AHashMap::new(),
        }
    }

    /// Registry preloaded with `identity`, `upper`, `lower`, `short-hash`,
    /// `date` and `score`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("identity", |_, value| path::value_key(value));
        registry.register("upper", |_, value| path::value_key(value).to_uppercase());
        registry.register("lower", |_, value| path::value_key(value).to_lowercase());
        registry.register("short-hash", |_, value| {
            path::value_key(value).chars().take(7).collect()
        });
        registry.register("date", |_, value| format_date(value));
        registry.register("score", |_, value| format_score(value));
        registry
    }

    /// Register (or replace) a formatter
    pub fn register<F>(&mut self, name: &str, formatter: F)
    where
        F: Fn(&Value, &Value) -> String + Send + Sync + 'static,
    {
        self.formatters.insert(name.to_string(), Arc::new(formatter));
    }

    /// Look up a formatter by name
    pub fn get(&self, name: &str) -> Option<Formatter> {
        self.formatters.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formatters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("formatters", &self.names())
            .finish()
    }
}

fn format_date(value: &Value) -> String {
    let secs = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    };
    secs.and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| path::value_key(value))
}

fn format_score(value: &Value) -> String {
    let score = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match score {
        Some(s) if s > 0 => format!("+{s}"),
        Some(s) => s.to_string(),
        None => path::value_key(value),
    }
}

/// Display attributes computed for a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayAttributes {
    pub label: String,
    pub icon: Option<String>,
    pub tooltip: Option<String>,
}

enum LabelSource {
    Formatter(Formatter),
    Template(Template),
    Raw,
}

enum IconSelector {
    Fixed(String),
    Template(Template),
    Map {
        property: PropertyPath,
        cases: BTreeMap<String, String>,
        default: Option<String>,
    },
}

/// A validated field descriptor
pub struct CompiledField {
    pub property: PropertyPath,
    pub has_context_menu: bool,
    pub tracks_changes: bool,
    label: LabelSource,
    icon: Option<IconSelector>,
    tooltip: Option<Template>,
}

impl CompiledField {
    fn compile(spec: FieldSpec, registry: &FormatterRegistry) -> Result<Self, SchemaError> {
        let property = PropertyPath::parse(&spec.property)?;

        let label = match (&spec.formatter, &spec.format) {
            (Some(name), _) => LabelSource::Formatter(registry.get(name).ok_or_else(|| {
                SchemaError::UnknownFormatter {
                    name: name.clone(),
                    property: spec.property.clone(),
                }
            })?),
            (None, Some(format)) => LabelSource::Template(Template::parse(format)?),
            (None, None) => LabelSource::Raw,
        };

        let icon = match spec.icon {
            None => None,
            Some(IconSpec::Name(name)) => {
                let template = Template::parse(&name)?;
                Some(if template.has_fields() {
                    IconSelector::Template(template)
                } else {
                    IconSelector::Fixed(name)
                })
            }
            Some(IconSpec::Map {
                property,
                cases,
                default,
            }) => Some(IconSelector::Map {
                property: PropertyPath::parse(&property)?,
                cases,
                default,
            }),
        };

        let tooltip = spec.tooltip.as_deref().map(Template::parse).transpose()?;

        Ok(Self {
            property,
            has_context_menu: spec.has_context_menu,
            tracks_changes: spec.tracks_changes,
            label,
            icon,
            tooltip,
        })
    }

    /// Compute label, icon and tooltip for one resolved value
    pub fn display(&self, record: &Value, value: &Value, context: &[ArrayStep]) -> DisplayAttributes {
        let label = match &self.label {
            LabelSource::Formatter(formatter) => formatter(record, value),
            LabelSource::Template(template) => template.render(record, context),
            LabelSource::Raw => path::value_key(value),
        };

        let icon = self.icon.as_ref().and_then(|selector| match selector {
            IconSelector::Fixed(name) => Some(name.clone()),
            IconSelector::Template(template) => {
                Some(template.render(record, context)).filter(|s| !s.is_empty())
            }
            IconSelector::Map {
                property,
                cases,
                default,
            } => path::resolve_within(record, property, context)
                .first()
                .and_then(|r| cases.get(&path::value_key(r.value)))
                .or(default.as_ref())
                .cloned(),
        });

        let tooltip = self.tooltip.as_ref().map(|t| t.render(record, context));

        DisplayAttributes {
            label,
            icon,
            tooltip,
        }
    }
}

impl fmt::Debug for CompiledField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledField")
            .field("property", &self.property.as_str())
            .field("has_context_menu", &self.has_context_menu)
            .field("tracks_changes", &self.tracks_changes)
            .finish_non_exhaustive()
    }
}

/// A validated level
#[derive(Debug)]
pub struct CompiledLevel {
    pub parent: Option<PropertyPath>,
    pub fields: Vec<CompiledField>,
}

/// Schema ready for the engine
#[derive(Debug)]
pub struct CompiledSchema {
    levels: Vec<CompiledLevel>,
}

impl CompiledSchema {
    pub fn levels(&self) -> &[CompiledLevel] {
        &self.levels
    }
}

impl Schema {
    /// Validate the schema and bind formatters
    pub fn compile(&self, registry: &FormatterRegistry) -> Result<CompiledSchema, SchemaError> {
        if self.levels.is_empty() {
            return Err(SchemaError::NoLevels);
        }

        let mut levels: Vec<CompiledLevel> = Vec::with_capacity(self.levels.len());
        for (index, spec) in self.levels.iter().enumerate() {
            if spec.children.is_empty() {
                return Err(SchemaError::EmptyLevel { level: index });
            }

            let parent = match (index, &spec.parent) {
                (0, Some(parent)) => {
                    return Err(SchemaError::RootWithParent {
                        parent: parent.clone(),
                    })
                }
                (0, None) => None,
                (_, None) => return Err(SchemaError::MissingParent { level: index }),
                (_, Some(parent)) => {
                    let parent = PropertyPath::parse(parent)?;
                    let previous = &levels[index - 1];
                    if !previous.fields.iter().any(|f| f.property == parent) {
                        return Err(SchemaError::UnknownParent {
                            level: index,
                            parent: parent.as_str().to_string(),
                        });
                    }
                    Some(parent)
                }
            };

            let mut seen = HashSet::new();
            let mut fields = Vec::with_capacity(spec.children.len());
            for entry in &spec.children {
                let field = CompiledField::compile(entry.clone().into_spec(), registry)?;
                if !seen.insert(field.property.as_str().to_string()) {
                    return Err(SchemaError::DuplicateField {
                        level: index,
                        property: field.property.as_str().to_string(),
                    });
                }
                fields.push(field);
            }

            levels.push(CompiledLevel { parent, fields });
        }

        Ok(CompiledSchema { levels })
    }
}
