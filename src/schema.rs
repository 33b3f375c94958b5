//! Schema ingestion
//!
//! Parses a JSON Schema document into a typed `SchemaNode` tree. All of the
//! ad hoc input conventions are normalized here, once:
//! - `type` as a string or list becomes `TypeSet { primitive, nullable }`
//! - `maxLength` as an integer, numeric string or `"N/A"` becomes `Option<u64>`
//! - every node records its JSON Pointer, used when `$id` is absent
//!
//! Structural problems (objects without `properties`, arrays without `items`,
//! runaway nesting) fail here with the offending path.

use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{Result, ShapeError};
use crate::naming::pointer_token;

/// Sentinel used by enriched schemas for "no length constraint"
pub const NOT_APPLICABLE: &str = "N/A";

/// Primitive JSON Schema type, after precedence resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Object,
    Array,
    Integer,
    Number,
    String,
    Boolean,
    /// Absent or unrecognized `type`
    Unknown,
}

impl Primitive {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "object" => Some(Primitive::Object),
            "array" => Some(Primitive::Array),
            "integer" => Some(Primitive::Integer),
            "number" => Some(Primitive::Number),
            "string" => Some(Primitive::String),
            "boolean" => Some(Primitive::Boolean),
            _ => None,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Primitive::Object => 0,
            Primitive::Array => 1,
            Primitive::Integer => 2,
            Primitive::Number => 3,
            Primitive::String => 4,
            Primitive::Boolean => 5,
            Primitive::Unknown => 6,
        }
    }
}

/// Normalized `type` keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSet {
    pub primitive: Primitive,
    /// The declared type set includes `"null"`
    pub nullable: bool,
}

impl TypeSet {
    pub fn new(primitive: Primitive, nullable: bool) -> Self {
        Self { primitive, nullable }
    }

    /// Normalize a `type` value. A list resolves to its highest-precedence member.
    pub fn from_value(value: Option<&Value>) -> Self {
        let names: Vec<&str> = match value {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };

        let nullable = names.contains(&"null");
        let primitive = names
            .iter()
            .filter_map(|n| Primitive::from_name(n))
            .min_by_key(|p| p.rank())
            .unwrap_or(Primitive::Unknown);

        Self { primitive, nullable }
    }
}

/// `format` values that change the inferred datatype
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Format {
    Number,
    Integer,
    DateTime,
    Other(String),
}

impl Format {
    fn parse(s: &str) -> Self {
        match s {
            "number" => Format::Number,
            "integer" => Format::Integer,
            "date-time" => Format::DateTime,
            other => Format::Other(other.to_string()),
        }
    }
}

/// A named property of an object node, in document order
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub node: SchemaNode,
}

/// A node of the ingested schema tree
#[derive(Debug, Clone)]
pub struct SchemaNode {
    /// Raw `$id`, if declared
    pub id: Option<String>,
    /// JSON Pointer from the document root
    pub pointer: String,
    pub types: TypeSet,
    /// Direct properties, in document order (empty unless object-like)
    pub properties: Vec<Property>,
    pub items: Option<Box<SchemaNode>>,
    pub format: Option<Format>,
    pub max_length: Option<u64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub description: Option<String>,
    /// Added by key injection rather than read from the document
    pub synthetic: bool,
}

impl SchemaNode {
    /// Ingest a schema document, failing beyond `max_depth` levels of nesting
    pub fn from_value(value: &Value, max_depth: usize) -> Result<Self> {
        Self::parse(value, String::new(), 0, max_depth)
    }

    /// A scalar node with no source location beyond its pointer
    pub fn scalar(pointer: impl Into<String>, types: TypeSet) -> Self {
        Self {
            id: None,
            pointer: pointer.into(),
            types,
            properties: Vec::new(),
            items: None,
            format: None,
            max_length: None,
            minimum: None,
            maximum: None,
            description: None,
            synthetic: false,
        }
    }

    fn parse(value: &Value, pointer: String, depth: usize, max_depth: usize) -> Result<Self> {
        if depth > max_depth {
            return Err(ShapeError::DepthExceeded {
                path: display_path(&pointer),
                limit: max_depth,
            });
        }

        let obj = value.as_object().ok_or_else(|| ShapeError::NotAnObject {
            path: display_path(&pointer),
        })?;

        let mut types = TypeSet::from_value(obj.get("type"));
        if types.primitive == Primitive::Unknown {
            if obj.contains_key("properties") {
                types.primitive = Primitive::Object;
            } else if obj.contains_key("items") {
                types.primitive = Primitive::Array;
            }
        }

        let mut node = SchemaNode::scalar(pointer, types);
        node.id = obj.get("$id").and_then(Value::as_str).map(str::to_string);
        node.description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        node.format = obj.get("format").and_then(Value::as_str).map(Format::parse);
        node.max_length = parse_max_length(obj, &node.pointer)?;
        node.minimum = parse_bound(obj, "minimum", &node.pointer)?;
        node.maximum = parse_bound(obj, "maximum", &node.pointer)?;

        match node.types.primitive {
            Primitive::Object => {
                let props = obj
                    .get("properties")
                    .and_then(Value::as_object)
                    .ok_or_else(|| ShapeError::MissingProperties {
                        path: display_path(&node.pointer),
                    })?;
                for (name, child) in props {
                    let child_pointer = format!("{}/properties/{}", node.pointer, pointer_token(name));
                    let child = Self::parse(child, child_pointer, depth + 1, max_depth)?;
                    node.properties.push(Property {
                        name: name.clone(),
                        node: child,
                    });
                }
            }
            Primitive::Array => {
                let items = obj.get("items").ok_or_else(|| ShapeError::MissingItems {
                    path: display_path(&node.pointer),
                })?;
                let items_pointer = format!("{}/items", node.pointer);
                node.items = Some(Box::new(Self::parse(items, items_pointer, depth + 1, max_depth)?));
            }
            _ => {}
        }

        Ok(node)
    }

    /// Path identifier: `$id` when declared, otherwise the computed pointer
    pub fn path_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.pointer)
    }

    pub fn is_object(&self) -> bool {
        self.types.primitive == Primitive::Object
    }

    pub fn is_array(&self) -> bool {
        self.types.primitive == Primitive::Array
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.node)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }
}

/// Read and ingest a schema file
pub fn load_schema(path: &Path, max_depth: usize) -> Result<SchemaNode> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    SchemaNode::from_value(&value, max_depth)
}

/// Pointer as shown in diagnostics; the document root is `#`
pub(crate) fn display_path(pointer: &str) -> String {
    format!("#{}", pointer)
}

fn parse_max_length(obj: &Map<String, Value>, pointer: &str) -> Result<Option<u64>> {
    let invalid = |value: &Value| ShapeError::InvalidConstraint {
        path: display_path(pointer),
        keyword: "maxLength",
        value: value.to_string(),
    };

    match obj.get("maxLength") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) => Ok(Some(v)),
            None => match n.as_f64() {
                Some(f) if f >= 0.0 && f.fract() == 0.0 => Ok(Some(f as u64)),
                _ => Err(invalid(&Value::Number(n.clone()))),
            },
        },
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOT_APPLICABLE) {
                Ok(None)
            } else {
                trimmed
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| invalid(&Value::String(s.clone())))
            }
        }
        Some(other) => Err(invalid(other)),
    }
}

fn parse_bound(obj: &Map<String, Value>, keyword: &'static str, pointer: &str) -> Result<Option<f64>> {
    let invalid = |value: &Value| ShapeError::InvalidConstraint {
        path: display_path(pointer),
        keyword,
        value: value.to_string(),
    };

    match obj.get(keyword) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| invalid(&Value::Number(n.clone()))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(&Value::String(s.clone()))),
        Some(other) => Err(invalid(other)),
    }
}
