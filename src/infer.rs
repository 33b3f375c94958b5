//! Type inference for scalar schema nodes
//!
//! Maps a node's normalized type, `format` and bounds to a `ValueType` plus
//! cardinality, length and range facts. Every branch has a fallback: unknown
//! types become strings with a warning, missing bounds take the defaults.

use crate::config::{DEFAULT_MAX_EXCLUSIVE, DEFAULT_MIN_INCLUSIVE};
use crate::model::ValueType;
use crate::schema::{display_path, Format, Primitive, SchemaNode};

/// Inferred facts for one scalar property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarFacts {
    pub value_type: ValueType,
    pub min_count: u8,
    pub max_length: Option<u64>,
    pub min_inclusive: Option<i64>,
    pub max_exclusive: Option<i64>,
}

impl ScalarFacts {
    /// Facts for a generated integer key with the default bounds
    pub fn integer_key() -> Self {
        Self {
            value_type: ValueType::Integer,
            min_count: 1,
            max_length: None,
            min_inclusive: Some(DEFAULT_MIN_INCLUSIVE),
            max_exclusive: Some(DEFAULT_MAX_EXCLUSIVE),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TypeInferencer {
    default_max_length: u64,
}

impl TypeInferencer {
    pub fn new(default_max_length: u64) -> Self {
        Self { default_max_length }
    }

    /// Infer all facts for a node, logging type fallbacks
    pub fn infer(&self, node: &SchemaNode) -> ScalarFacts {
        match node.types.primitive {
            Primitive::Unknown => tracing::warn!(
                path = %display_path(&node.pointer),
                "unrecognized or missing type, defaulting to string"
            ),
            Primitive::Boolean => tracing::debug!(
                path = %display_path(&node.pointer),
                "boolean mapped to string"
            ),
            _ => {}
        }
        self.facts(node)
    }

    /// Same as `infer`, without logging
    pub fn facts(&self, node: &SchemaNode) -> ScalarFacts {
        let value_type = self.datatype(node);
        ScalarFacts {
            value_type,
            min_count: self.min_count(node),
            max_length: self.max_length_for(node, value_type),
            min_inclusive: self.min_inclusive_for(node, value_type),
            max_exclusive: self.max_exclusive_for(node, value_type),
        }
    }

    pub fn datatype(&self, node: &SchemaNode) -> ValueType {
        match node.types.primitive {
            Primitive::Integer => ValueType::Integer,
            Primitive::Number => ValueType::Decimal,
            Primitive::String => match node.format {
                Some(Format::Number) => ValueType::Decimal,
                Some(Format::Integer) => ValueType::Integer,
                Some(Format::DateTime) => ValueType::DateTime,
                _ => ValueType::String,
            },
            _ => ValueType::String,
        }
    }

    /// 0 iff the declared type set includes `"null"`
    pub fn min_count(&self, node: &SchemaNode) -> u8 {
        if node.types.nullable {
            0
        } else {
            1
        }
    }

    pub fn min_inclusive(&self, node: &SchemaNode) -> Option<i64> {
        self.min_inclusive_for(node, self.datatype(node))
    }

    pub fn max_exclusive(&self, node: &SchemaNode) -> Option<i64> {
        self.max_exclusive_for(node, self.datatype(node))
    }

    pub fn max_length(&self, node: &SchemaNode) -> Option<u64> {
        self.max_length_for(node, self.datatype(node))
    }

    fn min_inclusive_for(&self, node: &SchemaNode, value_type: ValueType) -> Option<i64> {
        (value_type == ValueType::Integer).then(|| {
            node.minimum
                .map(|m| m.ceil() as i64)
                .unwrap_or(DEFAULT_MIN_INCLUSIVE)
        })
    }

    fn max_exclusive_for(&self, node: &SchemaNode, value_type: ValueType) -> Option<i64> {
        (value_type == ValueType::Integer).then(|| {
            node.maximum
                .map(|m| m.floor() as i64)
                .unwrap_or(DEFAULT_MAX_EXCLUSIVE)
        })
    }

    fn max_length_for(&self, node: &SchemaNode, value_type: ValueType) -> Option<u64> {
        (value_type == ValueType::String).then(|| node.max_length.unwrap_or(self.default_max_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeSet;
    use serde_json::json;

    fn node(value: serde_json::Value) -> SchemaNode {
        SchemaNode::from_value(&value, 8).unwrap()
    }

    #[test]
    fn test_datatype_precedence() {
        let infer = TypeInferencer::new(150);
        assert_eq!(infer.datatype(&node(json!({"type": "integer"}))), ValueType::Integer);
        assert_eq!(infer.datatype(&node(json!({"type": ["integer", "null"]}))), ValueType::Integer);
        assert_eq!(infer.datatype(&node(json!({"type": "number"}))), ValueType::Decimal);
        assert_eq!(
            infer.datatype(&node(json!({"type": "string", "format": "number"}))),
            ValueType::Decimal
        );
        assert_eq!(
            infer.datatype(&node(json!({"type": "string", "format": "integer"}))),
            ValueType::Integer
        );
        assert_eq!(
            infer.datatype(&node(json!({"type": ["string", "null"], "format": "date-time"}))),
            ValueType::DateTime
        );
        assert_eq!(
            infer.datatype(&node(json!({"type": "string", "format": "email"}))),
            ValueType::String
        );
        assert_eq!(infer.datatype(&node(json!({}))), ValueType::String);
        assert_eq!(infer.datatype(&node(json!({"type": "boolean"}))), ValueType::String);
    }

    #[test]
    fn test_min_count_follows_nullability() {
        let infer = TypeInferencer::new(150);
        assert_eq!(infer.min_count(&node(json!({"type": ["string", "null"]}))), 0);
        assert_eq!(infer.min_count(&node(json!({"type": "string"}))), 1);
        assert_eq!(infer.min_count(&node(json!({}))), 1);
    }

    #[test]
    fn test_integer_bounds() {
        let infer = TypeInferencer::new(150);
        let plain = node(json!({"type": "integer"}));
        assert_eq!(infer.min_inclusive(&plain), Some(0));
        assert_eq!(infer.max_exclusive(&plain), Some(4_294_967_295));

        let bounded = node(json!({"type": "integer", "minimum": -5, "maximum": 100}));
        assert_eq!(infer.min_inclusive(&bounded), Some(-5));
        assert_eq!(infer.max_exclusive(&bounded), Some(100));

        let text = node(json!({"type": "string", "minimum": 3}));
        assert_eq!(infer.min_inclusive(&text), None);
        assert_eq!(infer.max_exclusive(&text), None);
    }

    #[test]
    fn test_max_length_only_for_strings() {
        let infer = TypeInferencer::new(1000);
        assert_eq!(infer.max_length(&node(json!({"type": "string"}))), Some(1000));
        assert_eq!(infer.max_length(&node(json!({"type": "string", "maxLength": "N/A"}))), Some(1000));
        assert_eq!(infer.max_length(&node(json!({"type": "string", "maxLength": 12}))), Some(12));
        assert_eq!(infer.max_length(&node(json!({"type": "integer", "maxLength": 12}))), None);
        assert_eq!(
            infer.max_length(&node(json!({"type": "string", "format": "date-time"}))),
            None
        );
    }

    #[test]
    fn test_integer_key_facts() {
        let facts = ScalarFacts::integer_key();
        let synthetic = {
            let mut n = SchemaNode::scalar("/properties/stageId", TypeSet::new(Primitive::Integer, false));
            n.minimum = Some(0.0);
            n.maximum = Some(4_294_967_295.0);
            n
        };
        assert_eq!(TypeInferencer::new(150).infer(&synthetic), facts);
    }
}
