//! Shape model produced by flattening

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Semantic datatype of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    #[serde(rename = "xsd:integer")]
    Integer,
    #[serde(rename = "xsd:decimal")]
    Decimal,
    #[serde(rename = "xsd:dateTime")]
    DateTime,
    #[serde(rename = "xsd:string")]
    String,
}

impl ValueType {
    /// Qualified name used in tabular output
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Integer => "xsd:integer",
            ValueType::Decimal => "xsd:decimal",
            ValueType::DateTime => "xsd:dateTime",
            ValueType::String => "xsd:string",
        }
    }

    /// Short name used in diagrams
    pub fn label(&self) -> &'static str {
        match self {
            ValueType::Integer => "Integer",
            ValueType::Decimal => "Decimal",
            ValueType::DateTime => "DateTime",
            ValueType::String => "String",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structural role of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stereotype {
    #[serde(rename = "konig:primaryKey")]
    PrimaryKey,
    #[serde(rename = "konig:foreignKey")]
    ForeignKey,
    #[serde(rename = "konig:syntheticKey")]
    SyntheticKey,
}

impl Stereotype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stereotype::PrimaryKey => "konig:primaryKey",
            Stereotype::ForeignKey => "konig:foreignKey",
            Stereotype::SyntheticKey => "konig:syntheticKey",
        }
    }
}

impl fmt::Display for Stereotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Column headers, in output order
pub const COLUMNS: [&str; 11] = [
    "Shape Id",
    "Property Id",
    "Comment",
    "Remarks",
    "Value Type",
    "Stereotype",
    "Min Count",
    "Max Count",
    "Max Length",
    "Min Inclusive",
    "Max Exclusive",
];

/// One property row of a shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyConstraint {
    #[serde(rename = "Shape Id")]
    pub shape_id: String,
    #[serde(rename = "Property Id")]
    pub property_id: String,
    #[serde(rename = "Comment")]
    pub comment: Option<String>,
    #[serde(rename = "Remarks")]
    pub remarks: Option<String>,
    #[serde(rename = "Value Type")]
    pub value_type: ValueType,
    #[serde(rename = "Stereotype")]
    pub stereotype: Option<Stereotype>,
    #[serde(rename = "Min Count")]
    pub min_count: u8,
    #[serde(rename = "Max Count")]
    pub max_count: u8,
    #[serde(rename = "Max Length")]
    pub max_length: Option<u64>,
    #[serde(rename = "Min Inclusive")]
    pub min_inclusive: Option<i64>,
    #[serde(rename = "Max Exclusive")]
    pub max_exclusive: Option<i64>,
}

impl PropertyConstraint {
    /// Row cells in `COLUMNS` order; absent values are empty strings
    pub fn cells(&self) -> [String; 11] {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        [
            self.shape_id.clone(),
            self.property_id.clone(),
            opt(&self.comment),
            opt(&self.remarks),
            self.value_type.to_string(),
            opt(&self.stereotype),
            self.min_count.to_string(),
            self.max_count.to_string(),
            opt(&self.max_length),
            opt(&self.min_inclusive),
            opt(&self.max_exclusive),
        ]
    }

    pub fn is(&self, stereotype: Stereotype) -> bool {
        self.stereotype == Some(stereotype)
    }
}

/// Parent link of a non-root shape, recovered from its foreign key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeSummary {
    pub shape_id: String,
    pub parent: Option<String>,
    /// Promoted from array items (carries an order index)
    pub from_array: bool,
    pub property_count: usize,
}

/// The flattened output: an ordered, append-only record sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeModel {
    pub root_shape_id: String,
    /// Property id used for order indexes of array-derived shapes
    pub order_index_id: String,
    pub records: Vec<PropertyConstraint>,
}

impl ShapeModel {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct shape ids in first-appearance order
    pub fn shape_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.shape_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Records belonging to one shape, in emission order
    pub fn records_for<'a>(&'a self, shape_id: &'a str) -> impl Iterator<Item = &'a PropertyConstraint> + 'a {
        self.records.iter().filter(move |r| r.shape_id == shape_id)
    }

    /// Find one property of a shape
    pub fn find(&self, shape_id: &str, property_id: &str) -> Option<&PropertyConstraint> {
        self.records
            .iter()
            .find(|r| r.shape_id == shape_id && r.property_id == property_id)
    }

    /// Per-shape summary with parent links
    pub fn shapes(&self) -> Vec<ShapeSummary> {
        self.shape_ids()
            .into_iter()
            .map(|id| {
                let records: Vec<_> = self.records_for(id).collect();
                let parent = records
                    .iter()
                    .find(|r| r.is(Stereotype::ForeignKey))
                    .and_then(|fk| fk.remarks.as_deref())
                    .map(|remark| referenced_shape(remark).to_string());
                let from_array = records.iter().any(|r| r.property_id == self.order_index_id);
                ShapeSummary {
                    shape_id: id.to_string(),
                    parent,
                    from_array,
                    property_count: records.len(),
                }
            })
            .collect()
    }
}

/// Foreign key remark: `<parent shape id>.<parent key property id>`
pub fn foreign_key_remark(parent_shape: &str, parent_key: &str) -> String {
    format!("{}.{}", parent_shape, parent_key)
}

/// Shape id named by a foreign key remark.
///
/// A remark without a key part names the shape alone.
pub fn referenced_shape(remark: &str) -> &str {
    referenced_key(remark).map(|(shape, _)| shape).unwrap_or(remark)
}

/// (shape id, property id) named by a foreign key remark
pub fn referenced_key(remark: &str) -> Option<(&str, &str)> {
    let marker = format!(".{}", crate::naming::PROPERTY_NAMESPACE);
    remark
        .rfind(&marker)
        .map(|idx| (&remark[..idx], &remark[idx + 1..]))
}
