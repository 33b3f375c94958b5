//! Shape Model Checks
//!
//! Verifies the structural invariants of a finished `ShapeModel`:
//! 1. **Keys**: every non-root shape has exactly one foreign key, the root none
//! 2. **Key typing**: a foreign key matches the type and bounds of the key it references
//! 3. **Synthetic keys**: shapes without a natural `id` carry exactly one,
//!    typed integer over `[0, 4294967295)`
//! 4. **Uniqueness**: no property appears twice in one shape

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::config::{FlattenOptions, DEFAULT_MAX_EXCLUSIVE, DEFAULT_MIN_INCLUSIVE};
use crate::keys::NATURAL_KEY;
use crate::model::{referenced_key, referenced_shape, PropertyConstraint, ShapeModel, Stereotype, ValueType};

/// Check code for categorizing findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckCode {
    /// Same property id twice in one shape
    DuplicateProperty,
    /// Root shape carries a foreign key
    RootForeignKey,
    /// Non-root shape without exactly one foreign key
    ForeignKeyCount,
    /// Foreign key references a shape or key that does not exist
    DanglingForeignKey,
    /// Foreign key type or bounds differ from the referenced key
    ForeignKeyMismatch,
    /// Shape without natural id lacks a synthetic key, or has several
    SyntheticKeyCount,
    /// Synthetic key is not an integer over the default range
    SyntheticKeyBounds,
    /// Shape holds nothing but key columns
    EmptyShape,
}

impl CheckCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateProperty => "E001",
            Self::RootForeignKey => "E002",
            Self::ForeignKeyCount => "E003",
            Self::DanglingForeignKey => "E004",
            Self::ForeignKeyMismatch => "E005",
            Self::SyntheticKeyCount => "E006",
            Self::SyntheticKeyBounds => "E007",
            Self::EmptyShape => "W001",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Self::EmptyShape)
    }
}

impl fmt::Display for CheckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub code: CheckCode,
    pub shape_id: String,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.shape_id, self.message)
    }
}

/// Result of checking a model
#[derive(Debug, Default)]
pub struct CheckReport {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn push(&mut self, code: CheckCode, shape_id: &str, message: impl Into<String>) {
        let finding = Finding {
            code,
            shape_id: shape_id.to_string(),
            message: message.into(),
        };
        if code.is_error() {
            self.errors.push(finding);
        } else {
            self.warnings.push(finding);
        }
    }
}

/// Check a model produced with `options`
pub fn check_model(model: &ShapeModel, options: &FlattenOptions) -> CheckReport {
    let mut report = CheckReport::default();
    let natural_key_id = options.names.property_id(&[NATURAL_KEY.to_string()]);

    let mut by_shape: HashMap<&str, Vec<&PropertyConstraint>> = HashMap::new();
    for record in &model.records {
        by_shape.entry(record.shape_id.as_str()).or_default().push(record);
    }

    for shape_id in model.shape_ids() {
        let records = &by_shape[shape_id];
        let is_root = shape_id == model.root_shape_id;

        let mut seen = HashSet::new();
        for r in records {
            if !seen.insert(r.property_id.as_str()) {
                report.push(
                    CheckCode::DuplicateProperty,
                    shape_id,
                    format!("property {} appears more than once", r.property_id),
                );
            }
        }

        let foreign_keys: Vec<_> = records.iter().filter(|r| r.is(Stereotype::ForeignKey)).collect();
        if is_root && !foreign_keys.is_empty() {
            report.push(CheckCode::RootForeignKey, shape_id, "root shape has a foreign key");
        } else if !is_root && foreign_keys.len() != 1 {
            report.push(
                CheckCode::ForeignKeyCount,
                shape_id,
                format!("expected one foreign key, found {}", foreign_keys.len()),
            );
        }

        for fk in &foreign_keys {
            check_foreign_key(&by_shape, shape_id, fk, &mut report);
        }

        let synthetic: Vec<_> = records.iter().filter(|r| r.is(Stereotype::SyntheticKey)).collect();
        let has_natural_key = records
            .iter()
            .any(|r| r.property_id == natural_key_id && r.is(Stereotype::PrimaryKey));
        let count_ok = if options.synthetic_keys && !has_natural_key {
            synthetic.len() == 1
        } else {
            synthetic.len() <= 1
        };
        if !count_ok {
            report.push(
                CheckCode::SyntheticKeyCount,
                shape_id,
                format!("expected exactly one synthetic key, found {}", synthetic.len()),
            );
        }
        for key in synthetic {
            let bounded = key.value_type == ValueType::Integer
                && key.min_inclusive == Some(DEFAULT_MIN_INCLUSIVE)
                && key.max_exclusive == Some(DEFAULT_MAX_EXCLUSIVE);
            if !bounded {
                report.push(
                    CheckCode::SyntheticKeyBounds,
                    shape_id,
                    format!("synthetic key {} is not an integer over [0, {})", key.property_id, DEFAULT_MAX_EXCLUSIVE),
                );
            }
        }

        let only_keys = records
            .iter()
            .all(|r| r.stereotype.is_some() || r.property_id == model.order_index_id);
        if only_keys {
            report.push(CheckCode::EmptyShape, shape_id, "shape has no data properties");
        }
    }

    report
}

fn check_foreign_key(
    by_shape: &HashMap<&str, Vec<&PropertyConstraint>>,
    shape_id: &str,
    fk: &PropertyConstraint,
    report: &mut CheckReport,
) {
    let Some(remark) = fk.remarks.as_deref() else {
        report.push(
            CheckCode::DanglingForeignKey,
            shape_id,
            format!("foreign key {} names no parent", fk.property_id),
        );
        return;
    };

    let parent = referenced_shape(remark);
    let Some(parent_records) = by_shape.get(parent) else {
        report.push(
            CheckCode::DanglingForeignKey,
            shape_id,
            format!("foreign key {} references unknown shape {}", fk.property_id, parent),
        );
        return;
    };
    if parent == shape_id {
        report.push(CheckCode::DanglingForeignKey, shape_id, "foreign key references its own shape");
        return;
    }

    let Some((_, key_id)) = referenced_key(remark) else {
        return;
    };
    match parent_records.iter().find(|r| r.property_id == key_id) {
        None => report.push(
            CheckCode::DanglingForeignKey,
            shape_id,
            format!("foreign key {} references unknown key {}", fk.property_id, remark),
        ),
        Some(key) => {
            let same = key.value_type == fk.value_type
                && key.max_length == fk.max_length
                && key.min_inclusive == fk.min_inclusive
                && key.max_exclusive == fk.max_exclusive;
            if !same {
                report.push(
                    CheckCode::ForeignKeyMismatch,
                    shape_id,
                    format!("foreign key {} does not match {}", fk.property_id, remark),
                );
            }
        }
    }
}
