//! Schema Shapes
//!
//! Compiles a nested JSON Schema document into a flat, relational shape model:
//! an ordered list of property constraints grouped into shapes, ready to be
//! rendered as spreadsheet tabs or a UML class diagram.
//!
//! ## Pipeline
//!
//! ```text
//! shapes.toml ──► ShapesConfig ──► FlattenOptions
//!                                       │
//! schema.json ──► SchemaNode ──► SyntheticKeyInjector ──► Flattener ──► ShapeModel
//!                                                                          │
//!                                        ┌─────────────────┬───────────────┤
//!                                        ▼                 ▼               ▼
//!                                     Workbook        render_plantuml   check_model
//! ```
//!
//! ## Flattening rules
//!
//! - **Inline**: nested objects with at most `embed_threshold` properties join
//!   their parent shape under compound names (`ADDRESS__CITY`)
//! - **Promote**: larger objects and all array items become child shapes with a
//!   foreign key back to the parent's key
//! - **Order**: array-derived shapes carry an order index
//! - **Keys**: shapes without a natural `id` get a synthetic integer key
//!
//! ## Example
//!
//! ```no_run
//! use schema_shapes::{flatten_file, FlattenOptions};
//! use std::path::Path;
//!
//! let options = FlattenOptions::new("Product").with_prefix("pr");
//! let model = flatten_file(Path::new("product.schema.json"), &options)?;
//! for record in &model.records {
//!     println!("{} {}", record.shape_id, record.property_id);
//! }
//! # Ok::<(), schema_shapes::ShapeError>(())
//! ```

pub mod check;
pub mod checksum;
pub mod config;
pub mod error;
pub mod flatten;
pub mod infer;
pub mod keys;
pub mod model;
pub mod naming;
pub mod output;
pub mod schema;

pub use check::{check_model, CheckCode, CheckReport, Finding};
pub use checksum::Checksum;
pub use config::{AliasRule, FlattenOptions, GeneralConfig, OntologyConfig, SettingConfig, ShapesConfig};
pub use error::{Result, ShapeError};
pub use flatten::{flatten_file, flatten_schema, flatten_value, Flattener};
pub use infer::{ScalarFacts, TypeInferencer};
pub use keys::SyntheticKeyInjector;
pub use model::{PropertyConstraint, ShapeModel, ShapeSummary, Stereotype, ValueType, COLUMNS};
pub use naming::{NameTransformer, ShapeNamer};
pub use output::{render_plantuml, SheetFormat, Workbook};
pub use schema::{load_schema, SchemaNode, TypeSet};
