//! Output adapters
//!
//! Render a `ShapeModel` for downstream tools:
//! - Sheets (Ontologies, Shapes, Property Constraints) as CSV files or JSON
//! - PlantUML class diagrams

pub mod sheets;
pub mod uml;

pub use sheets::{OntologyRow, ShapeRow, SheetFormat, Workbook};
pub use uml::render_plantuml;
