//! Tabular output
//!
//! Three sheets, matching the shape-definition workbook layout:
//! - `Ontologies`: one row per configured ontology
//! - `Shapes`: one row per distinct shape, with its datasource
//! - `Property Constraints`: the flattened records, all eleven columns
//!
//! Sheets are written either as one CSV file each or as a single JSON document.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ShapesConfig;
use crate::error::{Result, ShapeError};
use crate::model::{PropertyConstraint, ShapeModel, COLUMNS};
use crate::naming::SHAPE_NAMESPACE;

/// Setting consulted for the datasource template
pub const DATASOURCE_SETTING: &str = "datasource";

/// Datasource template used when no setting overrides it
pub const DEFAULT_DATASOURCE: &str = "AwsAurora(AwsTableName:\"{table}\")";

pub const ONTOLOGY_COLUMNS: [&str; 4] = ["Ontology Name", "Comment", "Namespace URI", "Prefix"];

pub const SHAPE_COLUMNS: [&str; 7] = [
    "Shape Id",
    "Comment",
    "Scope Class",
    "Datasource",
    "Shape Type",
    "One Of",
    "IRI Template",
];

/// Output format for sheets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
    /// One CSV file per sheet in an output directory
    #[default]
    Csv,
    /// A single JSON document keyed by sheet name
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyRow {
    #[serde(rename = "Ontology Name")]
    pub name: String,
    #[serde(rename = "Comment")]
    pub comment: String,
    #[serde(rename = "Namespace URI")]
    pub namespace_uri: String,
    #[serde(rename = "Prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeRow {
    #[serde(rename = "Shape Id")]
    pub shape_id: String,
    #[serde(rename = "Comment")]
    pub comment: Option<String>,
    #[serde(rename = "Scope Class")]
    pub scope_class: Option<String>,
    #[serde(rename = "Datasource")]
    pub datasource: String,
    #[serde(rename = "Shape Type")]
    pub shape_type: Option<String>,
    #[serde(rename = "One Of")]
    pub one_of: Option<String>,
    #[serde(rename = "IRI Template")]
    pub iri_template: Option<String>,
}

/// All sheets for one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(rename = "Ontologies")]
    pub ontologies: Vec<OntologyRow>,
    #[serde(rename = "Shapes")]
    pub shapes: Vec<ShapeRow>,
    #[serde(rename = "Property Constraints")]
    pub property_constraints: Vec<PropertyConstraint>,
}

impl Workbook {
    /// Assemble sheets from a model and the run's configuration
    pub fn build(model: &ShapeModel, config: &ShapesConfig) -> Result<Self> {
        let ontologies = config
            .ontologies
            .iter()
            .map(|o| OntologyRow {
                name: o.name.clone(),
                comment: o.description.clone(),
                namespace_uri: o.uri.clone(),
                prefix: o.prefix.clone(),
            })
            .collect();

        let datasource = Datasource::from_config(config)?;
        let shapes = model
            .shape_ids()
            .into_iter()
            .map(|id| ShapeRow {
                shape_id: id.to_string(),
                comment: None,
                scope_class: None,
                datasource: datasource.render(id),
                shape_type: None,
                one_of: None,
                iri_template: None,
            })
            .collect();

        Ok(Self {
            ontologies,
            shapes,
            property_constraints: model.records.clone(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// CSV text of each sheet: (file stem, content)
    pub fn to_csv(&self) -> Vec<(&'static str, String)> {
        let ontologies = csv_table(
            &ONTOLOGY_COLUMNS,
            self.ontologies.iter().map(|o| {
                vec![o.name.clone(), o.comment.clone(), o.namespace_uri.clone(), o.prefix.clone()]
            }),
        );

        let shapes = csv_table(
            &SHAPE_COLUMNS,
            self.shapes.iter().map(|s| {
                vec![
                    s.shape_id.clone(),
                    s.comment.clone().unwrap_or_default(),
                    s.scope_class.clone().unwrap_or_default(),
                    s.datasource.clone(),
                    s.shape_type.clone().unwrap_or_default(),
                    s.one_of.clone().unwrap_or_default(),
                    s.iri_template.clone().unwrap_or_default(),
                ]
            }),
        );

        let constraints = csv_table(
            &COLUMNS,
            self.property_constraints.iter().map(|r| r.cells().to_vec()),
        );

        vec![
            ("ontologies", ontologies),
            ("shapes", shapes),
            ("property_constraints", constraints),
        ]
    }

    /// Write the workbook. CSV targets a directory, JSON a single file.
    pub fn write(&self, path: &Path, format: SheetFormat) -> Result<Vec<PathBuf>> {
        match format {
            SheetFormat::Json => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, self.to_json()?)?;
                Ok(vec![path.to_path_buf()])
            }
            SheetFormat::Csv => {
                fs::create_dir_all(path)?;
                self.to_csv()
                    .into_iter()
                    .map(|(stem, content)| -> Result<PathBuf> {
                        let file = path.join(format!("{}.csv", stem));
                        fs::write(&file, content)?;
                        Ok(file)
                    })
                    .collect()
            }
        }
    }
}

/// Datasource template with an optional regex rewrite of the table name
struct Datasource {
    template: String,
    rewrite: Option<(Regex, String)>,
}

impl Datasource {
    fn from_config(config: &ShapesConfig) -> Result<Self> {
        let Some(setting) = config.setting(DATASOURCE_SETTING) else {
            return Ok(Self {
                template: DEFAULT_DATASOURCE.to_string(),
                rewrite: None,
            });
        };

        let rewrite = match &setting.pattern {
            Some(pattern) => {
                let regex = Regex::new(pattern).map_err(|source| ShapeError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
                Some((regex, setting.replacement.clone().unwrap_or_default()))
            }
            None => None,
        };

        Ok(Self {
            template: setting.value.clone(),
            rewrite,
        })
    }

    fn render(&self, shape_id: &str) -> String {
        let table = match &self.rewrite {
            Some((regex, replacement)) => regex.replace_all(shape_id, replacement.as_str()).into_owned(),
            None => shape_id.trim_start_matches(SHAPE_NAMESPACE).to_string(),
        };
        self.template.replace("{table}", &table)
    }
}

fn csv_table<I>(header: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut out = header.iter().map(|h| csv_field(h)).collect::<Vec<_>>().join(",");
    out.push('\n');
    for row in rows {
        out.push_str(&row.iter().map(|c| csv_field(c)).collect::<Vec<_>>().join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
