//! Schema Flattening
//!
//! Walks an ingested schema tree and produces the ordered `PropertyConstraint`
//! sequence of a `ShapeModel`.
//!
//! Architecture:
//! - Key injection: optional pre-pass adding synthetic keys (see `keys`)
//! - Planning: assigns a collision-free shape id to every shape position
//! - Emission: pure recursion; each call returns its rows and the caller
//!   concatenates them. A shape's rows are contiguous, followed by the rows of
//!   the shapes promoted from it.
//!
//! Per object node:
//! - nested object with at most `embed_threshold` properties: inlined, its
//!   rows join the current shape under compound names (`ADDRESS__CITY`)
//! - nested object above the threshold: promoted to a child shape
//! - array: its items are always promoted to a child shape with an order index
//! - anything else: one scalar row
//!
//! The key that children reference is resolved from all direct properties
//! before any child is visited, so declaration order does not matter.

use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;

use crate::config::FlattenOptions;
use crate::error::{Result, ShapeError};
use crate::infer::{ScalarFacts, TypeInferencer};
use crate::keys::{has_natural_key, SyntheticKeyInjector, NATURAL_KEY};
use crate::model::{foreign_key_remark, PropertyConstraint, ShapeModel, Stereotype, ValueType};
use crate::naming::{json_path, ShapeNamer};
use crate::schema::{display_path, load_schema, SchemaNode};

// =============================================================================
// Public API
// =============================================================================

/// Inject synthetic keys (when enabled) and flatten an ingested schema
pub fn flatten_schema(mut root: SchemaNode, options: &FlattenOptions) -> Result<ShapeModel> {
    if options.synthetic_keys {
        let injector = SyntheticKeyInjector::new(&options.synthetic_key_name, options.embed_threshold);
        let added = injector.inject(&mut root);
        tracing::debug!(added, "synthetic keys injected");
    }
    Flattener::new(options).flatten(&root)
}

/// Ingest and flatten a schema document
pub fn flatten_value(value: &Value, options: &FlattenOptions) -> Result<ShapeModel> {
    let root = SchemaNode::from_value(value, options.max_depth)?;
    flatten_schema(root, options)
}

/// Load and flatten a schema file
pub fn flatten_file(path: &Path, options: &FlattenOptions) -> Result<ShapeModel> {
    let root = load_schema(path, options.max_depth)?;
    flatten_schema(root, options)
}

// =============================================================================
// Member classification
// =============================================================================

/// How a property of an object node is handled
enum Member<'n> {
    Inline(&'n SchemaNode),
    Promote(&'n SchemaNode),
    Items(&'n SchemaNode),
    Scalar(&'n SchemaNode),
}

/// Key of a shape, as referenced by its children's foreign keys
#[derive(Debug, Clone)]
struct KeyInfo {
    property_id: String,
    facts: ScalarFacts,
}

/// The shape currently being emitted
struct ShapeCtx<'a> {
    shape_id: &'a str,
    local_name: &'a str,
    is_root: bool,
    key: Option<&'a KeyInfo>,
}

/// Link from a promoted shape back to the shape it was promoted from
struct ParentLink<'a> {
    shape_id: &'a str,
    local_name: &'a str,
    key: Option<&'a KeyInfo>,
    from_array: bool,
}

// =============================================================================
// Flattener
// =============================================================================

pub struct Flattener<'a> {
    options: &'a FlattenOptions,
    infer: TypeInferencer,
}

impl<'a> Flattener<'a> {
    pub fn new(options: &'a FlattenOptions) -> Self {
        Self {
            options,
            infer: TypeInferencer::new(options.default_max_length),
        }
    }

    /// Flatten a tree as-is (no key injection)
    pub fn flatten(&self, root: &SchemaNode) -> Result<ShapeModel> {
        if !root.is_object() {
            return Err(ShapeError::MissingProperties {
                path: display_path(&root.pointer),
            });
        }

        let shape_ids = self.plan(root)?;
        let components = vec![self.options.base.clone()];
        let records = self.shape(root, &components, None, &shape_ids)?;

        let model = ShapeModel {
            root_shape_id: shape_ids
                .get(&root.pointer)
                .cloned()
                .unwrap_or_else(|| self.options.names.build_shape_id(self.prefix(), &components)),
            order_index_id: self.options.names.property_id(&[self.options.order_index_name.clone()]),
            records,
        };

        tracing::info!(
            shapes = shape_ids.len(),
            records = model.len(),
            root = %model.root_shape_id,
            "schema flattened"
        );
        Ok(model)
    }

    fn prefix(&self) -> Option<&str> {
        self.options.prefix.as_deref()
    }

    fn classify<'n>(&self, node: &'n SchemaNode) -> Result<Member<'n>> {
        if node.is_object() {
            if node.property_count() <= self.options.embed_threshold {
                Ok(Member::Inline(node))
            } else {
                Ok(Member::Promote(node))
            }
        } else if node.is_array() {
            let items = node.items.as_deref().ok_or_else(|| ShapeError::MissingItems {
                path: display_path(&node.pointer),
            })?;
            if items.is_array() {
                // nested arrays have no column to hold the inner elements
                return Err(ShapeError::MissingProperties {
                    path: display_path(&items.pointer),
                });
            }
            Ok(Member::Items(items))
        } else {
            Ok(Member::Scalar(node))
        }
    }

    fn check_depth(&self, node: &SchemaNode, depth: usize) -> Result<()> {
        if depth > self.options.max_depth {
            return Err(ShapeError::DepthExceeded {
                path: display_path(&node.pointer),
                limit: self.options.max_depth,
            });
        }
        Ok(())
    }

    /// A declared property may not take the synthetic key's name
    fn check_reserved(&self, node: &SchemaNode) -> Result<()> {
        if !self.options.synthetic_keys {
            return Ok(());
        }
        let name = &self.options.synthetic_key_name;
        match node.property(name) {
            Some(prop) if !prop.synthetic => Err(ShapeError::ReservedProperty {
                path: display_path(&prop.pointer),
                name: name.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Every property id of a shape's own rows must be distinct
    fn check_unique(&self, rows: &[PropertyConstraint]) -> Result<()> {
        let mut seen: HashMap<(&str, &str), &PropertyConstraint> = HashMap::new();
        for row in rows {
            match seen.entry((row.shape_id.as_str(), row.property_id.as_str())) {
                Entry::Occupied(first) => {
                    return Err(ShapeError::DuplicateProperty {
                        shape: row.shape_id.clone(),
                        property: row.property_id.clone(),
                        first: row_origin(first.get()),
                        second: row_origin(row),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Planning
    // -------------------------------------------------------------------------

    /// Assign shape ids to every shape position, keyed by JSON Pointer
    fn plan(&self, root: &SchemaNode) -> Result<HashMap<String, String>> {
        let mut namer = ShapeNamer::new(&self.options.names, self.prefix());
        let mut ids = HashMap::new();
        let components = vec![self.options.base.clone()];
        self.plan_shape(root, &components, 0, &mut namer, &mut ids)?;
        Ok(ids)
    }

    fn plan_shape(
        &self,
        node: &SchemaNode,
        components: &[String],
        depth: usize,
        namer: &mut ShapeNamer<'_>,
        ids: &mut HashMap<String, String>,
    ) -> Result<()> {
        self.check_depth(node, depth)?;
        self.check_reserved(node)?;
        ids.insert(node.pointer.clone(), namer.assign(components));
        self.plan_members(node, components, depth, namer, ids)
    }

    fn plan_members(
        &self,
        node: &SchemaNode,
        components: &[String],
        depth: usize,
        namer: &mut ShapeNamer<'_>,
        ids: &mut HashMap<String, String>,
    ) -> Result<()> {
        for prop in &node.properties {
            let child_components = extend(components, &prop.name);
            match self.classify(&prop.node)? {
                Member::Inline(child) => {
                    self.check_depth(child, depth + 1)?;
                    self.plan_members(child, &child_components, depth + 1, namer, ids)?;
                }
                Member::Promote(child) | Member::Items(child) => {
                    self.plan_shape(child, &child_components, depth + 1, namer, ids)?;
                }
                Member::Scalar(_) => {}
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Emission
    // -------------------------------------------------------------------------

    fn shape_id(&self, node: &SchemaNode, components: &[String], ids: &HashMap<String, String>) -> String {
        ids.get(&node.pointer)
            .cloned()
            .unwrap_or_else(|| self.options.names.build_shape_id(self.prefix(), components))
    }

    /// Rows of one shape followed by the rows of every shape promoted from it
    fn shape(
        &self,
        node: &SchemaNode,
        components: &[String],
        parent: Option<ParentLink<'_>>,
        ids: &HashMap<String, String>,
    ) -> Result<Vec<PropertyConstraint>> {
        let shape_id = self.shape_id(node, components, ids);
        let local_name = components.last().map(String::as_str).unwrap_or_default();
        let is_root = parent.is_none();
        tracing::debug!(shape = %shape_id, path = %display_path(&node.pointer), "emitting shape");

        let mut rows = match &parent {
            Some(link) => self.link_rows(&shape_id, link),
            None => Vec::new(),
        };

        let key = self.resolve_key(node, is_root);
        let ctx = ShapeCtx {
            shape_id: &shape_id,
            local_name,
            is_root,
            key: key.as_ref(),
        };

        let (own, children) = self.members(node, &ctx, &[], components, ids)?;
        rows.extend(own);
        self.check_unique(&rows)?;
        rows.extend(children);
        Ok(rows)
    }

    /// Shape for the scalar elements of an array
    fn scalar_items_shape(
        &self,
        name: &str,
        items: &SchemaNode,
        components: &[String],
        link: ParentLink<'_>,
        ids: &HashMap<String, String>,
    ) -> Result<Vec<PropertyConstraint>> {
        let shape_id = self.shape_id(items, components, ids);
        let mut rows = self.link_rows(&shape_id, &link);

        if self.options.synthetic_keys {
            rows.push(self.row(
                &shape_id,
                self.options.names.property_id(&[self.options.synthetic_key_name.clone()]),
                ScalarFacts::integer_key(),
                Some(Stereotype::SyntheticKey),
                None,
                None,
            ));
        }

        let facts = self.infer.infer(items);
        rows.push(self.row(
            &shape_id,
            self.options.names.property_id(&[name.to_string()]),
            facts,
            None,
            Some(json_path(items.path_id())),
            items.description.clone(),
        ));
        self.check_unique(&rows)?;
        Ok(rows)
    }

    /// Direct and inlined rows of the current shape, plus promoted children
    fn members(
        &self,
        node: &SchemaNode,
        ctx: &ShapeCtx<'_>,
        prop_path: &[String],
        components: &[String],
        ids: &HashMap<String, String>,
    ) -> Result<(Vec<PropertyConstraint>, Vec<PropertyConstraint>)> {
        let mut own = Vec::new();
        let mut children = Vec::new();

        for prop in &node.properties {
            let child_components = extend(components, &prop.name);
            match self.classify(&prop.node)? {
                Member::Inline(child) => {
                    tracing::debug!(path = %display_path(&child.pointer), "inlining object");
                    let child_path = extend(prop_path, &prop.name);
                    let (rows, nested) = self.members(child, ctx, &child_path, &child_components, ids)?;
                    own.extend(rows);
                    children.extend(nested);
                }
                Member::Promote(child) => {
                    let link = self.link(ctx, false);
                    children.extend(self.shape(child, &child_components, Some(link), ids)?);
                }
                Member::Items(items) => {
                    let link = self.link(ctx, true);
                    if items.is_object() {
                        children.extend(self.shape(items, &child_components, Some(link), ids)?);
                    } else {
                        children.extend(self.scalar_items_shape(&prop.name, items, &child_components, link, ids)?);
                    }
                }
                Member::Scalar(child) => {
                    own.push(self.scalar(&prop.name, child, ctx, prop_path));
                }
            }
        }

        Ok((own, children))
    }

    fn link<'c>(&self, ctx: &ShapeCtx<'c>, from_array: bool) -> ParentLink<'c> {
        ParentLink {
            shape_id: ctx.shape_id,
            local_name: ctx.local_name,
            key: ctx.key,
            from_array,
        }
    }

    /// Foreign key (and order index for array items) of a promoted shape
    fn link_rows(&self, shape_id: &str, link: &ParentLink<'_>) -> Vec<PropertyConstraint> {
        let names = &self.options.names;
        let (facts, remark) = match link.key {
            Some(key) => (
                ScalarFacts { min_count: 1, ..key.facts },
                foreign_key_remark(link.shape_id, &key.property_id),
            ),
            None => (
                ScalarFacts {
                    value_type: ValueType::String,
                    min_count: 1,
                    max_length: Some(self.options.default_max_length),
                    min_inclusive: None,
                    max_exclusive: None,
                },
                link.shape_id.to_string(),
            ),
        };

        let mut rows = vec![self.row(
            shape_id,
            names.foreign_key_id(link.local_name),
            facts,
            Some(Stereotype::ForeignKey),
            Some(remark),
            None,
        )];

        if link.from_array {
            let order = ScalarFacts {
                value_type: ValueType::Integer,
                min_count: 1,
                max_length: None,
                min_inclusive: None,
                max_exclusive: None,
            };
            rows.push(self.row(
                shape_id,
                names.property_id(&[self.options.order_index_name.clone()]),
                order,
                None,
                None,
                None,
            ));
        }
        rows
    }

    /// Locate the key children will reference: `id`, then the configured
    /// primary key (root only), then the synthetic key.
    fn resolve_key(&self, node: &SchemaNode, is_root: bool) -> Option<KeyInfo> {
        let configured = if is_root { self.options.primary_key.as_deref() } else { None };
        let natural = has_natural_key(node).then_some(NATURAL_KEY);
        let candidates = [natural, configured, Some(self.options.synthetic_key_name.as_str())];

        candidates.into_iter().flatten().find_map(|name| {
            let prop = node.property(name)?;
            if prop.is_object() || prop.is_array() {
                return None;
            }
            if name == self.options.synthetic_key_name && !prop.synthetic {
                return None;
            }
            Some(KeyInfo {
                property_id: self.options.names.property_id(&[name.to_string()]),
                facts: ScalarFacts {
                    min_count: 1,
                    ..self.infer.facts(prop)
                },
            })
        })
    }

    fn scalar(&self, name: &str, node: &SchemaNode, ctx: &ShapeCtx<'_>, prop_path: &[String]) -> PropertyConstraint {
        let direct = prop_path.is_empty();
        let stereotype = if direct && node.synthetic {
            Some(Stereotype::SyntheticKey)
        } else if direct
            && (name == NATURAL_KEY || (ctx.is_root && self.options.primary_key.as_deref() == Some(name)))
        {
            Some(Stereotype::PrimaryKey)
        } else {
            None
        };

        let mut facts = self.infer.infer(node);
        if stereotype == Some(Stereotype::PrimaryKey) {
            facts.min_count = 1;
        }

        let remarks = (!node.synthetic).then(|| json_path(node.path_id()));
        self.row(
            ctx.shape_id,
            self.options.names.property_id(&extend(prop_path, name)),
            facts,
            stereotype,
            remarks,
            node.description.clone(),
        )
    }

    fn row(
        &self,
        shape_id: &str,
        property_id: String,
        facts: ScalarFacts,
        stereotype: Option<Stereotype>,
        remarks: Option<String>,
        comment: Option<String>,
    ) -> PropertyConstraint {
        PropertyConstraint {
            shape_id: shape_id.to_string(),
            property_id,
            comment,
            remarks,
            value_type: facts.value_type,
            stereotype,
            min_count: facts.min_count,
            max_count: 1,
            max_length: facts.max_length,
            min_inclusive: facts.min_inclusive,
            max_exclusive: facts.max_exclusive,
        }
    }
}

/// Where a row came from: its JSON path, or `generated` for key and link rows
fn row_origin(row: &PropertyConstraint) -> String {
    row.remarks
        .as_deref()
        .filter(|r| r.starts_with('$'))
        .unwrap_or("generated")
        .to_string()
}

fn extend(path: &[String], name: &str) -> Vec<String> {
    let mut extended = path.to_vec();
    extended.push(name.to_string());
    extended
}
