//! Synthetic key injection
//!
//! Pre-pass over the schema tree that gives every shape-producing node
//! (the root, promoted objects and object array items) an integer key
//! property when it has no direct property named `id`. Inlined objects are
//! walked to reach shapes nested below them, but never receive a key of
//! their own: their rows live in the parent shape.

use crate::config::{DEFAULT_MAX_EXCLUSIVE, DEFAULT_MIN_INCLUSIVE};
use crate::naming::pointer_token;
use crate::schema::{Primitive, Property, SchemaNode, TypeSet};

/// Name of the natural identifier property
pub const NATURAL_KEY: &str = "id";

/// A direct scalar `id`. Object or array `id` properties are not keys.
pub fn has_natural_key(node: &SchemaNode) -> bool {
    node.property(NATURAL_KEY)
        .is_some_and(|id| !id.is_object() && !id.is_array())
}

#[derive(Debug, Clone)]
pub struct SyntheticKeyInjector<'a> {
    key_name: &'a str,
    embed_threshold: usize,
}

impl<'a> SyntheticKeyInjector<'a> {
    pub fn new(key_name: &'a str, embed_threshold: usize) -> Self {
        Self {
            key_name,
            embed_threshold,
        }
    }

    /// Inject keys in place; returns how many were added.
    ///
    /// Idempotent: a node that already has the reserved property is left alone.
    pub fn inject(&self, root: &mut SchemaNode) -> usize {
        self.visit_shape(root)
    }

    fn visit_shape(&self, node: &mut SchemaNode) -> usize {
        let mut added = 0;
        if node.is_object() && !has_natural_key(node) && !node.has_property(self.key_name) {
            let key = self.synthetic_property(&node.pointer);
            node.properties.insert(0, key);
            tracing::debug!(path = %node.pointer, key = self.key_name, "synthetic key added");
            added += 1;
        }
        added + self.visit_members(node)
    }

    fn visit_members(&self, node: &mut SchemaNode) -> usize {
        let threshold = self.embed_threshold;
        node.properties
            .iter_mut()
            .map(|prop| {
                let child = &mut prop.node;
                if child.is_object() {
                    if child.property_count() <= threshold {
                        self.visit_members(child)
                    } else {
                        self.visit_shape(child)
                    }
                } else if child.is_array() {
                    child
                        .items
                        .as_deref_mut()
                        .map(|items| self.visit_shape(items))
                        .unwrap_or(0)
                } else {
                    0
                }
            })
            .sum()
    }

    fn synthetic_property(&self, parent_pointer: &str) -> Property {
        let mut node = SchemaNode::scalar(
            format!("{}/properties/{}", parent_pointer, pointer_token(self.key_name)),
            TypeSet::new(Primitive::Integer, false),
        );
        node.minimum = Some(DEFAULT_MIN_INCLUSIVE as f64);
        node.maximum = Some(DEFAULT_MAX_EXCLUSIVE as f64);
        node.synthetic = true;
        Property {
            name: self.key_name.to_string(),
            node,
        }
    }
}
