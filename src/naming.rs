//! Name Transformation
//!
//! Turns schema property names into canonical identifiers:
//! - Alias substitution (configured regex rewrites, applied in order)
//! - UPPER_SNAKE conversion (`productId` -> `PRODUCT_ID`)
//! - Namespaced shape and property ids (`shape:PR_PRODUCT`, `alias:NAME`)
//! - JSON-path remarks derived from `$id` pointers
//!
//! Shape ids are built from the last two path components only, so distinct
//! schema positions can collide. `ShapeNamer` resolves collisions by widening
//! the component window for later positions.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::config::AliasRule;
use crate::error::{Result, ShapeError};

/// Namespace marker for shape identifiers
pub const SHAPE_NAMESPACE: &str = "shape:";

/// Namespace marker for property identifiers
pub const PROPERTY_NAMESPACE: &str = "alias:";

/// Separator between path components inside one identifier
pub const COMPONENT_SEPARATOR: &str = "__";

/// Default number of trailing path components in a shape id
pub const SHAPE_ID_WINDOW: usize = 2;

static CAPITALIZED_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"));

static LOWER_TO_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

#[derive(Debug, Clone)]
struct CompiledAlias {
    pattern: Regex,
    replacement: String,
}

/// Applies alias rules and naming conventions to identifiers
#[derive(Debug, Clone, Default)]
pub struct NameTransformer {
    aliases: Vec<CompiledAlias>,
}

impl NameTransformer {
    /// Compile alias rules. Fails on the first invalid pattern.
    pub fn new(rules: &[AliasRule]) -> Result<Self> {
        let aliases = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|pattern| CompiledAlias {
                        pattern,
                        replacement: rule.replacement.clone(),
                    })
                    .map_err(|source| ShapeError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { aliases })
    }

    /// Apply every alias rule in sequence
    pub fn apply_aliases(&self, name: &str) -> String {
        let mut result = name.to_string();
        for alias in &self.aliases {
            result = alias
                .pattern
                .replace_all(&result, alias.replacement.as_str())
                .into_owned();
        }
        result
    }

    /// Convert a name to UPPER_SNAKE, after alias substitution
    pub fn convert(&self, name: &str) -> String {
        let aliased = self.apply_aliases(name);
        let split = CAPITALIZED_SEGMENT.replace_all(&aliased, "${1}_${2}");
        LOWER_TO_UPPER
            .replace_all(&split, "${1}_${2}")
            .to_uppercase()
    }

    /// Shape id from the trailing `window` path components
    pub fn shape_id_with_window(
        &self,
        prefix: Option<&str>,
        components: &[String],
        window: usize,
    ) -> String {
        let start = components.len().saturating_sub(window.max(1));
        let local = self.join(&components[start..]);
        match prefix {
            Some(prefix) => format!("{}{}_{}", SHAPE_NAMESPACE, self.convert(prefix), local),
            None => format!("{}{}", SHAPE_NAMESPACE, local),
        }
    }

    /// Shape id from the last two path components
    pub fn build_shape_id(&self, prefix: Option<&str>, components: &[String]) -> String {
        self.shape_id_with_window(prefix, components, SHAPE_ID_WINDOW)
    }

    /// Property id for a (possibly compound) property path
    pub fn property_id(&self, path: &[String]) -> String {
        format!("{}{}", PROPERTY_NAMESPACE, self.join(path))
    }

    /// Foreign key property id referencing a parent shape
    pub fn foreign_key_id(&self, parent_local_name: &str) -> String {
        format!("{}{}_FK", PROPERTY_NAMESPACE, self.convert(parent_local_name))
    }

    fn join(&self, components: &[String]) -> String {
        components
            .iter()
            .map(|c| self.convert(c))
            .collect::<Vec<_>>()
            .join(COMPONENT_SEPARATOR)
    }
}

/// Rewrite a JSON-Pointer style path identifier into a JSON path.
///
/// `/properties/items/items/properties/sku` becomes `$.items[*].sku`.
/// Anything up to a `#` (a document URI) is dropped first. The token after
/// `properties` is always a property name, so a property called `items`
/// stays a name.
pub fn json_path(path_id: &str) -> String {
    let pointer = path_id
        .split_once('#')
        .map(|(_, fragment)| fragment)
        .unwrap_or(path_id);

    let mut path = String::from("$");
    let mut tokens = pointer.split('/').filter(|t| !t.is_empty());
    while let Some(token) = tokens.next() {
        match token {
            "properties" => {
                if let Some(name) = tokens.next() {
                    path.push('.');
                    path.push_str(&unescape_token(name));
                }
            }
            "items" => path.push_str("[*]"),
            other => {
                path.push('.');
                path.push_str(&unescape_token(other));
            }
        }
    }
    path
}

/// Escape a property name for use as one JSON Pointer token
pub fn pointer_token(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Hands out unique shape ids, widening the component window on collision
#[derive(Debug)]
pub struct ShapeNamer<'a> {
    names: &'a NameTransformer,
    prefix: Option<&'a str>,
    used: HashSet<String>,
}

impl<'a> ShapeNamer<'a> {
    pub fn new(names: &'a NameTransformer, prefix: Option<&'a str>) -> Self {
        Self {
            names,
            prefix,
            used: HashSet::new(),
        }
    }

    /// Assign an id for the shape at `components`.
    ///
    /// Earlier positions keep the short name; later colliding positions take
    /// more components, then a numeric suffix once the full path is used up.
    pub fn assign(&mut self, components: &[String]) -> String {
        let mut window = SHAPE_ID_WINDOW;
        loop {
            let candidate = self.names.shape_id_with_window(self.prefix, components, window);
            if self.used.insert(candidate.clone()) {
                if window > SHAPE_ID_WINDOW {
                    tracing::warn!(shape = %candidate, "shape id collision resolved by widening");
                }
                return candidate;
            }
            if window >= components.len() {
                break;
            }
            window += 1;
        }

        let base = self.names.shape_id_with_window(self.prefix, components, window);
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.used.insert(candidate.clone()) {
                tracing::warn!(shape = %candidate, "shape id collision resolved by suffix");
                return candidate;
            }
            n += 1;
        }
    }
}
