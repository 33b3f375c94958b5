//! End-to-end flattening tests
//!
//! Runs fixture schemas through ingestion, key injection and flattening and
//! checks the resulting record sequences.

use std::collections::HashSet;

use schema_shapes::{
    check_model, flatten_file, flatten_schema, flatten_value, render_plantuml, Checksum, FlattenOptions,
    SchemaNode, ShapeError, ShapeModel, ShapesConfig, SheetFormat, Stereotype, SyntheticKeyInjector, ValueType,
    Workbook,
};
use serde_json::{json, Value};

fn fixture(content: &str) -> Value {
    serde_json::from_str(content).unwrap()
}

fn product_options() -> FlattenOptions {
    FlattenOptions::new("Product").with_prefix("pr")
}

fn order_config() -> ShapesConfig {
    let mut config = ShapesConfig::default();
    config.general.base = Some("Order".into());
    config.general.prefix = Some("or".into());
    config.primary_keys.insert("Order".into(), "orderNumber".into());
    config
}

fn order_model() -> ShapeModel {
    let options = order_config().flatten_options().unwrap();
    flatten_value(&fixture(include_str!("fixtures/order.json")), &options).unwrap()
}

fn objects(count: usize) -> Value {
    let properties: serde_json::Map<String, Value> = (0..count)
        .map(|i| (format!("field{}", i), json!({"type": "string"})))
        .collect();
    json!({"type": "object", "properties": properties})
}

// =============================================================================
// Worked examples
// =============================================================================

#[test]
fn test_product_end_to_end() {
    let model = flatten_value(&fixture(include_str!("fixtures/product.json")), &product_options()).unwrap();

    assert_eq!(model.root_shape_id, "shape:PR_PRODUCT");
    assert_eq!(model.len(), 2);

    let id = model.find("shape:PR_PRODUCT", "alias:ID").unwrap();
    assert_eq!(id.stereotype, Some(Stereotype::PrimaryKey));
    assert_eq!(id.value_type, ValueType::Integer);
    assert_eq!(id.min_count, 1);
    assert_eq!(id.remarks.as_deref(), Some("$.id"));

    let name = model.find("shape:PR_PRODUCT", "alias:NAME").unwrap();
    assert_eq!(name.value_type, ValueType::String);
    assert_eq!(name.max_length, Some(50));
    assert_eq!(name.min_count, 0);
    assert_eq!(name.stereotype, None);
    assert_eq!(name.min_inclusive, None);
}

#[test]
fn test_product_variants_promotion() {
    let model = flatten_value(
        &fixture(include_str!("fixtures/product_variants.json")),
        &product_options(),
    )
    .unwrap();

    assert_eq!(model.shape_ids(), vec!["shape:PR_PRODUCT", "shape:PR_PRODUCT__VARIANTS"]);

    let pk = model.find("shape:PR_PRODUCT", "alias:ID").unwrap();
    let variants: Vec<_> = model.records_for("shape:PR_PRODUCT__VARIANTS").collect();

    let fks: Vec<_> = variants.iter().filter(|r| r.is(Stereotype::ForeignKey)).collect();
    assert_eq!(fks.len(), 1);
    let fk = fks[0];
    assert_eq!(fk.property_id, "alias:PRODUCT_FK");
    assert_eq!(fk.value_type, pk.value_type);
    assert_eq!(fk.min_inclusive, pk.min_inclusive);
    assert_eq!(fk.max_exclusive, pk.max_exclusive);
    assert_eq!(fk.min_inclusive, Some(1));
    assert_eq!(fk.max_exclusive, Some(99_999_999));
    assert_eq!(fk.remarks.as_deref(), Some("shape:PR_PRODUCT.alias:ID"));

    let order_index = model.find("shape:PR_PRODUCT__VARIANTS", "alias:ORDER_INDEX").unwrap();
    assert_eq!(order_index.value_type, ValueType::Integer);
    assert_eq!(order_index.stereotype, None);

    let data: Vec<_> = variants
        .iter()
        .filter(|r| r.stereotype.is_none() && r.property_id != model.order_index_id)
        .map(|r| r.property_id.as_str())
        .collect();
    assert_eq!(data, vec!["alias:SKU", "alias:COLOR", "alias:PRICE"]);

    let color = model.find("shape:PR_PRODUCT__VARIANTS", "alias:COLOR").unwrap();
    assert_eq!(color.remarks.as_deref(), Some("$.variants[*].color"));
    assert_eq!(color.min_count, 0);
}

// =============================================================================
// Structural invariants
// =============================================================================

#[test]
fn test_embedding_threshold_boundary() {
    let schema = json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "small": objects(10),
            "large": objects(11)
        }
    });
    let model = flatten_value(&schema, &product_options()).unwrap();

    assert!(model.find("shape:PR_PRODUCT", "alias:SMALL__FIELD0").is_some());
    assert_eq!(
        model.shape_ids(),
        vec!["shape:PR_PRODUCT", "shape:PR_PRODUCT__LARGE"]
    );

    let large: Vec<_> = model.records_for("shape:PR_PRODUCT__LARGE").collect();
    assert_eq!(large.iter().filter(|r| r.is(Stereotype::ForeignKey)).count(), 1);
    assert!(large.iter().all(|r| r.property_id != model.order_index_id));
}

#[test]
fn test_custom_threshold_promotes_smaller_objects() {
    let schema = json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "dims": {"type": "object", "properties": {
                "w": {"type": "number"}, "h": {"type": "number"}, "d": {"type": "number"}
            }}
        }
    });
    let model = flatten_value(&schema, &product_options().with_embed_threshold(2)).unwrap();
    assert!(model.shape_ids().contains(&"shape:PR_PRODUCT__DIMS"));
}

#[test]
fn test_every_array_gets_one_child_shape() {
    let model = order_model();
    for shape in ["shape:OR_ORDER__ITEMS", "shape:OR_ORDER__NOTES"] {
        let records: Vec<_> = model.records_for(shape).collect();
        assert_eq!(records.iter().filter(|r| r.is(Stereotype::ForeignKey)).count(), 1, "{}", shape);
        assert_eq!(
            records.iter().filter(|r| r.property_id == model.order_index_id).count(),
            1,
            "{}",
            shape
        );
    }
}

#[test]
fn test_shape_rows_are_contiguous() {
    let model = order_model();
    let mut finished = HashSet::new();
    let mut current = "";
    for record in &model.records {
        if record.shape_id != current {
            assert!(finished.insert(current.to_string()), "shape {} reopened", record.shape_id);
            assert!(!finished.contains(&record.shape_id), "shape {} reopened", record.shape_id);
            current = record.shape_id.as_str();
        }
    }
    assert_eq!(
        model.shape_ids(),
        vec![
            "shape:OR_ORDER",
            "shape:OR_ORDER__CUSTOMER",
            "shape:OR_ORDER__ITEMS",
            "shape:OR_ORDER__NOTES"
        ]
    );
}

#[test]
fn test_nullability_maps_to_min_count() {
    let model = order_model();
    let expectations = [
        ("shape:OR_ORDER", "alias:PLACED_AT", 0),
        ("shape:OR_ORDER", "alias:TOTAL", 1),
        ("shape:OR_ORDER", "alias:SHIPPING__ADDRESS__ZIP", 0),
        ("shape:OR_ORDER", "alias:SHIPPING__ADDRESS__CITY", 1),
        ("shape:OR_ORDER__CUSTOMER", "alias:PHONE", 0),
        ("shape:OR_ORDER__NOTES", "alias:NOTES", 0),
    ];
    for (shape, property, min_count) in expectations {
        let record = model.find(shape, property).unwrap_or_else(|| panic!("{} {}", shape, property));
        assert_eq!(record.min_count, min_count, "{} {}", shape, property);
        assert_eq!(record.max_count, 1);
    }
}

#[test]
fn test_synthetic_key_completeness() {
    let model = order_model();
    for shape in model.shape_ids() {
        let records: Vec<_> = model.records_for(shape).collect();
        let has_id = records.iter().any(|r| r.property_id == "alias:ID");
        let synthetic: Vec<_> = records.iter().filter(|r| r.is(Stereotype::SyntheticKey)).collect();
        if has_id {
            assert!(synthetic.is_empty(), "{}", shape);
        } else {
            assert_eq!(synthetic.len(), 1, "{}", shape);
            let key = synthetic[0];
            assert_eq!(key.property_id, "alias:STAGE_ID");
            assert_eq!(key.value_type, ValueType::Integer);
            assert_eq!(key.min_inclusive, Some(0));
            assert_eq!(key.max_exclusive, Some(4_294_967_295));
            assert_eq!(key.remarks, None);
        }
    }
}

#[test]
fn test_json_path_remarks() {
    let model = order_model();
    let remark = |shape: &str, property: &str| model.find(shape, property).unwrap().remarks.clone().unwrap();

    assert_eq!(remark("shape:OR_ORDER", "alias:SHIPPING__ADDRESS__CITY"), "$.shipping.address.city");
    assert_eq!(remark("shape:OR_ORDER__ITEMS", "alias:SKU"), "$.items[*].sku");
    assert_eq!(remark("shape:OR_ORDER__NOTES", "alias:NOTES"), "$.notes[*]");
}

#[test]
fn test_object_named_items_keeps_its_name_in_remarks() {
    let schema = json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "items": {"type": "object", "properties": {"x": {"type": "string"}}},
            "a/b": {"type": "string"}
        }
    });
    let model = flatten_value(&schema, &product_options()).unwrap();
    let remark = |property: &str| model.find("shape:PR_PRODUCT", property).unwrap().remarks.clone().unwrap();

    assert_eq!(remark("alias:ITEMS__X"), "$.items.x");
    assert_eq!(remark("alias:A/B"), "$.a/b");
}

// =============================================================================
// Inference through the full pipeline
// =============================================================================

#[test]
fn test_order_inference() {
    let model = order_model();
    let root = "shape:OR_ORDER";

    let pk = model.find(root, "alias:ORDER_NUMBER").unwrap();
    assert_eq!(pk.stereotype, Some(Stereotype::PrimaryKey));
    assert_eq!(pk.max_length, Some(20));
    assert_eq!(pk.comment.as_deref(), Some("Customer-facing order number"));

    assert_eq!(model.find(root, "alias:PLACED_AT").unwrap().value_type, ValueType::DateTime);
    assert_eq!(model.find(root, "alias:PLACED_AT").unwrap().max_length, None);
    assert_eq!(model.find(root, "alias:TOTAL").unwrap().value_type, ValueType::Decimal);

    let quantity = model.find(root, "alias:QUANTITY").unwrap();
    assert_eq!(quantity.value_type, ValueType::Integer);
    assert_eq!(quantity.min_inclusive, Some(0));
    assert_eq!(quantity.max_exclusive, Some(4_294_967_295));

    for fallback in ["alias:GIFT_WRAP", "alias:CHANNEL", "alias:SHIPPING__METHOD"] {
        let record = model.find(root, fallback).unwrap();
        assert_eq!(record.value_type, ValueType::String, "{}", fallback);
        assert_eq!(record.max_length, Some(150), "{}", fallback);
    }

    let qty = model.find("shape:OR_ORDER__ITEMS", "alias:QTY").unwrap();
    assert_eq!(qty.min_inclusive, Some(1));

    let notes = model.find("shape:OR_ORDER__NOTES", "alias:NOTES").unwrap();
    assert_eq!(notes.max_length, Some(500));
}

#[test]
fn test_configured_primary_key_types_foreign_keys() {
    let model = order_model();
    let fk = model.find("shape:OR_ORDER__CUSTOMER", "alias:ORDER_FK").unwrap();
    assert_eq!(fk.remarks.as_deref(), Some("shape:OR_ORDER.alias:ORDER_NUMBER"));
    assert_eq!(fk.value_type, ValueType::String);
    assert_eq!(fk.max_length, Some(20));
    assert_eq!(fk.min_count, 1);

    let customer_id = model.find("shape:OR_ORDER__CUSTOMER", "alias:ID").unwrap();
    assert_eq!(customer_id.stereotype, Some(Stereotype::PrimaryKey));
}

// =============================================================================
// Naming
// =============================================================================

#[test]
fn test_colliding_shape_ids_are_widened() {
    let schema = json!({
        "type": "object",
        "properties": {
            "a": {"type": "object", "properties": {
                "b": {"type": "array", "items": {"type": "string"}}
            }},
            "x": {"type": "array", "items": {"type": "object", "properties": {
                "a": {"type": "object", "properties": {
                    "b": {"type": "array", "items": {"type": "string"}}
                }}
            }}}
        }
    });
    let model = flatten_value(&schema, &FlattenOptions::new("Root")).unwrap();
    let ids = model.shape_ids();
    assert!(ids.contains(&"shape:A__B"));
    assert!(ids.contains(&"shape:X__A__B"));

    let inner = model.find("shape:X__A__B", "alias:B").unwrap();
    assert_eq!(inner.remarks.as_deref(), Some("$.x[*].a.b[*]"));
    assert_eq!(ids.len(), ids.iter().collect::<HashSet<_>>().len());
}

#[test]
fn test_alias_rules_apply_to_every_identifier() {
    let mut config = ShapesConfig::default();
    config.general.base = Some("Product".into());
    config.aliases.push(schema_shapes::AliasRule {
        pattern: "Identifier".into(),
        replacement: "Id".into(),
    });
    let options = config.flatten_options().unwrap();

    let schema = json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "vendorIdentifier": {"type": "string"}
        }
    });
    let model = flatten_value(&schema, &options).unwrap();
    assert!(model.find("shape:PRODUCT", "alias:VENDOR_ID").is_some());
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_structure_errors_name_the_path() {
    let missing_items = json!({
        "type": "object",
        "properties": {"tags": {"type": "array"}}
    });
    let err = flatten_value(&missing_items, &product_options()).unwrap_err();
    assert!(err.is_structural());
    assert!(err.to_string().contains("#/properties/tags"));

    let missing_properties = json!({
        "type": "object",
        "properties": {"meta": {"type": "object"}}
    });
    let err = flatten_value(&missing_properties, &product_options()).unwrap_err();
    assert!(matches!(err, ShapeError::MissingProperties { ref path } if path == "#/properties/meta"));
}

#[test]
fn test_invalid_constraint_is_rejected() {
    let schema = json!({
        "type": "object",
        "properties": {"name": {"type": "string", "maxLength": "long"}}
    });
    let err = flatten_value(&schema, &product_options()).unwrap_err();
    assert!(matches!(err, ShapeError::InvalidConstraint { keyword: "maxLength", .. }));
}

#[test]
fn test_colliding_property_ids_are_rejected() {
    let schema = json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "address__city": {"type": "string"},
            "address": {"type": "object", "properties": {"city": {"type": "string"}}}
        }
    });
    let err = flatten_value(&schema, &product_options()).unwrap_err();
    assert!(err.is_structural());
    match err {
        ShapeError::DuplicateProperty { shape, property, first, second } => {
            assert_eq!(shape, "shape:PR_PRODUCT");
            assert_eq!(property, "alias:ADDRESS__CITY");
            assert_eq!(first, "$.address__city");
            assert_eq!(second, "$.address.city");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_key_edge_cases_pass_checks() {
    let object_id = json!({
        "type": "object",
        "properties": {
            "id": {"type": "object", "properties": {"value": {"type": "string"}}},
            "tags": {"type": "array", "items": {"type": "string"}}
        }
    });
    let options = product_options();
    let model = flatten_value(&object_id, &options).unwrap();
    assert!(check_model(&model, &options).is_clean());

    let fk = model.find("shape:PR_PRODUCT__TAGS", "alias:PRODUCT_FK").unwrap();
    assert_eq!(fk.value_type, ValueType::Integer);
    assert_eq!(fk.remarks.as_deref(), Some("shape:PR_PRODUCT.alias:STAGE_ID"));

    let reserved = json!({
        "type": "object",
        "properties": {"id": {"type": "integer"}, "stageId": {"type": "string"}}
    });
    let err = flatten_value(&reserved, &options).unwrap_err();
    assert!(matches!(err, ShapeError::ReservedProperty { .. }));
}

#[test]
fn test_missing_base_fails_before_traversal() {
    let err = ShapesConfig::default().flatten_options().unwrap_err();
    assert!(matches!(err, ShapeError::MissingConfig(_)));
    assert!(!err.is_structural());
}

// =============================================================================
// Determinism and adapters
// =============================================================================

#[test]
fn test_idempotent_output() {
    let first = order_model();
    let second = order_model();
    assert_eq!(first, second);
    assert_eq!(
        Checksum::from_model(&first).unwrap(),
        Checksum::from_model(&second).unwrap()
    );
}

#[test]
fn test_pre_injected_tree_flattens_identically() {
    let options = order_config().flatten_options().unwrap();
    let mut root = SchemaNode::from_value(&fixture(include_str!("fixtures/order.json")), options.max_depth).unwrap();
    let added = SyntheticKeyInjector::new(&options.synthetic_key_name, options.embed_threshold).inject(&mut root);
    assert_eq!(added, 2);

    let model = flatten_schema(root, &options).unwrap();
    assert!(Checksum::from_model(&order_model()).unwrap().matches(&model).unwrap());
}

#[test]
fn test_order_model_passes_checks() {
    let options = order_config().flatten_options().unwrap();
    let report = check_model(&order_model(), &options);
    assert!(report.is_clean(), "{:?}", report.errors);
    assert!(!report.has_warnings(), "{:?}", report.warnings);
}

#[test]
fn test_file_pipeline_writes_sheets_and_diagram() {
    let dir = tempfile::tempdir().unwrap();
    let schema_path = dir.path().join("order.json");
    std::fs::write(&schema_path, include_str!("fixtures/order.json")).unwrap();

    let config = order_config();
    let model = flatten_file(&schema_path, &config.flatten_options().unwrap()).unwrap();
    assert_eq!(model, order_model());

    let workbook = Workbook::build(&model, &config).unwrap();
    let files = workbook.write(&dir.path().join("out"), SheetFormat::Csv).unwrap();
    let shapes_csv = std::fs::read_to_string(&files[1]).unwrap();
    assert!(shapes_csv.contains("shape:OR_ORDER__NOTES"));
    assert_eq!(shapes_csv.lines().count(), 5);

    let uml = render_plantuml(&model);
    assert!(uml.contains("OR_ORDER --> \"0..1\" OR_ORDER__CUSTOMER : customer"));
    assert!(uml.contains("OR_ORDER --> \"0..*\" OR_ORDER__ITEMS : items"));
}
