//! PlantUML class diagram for a shape model

use crate::model::{ShapeModel, Stereotype};
use crate::naming::{COMPONENT_SEPARATOR, PROPERTY_NAMESPACE, SHAPE_NAMESPACE};

/// Render one class per shape plus a relation per parent link
pub fn render_plantuml(model: &ShapeModel) -> String {
    let mut output = String::new();
    output.push_str("@startuml\n");

    for shape in model.shapes() {
        let class = class_name(&shape.shape_id);
        output.push_str(&format!("class {} {{\n", class));
        for record in model.records_for(&shape.shape_id) {
            let name = record.property_id.trim_start_matches(PROPERTY_NAMESPACE);
            match record.stereotype {
                Some(stereotype) => output.push_str(&format!(
                    "\t{} : {} <<{}>>\n",
                    name,
                    record.value_type.label(),
                    marker(stereotype)
                )),
                None => output.push_str(&format!("\t{} : {}\n", name, record.value_type.label())),
            }
        }
        output.push_str("}\n");

        if let Some(parent) = &shape.parent {
            let multiplicity = if shape.from_array { "0..*" } else { "0..1" };
            let role = class.rsplit(COMPONENT_SEPARATOR).next().unwrap_or(&class);
            output.push_str(&format!(
                "{} --> \"{}\" {} : {}\n",
                class_name(parent),
                multiplicity,
                class,
                role.to_lowercase()
            ));
        }
        output.push('\n');
    }

    output.push_str("@enduml\n");
    output
}

fn class_name(shape_id: &str) -> String {
    shape_id.trim_start_matches(SHAPE_NAMESPACE).to_string()
}

fn marker(stereotype: Stereotype) -> &'static str {
    match stereotype {
        Stereotype::PrimaryKey => "PK",
        Stereotype::ForeignKey => "FK",
        Stereotype::SyntheticKey => "SK",
    }
}
