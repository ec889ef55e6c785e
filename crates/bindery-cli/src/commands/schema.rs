use bindery_core::{Outline, OutlineShape};
use serde_json::{Value, json};

use crate::support::{print_json_or_exit, record_kind_or_exit, registry_or_exit};

pub fn run(record: String, json_output: bool) {
    let kind = record_kind_or_exit(&record);
    let registry = registry_or_exit();
    let outline = kind.outline(&registry).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if json_output {
        print_json_or_exit(&outline_json(&outline));
        return;
    }

    println!("{}", outline.record);
    print_fields(&outline, 1);
}

fn outline_json(outline: &Outline) -> Value {
    let fields: Vec<Value> = outline
        .fields
        .iter()
        .map(|field| match &field.shape {
            OutlineShape::Scalar(ty) => json!({
                "name": field.name,
                "type": ty.to_string(),
            }),
            OutlineShape::Nested(inner) => json!({
                "name": field.name,
                "record": outline_json(inner),
            }),
        })
        .collect();
    json!({
        "record": outline.record,
        "fields": fields,
    })
}

fn print_fields(outline: &Outline, depth: usize) {
    let indent = "  ".repeat(depth);
    for field in &outline.fields {
        match &field.shape {
            OutlineShape::Scalar(ty) => println!("{indent}{}: {ty}", field.name),
            OutlineShape::Nested(inner) => {
                println!("{indent}{}: {}", field.name, inner.record);
                print_fields(inner, depth + 1);
            }
        }
    }
}
