use bindery_bookstore::RecordKind;
use serde_json::{Value, json};

use crate::support::{print_json_or_exit, registry_or_exit, yes_no};

pub fn run(json_output: bool) {
    let registry = registry_or_exit();
    let mut rows = Vec::with_capacity(RecordKind::ALL.len());
    for kind in RecordKind::ALL {
        let outline = kind.outline(&registry).unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        });
        rows.push((kind, outline.scalar_paths().len()));
    }

    if json_output {
        let items: Vec<Value> = rows
            .iter()
            .map(|(kind, fields)| {
                json!({
                    "record": kind.name(),
                    "collection": kind.collection(),
                    "fields": fields,
                })
            })
            .collect();
        print_json_or_exit(&Value::Array(items));
        return;
    }

    println!("bindery records");
    for (kind, fields) in rows {
        println!(
            "  {kind}: {fields} fields, stored: {}",
            yes_no(kind.collection().is_some())
        );
    }
}
