use bindery_wire::FormTree;

use crate::support::{record_kind_or_exit, registry_or_exit, split_pair};

pub fn run(record: String, params: Vec<String>, query: Option<String>) {
    let kind = record_kind_or_exit(&record);
    let registry = registry_or_exit();

    let mut tree = FormTree::new();
    for raw in &params {
        let (key, value) = split_pair(raw);
        tree.insert(key, value);
    }
    if let Some(query) = query {
        tree.extend_query(&query);
    }

    match kind.bind_json(&registry, &tree) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: failed to bind `{kind}`: {e}");
            std::process::exit(1);
        }
    }
}
