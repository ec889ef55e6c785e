use bindery_bookstore::BookstoreConfig;
use bindery_store::DocumentStore;

use crate::support::{record_kind_or_exit, registry_or_exit};

pub fn run(config: &BookstoreConfig, record: String, id: String) {
    let kind = record_kind_or_exit(&record);
    let registry = registry_or_exit();
    let store = DocumentStore::open(&config.data_dir).unwrap_or_else(|e| {
        eprintln!(
            "error: failed to open store {}: {e}",
            config.data_dir.display()
        );
        std::process::exit(1);
    });

    match kind.show_json(&registry, &store, &id) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
