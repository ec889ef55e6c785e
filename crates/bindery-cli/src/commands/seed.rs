use bindery_bookstore::{BookstoreConfig, seed_store};
use bindery_store::mutate_store;
use chrono::Utc;
use serde_json::json;

use crate::support::{print_json_or_exit, registry_or_exit};

pub fn run(config: &BookstoreConfig, json_output: bool) {
    let registry = registry_or_exit();
    let summary = mutate_store(&config.data_dir, |store| {
        let summary = seed_store(&registry, store, Utc::now())?;
        Ok((summary, true))
    })
    .unwrap_or_else(|e| {
        eprintln!("error: failed to seed {}: {e}", config.data_dir.display());
        std::process::exit(1);
    });

    if json_output {
        print_json_or_exit(&json!({
            "dataDir": config.data_dir.display().to_string(),
            "cats": summary.cats,
            "books": summary.books,
            "users": summary.users,
        }));
        return;
    }

    println!("bindery seed");
    println!("  data: {}", config.data_dir.display());
    println!("  cats: {}", summary.cats);
    println!("  books: {}", summary.books);
    println!("  users: {}", summary.users);
}
