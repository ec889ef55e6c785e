use bindery_bookstore::{BookstoreConfig, RecordKind, register_records};
use bindery_core::SchemaRegistry;
use serde_json::Value;
use std::path::PathBuf;

pub fn load_config_or_exit(path: &str, data_dir: Option<&str>) -> BookstoreConfig {
    let mut config = BookstoreConfig::load(path).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    if let Some(dir) = data_dir {
        config.data_dir = PathBuf::from(dir);
    }
    config
}

pub fn record_kind_or_exit(name: &str) -> RecordKind {
    RecordKind::from_name(name).unwrap_or_else(|| {
        let known: Vec<&str> = RecordKind::ALL.iter().map(|kind| kind.name()).collect();
        eprintln!(
            "error: unknown record `{name}` (known: {})",
            known.join(", ")
        );
        std::process::exit(1);
    })
}

/// A sealed registry holding every bookstore record.
pub fn registry_or_exit() -> SchemaRegistry {
    let registry = SchemaRegistry::new();
    register_records(&registry).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    registry.seal();
    registry
}

/// Split `KEY=VALUE`; a missing `=` binds the empty string.
pub fn split_pair(raw: &str) -> (&str, &str) {
    raw.split_once('=').unwrap_or((raw, ""))
}

pub fn print_json_or_exit(payload: &Value) {
    let rendered = serde_json::to_string_pretty(payload).unwrap_or_else(|e| {
        eprintln!("error: failed to render json: {e}");
        std::process::exit(1);
    });
    println!("{rendered}");
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
