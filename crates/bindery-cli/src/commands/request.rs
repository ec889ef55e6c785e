use bindery_bookstore::{App, BookstoreConfig, Request, Response};
use bindery_store::StoreLock;
use chrono::Utc;
use serde_json::{Map, Value, json};

use crate::support::{print_json_or_exit, split_pair};

pub fn run(
    config: &BookstoreConfig,
    target: String,
    cookies: Vec<String>,
    body: Option<String>,
    json_output: bool,
) {
    let mut request =
        Request::get(&target).with_cookies(cookies.iter().map(|raw| split_pair(raw)));
    if let Some(body) = body {
        request.method = "POST".to_string();
        request.headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        request.body = body;
    }

    let response = exchange(config, &request).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if json_output {
        let cookies: Map<String, Value> = response
            .cookies
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        let body: Value = serde_json::from_str(&response.body)
            .unwrap_or_else(|_| Value::String(response.body.clone()));
        print_json_or_exit(&json!({
            "status": response.status,
            "cookies": cookies,
            "body": body,
        }));
    } else {
        for (name, value) in &response.cookies {
            eprintln!("cookie: {name}={value}");
        }
        println!("{}", response.body);
    }

    if response.status >= 400 {
        std::process::exit(1);
    }
}

// The lock is released on return, before any exit.
fn exchange(config: &BookstoreConfig, request: &Request) -> Result<Response, String> {
    let _lock = StoreLock::acquire(&config.data_dir).map_err(|e| e.to_string())?;
    let mut app = App::open(config)
        .map_err(|e| format!("failed to open store {}: {e}", config.data_dir.display()))?;
    Ok(app.handle(request, Utc::now()))
}
