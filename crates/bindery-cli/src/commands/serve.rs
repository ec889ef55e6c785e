use bindery_bookstore::{App, BookstoreConfig, ROUTES, serve, serve_listener};
use bindery_store::StoreLock;
use std::net::TcpListener;
use std::process;

pub fn run(mut config: BookstoreConfig, bind: Option<String>, max_requests: Option<usize>) {
    if let Some(bind) = bind {
        config.bind = bind.parse().unwrap_or_else(|e| {
            eprintln!("error: invalid --bind address `{bind}`: {e}");
            process::exit(1);
        });
    }

    if let Err(e) = serve_locked(&config, max_requests) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

// The data directory stays locked for the server's lifetime.
fn serve_locked(config: &BookstoreConfig, max_requests: Option<usize>) -> Result<(), String> {
    let _lock = StoreLock::acquire(&config.data_dir).map_err(|e| e.to_string())?;
    let mut app = App::open(config)
        .map_err(|e| format!("failed to open store {}: {e}", config.data_dir.display()))?;

    println!("bindery serve");
    println!("  bind: {}", config.bind);
    println!("  data: {}", config.data_dir.display());
    println!("  session ttl: {}s", config.session_ttl_secs);
    println!("  routes:");
    for route in ROUTES {
        println!("    GET|POST {route}");
    }

    let result = match max_requests {
        None => serve(&mut app, config.bind),
        Some(limit) => {
            let listener = TcpListener::bind(config.bind)
                .map_err(|e| format!("failed to bind {}: {e}", config.bind))?;
            serve_listener(&mut app, &listener, Some(limit))
        }
    };
    result.map_err(|e| format!("server failed: {e}"))
}
