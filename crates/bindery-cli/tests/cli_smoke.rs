use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "bindery-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn data_dir(&self) -> PathBuf {
        self.path.join("data")
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

// Runs inside `cwd` so a stray `bindery.toml` elsewhere is never picked up.
fn run_bindery<I, S>(cwd: &Path, args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_bindery");
    Command::new(bin)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("bindery command should execute")
}

fn run_in(tmp: &TempDirGuard, args: &[&str]) -> Output {
    let data_dir = tmp.data_dir();
    let mut full: Vec<&OsStr> = vec![OsStr::new("--data-dir"), data_dir.as_os_str()];
    full.extend(args.iter().map(OsStr::new));
    run_bindery(tmp.path(), full)
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn cookie_args(response: &Value) -> Vec<String> {
    response["cookies"]
        .as_object()
        .expect("cookies object")
        .iter()
        .map(|(name, value)| format!("{name}={}", value.as_str().expect("cookie value")))
        .collect()
}

#[test]
fn records_lists_every_record_kind() {
    let tmp = TempDirGuard::new("records");
    let output = run_in(&tmp, &["records", "--json"]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    let items = payload.as_array().expect("array");
    assert_eq!(items.len(), 14);
    let book = items
        .iter()
        .find(|item| item["record"] == "Book")
        .expect("Book listed");
    assert_eq!(book["collection"], "book");
    assert_eq!(book["fields"], 9);
    let args = items
        .iter()
        .find(|item| item["record"] == "BuyArgs")
        .expect("BuyArgs listed");
    assert_eq!(args["collection"], Value::Null);
}

#[test]
fn schema_prints_declared_field_order() {
    let tmp = TempDirGuard::new("schema");
    let output = run_in(&tmp, &["schema", "session", "--json"]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["record"], "Session");
    let names: Vec<&str> = payload["fields"]
        .as_array()
        .expect("fields")
        .iter()
        .map(|field| field["name"].as_str().expect("name"))
        .collect();
    assert_eq!(
        names,
        vec![
            "_id",
            "key",
            "user",
            "cart",
            "referrer",
            "logged_in",
            "date_create"
        ]
    );
    assert_eq!(payload["fields"][2]["type"], "string?");

    let text = run_in(&tmp, &["schema", "Book"]);
    assert_success(&text);
    let text = stdout_text(&text);
    assert!(text.starts_with("Book\n"), "{text}");
    assert!(text.contains("  details: BookDetails\n    isbn: string\n"), "{text}");
}

#[test]
fn bind_fills_defaults_and_absorbs_bad_values() {
    let tmp = TempDirGuard::new("bind");
    let output = run_in(
        &tmp,
        &["bind", "BuyArgs", "--param", "book_id=dune", "--param", "count=lots"],
    );
    assert_success(&output);
    assert_eq!(stdout_text(&output).trim(), r#"{"book_id":"dune","count":1}"#);

    let nested = run_in(
        &tmp,
        &[
            "bind",
            "book",
            "--param",
            "details[isbn]=978-0",
            "--query",
            "title=Dune%20Messiah&stock=3",
        ],
    );
    assert_success(&nested);
    let payload = parse_json_stdout(&nested);
    assert_eq!(payload["title"], "Dune Messiah");
    assert_eq!(payload["stock"], 3);
    assert_eq!(payload["details"]["isbn"], "978-0");
}

#[test]
fn unknown_record_is_rejected() {
    let tmp = TempDirGuard::new("unknown");
    let output = run_in(&tmp, &["schema", "Invoice"]);
    assert_failure(&output);
    assert!(stderr_text(&output).contains("unknown record `Invoice`"));
}

#[test]
fn seed_then_show_reads_stored_records() {
    let tmp = TempDirGuard::new("seed-show");
    let seeded = run_in(&tmp, &["seed", "--json"]);
    assert_success(&seeded);
    let summary = parse_json_stdout(&seeded);
    assert_eq!(summary["books"], 3);
    assert!(tmp.data_dir().join("book.bson").exists());
    assert!(!tmp.data_dir().join(".lock").exists());

    let shown = run_in(&tmp, &["show", "book", "dune"]);
    assert_success(&shown);
    let book = parse_json_stdout(&shown);
    assert_eq!(book["title"], "Dune");
    assert_eq!(book["stock"], 5);
    assert_eq!(book["details"]["published"], "1965-08-01T00:00:00Z");

    let missing = run_in(&tmp, &["show", "book", "nope"]);
    assert_failure(&missing);
    assert!(stderr_text(&missing).contains("document not found: book/nope"));

    let not_stored = run_in(&tmp, &["show", "BuyArgs", "x"]);
    assert_failure(&not_stored);
}

#[test]
fn seed_refuses_a_held_lock() {
    let tmp = TempDirGuard::new("lock");
    fs::create_dir_all(tmp.data_dir()).expect("data dir");
    fs::write(tmp.data_dir().join(".lock"), "pid=1\n").expect("lock");

    let output = run_in(&tmp, &["seed"]);
    assert_failure(&output);
    assert!(stderr_text(&output).contains("store lock busy"));
}

#[test]
fn request_and_serve_refuse_a_held_lock() {
    let tmp = TempDirGuard::new("request-lock");
    assert_success(&run_in(&tmp, &["seed"]));
    fs::write(tmp.data_dir().join(".lock"), "pid=1\n").expect("lock");

    let request = run_in(&tmp, &["request", "/book?book_id=dune"]);
    assert_failure(&request);
    assert!(stderr_text(&request).contains("store lock busy"));

    let serve = run_in(&tmp, &["serve", "--bind", "127.0.0.1:0", "--max-requests", "1"]);
    assert_failure(&serve);
    assert!(stderr_text(&serve).contains("store lock busy"));
    assert!(tmp.data_dir().join(".lock").exists());
}

#[test]
fn request_flow_logs_in_and_buys() {
    let tmp = TempDirGuard::new("flow");
    assert_success(&run_in(&tmp, &["seed"]));

    let first = run_in(&tmp, &["request", "/book?book_id=dune", "--json"]);
    assert_success(&first);
    let first = parse_json_stdout(&first);
    assert_eq!(first["status"], 200);
    let cookies = cookie_args(&first);
    assert_eq!(cookies.len(), 2);

    let mut login_args = vec!["request", "/login", "--json"];
    for cookie in &cookies {
        login_args.extend(["--cookie", cookie.as_str()]);
    }
    login_args.extend(["--body", "user_id=alice&email=alice%40example.com"]);
    let login = run_in(&tmp, &login_args);
    assert_success(&login);
    let login = parse_json_stdout(&login);
    assert_eq!(login["body"]["logged_in"], true);
    assert_eq!(cookie_args(&login), cookies);

    let mut buy_args = vec!["request", "/buy?book_id=dune&count=2", "--json"];
    for cookie in &cookies {
        buy_args.extend(["--cookie", cookie.as_str()]);
    }
    let buy = run_in(&tmp, &buy_args);
    assert_success(&buy);
    assert_eq!(parse_json_stdout(&buy)["body"]["stock"], 3);

    let shown = run_in(&tmp, &["show", "book", "dune"]);
    assert_success(&shown);
    assert_eq!(parse_json_stdout(&shown)["stock"], 3);
}

#[test]
fn request_failures_exit_nonzero_with_an_error_body() {
    let tmp = TempDirGuard::new("request-fail");
    assert_success(&run_in(&tmp, &["seed"]));

    let output = run_in(&tmp, &["request", "/buy?book_id=dune"]);
    assert_failure(&output);
    let body = parse_json_stdout(&output);
    assert_eq!(body["status"], 403);
    assert!(!tmp.data_dir().join(".lock").exists());
}

#[test]
fn invalid_config_is_reported() {
    let tmp = TempDirGuard::new("config");
    let config = tmp.path().join("custom.toml");
    fs::write(&config, "session_ttl_secs = 0\n").expect("config");

    let output = run_bindery(
        tmp.path(),
        ["--config", config.to_str().expect("utf-8 path"), "records"],
    );
    assert_failure(&output);
    assert!(stderr_text(&output).contains("session_ttl_secs must be positive"));

    let missing = run_bindery(tmp.path(), ["--config", "absent.toml", "records"]);
    assert_failure(&missing);
}
