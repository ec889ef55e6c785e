use bindery_bookstore::records::{BOOK, BUY, SESSION};
use bindery_bookstore::{
    App, Book, BookstoreConfig, Buy, Request, Response, Session, seed_store, serve_listener,
};
use bindery_store::{DocumentStore, get_record};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::thread;
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
            "bindery-bookstore-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()
}

fn seeded_app() -> App {
    let mut app =
        App::new(&BookstoreConfig::default(), DocumentStore::in_memory()).expect("app builds");
    let registry = bindery_core::SchemaRegistry::new();
    seed_store(&registry, app.store_mut(), now()).expect("seed");
    app
}

fn json(response: &Response) -> Value {
    serde_json::from_str(&response.body).unwrap_or_else(|e| {
        panic!("body should be JSON ({e}): {}", response.body);
    })
}

fn cookie_request(target: &str, previous: &Response) -> Request {
    Request::get(target).with_cookies(previous.cookies.clone())
}

#[test]
fn book_lookup_renders_the_stored_record() {
    let mut app = seeded_app();
    let response = app.handle(&Request::get("/book?book_id=dune"), now());

    assert_eq!(response.status, 200);
    insta::assert_snapshot!(
        response.body,
        @r#"{"_id":"dune","title":"Dune","author":"Frank Herbert","cat_id":"scifi","price_cents":999,"stock":5,"details":{"isbn":"978-0441013593","publisher":"Chilton Books","published":"1965-08-01T00:00:00Z"}}"#
    );
    let names: Vec<&str> = response.cookies.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["bookstore_session_id", "bookstore_session_key"]);
}

#[test]
fn cat_page_nests_the_category_and_counts_books() {
    let mut app = seeded_app();
    let response = app.handle(&Request::get("/cat?cat_id=scifi"), now());
    assert_eq!(response.status, 200);
    insta::assert_snapshot!(
        response.body,
        @r#"{"cat":{"_id":"scifi","name":"Science Fiction","parent":"fiction"},"book_count":2}"#
    );

    let top = app.handle(&Request::get("/cat?cat_id=history"), now());
    assert_eq!(json(&top)["cat"]["parent"], Value::Null);
}

#[test]
fn missing_records_and_routes_are_404() {
    let mut app = seeded_app();
    let response = app.handle(&Request::get("/book?book_id=missing"), now());
    assert_eq!(response.status, 404);
    insta::assert_snapshot!(
        response.body,
        @r#"{"status":404,"error":"document not found: book/missing"}"#
    );
    assert_eq!(response.cookies.len(), 2);

    let unknown = app.handle(&Request::get("/nowhere"), now());
    assert_eq!(unknown.status, 404);
    assert!(unknown.cookies.is_empty());
    assert_eq!(json(&unknown)["error"], "unknown route: /nowhere");
}

#[test]
fn a_session_is_reused_across_requests() {
    let mut app = seeded_app();
    let first = app.handle(&Request::get("/book?book_id=dune"), now());
    let second = app.handle(
        &cookie_request("/book?book_id=spqr", &first),
        now() + Duration::minutes(5),
    );
    assert_eq!(second.cookies, first.cookies);

    let sessions = app.store().collection(SESSION).expect("sessions");
    assert_eq!(sessions.len(), 1);

    let expired = app.handle(
        &cookie_request("/book?book_id=spqr", &first),
        now() + Duration::days(2),
    );
    assert_ne!(expired.cookies, first.cookies);
    assert_eq!(app.store().collection(SESSION).expect("sessions").len(), 2);
}

#[test]
fn buying_requires_login_and_stock() {
    let mut app = seeded_app();

    let anonymous = app.handle(&Request::get("/buy?book_id=dune"), now());
    assert_eq!(anonymous.status, 403);

    let wrong = app.handle(
        &cookie_request("/login?user_id=alice&email=bob@example.com", &anonymous),
        now(),
    );
    assert_eq!(wrong.status, 403);

    let login = app.handle(
        &cookie_request("/login?user_id=alice&email=ALICE@example.com", &anonymous),
        now(),
    );
    assert_eq!(login.status, 200);
    let body = json(&login);
    assert_eq!(body["logged_in"], true);
    assert_eq!(body["user"]["_id"], "alice");

    let bought = app.handle(
        &cookie_request("/buy?book_id=dune&count=2", &login),
        now(),
    );
    assert_eq!(bought.status, 200, "{}", bought.body);
    let body = json(&bought);
    assert_eq!(body["stock"], 3);
    assert_eq!(body["buy"]["user_id"], "alice");
    assert_eq!(body["buy"]["count"], 2);
    assert_eq!(body["buy"]["date_create"], "2025-06-01T09:30:00Z");

    let too_many = app.handle(
        &cookie_request("/buy?book_id=dune&count=9", &login),
        now(),
    );
    assert_eq!(too_many.status, 409);

    let sold_out = app.handle(&cookie_request("/buy?book_id=spqr", &login), now());
    assert_eq!(sold_out.status, 409);

    let zero = app.handle(
        &cookie_request("/buy?book_id=dune&count=0", &login),
        now(),
    );
    assert_eq!(zero.status, 400);

    assert_eq!(app.store().collection(BUY).expect("buys").len(), 1);
    let registry = app.registry();
    let dune: Book = get_record(
        registry,
        app.store().collection(BOOK).expect("books"),
        "dune",
    )
    .expect("dune");
    assert_eq!(dune.stock, 3);
}

#[test]
fn stored_purchase_matches_the_response_at_any_clock_precision() {
    let mut app = seeded_app();
    let at = now() + Duration::nanoseconds(123_456_789);
    let anonymous = app.handle(&Request::get("/book?book_id=dune"), at);
    assert_eq!(anonymous.status, 200, "{}", anonymous.body);
    let login = app.handle(
        &cookie_request("/login?user_id=alice&email=alice@example.com", &anonymous),
        at,
    );
    assert_eq!(login.cookies, anonymous.cookies);

    let bought = app.handle(&cookie_request("/buy?book_id=dune", &login), at);
    assert_eq!(bought.status, 200, "{}", bought.body);
    let body = json(&bought);
    assert_eq!(body["buy"]["date_create"], "2025-06-01T09:30:00.123Z");

    let id = body["buy"]["_id"].as_str().expect("buy id");
    let stored: Buy = get_record(
        app.registry(),
        app.store().collection(BUY).expect("buys"),
        id,
    )
    .expect("stored buy");
    assert_eq!(stored.date_create, now() + Duration::milliseconds(123));
}

#[test]
fn unparsable_arguments_fall_back_to_defaults() {
    let mut app = seeded_app();
    let anonymous = app.handle(&Request::get("/book?book_id=dune"), now());
    let login = app.handle(
        &cookie_request("/login?user_id=bob&email=bob@example.com", &anonymous),
        now(),
    );

    let bought = app.handle(
        &cookie_request("/buy?book_id=foundation&count=lots", &login),
        now(),
    );
    assert_eq!(bought.status, 200, "{}", bought.body);
    assert_eq!(json(&bought)["buy"]["count"], 1);
}

#[test]
fn referrer_is_recorded_on_the_session() {
    let mut app = seeded_app();
    let mut request = Request::get("/book?book_id=dune");
    request
        .headers
        .insert("referer".to_string(), "https://example.com/".to_string());
    let response = app.handle(&request, now());

    let id = &response.cookies[0].1;
    let session: Session = get_record(
        app.registry(),
        app.store().collection(SESSION).expect("sessions"),
        id,
    )
    .expect("session");
    assert_eq!(session.referrer.as_deref(), Some("https://example.com/"));
}

#[test]
fn writes_are_persisted_to_the_data_dir() {
    let tmp = TempDirGuard::new("persist");
    let config = BookstoreConfig {
        data_dir: tmp.path().to_path_buf(),
        ..BookstoreConfig::default()
    };

    let mut app = App::open(&config).expect("open");
    let registry = bindery_core::SchemaRegistry::new();
    seed_store(&registry, app.store_mut(), now()).expect("seed");
    app.store().save().expect("save");

    let anonymous = app.handle(&Request::get("/book?book_id=dune"), now());
    let login = app.handle(
        &cookie_request("/login?user_id=alice&email=alice@example.com", &anonymous),
        now(),
    );
    let bought = app.handle(&cookie_request("/buy?book_id=dune", &login), now());
    assert_eq!(bought.status, 200, "{}", bought.body);

    let reopened = DocumentStore::open(tmp.path()).expect("reopen");
    assert_eq!(reopened.collection(BUY).expect("buys").len(), 1);
    let dune: Book = get_record(
        &registry,
        reopened.collection(BOOK).expect("books"),
        "dune",
    )
    .expect("dune");
    assert_eq!(dune.stock, 4);

    let session: Session = get_record(
        &registry,
        reopened.collection(SESSION).expect("sessions"),
        &login.cookies[0].1,
    )
    .expect("session");
    assert!(session.logged_in);
    assert_eq!(session.user.as_deref(), Some("alice"));
}

#[test]
fn http_loop_serves_one_request_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = seeded_app();

    let server = thread::spawn(move || {
        let mut app = app;
        serve_listener(&mut app, &listener, Some(1))
    });

    let mut stream = TcpStream::connect(addr).expect("connect");
    stream
        .write_all(
            b"POST /book HTTP/1.1\r\n\
              Host: localhost\r\n\
              Content-Type: application/x-www-form-urlencoded\r\n\
              Content-Length: 12\r\n\
              \r\n\
              book_id=spqr",
        )
        .expect("send");
    let mut raw = String::new();
    stream.read_to_string(&mut raw).expect("receive");
    server.join().expect("server thread").expect("serve");

    assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"), "{raw}");
    assert!(raw.contains("Content-Type: application/json; charset=utf-8\r\n"));
    assert!(raw.contains("Set-Cookie: bookstore_session_id="));
    let (_, body) = raw.split_once("\r\n\r\n").expect("header/body split");
    let body: Value = serde_json::from_str(body).expect("json body");
    assert_eq!(body["title"], "SPQR");
    assert_eq!(body["stock"], 0);
}
