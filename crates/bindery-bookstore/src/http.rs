//! Blocking HTTP/1.1 request loop.
//!
//! One connection at a time, one request per connection. Parameters come
//! from the query string and, for `application/x-www-form-urlencoded`
//! bodies, from the body; the query string wins on conflicts.

use crate::app::App;
use bindery_wire::FormTree;
use chrono::Utc;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use thiserror::Error;
use tracing::{info, warn};

const MAX_HEADER_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 64 * 1024;
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Error)]
pub enum HttpServeError {
    #[error("bind failed: {0}")]
    Bind(std::io::Error),
    #[error("accept failed: {0}")]
    Accept(std::io::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("request too large: {0}")]
    TooLarge(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub body: String,
}

impl Request {
    /// Build a request from a target such as `/book?book_id=b1`.
    pub fn get(target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method: "GET".to_string(),
            path: path.to_string(),
            query: query.to_string(),
            ..Self::default()
        }
    }

    pub fn with_cookies<I, K, V>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.cookies
            .extend(cookies.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Header value by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Query and form-body parameters as one tree.
    pub fn params(&self) -> FormTree {
        let mut tree = FormTree::from_query(&self.query);
        let is_form = self
            .header("content-type")
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE));
        if is_form {
            tree.extend_query(&self.body);
        }
        tree
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub cookies: Vec<(String, String)>,
}

/// Serve until the listener fails.
pub fn serve(app: &mut App, bind: SocketAddr) -> Result<(), HttpServeError> {
    let listener = TcpListener::bind(bind).map_err(HttpServeError::Bind)?;
    info!(addr = %bind, "listening");
    serve_listener(app, &listener, None)
}

/// Serve on an already-bound listener, stopping after `max_requests` when set.
pub fn serve_listener(
    app: &mut App,
    listener: &TcpListener,
    max_requests: Option<usize>,
) -> Result<(), HttpServeError> {
    let mut served = 0usize;

    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                if let Err(err) = handle_connection(app, &mut stream) {
                    warn!(error = %err, "connection failed");
                }
                served += 1;
            }
            Err(err) => return Err(HttpServeError::Accept(err)),
        }

        if let Some(limit) = max_requests
            && served >= limit
        {
            break;
        }
    }

    Ok(())
}

fn handle_connection(app: &mut App, stream: &mut TcpStream) -> std::io::Result<()> {
    let request = {
        let mut reader = BufReader::new(&mut *stream);
        read_request(&mut reader)
    };
    let response = match request {
        Ok(request) => {
            let response = app.handle(&request, Utc::now());
            info!(
                method = %request.method,
                path = %request.path,
                status = response.status,
                "request"
            );
            response
        }
        Err(err) => {
            let status = match err {
                RequestError::BadRequest(_) => 400,
                RequestError::TooLarge(_) => 413,
            };
            app.error_response(status, &err.to_string())
        }
    };
    write_response(stream, &response)
}

/// Read one request: request line, headers, and a `Content-Length` body.
pub fn read_request(reader: &mut impl BufRead) -> Result<Request, RequestError> {
    let mut header_bytes = 0usize;
    let mut line = String::new();
    read_line(reader, &mut line, &mut header_bytes)?;
    let (method, target) = parse_request_line(line.trim_end())?;
    let (path, query) = split_target(&target);

    let mut request = Request {
        method,
        path: path.to_string(),
        query: query.to_string(),
        ..Request::default()
    };

    loop {
        line.clear();
        read_line(reader, &mut line, &mut header_bytes)?;
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        let Some((name, value)) = header.split_once(':') else {
            return Err(RequestError::BadRequest(format!(
                "malformed header: {header}"
            )));
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        if name == "cookie" {
            for (k, v) in parse_cookie_header(&value) {
                request.cookies.entry(k).or_insert(v);
            }
        }
        request.headers.insert(name, value);
    }

    let length = match request.header("content-length") {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| RequestError::BadRequest(format!("invalid content-length: {raw}")))?,
        None => 0,
    };
    if length > MAX_BODY_BYTES {
        return Err(RequestError::TooLarge(format!(
            "body of {length} bytes exceeds {MAX_BODY_BYTES}"
        )));
    }
    let mut body = vec![0u8; length];
    reader
        .read_exact(&mut body)
        .map_err(|e| RequestError::BadRequest(format!("failed to read body: {e}")))?;
    request.body = String::from_utf8_lossy(&body).into_owned();
    Ok(request)
}

fn read_line(
    reader: &mut impl BufRead,
    line: &mut String,
    total: &mut usize,
) -> Result<(), RequestError> {
    // One byte past the cap is enough to tell an oversized line apart.
    let budget = MAX_HEADER_BYTES.saturating_sub(*total) as u64 + 1;
    let n = (&mut *reader)
        .take(budget)
        .read_line(line)
        .map_err(|e| RequestError::BadRequest(format!("failed to read request: {e}")))?;
    if n == 0 {
        return Err(RequestError::BadRequest(
            "unexpected end of request".to_string(),
        ));
    }
    *total += n;
    if *total > MAX_HEADER_BYTES {
        return Err(RequestError::TooLarge(format!(
            "headers exceed {MAX_HEADER_BYTES} bytes"
        )));
    }
    Ok(())
}

pub fn parse_request_line(line: &str) -> Result<(String, String), RequestError> {
    let mut parts = line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| RequestError::BadRequest("missing method".to_string()))?;
    let target = parts
        .next()
        .ok_or_else(|| RequestError::BadRequest("missing target".to_string()))?;
    Ok((method.to_string(), target.to_string()))
}

/// Split `a=1; b=2` into pairs. The first occurrence of a name wins.
pub fn parse_cookie_header(value: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for pair in value.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        out.entry(name.to_string())
            .or_insert_with(|| value.trim().trim_matches('"').to_string());
    }
    out
}

fn split_target(target: &str) -> (&str, &str) {
    match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    }
}

pub fn write_response(stream: &mut impl Write, response: &Response) -> std::io::Result<()> {
    let mut header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {JSON_CONTENT_TYPE}\r\nContent-Length: {}\r\n",
        response.status,
        reason_phrase(response.status),
        response.body.len()
    );
    for (name, value) in &response.cookies {
        header.push_str(&format!(
            "Set-Cookie: {name}={value}; Path=/; HttpOnly\r\n"
        ));
    }
    header.push_str("Connection: close\r\n\r\n");
    stream.write_all(header.as_bytes())?;
    stream.write_all(response.body.as_bytes())?;
    stream.flush()
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
