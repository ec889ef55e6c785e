//! # bindery-bookstore
//!
//! A small bookstore served over HTTP, built on record binding.
//!
//! This crate provides:
//! - the stored records (`Session`, `Cat`, `Book`, `User`, `Buy`)
//! - `SessionManager` (cookie id/key pair, ttl-bounded lookup)
//! - the `cat`, `book`, `buy`, and `login` handlers
//! - `App`, which owns the sealed schema registry and the document store
//! - a blocking HTTP loop and TOML configuration
//!
//! ## Request flow
//!
//! ```text
//! TcpStream ──read_request──▶ Request ──App::handle──▶ Response ──write_response──▶ TcpStream
//!                                      │
//!                   session ▸ args ▸ handler ▸ JSON ▸ save
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod kinds;
pub mod records;
pub mod seed;
pub mod session;

pub use app::{App, ErrorReply, ROUTES, register_records};
pub use config::{BookstoreConfig, ConfigError, DEFAULT_CONFIG_PATH};
pub use error::AppError;
pub use handlers::{Context, Handler};
pub use http::{HttpServeError, Request, Response, serve, serve_listener};
pub use kinds::RecordKind;
pub use records::{Book, BookDetails, Buy, Cat, Session, User};
pub use seed::{SeedSummary, seed_store};
pub use session::SessionManager;
