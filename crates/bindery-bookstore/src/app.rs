//! The application: one sealed schema registry, the document store, and
//! the session manager, plus the route table.
//!
//! Every handled request runs the same exchange:
//!
//! ```text
//! establish session → bind args (form tree) → handler → render output (JSON)
//!                   → save session → persist written collections
//! ```

use crate::config::BookstoreConfig;
use crate::error::AppError;
use crate::handlers::{BookHandler, BuyHandler, CatHandler, Context, Handler, LoginHandler};
use crate::http::{Request, Response};
use crate::records::{Book, BookDetails, Buy, Cat, SESSION, Session, User};
use crate::session::SessionManager;
use bindery_core::{Record, SchemaBuilder, SchemaError, SchemaRegistry, truncate_to_millis};
use bindery_store::DocumentStore;
use bindery_wire::{FormTree, bind_form, to_json_string};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{debug, error};

/// Body of every non-200 response.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ErrorReply {
    pub status: i64,
    pub error: String,
}

impl Record for ErrorReply {
    const NAME: &'static str = "ErrorReply";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("status", |r| &r.status, |r, v| r.status = v)
            .field("error", |r| &r.error, |r, v| r.error = v);
    }
}

/// Routes served by [`App::handle`].
pub const ROUTES: [&str; 4] = [
    CatHandler::ROUTE,
    BookHandler::ROUTE,
    BuyHandler::ROUTE,
    LoginHandler::ROUTE,
];

/// Describe every record the application binds or stores.
pub fn register_records(registry: &SchemaRegistry) -> Result<(), SchemaError> {
    registry.register::<Session>()?;
    registry.register::<Cat>()?;
    registry.register::<Book>()?;
    registry.register::<BookDetails>()?;
    registry.register::<User>()?;
    registry.register::<Buy>()?;
    registry.register::<ErrorReply>()?;
    CatHandler::register(registry)?;
    BookHandler::register(registry)?;
    BuyHandler::register(registry)?;
    LoginHandler::register(registry)
}

#[derive(Debug)]
pub struct App {
    registry: SchemaRegistry,
    store: DocumentStore,
    sessions: SessionManager,
}

impl App {
    /// Build the application over `store`. The registry is sealed before
    /// the first request.
    pub fn new(config: &BookstoreConfig, store: DocumentStore) -> Result<Self, AppError> {
        config.validate()?;
        let registry = SchemaRegistry::new();
        register_records(&registry)?;
        registry.seal();
        debug!(records = registry.len(), "schema registry sealed");
        Ok(Self {
            registry,
            store,
            sessions: SessionManager::from_config(config),
        })
    }

    /// Build the application over the store in `config.data_dir`.
    pub fn open(config: &BookstoreConfig) -> Result<Self, AppError> {
        let store = DocumentStore::open(&config.data_dir)?;
        Self::new(config, store)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DocumentStore {
        &mut self.store
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn handle(&mut self, request: &Request, now: DateTime<Utc>) -> Response {
        let now = truncate_to_millis(now);
        let params = request.params();
        match request.path.as_str() {
            CatHandler::ROUTE => self.exchange::<CatHandler>(request, &params, now),
            BookHandler::ROUTE => self.exchange::<BookHandler>(request, &params, now),
            BuyHandler::ROUTE => self.exchange::<BuyHandler>(request, &params, now),
            LoginHandler::ROUTE => self.exchange::<LoginHandler>(request, &params, now),
            other => {
                let err = AppError::UnknownRoute(other.to_string());
                self.error_response(err.status(), &err.to_string())
            }
        }
    }

    fn exchange<H: Handler>(
        &mut self,
        request: &Request,
        params: &FormTree,
        now: DateTime<Utc>,
    ) -> Response {
        let mut session = match self.sessions.establish(
            &self.registry,
            self.store.collection_mut(SESSION),
            &request.cookies,
            now,
        ) {
            Ok(session) => session,
            Err(err) => return self.fail(&AppError::from(err), Vec::new()),
        };
        if session.referrer.is_none() {
            session.referrer = request.header("referer").map(str::to_string);
        }

        let mut dirty = BTreeSet::from([SESSION.to_string()]);
        let outcome = self.run::<H>(params, &mut session, now, &mut dirty);

        let mut persisted = self
            .sessions
            .save(&self.registry, self.store.collection_mut(SESSION), &session)
            .map_err(AppError::from);
        for name in &dirty {
            if persisted.is_ok() {
                persisted = self.store.save_collection(name).map_err(AppError::from);
            }
        }

        let cookies = self.sessions.cookies_for(&session);
        match outcome.and_then(|body| persisted.map(|()| body)) {
            Ok(body) => Response {
                status: 200,
                body,
                cookies,
            },
            Err(err) => self.fail(&err, cookies),
        }
    }

    fn run<H: Handler>(
        &mut self,
        params: &FormTree,
        session: &mut Session,
        now: DateTime<Utc>,
        dirty: &mut BTreeSet<String>,
    ) -> Result<String, AppError> {
        let args: H::Args = bind_form(&self.registry, params)?;
        let mut ctx = Context::new(&self.registry, &mut self.store, session, now);
        let output = H::run(&mut ctx, args);
        dirty.extend(ctx.into_dirty());
        Ok(to_json_string(&self.registry, &output?)?)
    }

    fn fail(&self, err: &AppError, cookies: Vec<(String, String)>) -> Response {
        let status = err.status();
        if status >= 500 {
            error!(error = %err, "request failed");
        }
        Response {
            cookies,
            ..self.error_response(status, &err.to_string())
        }
    }

    /// A JSON error body with no cookies.
    pub fn error_response(&self, status: u16, message: &str) -> Response {
        let reply = ErrorReply {
            status: i64::from(status),
            error: message.to_string(),
        };
        let body = to_json_string(&self.registry, &reply)
            .unwrap_or_else(|_| format!("{{\"status\":{status}}}"));
        Response {
            status,
            body,
            cookies: Vec::new(),
        }
    }
}
