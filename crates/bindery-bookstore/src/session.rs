//! Cookie-keyed sessions.
//!
//! A client presents two cookies: the session id and a secret key. A
//! stored session is accepted when both match and it is younger than the
//! configured ttl. Anything else (no cookies, wrong key, expired, or a
//! stored document that no longer views as a `Session`) starts a new one.

use crate::config::BookstoreConfig;
use crate::records::Session;
use bindery_core::{SchemaRegistry, truncate_to_millis};
use bindery_store::{Collection, Filter, StoreError, find_record, insert_record, upsert_record};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

impl Session {
    /// A fresh anonymous session created at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            key: random_key(),
            user: None,
            cart: None,
            referrer: None,
            logged_in: false,
            date_create: truncate_to_millis(now),
        }
    }

    /// Expired once `ttl` has fully elapsed since creation.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.date_create >= ttl
    }
}

fn random_key() -> String {
    let hash = Sha256::digest(Uuid::new_v4().as_bytes());
    format!("{hash:x}")
}

#[derive(Debug, Clone)]
pub struct SessionManager {
    ttl: Duration,
    cookie_id: String,
    cookie_key: String,
}

impl SessionManager {
    pub fn new(ttl: Duration, cookie_id: impl Into<String>, cookie_key: impl Into<String>) -> Self {
        Self {
            ttl,
            cookie_id: cookie_id.into(),
            cookie_key: cookie_key.into(),
        }
    }

    pub fn from_config(config: &BookstoreConfig) -> Self {
        Self::new(
            config.session_ttl(),
            config.cookie_id.clone(),
            config.cookie_key.clone(),
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The stored-session query for an id/key pair at `now`:
    /// `date_create > now - ttl`, the storage form of `!is_expired`.
    pub fn filter(&self, id: &str, key: &str, now: DateTime<Utc>) -> Filter {
        let oldest = now
            .checked_sub_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Filter::by_id(id).eq("key", key).gt("date_create", oldest)
    }

    /// Find the live session named by the request cookies.
    pub fn lookup(
        &self,
        registry: &SchemaRegistry,
        sessions: &Collection,
        cookies: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError> {
        let Some(id) = cookies.get(&self.cookie_id).filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let key = cookies.get(&self.cookie_key).map_or("", String::as_str);
        let found: Option<Session> = find_record(registry, sessions, &self.filter(id, key, now))?;
        Ok(found.filter(|session| !session.is_expired(now, self.ttl)))
    }

    /// Return the live session for the request, or create and store a new one.
    pub fn establish(
        &self,
        registry: &SchemaRegistry,
        sessions: &mut Collection,
        cookies: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        match self.lookup(registry, sessions, cookies, now) {
            Ok(Some(session)) => return Ok(session),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "stored session is unreadable; starting a new one"),
        }

        let session = Session::new(now);
        insert_record(registry, sessions, &session)?;
        debug!(session = %session.id, "created session");
        Ok(session)
    }

    /// Write the session back to storage.
    pub fn save(
        &self,
        registry: &SchemaRegistry,
        sessions: &mut Collection,
        session: &Session,
    ) -> Result<(), StoreError> {
        upsert_record(registry, sessions, session)
    }

    /// `(name, value)` cookie pairs that identify `session`.
    pub fn cookies_for(&self, session: &Session) -> Vec<(String, String)> {
        vec![
            (self.cookie_id.clone(), session.id.clone()),
            (self.cookie_key.clone(), session.key.clone()),
        ]
    }
}
