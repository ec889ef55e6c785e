//! Stored bookstore records.
//!
//! Field order here is the order of every JSON object and BSON document
//! these records produce.

use bindery_core::{Record, SchemaBuilder};
use bindery_store::Identified;
use chrono::{DateTime, Utc};

pub const SESSION: &str = "session";
pub const CAT: &str = "cat";
pub const BOOK: &str = "book";
pub const USER: &str = "user";
pub const BUY: &str = "buy";

/// Collection names, in the order `seed` fills them.
pub const COLLECTIONS: [&str; 5] = [CAT, BOOK, USER, BUY, SESSION];

/// A browser session, keyed by the id/key cookie pair.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub key: String,
    pub user: Option<String>,
    pub cart: Option<String>,
    pub referrer: Option<String>,
    pub logged_in: bool,
    pub date_create: DateTime<Utc>,
}

impl Record for Session {
    const NAME: &'static str = "Session";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("_id", |s| &s.id, |s, v| s.id = v)
            .field("key", |s| &s.key, |s, v| s.key = v)
            .field("user", |s| &s.user, |s, v| s.user = v)
            .field("cart", |s| &s.cart, |s, v| s.cart = v)
            .field("referrer", |s| &s.referrer, |s, v| s.referrer = v)
            .field("logged_in", |s| &s.logged_in, |s, v| s.logged_in = v)
            .field("date_create", |s| &s.date_create, |s, v| s.date_create = v);
    }
}

impl Identified for Session {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A catalogue category. `parent` is absent for top-level categories.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Cat {
    pub id: String,
    pub name: String,
    pub parent: Option<String>,
}

impl Record for Cat {
    const NAME: &'static str = "Cat";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("_id", |c| &c.id, |c, v| c.id = v)
            .field("name", |c| &c.name, |c, v| c.name = v)
            .field("parent", |c| &c.parent, |c, v| c.parent = v);
    }
}

impl Identified for Cat {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BookDetails {
    pub isbn: String,
    pub publisher: String,
    pub published: DateTime<Utc>,
}

impl Record for BookDetails {
    const NAME: &'static str = "BookDetails";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("isbn", |d| &d.isbn, |d, v| d.isbn = v)
            .field("publisher", |d| &d.publisher, |d, v| d.publisher = v)
            .field("published", |d| &d.published, |d, v| d.published = v);
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub cat_id: String,
    pub price_cents: i64,
    pub stock: i64,
    pub details: BookDetails,
}

impl Record for Book {
    const NAME: &'static str = "Book";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("_id", |b| &b.id, |b, v| b.id = v)
            .field("title", |b| &b.title, |b, v| b.title = v)
            .field("author", |b| &b.author, |b, v| b.author = v)
            .field("cat_id", |b| &b.cat_id, |b, v| b.cat_id = v)
            .field("price_cents", |b| &b.price_cents, |b, v| b.price_cents = v)
            .field("stock", |b| &b.stock, |b, v| b.stock = v)
            .nested("details", |b| &b.details, |b| &mut b.details);
    }
}

impl Identified for Book {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub date_create: DateTime<Utc>,
}

impl Record for User {
    const NAME: &'static str = "User";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("_id", |u| &u.id, |u, v| u.id = v)
            .field("name", |u| &u.name, |u, v| u.name = v)
            .field("email", |u| &u.email, |u, v| u.email = v)
            .field("date_create", |u| &u.date_create, |u, v| u.date_create = v);
    }
}

impl Identified for User {
    fn id(&self) -> &str {
        &self.id
    }
}

/// One purchase.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Buy {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub count: i64,
    pub date_create: DateTime<Utc>,
}

impl Record for Buy {
    const NAME: &'static str = "Buy";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("_id", |b| &b.id, |b, v| b.id = v)
            .field("user_id", |b| &b.user_id, |b, v| b.user_id = v)
            .field("book_id", |b| &b.book_id, |b, v| b.book_id = v)
            .field("count", |b| &b.count, |b, v| b.count = v)
            .field("date_create", |b| &b.date_create, |b, v| b.date_create = v);
    }
}

impl Identified for Buy {
    fn id(&self) -> &str {
        &self.id
    }
}
