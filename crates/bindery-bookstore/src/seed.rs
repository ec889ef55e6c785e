//! A small sample catalogue for local runs.

use crate::records::{BOOK, Book, BookDetails, CAT, Cat, USER, User};
use bindery_core::{SchemaRegistry, truncate_to_millis};
use bindery_store::{DocumentStore, StoreError, upsert_record};
use chrono::{DateTime, TimeZone, Utc};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
    pub cats: usize,
    pub books: usize,
    pub users: usize,
}

pub fn sample_cats() -> Vec<Cat> {
    vec![
        cat("fiction", "Fiction", None),
        cat("scifi", "Science Fiction", Some("fiction")),
        cat("history", "History", None),
    ]
}

pub fn sample_books() -> Vec<Book> {
    vec![
        book(
            "dune",
            "Dune",
            "Frank Herbert",
            "scifi",
            999,
            5,
            ("978-0441013593", "Chilton Books", day(1965, 8, 1)),
        ),
        book(
            "foundation",
            "Foundation",
            "Isaac Asimov",
            "scifi",
            899,
            2,
            ("978-0553293357", "Gnome Press", day(1951, 6, 1)),
        ),
        book(
            "spqr",
            "SPQR",
            "Mary Beard",
            "history",
            1599,
            0,
            ("978-1631492228", "Liveright", day(2015, 11, 9)),
        ),
    ]
}

pub fn sample_users(now: DateTime<Utc>) -> Vec<User> {
    vec![
        user("alice", "Alice", "alice@example.com", now),
        user("bob", "Bob", "bob@example.com", now),
    ]
}

/// Write the sample catalogue, replacing records with the same ids.
pub fn seed_store(
    registry: &SchemaRegistry,
    store: &mut DocumentStore,
    now: DateTime<Utc>,
) -> Result<SeedSummary, StoreError> {
    let mut summary = SeedSummary::default();
    for cat in sample_cats() {
        upsert_record(registry, store.collection_mut(CAT), &cat)?;
        summary.cats += 1;
    }
    for book in sample_books() {
        upsert_record(registry, store.collection_mut(BOOK), &book)?;
        summary.books += 1;
    }
    for user in sample_users(truncate_to_millis(now)) {
        upsert_record(registry, store.collection_mut(USER), &user)?;
        summary.users += 1;
    }
    info!(
        cats = summary.cats,
        books = summary.books,
        users = summary.users,
        "seeded catalogue"
    );
    Ok(summary)
}

fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn cat(id: &str, name: &str, parent: Option<&str>) -> Cat {
    Cat {
        id: id.to_string(),
        name: name.to_string(),
        parent: parent.map(str::to_string),
    }
}

fn book(
    id: &str,
    title: &str,
    author: &str,
    cat_id: &str,
    price_cents: i64,
    stock: i64,
    (isbn, publisher, published): (&str, &str, DateTime<Utc>),
) -> Book {
    Book {
        id: id.to_string(),
        title: title.to_string(),
        author: author.to_string(),
        cat_id: cat_id.to_string(),
        price_cents,
        stock,
        details: BookDetails {
            isbn: isbn.to_string(),
            publisher: publisher.to_string(),
            published,
        },
    }
}

fn user(id: &str, name: &str, email: &str, now: DateTime<Utc>) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        date_create: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_twice_is_idempotent() {
        let registry = SchemaRegistry::new();
        let mut store = DocumentStore::in_memory();
        let now = day(2025, 1, 1);

        let first = seed_store(&registry, &mut store, now).expect("seed");
        let digest = store.collection(BOOK).expect("books").digest();
        let second = seed_store(&registry, &mut store, now).expect("seed again");

        assert_eq!(first, second);
        assert_eq!(
            first,
            SeedSummary {
                cats: 3,
                books: 3,
                users: 2
            }
        );
        assert_eq!(store.collection(BOOK).expect("books").digest(), digest);
    }

    #[test]
    fn a_wall_clock_with_nanoseconds_seeds_cleanly() {
        let registry = SchemaRegistry::new();
        let mut store = DocumentStore::in_memory();
        let now = Utc.timestamp_opt(1_750_000_000, 987_654_321).unwrap();

        seed_store(&registry, &mut store, now).expect("seed");
        let alice: User = bindery_store::get_record(
            &registry,
            store.collection(USER).expect("users"),
            "alice",
        )
        .expect("alice");
        assert_eq!(
            alice.date_create,
            Utc.timestamp_opt(1_750_000_000, 987_000_000).unwrap()
        );
    }

    #[test]
    fn every_book_files_under_a_seeded_cat() {
        let cats: Vec<String> = sample_cats().into_iter().map(|c| c.id).collect();
        for book in sample_books() {
            assert!(cats.contains(&book.cat_id), "{}", book.cat_id);
        }
    }
}
