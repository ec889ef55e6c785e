use super::{Context, Handler};
use crate::error::AppError;
use crate::records::{BOOK, BUY, Book, Buy};
use bindery_core::{Record, SchemaBuilder};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct BuyArgs {
    pub book_id: String,
    pub count: i64,
}

// A request without `count` buys one copy.
impl Default for BuyArgs {
    fn default() -> Self {
        Self {
            book_id: String::new(),
            count: 1,
        }
    }
}

impl Record for BuyArgs {
    const NAME: &'static str = "BuyArgs";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("book_id", |a| &a.book_id, |a, v| a.book_id = v)
            .field("count", |a| &a.count, |a, v| a.count = v);
    }
}

/// The stored purchase and the stock left after it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BuyResult {
    pub buy: Buy,
    pub stock: i64,
}

impl Record for BuyResult {
    const NAME: &'static str = "BuyResult";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .nested("buy", |r| &r.buy, |r| &mut r.buy)
            .field("stock", |r| &r.stock, |r, v| r.stock = v);
    }
}

/// Purchase copies of a book for the logged-in user.
pub struct BuyHandler;

impl Handler for BuyHandler {
    const ROUTE: &'static str = "/buy";
    type Args = BuyArgs;
    type Output = BuyResult;

    fn run(ctx: &mut Context<'_>, args: BuyArgs) -> Result<BuyResult, AppError> {
        let user_id = match (&ctx.session().user, ctx.session().logged_in) {
            (Some(user), true) => user.clone(),
            _ => return Err(AppError::Forbidden("login required".to_string())),
        };
        if args.count <= 0 {
            return Err(AppError::BadRequest(format!(
                "count must be positive (got {})",
                args.count
            )));
        }

        let mut book: Book = ctx.get(BOOK, &args.book_id)?;
        if book.stock < args.count {
            return Err(AppError::Conflict(format!(
                "only {} of `{}` in stock",
                book.stock, book.id
            )));
        }

        let buy = Buy {
            id: Uuid::new_v4().simple().to_string(),
            user_id,
            book_id: book.id.clone(),
            count: args.count,
            date_create: ctx.now(),
        };
        let before = book.clone();
        book.stock -= args.count;
        ctx.replace(BOOK, &book)?;
        if let Err(err) = ctx.insert(BUY, &buy) {
            ctx.replace(BOOK, &before)?;
            return Err(err);
        }

        info!(buy = %buy.id, book = %book.id, count = buy.count, "purchase recorded");
        Ok(BuyResult {
            buy,
            stock: book.stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Session;
    use crate::seed::seed_store;
    use bindery_core::SchemaRegistry;
    use bindery_store::{DocumentStore, get_record};
    use chrono::{TimeZone, Utc};

    fn alice() -> Session {
        Session {
            id: "s1".to_string(),
            key: "k1".to_string(),
            user: Some("alice".to_string()),
            logged_in: true,
            ..Session::default()
        }
    }

    #[test]
    fn failed_purchase_leaves_stock_untouched() {
        let registry = SchemaRegistry::new();
        let mut store = DocumentStore::in_memory();
        let seeded_at = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
        seed_store(&registry, &mut store, seeded_at).expect("seed");

        // A clock finer than storage can hold makes the purchase unstorable.
        let now = Utc.timestamp_opt(1_750_000_000, 123_456_789).unwrap();
        let mut session = alice();
        let mut ctx = Context::new(&registry, &mut store, &mut session, now);
        let args = BuyArgs {
            book_id: "dune".to_string(),
            count: 2,
        };
        let err = BuyHandler::run(&mut ctx, args).expect_err("buy cannot be stored");
        assert_eq!(err.status(), 500);
        drop(ctx);

        let books = store.collection(BOOK).expect("books");
        let dune: Book = get_record(&registry, books, "dune").expect("dune");
        assert_eq!(dune.stock, 5);
        assert!(store.collection(BUY).is_none_or(|buys| buys.is_empty()));
    }
}
