use super::{Context, Handler};
use crate::error::AppError;
use crate::records::{BOOK, CAT, Cat};
use bindery_core::{Record, SchemaBuilder};
use bindery_store::Filter;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CatArgs {
    pub cat_id: String,
}

impl Record for CatArgs {
    const NAME: &'static str = "CatArgs";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema.field("cat_id", |a| &a.cat_id, |a, v| a.cat_id = v);
    }
}

/// A category and the number of books filed under it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CatPage {
    pub cat: Cat,
    pub book_count: i64,
}

impl Record for CatPage {
    const NAME: &'static str = "CatPage";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .nested("cat", |p| &p.cat, |p| &mut p.cat)
            .field("book_count", |p| &p.book_count, |p, v| p.book_count = v);
    }
}

pub struct CatHandler;

impl Handler for CatHandler {
    const ROUTE: &'static str = "/cat";
    type Args = CatArgs;
    type Output = CatPage;

    fn run(ctx: &mut Context<'_>, args: CatArgs) -> Result<CatPage, AppError> {
        let cat: Cat = ctx.get(CAT, &args.cat_id)?;
        let books = ctx.count(BOOK, &Filter::new().eq("cat_id", cat.id.as_str()));
        Ok(CatPage {
            cat,
            book_count: i64::try_from(books).unwrap_or(i64::MAX),
        })
    }
}
