use super::{Context, Handler};
use crate::error::AppError;
use crate::records::{BOOK, Book};
use bindery_core::{Record, SchemaBuilder};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BookArgs {
    pub book_id: String,
}

impl Record for BookArgs {
    const NAME: &'static str = "BookArgs";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema.field("book_id", |a| &a.book_id, |a, v| a.book_id = v);
    }
}

pub struct BookHandler;

impl Handler for BookHandler {
    const ROUTE: &'static str = "/book";
    type Args = BookArgs;
    type Output = Book;

    fn run(ctx: &mut Context<'_>, args: BookArgs) -> Result<Book, AppError> {
        ctx.get(BOOK, &args.book_id)
    }
}
