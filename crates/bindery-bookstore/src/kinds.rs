//! Record types addressable by name, for tools that pick a record at
//! runtime (the `bindery` command line).

use crate::app::ErrorReply;
use crate::error::AppError;
use crate::handlers::{BookArgs, BuyArgs, BuyResult, CatArgs, CatPage, LoginArgs, LoginResult};
use crate::records::{BOOK, BUY, Book, BookDetails, Buy, CAT, Cat, SESSION, Session, USER, User};
use bindery_core::{Outline, SchemaError, SchemaRegistry, TraverseError};
use bindery_store::{DocumentStore, StoreError, get_record};
use bindery_wire::{FormTree, bind_form, to_json_string};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Session,
    Cat,
    Book,
    BookDetails,
    User,
    Buy,
    CatArgs,
    CatPage,
    BookArgs,
    BuyArgs,
    BuyResult,
    LoginArgs,
    LoginResult,
    ErrorReply,
}

// Runs `$body` with `$r` bound to the record type of `$kind`.
macro_rules! with_record {
    ($kind:expr, $r:ident => $body:expr) => {
        match $kind {
            RecordKind::Session => {
                type $r = Session;
                $body
            }
            RecordKind::Cat => {
                type $r = Cat;
                $body
            }
            RecordKind::Book => {
                type $r = Book;
                $body
            }
            RecordKind::BookDetails => {
                type $r = BookDetails;
                $body
            }
            RecordKind::User => {
                type $r = User;
                $body
            }
            RecordKind::Buy => {
                type $r = Buy;
                $body
            }
            RecordKind::CatArgs => {
                type $r = CatArgs;
                $body
            }
            RecordKind::CatPage => {
                type $r = CatPage;
                $body
            }
            RecordKind::BookArgs => {
                type $r = BookArgs;
                $body
            }
            RecordKind::BuyArgs => {
                type $r = BuyArgs;
                $body
            }
            RecordKind::BuyResult => {
                type $r = BuyResult;
                $body
            }
            RecordKind::LoginArgs => {
                type $r = LoginArgs;
                $body
            }
            RecordKind::LoginResult => {
                type $r = LoginResult;
                $body
            }
            RecordKind::ErrorReply => {
                type $r = ErrorReply;
                $body
            }
        }
    };
}

impl RecordKind {
    pub const ALL: [RecordKind; 14] = [
        RecordKind::Session,
        RecordKind::Cat,
        RecordKind::Book,
        RecordKind::BookDetails,
        RecordKind::User,
        RecordKind::Buy,
        RecordKind::CatArgs,
        RecordKind::CatPage,
        RecordKind::BookArgs,
        RecordKind::BuyArgs,
        RecordKind::BuyResult,
        RecordKind::LoginArgs,
        RecordKind::LoginResult,
        RecordKind::ErrorReply,
    ];

    pub fn name(self) -> &'static str {
        use bindery_core::Record;
        with_record!(self, R => R::NAME)
    }

    /// Look a kind up by record name or collection name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| {
            kind.name().eq_ignore_ascii_case(name)
                || kind
                    .collection()
                    .is_some_and(|collection| collection.eq_ignore_ascii_case(name))
        })
    }

    /// Collection holding records of this kind, for stored kinds.
    pub fn collection(self) -> Option<&'static str> {
        match self {
            RecordKind::Session => Some(SESSION),
            RecordKind::Cat => Some(CAT),
            RecordKind::Book => Some(BOOK),
            RecordKind::User => Some(USER),
            RecordKind::Buy => Some(BUY),
            _ => None,
        }
    }

    pub fn outline(self, registry: &SchemaRegistry) -> Result<Outline, SchemaError> {
        with_record!(self, R => registry.outline::<R>())
    }

    /// Bind `params` into a default record and render it as JSON.
    pub fn bind_json(
        self,
        registry: &SchemaRegistry,
        params: &FormTree,
    ) -> Result<String, TraverseError> {
        with_record!(self, R => {
            let record: R = bind_form(registry, params)?;
            to_json_string(registry, &record)
        })
    }

    /// View the stored record `id` and render it as JSON.
    pub fn show_json(
        self,
        registry: &SchemaRegistry,
        store: &DocumentStore,
        id: &str,
    ) -> Result<String, AppError> {
        let Some(name) = self.collection() else {
            return Err(AppError::BadRequest(format!(
                "`{}` records are not stored",
                self.name()
            )));
        };
        let Some(collection) = store.collection(name) else {
            return Err(StoreError::NotFound {
                collection: name.to_string(),
                id: id.to_string(),
            }
            .into());
        };
        with_record!(self, R => {
            let record: R = get_record(registry, collection, id)?;
            Ok(to_json_string(registry, &record)?)
        })
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
