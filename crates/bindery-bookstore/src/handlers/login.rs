use super::{Context, Handler};
use crate::error::AppError;
use crate::records::{USER, User};
use bindery_core::{Record, SchemaBuilder};
use tracing::info;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoginArgs {
    pub user_id: String,
    pub email: String,
}

impl Record for LoginArgs {
    const NAME: &'static str = "LoginArgs";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("user_id", |a| &a.user_id, |a, v| a.user_id = v)
            .field("email", |a| &a.email, |a, v| a.email = v);
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoginResult {
    pub logged_in: bool,
    pub user: User,
}

impl Record for LoginResult {
    const NAME: &'static str = "LoginResult";

    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("logged_in", |r| &r.logged_in, |r, v| r.logged_in = v)
            .nested("user", |r| &r.user, |r| &mut r.user);
    }
}

/// Attach a user to the current session.
pub struct LoginHandler;

impl Handler for LoginHandler {
    const ROUTE: &'static str = "/login";
    type Args = LoginArgs;
    type Output = LoginResult;

    fn run(ctx: &mut Context<'_>, args: LoginArgs) -> Result<LoginResult, AppError> {
        let user: User = ctx.get(USER, &args.user_id)?;
        if !user.email.eq_ignore_ascii_case(args.email.trim()) {
            return Err(AppError::Forbidden(
                "email does not match user".to_string(),
            ));
        }

        let session = ctx.session_mut();
        session.user = Some(user.id.clone());
        session.logged_in = true;
        info!(session = %session.id, user = %user.id, "logged in");
        Ok(LoginResult {
            logged_in: true,
            user,
        })
    }
}
