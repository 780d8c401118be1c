use std::convert::Infallible;

use serde::de::DeserializeOwned;
use warp::Filter;
use warp::http::Uri;

use crate::AppState;
use crate::handlers;
use crate::names::{QUIZ_INDEX_URL, SESSION_COOKIE_NAME};
use crate::rejections::recover;
use crate::session::{Session, SessionStore};

const MAX_FORM_BYTES: u64 = 16 * 1024;

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn with_session(
    store: SessionStore,
) -> impl Filter<Extract = (Session,), Error = Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE_NAME).map(move |token| store.open(token))
}

fn form<T: DeserializeOwned + Send + 'static>()
-> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_FORM_BYTES).and(warp::body::form::<T>())
}

/// Every page of the site, with rejections rendered as error pages.
///
/// Routes with fixed segments come before `/q/<url>/` so a quiz slug never
/// shadows them.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    let sessions = state.sessions.clone();
    let ctx = with_state(state).and(with_session(sessions));

    let root = warp::get()
        .and(warp::path::end())
        .map(|| warp::redirect::see_other(Uri::from_static(QUIZ_INDEX_URL)));

    let index = warp::get()
        .and(warp::path!("q"))
        .and(ctx.clone())
        .and_then(handlers::index);

    let category_list = warp::get()
        .and(warp::path!("q" / "category"))
        .and(ctx.clone())
        .and_then(handlers::category_list);

    let category_detail = warp::get()
        .and(warp::path!("q" / "category" / String))
        .and(ctx.clone())
        .and_then(handlers::category_detail);

    let progress = warp::get()
        .and(warp::path!("q" / "progress"))
        .and(ctx.clone())
        .and_then(handlers::progress);

    let take_get = warp::get()
        .and(warp::path!("q" / String / "take"))
        .and(ctx.clone())
        .and_then(handlers::take_get);

    let take_post = warp::post()
        .and(warp::path!("q" / String / "take"))
        .and(ctx.clone())
        .and(form::<handlers::AnswerForm>())
        .and_then(handlers::take_post);

    let quiz_detail = warp::get()
        .and(warp::path!("q" / String))
        .and(ctx.clone())
        .and_then(handlers::quiz_detail);

    let login_get = warp::get()
        .and(warp::path!("accounts" / "login"))
        .and_then(handlers::login_form);

    let login_post = warp::post()
        .and(warp::path!("accounts" / "login"))
        .and(ctx.clone())
        .and(form::<handlers::LoginForm>())
        .and_then(handlers::login);

    let logout = warp::post()
        .and(warp::path!("accounts" / "logout"))
        .and(ctx.clone())
        .and_then(handlers::logout);

    let register_get = warp::get()
        .and(warp::path!("accounts" / "register"))
        .and_then(handlers::register_form);

    let register_post = warp::post()
        .and(warp::path!("accounts" / "register"))
        .and(ctx)
        .and(form::<handlers::RegisterForm>())
        .and_then(handlers::register);

    root.or(index)
        .or(category_list)
        .or(category_detail)
        .or(progress)
        .or(take_get)
        .or(take_post)
        .or(quiz_detail)
        .or(login_get)
        .or(login_post)
        .or(logout)
        .or(register_get)
        .or(register_post)
        .recover(recover)
        .with(warp::trace::request())
}
