use std::convert::Infallible;
use std::fmt::Display;

use warp::Reply;
use warp::http::StatusCode;
use warp::reject::Rejection;

use crate::views;

#[derive(Debug)]
pub struct NotFound;

impl warp::reject::Reject for NotFound {}

#[derive(Debug)]
pub struct InputError;

impl warp::reject::Reject for InputError {}

#[derive(Debug)]
pub struct InternalServerError;

impl warp::reject::Reject for InternalServerError {}

/// Logs an internal failure and turns it into a 500 rejection.
pub fn internal(context: &str, err: impl Display) -> Rejection {
    tracing::error!("{context}: {err}");
    warp::reject::custom(InternalServerError)
}

/// Renders every rejection as an HTML error page.
///
/// # Errors
///
/// Never fails; the error type only satisfies `Filter::recover`.
pub async fn recover(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() || err.find::<NotFound>().is_some() {
        (StatusCode::NOT_FOUND, "Page not found.")
    } else if err.find::<InputError>().is_some()
        || err.find::<warp::filters::body::BodyDeserializeError>().is_some()
        || err.find::<warp::reject::UnsupportedMediaType>().is_some()
    {
        (StatusCode::BAD_REQUEST, "The submitted form was not valid.")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "The submitted form is too large.")
    } else {
        if err.find::<InternalServerError>().is_none() {
            tracing::error!("unhandled rejection: {err:?}");
        }
        (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.")
    };

    Ok(warp::reply::with_status(
        views::error_page(status, message),
        status,
    ))
}
