use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// `Json` with rejections rendered as a 400 `AppError` instead of axum's
/// plain-text 415/422 bodies.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Path` whose parse failures (`/posts/abc`) come back in the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
