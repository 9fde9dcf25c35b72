//! Extractors whose rejections render as `AppError`.
//!
//! Axum's own `Json` and `Path` reply with plain-text 400/422 bodies; these
//! wrappers turn every malformed body or path into a `400 {"error": ...}`.

use axum::extract::{FromRequest, FromRequestParts};
use crate::error::AppError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
