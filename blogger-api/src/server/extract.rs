//! Extractors whose rejections render as [`ServerError`] pages.

use crate::server::ServerError;
use axum::extract::{Form as AxumForm, FromRequest, FromRequestParts, Query as AxumQuery};

#[derive(FromRequestParts, Debug, Clone, Copy, Default)]
#[from_request(via(AxumQuery), rejection(ServerError))]
pub struct Query<T>(pub T);

#[derive(FromRequest, Debug, Clone, Copy, Default)]
#[from_request(via(AxumForm), rejection(ServerError))]
pub struct Form<T>(pub T);
