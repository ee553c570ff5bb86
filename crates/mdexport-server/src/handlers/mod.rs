//! HTTP request handlers.

pub(crate) mod convert;
pub(crate) mod health;
