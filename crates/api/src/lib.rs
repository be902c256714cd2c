//! HTTP API: router, request DTOs and error mapping over the engines.

pub mod app;
