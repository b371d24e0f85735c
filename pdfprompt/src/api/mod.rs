//! API layer for HTTP request handling.
//!
//! - `GET /`: the upload form ([`handlers::pages`])
//! - `POST /upload`: PDF analysis ([`handlers::upload`])
//!
//! API documentation is available at `/docs` when the server is running.

pub mod handlers;
