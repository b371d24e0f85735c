//! HTTP request handlers.
//!
//! - [`pages`]: the upload form served at `/`
//! - [`upload`]: multipart validation, scratch file lifecycle and the Gemini round trip
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to a status code and a plain-text body.

pub mod pages;
pub mod upload;
