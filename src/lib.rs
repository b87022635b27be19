//! Filtered search API over series of incident records.
//!
//! Typed filter parameters are compiled into a single Elasticsearch boolean
//! query by [`search::QueryCompiler`] and executed through
//! [`search::SearchService`]. An [`api`] router exposes the search behind a
//! username/password login backed by a relational `users` table.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod search;

pub use error::{AppError, Result};
