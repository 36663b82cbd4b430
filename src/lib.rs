//! Runtime translation of UI strings.
//!
//! The server side (`resolver`, `cache`, `provider`, `api`) answers
//! translation requests from a cache and falls back to an LLM provider for
//! misses. The client side (`context`, `coalescer`, `client`) tracks the
//! active locale and batches the strings a render asks for.

pub mod api;
pub mod cache;
pub mod client;
pub mod coalescer;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod i18n;
pub mod provider;
pub mod resolver;
pub mod retry;
pub mod security;

#[cfg(test)]
mod test_support;
