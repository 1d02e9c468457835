//! Core types and trait definitions for the Varcal calculation engine.
//!
//! Varcal computes named, versioned "variables" (SQL-scripted metrics) for
//! loan applications. This crate is deliberately free of database and
//! runtime dependencies; storage backends and the coordinator live in
//! sibling crates and depend on the seams defined here.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod exec;
pub mod record;
pub mod store;
pub mod value;
pub mod variable;
pub mod version;

pub use error::{Error, Result};
