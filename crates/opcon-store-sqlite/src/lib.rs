//! SQLite backend for the opcon scenario store and model index.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. All failures are folded into
//! the `opcon-core` error taxonomy at the call site; this crate exposes no
//! error type of its own.

mod encode;
mod schema;
mod store;

pub use store::SqliteStore;

#[cfg(test)]
mod tests;
