//! Sheetdesk API: library crate for the booking and Q&A server.
//!
//! Re-exports all modules so the binary (`main.rs`) and external crates
//! (e.g. `sd-e2e-tests`) can access `AppState`, `build_router` and the
//! dispatcher.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod inference;
pub mod routes;
pub mod state;
