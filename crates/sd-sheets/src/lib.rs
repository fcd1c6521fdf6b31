//! Tabular store adapter: the spreadsheet acting as system of record.
//!
//! - `TabularStore` trait for read/append/patch over A1 ranges (mockable in tests)
//! - `SheetsClient` talking to the Google Sheets v4 REST API
//! - `MemoryStore` for tests and local development
//! - `BookingBook` mapping services and appointments onto sheet rows

pub mod booking;
pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod store;

// Re-exports for convenience.
pub use booking::{BookingBook, new_booking_id};
pub use client::SheetsClient;
pub use config::SheetsConfig;
pub use error::{StoreError, StoreResult};
pub use mock::MemoryStore;
pub use store::{CellUpdate, Table, TabularStore};
