//! In-memory tabular store for tests and local development.
//!
//! Tabs are plain row vectors keyed by tab name. Ranges are resolved by tab
//! only for reads and appends; patches address single cells.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::store::{CellUpdate, TabularStore, parse_cell, split_range};

/// Mock implementation of the `TabularStore` trait.
///
/// Thread-safe via `Mutex`; also backs the binary when no spreadsheet is configured.
pub struct MemoryStore {
    tabs: Mutex<BTreeMap<String, Vec<Vec<String>>>>,
    unreachable: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tabs: Mutex::new(BTreeMap::new()),
            unreachable: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
        }
    }

    /// Store with a small studio catalog, an empty appointments tab and business hours.
    pub fn with_sample_data() -> Self {
        let store = Self::new();
        store.set_tab(
            "Services",
            &[
                &["Name", "Duration", "Price", "Location"],
                &["5 Sessions Ceramic Class", "90 min", "$200", "Studio A"],
                &["Wheel Throwing Intro", "60 min", "$45", "Studio B"],
                &["Private Glazing Workshop", "120 min", "$120", ""],
            ],
        );
        store.set_tab(
            "Appointments",
            &[&[
                "Name",
                "Email",
                "Phone",
                "Service",
                "Total Sessions",
                "Sessions (Format: Session 1: Date at Time | Session 2: Date at Time | etc.)",
                "Booking ID",
                "Created At",
            ]],
        );
        store.set_tab(
            "Business Hours",
            &[
                &["Day", "Open", "Close", "Notes"],
                &["Monday", "10:00", "18:00", ""],
                &["Saturday", "09:00", "14:00", "Open studio only"],
                &["Sunday", "Closed", "Closed", "Closed all day on Sundays"],
            ],
        );
        store
    }

    /// Replace a whole tab.
    pub fn set_tab(&self, tab: &str, rows: &[&[&str]]) {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        self.lock().insert(tab.to_string(), rows);
    }

    /// Snapshot of a tab's rows (header included).
    pub fn tab(&self, tab: &str) -> Vec<Vec<String>> {
        self.lock().get(tab).cloned().unwrap_or_default()
    }

    /// Make every call fail with `StoreError::Unreachable`.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of `read` calls served.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Vec<Vec<String>>>> {
        self.tabs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_reachable(&self) -> StoreResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable);
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn read(&self, range: &str) -> StoreResult<Vec<Vec<String>>> {
        self.ensure_reachable()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let (tab, _) = split_range(range);
        Ok(self.tab(&tab))
    }

    async fn append(&self, range: &str, row: Vec<String>) -> StoreResult<()> {
        self.ensure_reachable()?;
        let (tab, _) = split_range(range);
        self.lock().entry(tab).or_default().push(row);
        Ok(())
    }

    async fn patch(&self, updates: &[CellUpdate]) -> StoreResult<()> {
        self.ensure_reachable()?;
        // Validate everything before writing so a bad range leaves the tab untouched.
        let mut resolved = Vec::with_capacity(updates.len());
        for update in updates {
            let (tab, cell) = split_range(&update.range);
            let cell = cell.ok_or_else(|| StoreError::InvalidRange(update.range.clone()))?;
            let (column, row) = parse_cell(cell)?;
            resolved.push((tab, column, row, update.value.clone()));
        }

        let mut tabs = self.lock();
        for (tab, column, row, value) in resolved {
            let rows = tabs.entry(tab).or_default();
            if rows.len() < row {
                rows.resize(row, Vec::new());
            }
            let cells = &mut rows[row - 1];
            if cells.len() <= column {
                cells.resize(column + 1, String::new());
            }
            cells[column] = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_resolves_tab_from_range() {
        let store = MemoryStore::with_sample_data();
        let rows = store.read("Business Hours!A1:Z").await.unwrap();
        assert_eq!(rows[0][0], "Day");
        assert_eq!(rows.len(), 4);
        assert_eq!(store.reads(), 1);
    }

    #[tokio::test]
    async fn missing_tab_reads_empty() {
        let store = MemoryStore::new();
        assert!(store.read("Nope!A1:Z").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_then_patch_cell() {
        let store = MemoryStore::new();
        store
            .append("Tab!A1:Z", vec!["a".into(), "b".into()])
            .await
            .unwrap();
        store
            .patch(&[CellUpdate::at("Tab", 3, 1, "d")])
            .await
            .unwrap();
        assert_eq!(store.tab("Tab"), vec![vec!["a", "b", "", "d"]]);
    }

    #[tokio::test]
    async fn invalid_patch_range_writes_nothing() {
        let store = MemoryStore::new();
        store.set_tab("Tab", &[&["a"]]);
        let updates = [
            CellUpdate::at("Tab", 0, 1, "changed"),
            CellUpdate {
                range: "Tab!??".into(),
                value: "x".into(),
            },
        ];
        assert!(store.patch(&updates).await.is_err());
        assert_eq!(store.tab("Tab"), vec![vec!["a"]]);
    }

    #[tokio::test]
    async fn unreachable_fails_every_call() {
        let store = MemoryStore::with_sample_data();
        store.set_unreachable(true);
        assert!(matches!(
            store.read("Services!A1:Z").await,
            Err(StoreError::Unreachable)
        ));
        assert!(store.append("Services!A1:Z", vec![]).await.is_err());
        assert!(store.patch(&[]).await.is_err());
    }
}
