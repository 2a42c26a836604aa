//! Persisted ledger state behind a narrow key/value contract.
//!
//! Every value lives under a string key, year-scoped by suffix
//! (`transactions_2024`), except the global recurrence watermark
//! (`lastProcessedDate`). Implementations only move raw strings; decoding
//! and the "malformed means default" policy live in the provided methods.

#[cfg(test)]
use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::de::DeserializeOwned;

use crate::db;
use crate::error::Result;
use crate::models::Transaction;

pub const WATERMARK_KEY: &str = "lastProcessedDate";

pub fn initial_capital_key(year: i32) -> String {
    format!("initialCapital_{year}")
}

pub fn transactions_key(year: i32) -> String {
    format!("transactions_{year}")
}

pub fn recurring_key(year: i32) -> String {
    format!("recurringTransactions_{year}")
}

pub fn next_id_key(year: i32) -> String {
    format!("nextTransactionId_{year}")
}

pub trait Repository {
    fn get_raw(&self, key: &str) -> Result<Option<String>>;
    fn set_raw(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove_raw(&mut self, key: &str) -> Result<()>;

    /// Run `f` so that its writes land together or not at all. An `Err`
    /// from `f` discards every write it made.
    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut dyn Repository) -> Result<T>;

    fn initial_capital(&self, year: i32) -> Result<f64> {
        let key = initial_capital_key(year);
        Ok(match self.get_raw(&key)? {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    tracing::warn!(%key, %raw, "unreadable initial capital, using 0");
                    0.0
                }
            },
            None => 0.0,
        })
    }

    fn save_initial_capital(&mut self, year: i32, amount: f64) -> Result<()> {
        self.set_raw(&initial_capital_key(year), &amount.to_string())
    }

    fn transactions(&self, year: i32) -> Result<Vec<Transaction>> {
        read_json_or_default(self, &transactions_key(year))
    }

    fn save_transactions(&mut self, year: i32, txns: &[Transaction]) -> Result<()> {
        self.set_raw(&transactions_key(year), &serde_json::to_string(txns)?)
    }

    fn recurring(&self, year: i32) -> Result<Vec<Transaction>> {
        read_json_or_default(self, &recurring_key(year))
    }

    fn save_recurring(&mut self, year: i32, txns: &[Transaction]) -> Result<()> {
        self.set_raw(&recurring_key(year), &serde_json::to_string(txns)?)
    }

    fn next_id(&self, year: i32) -> Result<Option<u64>> {
        let key = next_id_key(year);
        Ok(self.get_raw(&key)?.and_then(|raw| match raw.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(%key, %raw, "unreadable id counter, reseeding");
                None
            }
        }))
    }

    fn save_next_id(&mut self, year: i32, next: u64) -> Result<()> {
        self.set_raw(&next_id_key(year), &next.to_string())
    }

    /// Calendar date of the last recurrence pass, if any.
    fn watermark(&self) -> Result<Option<NaiveDate>> {
        Ok(self.get_raw(WATERMARK_KEY)?.and_then(|raw| {
            let parsed = parse_watermark(&raw);
            if parsed.is_none() {
                tracing::warn!(key = WATERMARK_KEY, %raw, "unreadable watermark, treating as never processed");
            }
            parsed
        }))
    }

    fn save_watermark(&mut self, at: NaiveDateTime) -> Result<()> {
        self.set_raw(WATERMARK_KEY, &at.format("%Y-%m-%dT%H:%M:%S").to_string())
    }

    /// Drop a year's transaction collections.
    fn clear_year(&mut self, year: i32) -> Result<()> {
        self.remove_raw(&transactions_key(year))?;
        self.remove_raw(&recurring_key(year))
    }
}

fn read_json_or_default<R, T>(repo: &R, key: &str) -> Result<T>
where
    R: Repository + ?Sized,
    T: DeserializeOwned + Default,
{
    let Some(raw) = repo.get_raw(key)? else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(%key, error = %e, "malformed stored data, treating as empty");
            Ok(T::default())
        }
    }
}

/// Accepts an RFC 3339 instant (converted to local time), a local date-time,
/// or a bare date.
fn parse_watermark(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = db::get_connection(db_path)?;
        db::init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Repository for SqliteRepository {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        db::get_value(&self.conn, key)
    }

    fn set_raw(&mut self, key: &str, value: &str) -> Result<()> {
        db::set_value(&self.conn, key, value)
    }

    fn remove_raw(&mut self, key: &str) -> Result<()> {
        db::delete_value(&self.conn, key)
    }

    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Repository) -> Result<T>,
    {
        let tx = self.conn.transaction()?;
        let out = f(&mut SqliteScope { conn: &tx })?;
        tx.commit()?;
        Ok(out)
    }
}

/// Writes routed through an open transaction; dropped uncommitted on error.
struct SqliteScope<'a> {
    conn: &'a Connection,
}

impl Repository for SqliteScope<'_> {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        db::get_value(self.conn, key)
    }

    fn set_raw(&mut self, key: &str, value: &str) -> Result<()> {
        db::set_value(self.conn, key, value)
    }

    fn remove_raw(&mut self, key: &str) -> Result<()> {
        db::delete_value(self.conn, key)
    }

    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Repository) -> Result<T>,
    {
        // Already inside the outer transaction
        f(self)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    values: HashMap<String, String>,
}

#[cfg(test)]
impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl Repository for MemoryRepository {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set_raw(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_raw(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }

    fn atomically<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Repository) -> Result<T>,
    {
        let snapshot = self.values.clone();
        f(self).inspect_err(|_| self.values = snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FintrackError;
    use crate::models::{Category, TransactionKind};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn txn(id: u64) -> Transaction {
        Transaction {
            id,
            description: format!("t{id}"),
            amount: 10.0,
            kind: TransactionKind::Expense,
            category: Category::Food,
            date: date(2024, 3, 15),
            timestamp: date(2024, 3, 15).and_hms_opt(12, 0, 0).unwrap(),
            recurrence: None,
        }
    }

    fn sqlite_repo() -> (tempfile::TempDir, SqliteRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepository::open(&dir.path().join("test.db")).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_sqlite_atomically_rolls_back_on_error() {
        let (_dir, mut repo) = sqlite_repo();
        repo.save_initial_capital(2024, 10.0).unwrap();

        let result: Result<()> = repo.atomically(|tx| {
            tx.save_initial_capital(2024, 99.0)?;
            tx.save_transactions(2024, &[txn(1)])?;
            Err(FintrackError::Other("interrupted".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(repo.initial_capital(2024).unwrap(), 10.0);
        assert!(repo.transactions(2024).unwrap().is_empty());

        repo.atomically(|tx| tx.save_transactions(2024, &[txn(1), txn(2)]))
            .unwrap();
        assert_eq!(repo.transactions(2024).unwrap().len(), 2);
    }

    #[test]
    fn test_memory_atomically_restores_on_error() {
        let mut repo = MemoryRepository::new();
        let result: Result<()> = repo.atomically(|tx| {
            tx.save_next_id(2024, 5)?;
            Err(FintrackError::Other("interrupted".to_string()))
        });
        assert!(result.is_err());
        assert!(repo.next_id(2024).unwrap().is_none());
    }

    #[test]
    fn test_keys_are_year_scoped() {
        assert_eq!(initial_capital_key(2024), "initialCapital_2024");
        assert_eq!(transactions_key(2024), "transactions_2024");
        assert_eq!(recurring_key(2025), "recurringTransactions_2025");
        assert_eq!(next_id_key(2024), "nextTransactionId_2024");
    }

    #[test]
    fn test_defaults_when_nothing_stored() {
        let repo = MemoryRepository::new();
        assert_eq!(repo.initial_capital(2024).unwrap(), 0.0);
        assert!(repo.transactions(2024).unwrap().is_empty());
        assert!(repo.recurring(2024).unwrap().is_empty());
        assert!(repo.next_id(2024).unwrap().is_none());
        assert!(repo.watermark().unwrap().is_none());
    }

    #[test]
    fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let mut repo = SqliteRepository::open(&path).unwrap();
            repo.save_transactions(2024, &[txn(1), txn(2)]).unwrap();
            repo.save_initial_capital(2024, 500.25).unwrap();
            repo.save_next_id(2024, 3).unwrap();
        }
        let repo = SqliteRepository::open(&path).unwrap();
        let loaded = repo.transactions(2024).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1], txn(2));
        assert_eq!(repo.initial_capital(2024).unwrap(), 500.25);
        assert_eq!(repo.next_id(2024).unwrap(), Some(3));
        assert!(repo.transactions(2023).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_collections_read_as_empty() {
        let (_dir, mut repo) = sqlite_repo();
        repo.set_raw(&transactions_key(2024), "{not json").unwrap();
        repo.set_raw(&initial_capital_key(2024), "lots").unwrap();
        assert!(repo.transactions(2024).unwrap().is_empty());
        assert_eq!(repo.initial_capital(2024).unwrap(), 0.0);
    }

    #[test]
    fn test_watermark_formats() {
        let mut repo = MemoryRepository::new();
        repo.save_watermark(date(2024, 3, 15).and_hms_opt(8, 5, 0).unwrap())
            .unwrap();
        assert_eq!(repo.get_raw(WATERMARK_KEY).unwrap().as_deref(), Some("2024-03-15T08:05:00"));
        assert_eq!(repo.watermark().unwrap(), Some(date(2024, 3, 15)));

        repo.set_raw(WATERMARK_KEY, "2024-03-15").unwrap();
        assert_eq!(repo.watermark().unwrap(), Some(date(2024, 3, 15)));

        repo.set_raw(WATERMARK_KEY, "2024-03-15T12:00:00.000Z").unwrap();
        assert!(repo.watermark().unwrap().is_some());

        repo.set_raw(WATERMARK_KEY, "yesterday").unwrap();
        assert!(repo.watermark().unwrap().is_none());
    }

    #[test]
    fn test_clear_year_keeps_other_years_and_capital() {
        let mut repo = MemoryRepository::new();
        repo.save_transactions(2024, &[txn(1)]).unwrap();
        repo.save_recurring(2024, &[txn(1)]).unwrap();
        repo.save_transactions(2023, &[txn(9)]).unwrap();
        repo.save_initial_capital(2024, 42.0).unwrap();
        repo.clear_year(2024).unwrap();
        assert!(repo.transactions(2024).unwrap().is_empty());
        assert!(repo.recurring(2024).unwrap().is_empty());
        assert_eq!(repo.transactions(2023).unwrap().len(), 1);
        assert_eq!(repo.initial_capital(2024).unwrap(), 42.0);
    }
}
