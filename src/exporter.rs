use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::models::Transaction;

#[derive(Serialize)]
struct CsvRow<'a> {
    id: u64,
    date: String,
    description: &'a str,
    amount: String,
    #[serde(rename = "type")]
    kind: String,
    category: &'static str,
    recurring: bool,
    recurring_day: Option<u32>,
    timestamp: String,
}

impl<'a> From<&'a Transaction> for CsvRow<'a> {
    fn from(t: &'a Transaction) -> Self {
        Self {
            id: t.id,
            date: t.date.format("%Y-%m-%d").to_string(),
            description: &t.description,
            amount: format!("{:.2}", t.amount),
            kind: t.kind.to_string(),
            category: t.category.key(),
            recurring: t.is_recurring(),
            recurring_day: t.recurrence.map(|r| r.day),
            timestamp: t.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Write `txns` as CSV with a header row. Returns the number of data rows.
pub fn write_csv<'a, W, I>(writer: W, txns: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    let mut count = 0;
    for t in txns {
        wtr.serialize(CsvRow::from(t))?;
        count += 1;
    }
    if count == 0 {
        wtr.write_record([
            "id",
            "date",
            "description",
            "amount",
            "type",
            "category",
            "recurring",
            "recurring_day",
            "timestamp",
        ])?;
    }
    wtr.flush()?;
    Ok(count)
}

pub fn export_csv<'a, I>(path: &Path, txns: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let count = write_csv(file, txns)?;
    tracing::info!(path = %path.display(), rows = count, "exported transactions");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::{Category, Recurrence, TransactionKind};

    fn txn(id: u64, description: &str, recurrence: Option<Recurrence>) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        Transaction {
            id,
            description: description.to_string(),
            amount: 19.5,
            kind: TransactionKind::Expense,
            category: Category::Shopping,
            date,
            timestamp: date.and_hms_opt(14, 5, 9).unwrap(),
            recurrence,
        }
    }

    #[test]
    fn test_write_csv_header_and_rows() {
        let txns = vec![
            txn(1, "Shoes, running", None),
            txn(2, "Magazine", Some(Recurrence::new(15, None, None).unwrap())),
        ];
        let mut buf = Vec::new();
        let count = write_csv(&mut buf, &txns).unwrap();
        assert_eq!(count, 2);

        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "id,date,description,amount,type,category,recurring,recurring_day,timestamp"
        );
        assert_eq!(
            lines[1],
            "1,2024-03-15,\"Shoes, running\",19.50,Expense,shopping,false,,2024-03-15 14:05:09"
        );
        assert_eq!(
            lines[2],
            "2,2024-03-15,Magazine,19.50,Expense,shopping,true,15,2024-03-15 14:05:09"
        );
    }

    #[test]
    fn test_write_csv_empty_still_has_header() {
        let mut buf = Vec::new();
        let count = write_csv(&mut buf, std::iter::empty::<&Transaction>()).unwrap();
        assert_eq!(count, 0);
        assert!(String::from_utf8(buf).unwrap().starts_with("id,date,"));
    }

    #[test]
    fn test_export_csv_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports").join("out.csv");
        export_csv(&path, &[txn(1, "x", None)]).unwrap();
        assert!(path.exists());
    }
}
