use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{FintrackError, Result};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Whether a transaction adds to or subtracts from the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Income,
    Expense,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "Income"),
            Self::Expense => write!(f, "Expense"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = FintrackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(FintrackError::UnknownKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Rent,
    Utilities,
    Entertainment,
    Transport,
    Health,
    Misc,
    Salary,
    Bonus,
    Other,
    Shopping,
    Education,
    Travel,
    Bills,
}

impl Category {
    pub const ALL: [Category; 14] = [
        Self::Food,
        Self::Rent,
        Self::Utilities,
        Self::Entertainment,
        Self::Transport,
        Self::Health,
        Self::Misc,
        Self::Salary,
        Self::Bonus,
        Self::Other,
        Self::Shopping,
        Self::Education,
        Self::Travel,
        Self::Bills,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Rent => "rent",
            Self::Utilities => "utilities",
            Self::Entertainment => "entertainment",
            Self::Transport => "transport",
            Self::Health => "health",
            Self::Misc => "misc",
            Self::Salary => "salary",
            Self::Bonus => "bonus",
            Self::Other => "other",
            Self::Shopping => "shopping",
            Self::Education => "education",
            Self::Travel => "travel",
            Self::Bills => "bills",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = FintrackError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.key() == wanted)
            .ok_or_else(|| FintrackError::UnknownCategory(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Recurrence
// ---------------------------------------------------------------------------

/// Monthly schedule attached to a recurring template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recurrence {
    pub day: u32,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Recurrence {
    pub fn new(day: u32, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        if !(1..=31).contains(&day) {
            return Err(FintrackError::InvalidRecurringDay(day));
        }
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(FintrackError::Other(format!(
                    "recurring start date {s} is after end date {e}"
                )));
            }
        }
        Ok(Self { day, start, end })
    }

    /// True when `date` falls inside whichever bounds are set.
    pub fn within_bounds(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| s <= date) && self.end.map_or(true, |e| date <= e)
    }

    /// A day that does not exist in the month (31 in April) never matches.
    pub fn is_due(&self, date: NaiveDate, enforce_bounds: bool) -> bool {
        self.day == date.day() && (!enforce_bounds || self.within_bounds(date))
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransactionRecord", into = "TransactionRecord")]
pub struct Transaction {
    pub id: u64,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: Category,
    pub date: NaiveDate,
    pub timestamp: NaiveDateTime,
    pub recurrence: Option<Recurrence>,
}

impl Transaction {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Effect on the balance: positive for income, negative for expense.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

/// Flat persisted layout. Recurrence fields are only written when the
/// transaction is recurring.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRecord {
    id: u64,
    #[serde(default)]
    description: String,
    amount: f64,
    #[serde(rename = "type")]
    kind: TransactionKind,
    category: Category,
    date: NaiveDate,
    timestamp: NaiveDateTime,
    #[serde(default)]
    is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recurring_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recurring_start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recurring_end_date: Option<NaiveDate>,
}

impl From<TransactionRecord> for Transaction {
    fn from(r: TransactionRecord) -> Self {
        let recurrence = match (r.is_recurring, r.recurring_day) {
            (true, Some(day)) => Some(Recurrence {
                day,
                start: r.recurring_start_date,
                end: r.recurring_end_date,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            description: r.description,
            amount: r.amount,
            kind: r.kind,
            category: r.category,
            date: r.date,
            timestamp: r.timestamp,
            recurrence,
        }
    }
}

impl From<Transaction> for TransactionRecord {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            description: t.description,
            amount: t.amount,
            kind: t.kind,
            category: t.category,
            date: t.date,
            timestamp: t.timestamp,
            is_recurring: t.recurrence.is_some(),
            recurring_day: t.recurrence.map(|r| r.day),
            recurring_start_date: t.recurrence.and_then(|r| r.start),
            recurring_end_date: t.recurrence.and_then(|r| r.end),
        }
    }
}

/// User input for a new transaction; id, date and timestamp are assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: Category,
    pub recurrence: Option<Recurrence>,
}

/// Partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub kind: Option<TransactionKind>,
    pub category: Option<Category>,
    pub date: Option<NaiveDate>,
    pub recurring_day: Option<u32>,
    pub recurring_start: Option<NaiveDate>,
    pub recurring_end: Option<NaiveDate>,
    pub clear_recurrence: bool,
}

impl TransactionPatch {
    /// Whether the patch sets, moves or clears the recurring schedule.
    pub fn touches_recurrence(&self) -> bool {
        self.clear_recurrence
            || self.recurring_day.is_some()
            || self.recurring_start.is_some()
            || self.recurring_end.is_some()
    }

    /// Produce the edited copy of `current`. The id never changes.
    pub fn apply(&self, current: &Transaction) -> Result<Transaction> {
        let mut updated = current.clone();
        if let Some(description) = &self.description {
            updated.description = description.clone();
        }
        if let Some(amount) = self.amount {
            updated.amount = validate_amount(amount)?;
        }
        if let Some(kind) = self.kind {
            updated.kind = kind;
        }
        if let Some(category) = self.category {
            updated.category = category;
        }
        if let Some(date) = self.date {
            updated.date = date;
        }

        // Untouched schedules are carried over as stored, even if invalid
        if !self.touches_recurrence() {
            return Ok(updated);
        }
        updated.recurrence = if self.clear_recurrence {
            None
        } else {
            match (self.recurring_day, current.recurrence) {
                (Some(day), existing) => Some(Recurrence::new(
                    day,
                    self.recurring_start.or(existing.and_then(|r| r.start)),
                    self.recurring_end.or(existing.and_then(|r| r.end)),
                )?),
                (None, Some(existing)) => Some(Recurrence::new(
                    existing.day,
                    self.recurring_start.or(existing.start),
                    self.recurring_end.or(existing.end),
                )?),
                (None, None) => {
                    if self.recurring_start.is_some() || self.recurring_end.is_some() {
                        return Err(FintrackError::Other(
                            "recurring bounds need a recurring day on a non-recurring transaction"
                                .to_string(),
                        ));
                    }
                    None
                }
            }
        };
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// Input helpers
// ---------------------------------------------------------------------------

pub fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(FintrackError::InvalidAmount(amount.to_string()));
    }
    Ok(amount)
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| FintrackError::InvalidDate(raw.to_string()))
}
