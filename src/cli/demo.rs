use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::cli::Context;
use crate::error::{FintrackError, Result};
use crate::models::{Category, NewTransaction, Recurrence, TransactionKind};
use crate::store::Ledger;

const INITIAL_CAPITAL: f64 = 5000.0;

/// Monthly items. Past months get plain copies; the template itself is
/// recorded today so the daily pass picks it up from here on.
struct RecurringTxn {
    day: u32,
    description: &'static str,
    amount: f64,
    kind: TransactionKind,
    category: Category,
}

const RECURRING: &[RecurringTxn] = &[
    RecurringTxn {
        day: 1,
        description: "Rent",
        amount: 4200.0,
        kind: TransactionKind::Expense,
        category: Category::Rent,
    },
    RecurringTxn {
        day: 9,
        description: "Phone plan",
        amount: 59.9,
        kind: TransactionKind::Expense,
        category: Category::Bills,
    },
    RecurringTxn {
        day: 10,
        description: "Salary",
        amount: 14500.0,
        kind: TransactionKind::Income,
        category: Category::Salary,
    },
];

/// One-off items rotated across months.
struct RotatingTxn {
    day: u32,
    description: &'static str,
    amount: f64,
    category: Category,
}

const ROTATING: &[RotatingTxn] = &[
    RotatingTxn {
        day: 3,
        description: "Supermarket",
        amount: 612.4,
        category: Category::Food,
    },
    RotatingTxn {
        day: 6,
        description: "Electricity bill",
        amount: 388.0,
        category: Category::Utilities,
    },
    RotatingTxn {
        day: 12,
        description: "Cinema",
        amount: 96.0,
        category: Category::Entertainment,
    },
    RotatingTxn {
        day: 14,
        description: "Bus pass",
        amount: 225.0,
        category: Category::Transport,
    },
    RotatingTxn {
        day: 18,
        description: "Pharmacy",
        amount: 74.5,
        category: Category::Health,
    },
    RotatingTxn {
        day: 21,
        description: "Bookstore",
        amount: 140.0,
        category: Category::Education,
    },
    RotatingTxn {
        day: 24,
        description: "New shoes",
        amount: 329.9,
        category: Category::Shopping,
    },
    RotatingTxn {
        day: 27,
        description: "Weekend trip",
        amount: 980.0,
        category: Category::Travel,
    },
    RotatingTxn {
        day: 30,
        description: "Groceries",
        amount: 455.2,
        category: Category::Food,
    },
];

/// Clamp a day to the last valid day of the given year/month.
fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next
        .and_then(|d| d.pred_opt())
        .map_or(day, |last| day.min(last.day()))
}

fn make_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, clamp_day(year, month, day))
}

struct DemoTxn {
    date: NaiveDate,
    new: NewTransaction,
}

/// History from January of `today`'s year up to `today`, oldest first,
/// followed by the recurring templates dated `today`.
fn generate_transactions(today: NaiveDate) -> Vec<DemoTxn> {
    let year = today.year();
    let mut txns = Vec::new();

    for month in 1..=today.month() {
        let idx = (month - 1) as usize;
        let mut batch = Vec::new();

        // Past occurrences of the monthly items, except today's
        for r in RECURRING {
            if let Some(date) = make_date(year, month, r.day) {
                batch.push(DemoTxn {
                    date,
                    new: NewTransaction {
                        description: r.description.to_string(),
                        amount: r.amount,
                        kind: r.kind,
                        category: r.category,
                        recurrence: None,
                    },
                });
            }
        }

        for j in 0..3usize {
            let rot = &ROTATING[(idx * 3 + j) % ROTATING.len()];
            // Small deterministic variation per month
            let vary = 1.0 + ((idx % 5) as f64 - 2.0) * 0.04;
            if let Some(date) = make_date(year, month, rot.day) {
                batch.push(DemoTxn {
                    date,
                    new: NewTransaction {
                        description: rot.description.to_string(),
                        amount: (rot.amount * vary * 100.0).round() / 100.0,
                        kind: TransactionKind::Expense,
                        category: rot.category,
                        recurrence: None,
                    },
                });
            }
        }

        if idx % 4 == 3 {
            if let Some(date) = make_date(year, month, 28) {
                batch.push(DemoTxn {
                    date,
                    new: NewTransaction {
                        description: "Quarterly bonus".to_string(),
                        amount: 2500.0,
                        kind: TransactionKind::Income,
                        category: Category::Bonus,
                        recurrence: None,
                    },
                });
            }
        }

        batch.retain(|t| t.date < today);
        batch.sort_by_key(|t| t.date);
        txns.extend(batch);
    }

    for r in RECURRING {
        txns.push(DemoTxn {
            date: today,
            new: NewTransaction {
                description: r.description.to_string(),
                amount: r.amount,
                kind: r.kind,
                category: r.category,
                recurrence: Recurrence::new(r.day, None, None).ok(),
            },
        });
    }
    txns
}

fn insert_demo_data(ledger: &mut Ledger, now: NaiveDateTime) -> Result<usize> {
    ledger.set_initial_capital(INITIAL_CAPITAL);
    let txns = generate_transactions(now.date());
    let count = txns.len();
    for t in txns {
        let stamp = t.date.and_time(now.time());
        ledger.add_on(t.new, t.date, stamp)?;
    }
    Ok(count)
}

pub fn run(ctx: &Context) -> Result<()> {
    let year = ctx.year(None);
    let mut repo = ctx.open_repo()?;
    let mut ledger = Ledger::load(&repo, year)?;

    // Idempotency guard
    if !ledger.transactions().is_empty() || !ledger.recurring().is_empty() {
        return Err(FintrackError::Other(format!(
            "{year} already has transactions; run `fintrack clear --yes` first"
        )));
    }

    let txn_count = insert_demo_data(&mut ledger, ctx.now)?;
    ledger.commit(&mut repo)?;
    tracing::info!(year, transactions = txn_count, "loaded demo data");

    println!("Demo data loaded!");
    println!("  Initial capital: {}", ctx.money(INITIAL_CAPITAL));
    println!("  Transactions:    {txn_count}");
    println!("  Recurring:       {}", RECURRING.len());
    println!();
    println!("Try these next:");
    println!("  fintrack list");
    println!("  fintrack balance");
    println!("  fintrack summary");
    println!("  fintrack breakdown");
    println!("  fintrack recurring list");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_clamp_day() {
        assert_eq!(clamp_day(2024, 2, 31), 29);
        assert_eq!(clamp_day(2023, 2, 31), 28);
        assert_eq!(clamp_day(2024, 4, 31), 30);
        assert_eq!(clamp_day(2024, 12, 31), 31);
        assert_eq!(clamp_day(2024, 6, 15), 15);
    }

    #[test]
    fn test_generate_transactions_stay_in_year_up_to_today() {
        let today = date(2024, 5, 20);
        let txns = generate_transactions(today);
        assert!(txns.iter().all(|t| t.date.year() == 2024 && t.date <= today));
        assert!(txns.iter().any(|t| t.date.month() == 1));
    }

    #[test]
    fn test_generate_transactions_ends_with_templates() {
        let today = date(2024, 5, 20);
        let txns = generate_transactions(today);
        let templates: Vec<_> = txns.iter().filter(|t| t.new.recurrence.is_some()).collect();
        assert_eq!(templates.len(), RECURRING.len());
        assert!(templates.iter().all(|t| t.date == today));
    }

    #[test]
    fn test_demo_creates_data() {
        let now = date(2024, 5, 20).and_hms_opt(9, 0, 0).unwrap();
        let mut ledger = Ledger::new(2024);
        let count = insert_demo_data(&mut ledger, now).unwrap();

        assert_eq!(ledger.transactions().len(), count);
        assert_eq!(ledger.recurring().len(), RECURRING.len());
        assert_eq!(ledger.initial_capital(), INITIAL_CAPITAL);

        let mut repo = MemoryRepository::new();
        ledger.save(&mut repo).unwrap();
        let reloaded = Ledger::load(&repo, 2024).unwrap();
        assert_eq!(reloaded.transactions().len(), count);
        assert_eq!(reloaded.next_id(), count as u64 + 1);
    }

    #[test]
    fn test_demo_ids_are_sequential() {
        let now = date(2024, 3, 2).and_hms_opt(9, 0, 0).unwrap();
        let mut ledger = Ledger::new(2024);
        insert_demo_data(&mut ledger, now).unwrap();
        let ids: Vec<u64> = ledger.transactions().iter().map(|t| t.id).collect();
        let expected: Vec<u64> = (1..=ids.len() as u64).collect();
        assert_eq!(ids, expected);
    }
}
