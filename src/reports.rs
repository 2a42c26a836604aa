use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::models::{Category, Transaction, TransactionKind};
use crate::store::Ledger;

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Criteria applied before listings and reports. Unset fields match all.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub month: Option<u32>,
    pub category: Option<Category>,
    pub kind: Option<TransactionKind>,
}

impl Filter {
    pub fn matches(&self, t: &Transaction) -> bool {
        self.from.map_or(true, |from| t.date >= from)
            && self.to.map_or(true, |to| t.date <= to)
            && self.month.map_or(true, |m| t.date.month() == m)
            && self.category.map_or(true, |c| t.category == c)
            && self.kind.map_or(true, |k| t.kind == k)
    }

    pub fn apply<'a>(&self, txns: &'a [Transaction]) -> Vec<&'a Transaction> {
        txns.iter().filter(|t| self.matches(t)).collect()
    }
}

// ---------------------------------------------------------------------------
// Totals & balance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    pub count: usize,
}

pub fn totals<'a, I>(txns: I) -> Totals
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut out = Totals::default();
    for t in txns {
        match t.kind {
            TransactionKind::Income => out.income += t.amount,
            TransactionKind::Expense => out.expenses += t.amount,
        }
        out.count += 1;
    }
    out.net = out.income - out.expenses;
    out
}

pub struct BalanceReport {
    pub year: i32,
    pub initial_capital: f64,
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
}

pub fn get_balance(ledger: &Ledger) -> BalanceReport {
    let t = totals(ledger.transactions());
    BalanceReport {
        year: ledger.year(),
        initial_capital: ledger.initial_capital(),
        income: t.income,
        expenses: t.expenses,
        balance: ledger.initial_capital() + t.net,
    }
}

// ---------------------------------------------------------------------------
// Category breakdown
// ---------------------------------------------------------------------------

pub struct CategoryItem {
    pub category: Category,
    pub total: f64,
    pub count: usize,
    pub pct: f64,
}

pub struct CategoryBreakdown {
    pub categories: Vec<CategoryItem>,
    pub total: f64,
}

/// Expense totals per category, largest first.
pub fn get_category_breakdown<'a, I>(txns: I) -> CategoryBreakdown
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut grouped: BTreeMap<Category, (f64, usize)> = BTreeMap::new();
    for t in txns.into_iter().filter(|t| t.kind == TransactionKind::Expense) {
        let entry = grouped.entry(t.category).or_insert((0.0, 0));
        entry.0 += t.amount;
        entry.1 += 1;
    }

    let total: f64 = grouped.values().map(|(sum, _)| sum).sum();
    let mut categories: Vec<CategoryItem> = grouped
        .into_iter()
        .map(|(category, (sum, count))| CategoryItem {
            category,
            total: sum,
            count,
            pct: if total != 0.0 { sum / total * 100.0 } else { 0.0 },
        })
        .collect();
    categories.sort_by(|a, b| b.total.total_cmp(&a.total));

    CategoryBreakdown { categories, total }
}

// ---------------------------------------------------------------------------
// Monthly summary
// ---------------------------------------------------------------------------

pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub totals: Totals,
}

pub fn get_month_summary(txns: &[Transaction], year: i32, month: u32) -> MonthSummary {
    MonthSummary {
        year,
        month,
        totals: totals(
            txns.iter()
                .filter(|t| t.date.year() == year && t.date.month() == month),
        ),
    }
}

/// One row per calendar month of `year`, January first.
pub fn get_year_summary(txns: &[Transaction], year: i32) -> Vec<MonthSummary> {
    (1..=12)
        .map(|month| get_month_summary(txns, year, month))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(d: NaiveDate) -> NaiveDateTime {
        d.and_hms_opt(12, 0, 0).unwrap()
    }

    fn txn(id: u64, d: NaiveDate, amount: f64, kind: TransactionKind, category: Category) -> Transaction {
        Transaction {
            id,
            description: format!("t{id}"),
            amount,
            kind,
            category,
            date: d,
            timestamp: ts(d),
            recurrence: None,
        }
    }

    fn seed() -> Vec<Transaction> {
        vec![
            txn(1, date(2025, 1, 15), 1000.0, TransactionKind::Income, Category::Salary),
            txn(2, date(2025, 1, 20), 50.0, TransactionKind::Expense, Category::Food),
            txn(3, date(2025, 2, 10), 10.0, TransactionKind::Expense, Category::Food),
            txn(4, date(2025, 2, 11), 400.0, TransactionKind::Expense, Category::Rent),
        ]
    }

    #[test]
    fn test_totals() {
        let t = totals(&seed());
        assert_eq!(t.income, 1000.0);
        assert_eq!(t.expenses, 460.0);
        assert_eq!(t.net, 540.0);
        assert_eq!(t.count, 4);
    }

    #[test]
    fn test_filter_by_date_range() {
        let txns = seed();
        let filter = Filter {
            from: Some(date(2025, 1, 20)),
            to: Some(date(2025, 2, 10)),
            ..Default::default()
        };
        let ids: Vec<u64> = filter.apply(&txns).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_filter_open_ended_range() {
        let txns = seed();
        let filter = Filter {
            from: Some(date(2025, 2, 1)),
            ..Default::default()
        };
        assert_eq!(filter.apply(&txns).len(), 2);
    }

    #[test]
    fn test_filter_by_category_kind_and_month() {
        let txns = seed();
        let food = Filter {
            category: Some(Category::Food),
            ..Default::default()
        };
        assert_eq!(food.apply(&txns).len(), 2);

        let income = Filter {
            kind: Some(TransactionKind::Income),
            ..Default::default()
        };
        assert_eq!(income.apply(&txns).len(), 1);

        let feb_food = Filter {
            month: Some(2),
            category: Some(Category::Food),
            ..Default::default()
        };
        assert_eq!(feb_food.apply(&txns)[0].id, 3);
    }

    #[test]
    fn test_category_breakdown_orders_by_amount() {
        let breakdown = get_category_breakdown(&seed());
        assert_eq!(breakdown.total, 460.0);
        assert_eq!(breakdown.categories.len(), 2);
        assert_eq!(breakdown.categories[0].category, Category::Rent);
        assert_eq!(breakdown.categories[1].category, Category::Food);
        assert_eq!(breakdown.categories[1].count, 2);
        assert!((breakdown.categories[1].pct - 60.0 / 460.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_category_breakdown_ignores_income() {
        let txns = vec![txn(1, date(2025, 1, 1), 10.0, TransactionKind::Income, Category::Bonus)];
        let breakdown = get_category_breakdown(&txns);
        assert!(breakdown.categories.is_empty());
        assert_eq!(breakdown.total, 0.0);
    }

    #[test]
    fn test_month_summary() {
        let jan = get_month_summary(&seed(), 2025, 1);
        assert_eq!(jan.totals.income, 1000.0);
        assert_eq!(jan.totals.expenses, 50.0);
        assert_eq!(jan.totals.net, 950.0);

        let mar = get_month_summary(&seed(), 2025, 3);
        assert_eq!(mar.totals.count, 0);
    }

    #[test]
    fn test_year_summary_has_twelve_months() {
        let rows = get_year_summary(&seed(), 2025);
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[1].totals.expenses, 410.0);
        assert_eq!(rows.iter().map(|r| r.totals.count).sum::<usize>(), 4);
    }

    #[test]
    fn test_balance_includes_initial_capital() {
        let mut ledger = Ledger::new(2025);
        ledger.set_initial_capital(200.0);
        let report = get_balance(&ledger);
        assert_eq!(report.balance, 200.0);
        assert_eq!(report.income, 0.0);
    }
}
