use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{parse_month_opt, Context, FilterArgs};
use crate::error::Result;
use crate::reports;
use crate::store::Ledger;

fn month_name(month: u32) -> String {
    NaiveDate::from_ymd_opt(2000, month, 1)
        .map(|d| d.format("%B").to_string())
        .unwrap_or_else(|| month.to_string())
}

pub fn balance(ctx: &Context, year: Option<i32>) -> Result<()> {
    let repo = ctx.open_repo()?;
    let ledger = Ledger::load(&repo, ctx.year(year))?;
    let report = reports::get_balance(&ledger);

    let mut table = Table::new();
    table.set_header(vec!["", "Amount"]);
    table.add_row(vec![
        Cell::new("Initial capital"),
        Cell::new(ctx.money(report.initial_capital)),
    ]);
    table.add_row(vec![
        Cell::new("Income".green()),
        Cell::new(ctx.money(report.income)),
    ]);
    table.add_row(vec![
        Cell::new("Expenses".red()),
        Cell::new(ctx.money(report.expenses)),
    ]);
    let label = if report.balance >= 0.0 {
        "BALANCE".green().bold()
    } else {
        "BALANCE".red().bold()
    };
    table.add_row(vec![Cell::new(label), Cell::new(ctx.money(report.balance))]);

    println!("Balance {}\n{table}", report.year);
    Ok(())
}

pub fn summary(ctx: &Context, year: Option<i32>, month: Option<String>) -> Result<()> {
    let (month_year, mm) = parse_month_opt(&month)?;
    let y = ctx.year(year.or(month_year));
    let repo = ctx.open_repo()?;
    let ledger = Ledger::load(&repo, y)?;

    let rows = match mm {
        Some(m) => vec![reports::get_month_summary(ledger.transactions(), y, m)],
        None => reports::get_year_summary(ledger.transactions(), y),
    };

    let mut table = Table::new();
    table.set_header(vec!["Month", "Income", "Expenses", "Net", "Count"]);
    for row in &rows {
        let net = if row.totals.net >= 0.0 {
            ctx.money(row.totals.net).green()
        } else {
            ctx.money(row.totals.net).red()
        };
        table.add_row(vec![
            Cell::new(month_name(row.month)),
            Cell::new(ctx.money(row.totals.income)),
            Cell::new(ctx.money(row.totals.expenses)),
            Cell::new(net),
            Cell::new(row.totals.count),
        ]);
    }

    if rows.len() > 1 {
        let all = reports::totals(ledger.transactions());
        table.add_row(vec![
            Cell::new("Total".bold()),
            Cell::new(ctx.money(all.income)),
            Cell::new(ctx.money(all.expenses)),
            Cell::new(ctx.money(all.net)),
            Cell::new(all.count),
        ]);
    }

    println!("Summary {y}\n{table}");
    Ok(())
}

pub fn breakdown(ctx: &Context, args: &FilterArgs) -> Result<()> {
    let (year, filter) = args.resolve(ctx)?;
    let repo = ctx.open_repo()?;
    let ledger = Ledger::load(&repo, year)?;
    let data = reports::get_category_breakdown(filter.apply(ledger.transactions()));

    if data.categories.is_empty() {
        println!("No expenses for {year}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Category", "Amount", "%", "Count"]);
    for item in &data.categories {
        table.add_row(vec![
            Cell::new(item.category),
            Cell::new(ctx.money(item.total)),
            Cell::new(format!("{:.1}%", item.pct)),
            Cell::new(item.count),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(ctx.money(data.total)),
        Cell::new(""),
        Cell::new(""),
    ]);
    println!("Expense Breakdown {year}\n{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_name() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(13), "13");
    }
}
