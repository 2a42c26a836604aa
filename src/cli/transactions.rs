use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{parse_date_opt, Context, FilterArgs};
use crate::error::{FintrackError, Result};
use crate::models::{
    parse_date, Category, NewTransaction, Recurrence, Transaction, TransactionKind,
    TransactionPatch,
};
use crate::reports::totals;
use crate::store::Ledger;

#[allow(clippy::too_many_arguments)]
pub fn add(
    ctx: &Context,
    description: &str,
    amount: f64,
    kind: &str,
    category: &str,
    recurring_day: Option<u32>,
    start: Option<String>,
    end: Option<String>,
) -> Result<()> {
    let recurrence = match recurring_day {
        Some(day) => Some(Recurrence::new(
            day,
            parse_date_opt(&start)?,
            parse_date_opt(&end)?,
        )?),
        None => None,
    };
    let new = NewTransaction {
        description: description.to_string(),
        amount,
        kind: kind.parse()?,
        category: category.parse()?,
        recurrence,
    };

    let mut repo = ctx.open_repo()?;
    let mut ledger = Ledger::load(&repo, ctx.year(None))?;
    let t = ledger.add(new, ctx.now)?;
    ledger.commit(&mut repo)?;

    let suffix = match t.recurrence {
        Some(r) => format!(" (repeats on day {})", r.day),
        None => String::new(),
    };
    println!(
        "Added transaction {}: {} {} [{}]{suffix}",
        t.id,
        t.description,
        ctx.money(t.amount),
        t.kind
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn edit(
    ctx: &Context,
    id: u64,
    year: Option<i32>,
    description: Option<String>,
    amount: Option<f64>,
    kind: Option<String>,
    category: Option<String>,
    date: Option<String>,
    recurring_day: Option<u32>,
    start: Option<String>,
    end: Option<String>,
    no_recurring: bool,
) -> Result<()> {
    let patch = TransactionPatch {
        description,
        amount,
        kind: kind.as_deref().map(str::parse::<TransactionKind>).transpose()?,
        category: category.as_deref().map(str::parse::<Category>).transpose()?,
        date: date.as_deref().map(parse_date).transpose()?,
        recurring_day,
        recurring_start: parse_date_opt(&start)?,
        recurring_end: parse_date_opt(&end)?,
        clear_recurrence: no_recurring,
    };

    let mut repo = ctx.open_repo()?;
    let mut ledger = Ledger::load(&repo, ctx.year(year))?;
    if !ledger.edit(id, &patch)? {
        return Err(FintrackError::NoSuchTransaction(id));
    }
    ledger.commit(&mut repo)?;
    println!("Updated transaction {id}");
    Ok(())
}

pub fn delete(ctx: &Context, id: u64, year: Option<i32>) -> Result<()> {
    let mut repo = ctx.open_repo()?;
    let mut ledger = Ledger::load(&repo, ctx.year(year))?;
    if ledger.delete(id) {
        ledger.commit(&mut repo)?;
        println!("Deleted transaction {id}");
    } else {
        println!("No transaction with ID {id}; nothing deleted");
    }
    Ok(())
}

pub fn list(ctx: &Context, args: &FilterArgs) -> Result<()> {
    let (year, filter) = args.resolve(ctx)?;
    let repo = ctx.open_repo()?;
    let ledger = Ledger::load(&repo, year)?;
    let rows = filter.apply(ledger.transactions());

    if rows.is_empty() {
        println!("No transactions for {year}.");
        return Ok(());
    }

    println!("Transactions {year}\n{}", transaction_table(ctx, rows.iter().copied()));
    let sums = totals(rows.iter().copied());
    println!(
        "{} {}   {} {}   {} {}",
        "Income:".green().bold(),
        ctx.money(sums.income),
        "Expenses:".red().bold(),
        ctx.money(sums.expenses),
        "Net:".bold(),
        ctx.money(sums.net)
    );
    Ok(())
}

pub(crate) fn transaction_table<'a, I>(ctx: &Context, rows: I) -> Table
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Category", "Type", "Amount", "Recurs"]);
    for t in rows {
        let amount = match t.kind {
            TransactionKind::Income => ctx.money(t.amount).green(),
            TransactionKind::Expense => ctx.money(t.amount).red(),
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.date),
            Cell::new(&t.description),
            Cell::new(t.category),
            Cell::new(t.kind),
            Cell::new(amount),
            Cell::new(
                t.recurrence
                    .map(|r| format!("day {}", r.day))
                    .unwrap_or_default(),
            ),
        ]);
    }
    table
}
