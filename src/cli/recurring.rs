use comfy_table::{Cell, Table};

use crate::cli::Context;
use crate::error::Result;
use crate::recurrence::RecurrenceState;
use crate::store::Ledger;

pub fn list(ctx: &Context, year: Option<i32>) -> Result<()> {
    let year = ctx.year(year);
    let repo = ctx.open_repo()?;
    let ledger = Ledger::load(&repo, year)?;

    if ledger.recurring().is_empty() {
        println!("No recurring transactions for {year}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Description", "Category", "Type", "Amount", "Day", "Start", "End"]);
    for t in ledger.recurring() {
        let Some(r) = t.recurrence else { continue };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.description),
            Cell::new(t.category),
            Cell::new(t.kind),
            Cell::new(ctx.money(t.amount)),
            Cell::new(r.day),
            Cell::new(r.start.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(r.end.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
        ]);
    }
    println!("Recurring transactions {year}\n{table}");
    if ctx.settings.enforce_recurring_bounds {
        println!("Start/end dates are enforced.");
    }
    Ok(())
}

/// Explicit pass, reporting when today has already been handled.
pub fn run(ctx: &Context) -> Result<()> {
    let mut repo = ctx.open_repo()?;
    let report = ctx.processor().run(&mut repo, ctx.now)?;
    if report.state == RecurrenceState::Settled {
        println!("Recurring transactions already processed today.");
        return Ok(());
    }
    println!(
        "{} recurring transaction(s) processed for {}.",
        report.generated.len(),
        ctx.today()
    );
    for t in &report.generated {
        println!("  #{} {} {}", t.id, t.description, ctx.money(t.amount));
    }
    Ok(())
}

/// Silent unless something was generated.
pub fn on_startup(ctx: &Context) -> Result<()> {
    let mut repo = ctx.open_repo()?;
    let report = ctx.processor().run(&mut repo, ctx.now)?;
    if !report.generated.is_empty() {
        println!(
            "{} recurring transaction(s) processed for today.",
            report.generated.len()
        );
    }
    Ok(())
}
