use crate::cli::Context;
use crate::error::{FintrackError, Result};
use crate::store::Ledger;

pub fn run(ctx: &Context, yes: bool, year: Option<i32>) -> Result<()> {
    let year = ctx.year(year);
    if !yes {
        return Err(FintrackError::Other(format!(
            "this deletes every transaction of {year}; re-run with --yes to confirm"
        )));
    }

    let mut repo = ctx.open_repo()?;
    let mut ledger = Ledger::load(&repo, year)?;
    let removed = ledger.transactions().len();
    let capital = ledger.clear_all();
    ledger.commit(&mut repo)?;
    tracing::info!(year, removed, capital, "cleared ledger");

    println!("Cleared {removed} transaction(s) from {year}.");
    println!("Initial capital is now {}", ctx.money(capital));
    Ok(())
}
