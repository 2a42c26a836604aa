use crate::cli::Context;
use crate::error::{FintrackError, Result};
use crate::store::Ledger;

pub fn run(ctx: &Context, amount: f64, year: Option<i32>) -> Result<()> {
    if !amount.is_finite() {
        return Err(FintrackError::InvalidAmount(amount.to_string()));
    }
    let year = ctx.year(year);
    let mut repo = ctx.open_repo()?;
    let mut ledger = Ledger::load(&repo, year)?;
    ledger.set_initial_capital(amount);
    ledger.commit(&mut repo)?;
    println!("Initial capital for {year} set to {}", ctx.money(amount));
    Ok(())
}
