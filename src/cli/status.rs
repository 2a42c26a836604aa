use crate::cli::Context;
use crate::db::count_keys;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::repository::Repository;
use crate::store::Ledger;

pub fn run(ctx: &Context) -> Result<()> {
    let data_dir = ctx.data_dir();
    let db_path = ctx.db_path();

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());
    println!("Currency:   {}", ctx.settings.currency_symbol);
    println!(
        "Bounds:     {}",
        if ctx.settings.enforce_recurring_bounds { "enforced" } else { "ignored" }
    );

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `fintrack init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("DB size:    {}", format_bytes(size));

    let repo = ctx.open_repo()?;
    let year = ctx.year(None);
    let ledger = Ledger::load(&repo, year)?;
    let keys = count_keys(repo.connection())?;
    let last = repo
        .watermark()?
        .map(|d| d.to_string())
        .unwrap_or_else(|| "never".to_string());

    println!();
    println!("Stored keys:    {keys}");
    println!("Year:           {year}");
    println!("Transactions:   {}", ledger.transactions().len());
    println!("Recurring:      {}", ledger.recurring().len());
    println!("Next ID:        {}", ledger.next_id());
    println!("Last processed: {last}");
    Ok(())
}
