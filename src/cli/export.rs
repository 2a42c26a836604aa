use std::path::PathBuf;

use crate::cli::{Context, FilterArgs};
use crate::error::Result;
use crate::exporter::export_csv;
use crate::settings::shellexpand_path;
use crate::store::Ledger;

pub fn run(ctx: &Context, args: &FilterArgs, output: Option<String>) -> Result<()> {
    let (year, filter) = args.resolve(ctx)?;
    let repo = ctx.open_repo()?;
    let ledger = Ledger::load(&repo, year)?;
    let rows = filter.apply(ledger.transactions());

    let path = match output {
        Some(p) => PathBuf::from(shellexpand_path(&p)),
        None => ctx.data_dir().join("exports").join(format!(
            "transactions-{year}-{}.csv",
            ctx.today().format("%Y-%m-%d")
        )),
    };
    let count = export_csv(&path, rows)?;
    println!("Exported {count} transaction(s) to {}", path.display());
    Ok(())
}
