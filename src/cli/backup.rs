use std::path::PathBuf;

use rusqlite::backup::Backup;

use crate::cli::Context;
use crate::db::get_connection;
use crate::error::{FintrackError, Result};
use crate::fmt::format_bytes;

pub fn run(ctx: &Context, output: Option<String>) -> Result<()> {
    let db_path = ctx.db_path();
    if !db_path.exists() {
        return Err(FintrackError::Other(format!(
            "no database at {}; run `fintrack init` first",
            db_path.display()
        )));
    }
    let conn = get_connection(&db_path)?;

    let dest_path = match output {
        Some(p) => PathBuf::from(p),
        None => {
            let backups_dir = ctx.data_dir().join("backups");
            std::fs::create_dir_all(&backups_dir)?;
            let stamp = ctx.now.format("%Y%m%d-%H%M%S");
            backups_dir.join(format!("fintrack-{stamp}.db"))
        }
    };

    let mut dest_conn = rusqlite::Connection::open(&dest_path)?;
    let backup = Backup::new(&conn, &mut dest_conn)?;
    backup.run_to_completion(100, std::time::Duration::from_millis(10), None)?;
    tracing::info!(dest = %dest_path.display(), "database backed up");

    let size = std::fs::metadata(&dest_path)?.len();
    println!("Backup saved to {}", dest_path.display());
    println!("Size: {}", format_bytes(size));
    Ok(())
}
