mod cli;
mod db;
mod error;
mod exporter;
mod fmt;
mod logging;
mod models;
mod recurrence;
mod reports;
mod repository;
mod settings;
mod store;

use clap::Parser;

use cli::{Cli, Commands, Context, RecurringCommands};
use error::Result;

fn dispatch(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Init {
            data_dir,
            currency,
            enforce_bounds,
        } => cli::init::run(data_dir, currency, enforce_bounds),
        Commands::Add {
            description,
            amount,
            kind,
            category,
            recurring_day,
            start,
            end,
        } => cli::transactions::add(
            ctx,
            &description,
            amount,
            &kind,
            &category,
            recurring_day,
            start,
            end,
        ),
        Commands::Edit {
            id,
            description,
            amount,
            kind,
            category,
            date,
            recurring_day,
            start,
            end,
            no_recurring,
            year,
        } => cli::transactions::edit(
            ctx,
            id,
            year,
            description,
            amount,
            kind,
            category,
            date,
            recurring_day,
            start,
            end,
            no_recurring,
        ),
        Commands::Delete { id, year } => cli::transactions::delete(ctx, id, year),
        Commands::List { filter } => cli::transactions::list(ctx, &filter),
        Commands::Balance { year } => cli::report::balance(ctx, year),
        Commands::Capital { amount, year } => cli::capital::run(ctx, amount, year),
        Commands::Summary { year, month } => cli::report::summary(ctx, year, month),
        Commands::Breakdown { filter } => cli::report::breakdown(ctx, &filter),
        Commands::Export { filter, output } => cli::export::run(ctx, &filter, output),
        Commands::Recurring { command } => match command {
            RecurringCommands::List { year } => cli::recurring::list(ctx, year),
            RecurringCommands::Run => cli::recurring::run(ctx),
        },
        Commands::Clear { yes, year } => cli::clear::run(ctx, yes, year),
        Commands::Demo => cli::demo::run(ctx),
        Commands::Backup { output } => cli::backup::run(ctx, output),
        Commands::Status => cli::status::run(ctx),
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(cli.today.as_deref())?;
    if cli.command.processes_recurring() {
        cli::recurring::on_startup(&ctx)?;
    }
    dispatch(&ctx, cli.command)
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
