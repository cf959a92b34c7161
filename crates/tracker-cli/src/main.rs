//! Tracker CLI - keep track of the products you are testing
//!
//! Every invocation starts the sync engine against the shared record
//! database, applies one command and waits for its writes to land.

mod cli;
mod commands;
mod error;
mod identity_store;
mod reminders;
mod session;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::{run_add, AddArgs};
use crate::commands::auth_cmd::{run_login, run_logout};
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, EditArgs};
use crate::commands::list::{run_list, ListFilter};
use crate::commands::status::run_status;
use crate::commands::toggle::run_toggle;
use crate::commands::urgent::run_urgent;
use crate::error::CliError;
use crate::identity_store::DataPaths;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tracker=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };
    if let Commands::Completions { shell, output } = &command {
        return run_completions(*shell, output.as_deref());
    }

    let paths = DataPaths::resolve(cli.data_dir, cli.db_path)?;

    match command {
        Commands::List {
            completed,
            pending,
            json,
        } => run_list(ListFilter::from_flags(completed, pending), json, &paths).await?,
        Commands::Add {
            name,
            brand,
            category,
            priority,
            notes,
            due,
        } => {
            let args = AddArgs {
                name,
                brand,
                category,
                priority: priority.into(),
                notes,
                due,
            };
            run_add(args, &paths).await?;
        }
        Commands::Toggle { id } => run_toggle(&id, &paths).await?,
        Commands::Edit {
            id,
            name,
            brand,
            category,
            priority,
            notes,
            due,
            clear_due,
        } => {
            let args = EditArgs {
                name,
                brand,
                category,
                priority: priority.map(Into::into),
                notes,
                due,
                clear_due,
            };
            run_edit(&id, args, &paths).await?;
        }
        Commands::Delete { id } => run_delete(&id, &paths).await?,
        Commands::Urgent => run_urgent(&paths).await?,
        Commands::Status => run_status(&paths).await?,
        Commands::Login { uid, anonymous } => run_login(uid, anonymous, &paths).await?,
        Commands::Logout => run_logout(&paths).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
