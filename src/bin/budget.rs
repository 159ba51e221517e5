use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use budget_tracker::{
    Error, TransactionAction,
    client::{Client, ClientConfig, LoadReport, ReplayReport, SubmitOutcome, open},
    page::FormState,
};

/// Keep track of your budget, even when the server is unreachable.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ClientConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the total and every transaction.
    Show {
        /// Also write the rendered budget page to this file.
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Add funds.
    Add(TransactionArgs),
    /// Subtract funds.
    Subtract(TransactionArgs),
    /// Print the number of queued writes and the cache buckets.
    Status,
}

#[derive(Args, Debug)]
struct TransactionArgs {
    /// What the transaction was for.
    #[arg(long, default_value = "")]
    name: String,

    /// The amount in whole dollars.
    #[arg(long, default_value = "")]
    amount: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging();

    let mut client = match open(&cli.config).await {
        Ok(client) => client,
        Err(error) => {
            eprintln!(
                "Durable storage is unavailable at {:?}, cannot continue: {error}",
                cli.config.data_path
            );
            return ExitCode::FAILURE;
        }
    };

    match run(&mut client, cli.command).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Could not update local storage: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &mut Client, command: Command) -> Result<ExitCode, Error> {
    let report = client.load().await?;
    print_load_report(&report);

    match command {
        Command::Show { html } => {
            print_summary(client);

            if let Some(path) = html {
                if let Err(error) = std::fs::write(&path, client.render().into_string()) {
                    eprintln!("Could not write page to {path:?}: {error}");
                    return Ok(ExitCode::FAILURE);
                }
                println!("Wrote page to {path:?}");
            }
        }
        Command::Add(args) => return submit(client, TransactionAction::Add, args).await,
        Command::Subtract(args) => return submit(client, TransactionAction::Subtract, args).await,
        Command::Status => print_status(client)?,
    }

    Ok(ExitCode::SUCCESS)
}

async fn submit(
    client: &mut Client,
    action: TransactionAction,
    args: TransactionArgs,
) -> Result<ExitCode, Error> {
    *client.form_mut() = FormState::new(&args.name, &args.amount);

    let outcome = client.submit(action).await?;
    let code = match outcome {
        SubmitOutcome::Invalid | SubmitOutcome::Rejected => {
            eprintln!("{}", client.form().error.as_deref().unwrap_or_default());
            ExitCode::FAILURE
        }
        SubmitOutcome::Saved | SubmitOutcome::Queued(_) => ExitCode::SUCCESS,
    };

    print_summary(client);

    Ok(code)
}

fn print_load_report(report: &LoadReport) {
    if report.fetched.is_none() {
        tracing::warn!("Could not reach the server, showing local changes only");
    }

    match report.replay {
        ReplayReport::Empty => {}
        ReplayReport::Delivered(count) => tracing::info!("Synced {count} offline transactions"),
        ReplayReport::Deferred(count) => {
            tracing::info!("{count} offline transactions are waiting to sync")
        }
    }
}

fn print_summary(client: &Client) {
    let ledger = client.ledger();

    println!("Your total is: ${}", ledger.total());

    let name_width = ledger
        .transactions()
        .iter()
        .map(|transaction| transaction.name.chars().count())
        .max()
        .unwrap_or(0);

    for transaction in ledger.transactions() {
        println!(
            "  {:<name_width$}  {:>10}",
            transaction.name, transaction.value
        );
    }
}

fn print_status(client: &Client) -> Result<(), Error> {
    let pending = client.queue().pending()?;
    println!("Queued writes: {}", pending.len());
    for record in &pending {
        println!(
            "  #{} {} {} ({}, {} failed attempts)",
            record.id,
            record.transaction.name,
            record.transaction.value,
            record.state,
            record.attempts
        );
    }

    let worker = client.remote().fetcher();
    println!(
        "Offline cache: {}",
        if worker.is_active() { "active" } else { "inactive" }
    );
    for name in worker.caches().bucket_names()? {
        println!("  {name}");
    }

    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
}
