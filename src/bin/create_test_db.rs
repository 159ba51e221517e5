use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use budget_tracker::{Transaction, initialize_db};

/// A utility for creating a test database for the Budget Tracker server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// How many days of transactions to generate.
    #[arg(long, default_value_t = 30)]
    days: i64,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test transactions...");

    let start = OffsetDateTime::now_utc() - Duration::days(args.days);
    let transactions: Vec<Transaction> = (0..args.days)
        .map(|day| {
            let date = start + Duration::days(day);
            if day % 14 == 0 {
                Transaction::new("Salary", 2000, date)
            } else {
                Transaction::new("Groceries", -(20 + (day * 7) % 60), date)
            }
        })
        .collect();

    budget_tracker::create_transactions(&transactions, &conn)?;

    println!("Created {} transactions.", transactions.len());
    println!("Success!");

    Ok(())
}
