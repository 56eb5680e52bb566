//! Blend Calculator
//!
//! Octane and cost calculator for fuel blends.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use blend_calculator::calculator::CalculationReport;
use blend_calculator::db;
use blend_calculator::input;
use blend_calculator::sheet::BlendSheet;

#[derive(Parser)]
#[command(name = "blend-calculator")]
#[command(about = "Octane and cost calculator for fuel blends")]
struct Cli {
    /// Path to the SQLite database of saved calculations
    #[arg(short, long, env = "BLEND_CALC_DB", default_value = "blend_calc.db")]
    database: PathBuf,

    /// Increase log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Calculate blend totals for a set of materials
    Calc {
        /// JSON file with entries (array, or object with "sale_price" and "entries")
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Material as NAME:OCTANE:PRICE:PERCENT (repeatable)
        #[arg(short, long = "material", value_name = "NAME:OCTANE:PRICE:PERCENT")]
        materials: Vec<String>,

        /// Sale price of the finished blend
        #[arg(short, long, value_parser = sale_price_arg)]
        sale_price: Option<f64>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Write the combined entries back out as a JSON draft
        #[arg(long, value_name = "PATH")]
        draft: Option<PathBuf>,

        /// Save the calculation to the database
        #[arg(long)]
        save: bool,

        /// Calculation date (YYYY-MM-DD), defaults to today
        #[arg(long, requires = "save")]
        date: Option<NaiveDate>,

        /// Notes stored with a saved calculation
        #[arg(long, requires = "save")]
        notes: Option<String>,
    },

    /// List saved calculations
    History,

    /// Show a saved calculation
    Show {
        /// Calculation ID
        id: i64,
    },

    /// Delete a saved calculation
    Delete {
        /// Calculation ID
        id: i64,
    },
}

/// Sale prices follow the same fail-soft number reading as material fields
fn sale_price_arg(value: &str) -> Result<f64, std::convert::Infallible> {
    Ok(input::parse_number(value))
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    db::init_schema(&conn)?;
    Ok(conn)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Init => {
            open_database(&cli.database)?;
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::Calc {
            input: input_path,
            materials,
            sale_price,
            json,
            draft,
            save,
            date,
            notes,
        } => {
            let mut sheet = match &input_path {
                Some(path) => BlendSheet::load_draft(path)?,
                None => BlendSheet::new(),
            };
            for spec in &materials {
                let identifier = sheet.next_identifier();
                sheet.upsert(input::parse_material(spec, identifier)?);
            }
            if let Some(price) = sale_price {
                sheet.set_sale_price(price);
            }

            if let Some(path) = &draft {
                sheet.save_draft(path)?;
            }

            let report = sheet.report();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }

            if save {
                let mut conn = open_database(&cli.database)?;
                let request = db::SaveRequest {
                    calculation_date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                    entries: sheet.entries(),
                    sale_price: sheet.sale_price(),
                    notes,
                };
                let id = db::save_calculation(&mut conn, &request)
                    .context("Calculation was not saved")?;
                if !json {
                    println!("Saved calculation #{}", id);
                }
            }
        }

        Commands::History => {
            let conn = open_database(&cli.database)?;
            let records = db::list_calculations(&conn)?;
            if records.is_empty() {
                println!("No saved calculations. Run 'calc --save' first.");
            } else {
                println!(
                    "{:>5}  {:<10} {:>8} {:>8} {:>12} {:>12} {:>12}",
                    "ID", "Date", "%", "Octane", "Cost", "Sale", "Profit"
                );
                println!("{}", "-".repeat(75));
                for r in records {
                    println!(
                        "{:>5}  {:<10} {:>8.2} {:>8.2} {:>12.2} {:>12.2} {:>12.2}",
                        r.id,
                        r.calculation_date.to_string(),
                        r.totals.total_percentage,
                        r.totals.total_octane,
                        r.totals.total_cost,
                        r.totals.sale_price,
                        r.totals.profit
                    );
                }
            }
        }

        Commands::Show { id } => {
            let conn = open_database(&cli.database)?;
            match db::get_calculation(&conn, id)? {
                Some((record, lines)) => {
                    println!("Calculation #{} ({})", record.id, record.calculation_date);
                    println!("  Saved: {}", record.created_at);
                    if let Some(notes) = record.notes.as_deref().filter(|n| !n.is_empty()) {
                        println!("  Notes: {}", notes);
                    }
                    println!();
                    println!("{}", CalculationReport::from_saved(lines, record.totals));
                }
                None => println!("Calculation #{} not found", id),
            }
        }

        Commands::Delete { id } => {
            let mut conn = open_database(&cli.database)?;
            if db::delete_calculation(&mut conn, id)? {
                println!("Deleted calculation #{}", id);
            } else {
                println!("Calculation #{} not found", id);
            }
        }
    }

    Ok(())
}
