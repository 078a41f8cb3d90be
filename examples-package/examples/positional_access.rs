//! Positional Access Example
//!
//! Demonstrates addressing rows by position: single indices (including
//! negative ones), index lists, and spans with a step.

use anyhow::Result;
use rowview::{Session, SessionConfig, Span};

const SEED: &str = "
    CREATE TABLE cities (name TEXT, country TEXT, population INTEGER);
    INSERT INTO cities VALUES
        ('Tokyo', 'JP', 13960000),
        ('Delhi', 'IN', 31180000),
        ('Shanghai', 'CN', 24870000),
        ('Sao Paulo', 'BR', 12330000),
        ('Mexico City', 'MX', 9200000),
        ('Cairo', 'EG', 9500000),
        ('Mumbai', 'IN', 12440000),
        ('Beijing', 'CN', 21540000),
        ('Dhaka', 'BD', 8900000),
        ('Osaka', 'JP', 2750000);
";

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    println!("=== Positional Access Example ===\n");

    let session = open_seeded()?;
    let cities = session.table("cities")?;
    println!("Loaded {} rows, columns: {:?}\n", cities.len()?, cities.columns()?);

    let pos = cities.positional()?;

    // Single indices, counted from either end
    println!("--- Single indices ---");
    println!("pos 0:  {:?}", pos.at(0)?);
    println!("pos 5:  {:?}", pos.at(5)?);
    println!("pos -1: {:?} (last row)", pos.at(-1)?);

    // An index list keeps order and duplicates
    println!("\n--- Index list ---");
    for row in pos.select(&[3, -1, 0, 3])? {
        println!("  {row:?}");
    }

    // Spans clip like slices: no bounds error even past the end
    println!("\n--- Spans ---");
    println!("every second row in [2, 8):");
    for row in pos.span(&Span::range(2, 8).with_step(2)?)? {
        println!("  {row:?}");
    }
    println!("last three rows, reversed:");
    for row in pos.span(&Span::new(None, Some(-4), -1)?)? {
        println!("  {row:?}");
    }
    println!("span far past the end: {} rows", pos.span(&Span::range(3, 1000))?.len());

    // Out-of-range single indices do error
    println!("\n--- Bounds ---");
    match pos.at(42) {
        Err(err) => println!("pos 42: {err}"),
        Ok(_) => unreachable!(),
    }

    // The same requests work on one column
    println!("\n--- Column positional access ---");
    let names = cities.column("name")?;
    println!("name at -2:        {}", names.at(-2)?);
    println!("names 0..3:        {:?}", names.span(&Span::range(0, 3))?);

    session.close();
    println!("\n=== Done ===");
    Ok(())
}

fn open_seeded() -> Result<Session> {
    let path = std::env::temp_dir().join("rowview_positional_demo.sql");
    std::fs::write(&path, SEED)?;
    let session = Session::open(&path, SessionConfig::default())?;
    std::fs::remove_file(&path)?;
    Ok(session)
}
