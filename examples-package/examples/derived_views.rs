//! Derived Views Example
//!
//! Demonstrates filtering, sorting, and limiting relations. Every
//! derivation materializes as a transient view whose rows are re-ranked
//! from 1, so positional access works the same on a filtered view as on
//! the base table. All views are dropped when the session closes.

use anyhow::Result;
use rowview::{Ordering, Session, SessionConfig};

const SEED: &str = "
    CREATE TABLE orders (id INTEGER, customer TEXT, total REAL, status TEXT);
    INSERT INTO orders VALUES
        (1, 'acme', 120.0, 'shipped'),
        (2, 'globex', 45.5, 'pending'),
        (3, 'acme', 300.0, 'shipped'),
        (4, 'initech', 12.0, 'cancelled'),
        (5, 'globex', 99.9, 'shipped'),
        (6, 'acme', 15.0, 'pending'),
        (7, 'initech', 510.0, 'shipped'),
        (8, 'globex', 74.2, 'cancelled');
";

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    println!("=== Derived Views Example ===\n");

    let session = open_seeded()?;
    let orders = session.table("orders")?;
    println!("orders: {:?} (rows, cols)\n", orders.shape()?);

    // Filtering produces a new relation with fresh, contiguous positions
    println!("--- Filter ---");
    let shipped = orders.filter(&orders.column("status")?.eq("shipped"))?;
    println!("shipped orders: {} rows", shipped.len()?);
    println!("first shipped (pos 0): {:?}", shipped.positional()?.at(0)?);

    // Predicates compose with and / or
    println!("\n--- Composed predicates ---");
    let status = orders.column("status")?;
    let total = orders.column("total")?;
    let interesting = status.eq("shipped").and(&total.gt(100.0))?;
    println!("predicate: {interesting}");
    let big_shipped = orders.filter(&interesting)?;
    for row in big_shipped.rows(None)? {
        println!("  {row:?}");
    }

    // Sorting re-ranks identity over the new order
    println!("\n--- Sort ---");
    let by_total = orders.sort_by(&[Ordering::desc("total")])?;
    println!("largest order  (pos 0):  {:?}", by_total.positional()?.at(0)?);
    println!("smallest order (pos -1): {:?}", by_total.positional()?.at(-1)?);

    // Derivations chain: each step is a view over the previous one
    println!("\n--- Chained derivation ---");
    let top_shipped = shipped.sort_by(&[Ordering::desc("total")])?.limit(2)?;
    for row in top_shipped.rows(None)? {
        println!("  {row:?}");
    }

    println!("\nviews created this session: {:?}", session.view_names()?);
    session.close();
    println!("=== Done (all views dropped) ===");
    Ok(())
}

fn open_seeded() -> Result<Session> {
    let path = std::env::temp_dir().join("rowview_views_demo.sql");
    std::fs::write(&path, SEED)?;
    let session = Session::open(&path, SessionConfig::default())?;
    std::fs::remove_file(&path)?;
    Ok(session)
}
