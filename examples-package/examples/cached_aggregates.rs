//! Cached Aggregates Example
//!
//! Demonstrates the byte-budgeted result cache and the warm-up scheduler:
//! the session pre-computes per-column aggregates at open, so the first
//! interactive lookups are cache hits.

use anyhow::Result;
use rowview::{Session, SessionConfig};

const SEED: &str = "
    CREATE TABLE readings (sensor TEXT, celsius REAL);
    INSERT INTO readings VALUES
        ('roof', 21.5), ('roof', 22.1), ('roof', 19.8),
        ('cellar', 11.2), ('cellar', 11.9), ('cellar', NULL),
        ('garden', 17.0), ('garden', 16.4), ('garden', 18.3);
";

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    println!("=== Cached Aggregates Example ===\n");

    // Warm the cache for every table before returning from open
    let config = SessionConfig::default()
        .with_populate_on_start(true)
        .with_block_until_ready(true)
        .with_max_total_bytes(8 * 1024 * 1024);
    let session = open_seeded(config)?;
    println!("session ready: {}\n", session.is_ready());

    let readings = session.table("readings")?;
    let celsius = readings.column("celsius")?;

    // These aggregates were computed during warm-up; each call is a hit
    println!("--- Aggregates (served from cache) ---");
    println!("count:  {}", celsius.count()?);
    println!("nulls:  {}", celsius.na_count()?);
    println!("min:    {}", celsius.min()?);
    println!("max:    {}", celsius.max()?);
    if let Some(avg) = celsius.avg()? {
        println!("avg:    {avg:.2}");
    }
    if let Some(median) = celsius.median()? {
        println!("median: {median:.2}");
    }

    println!("\n--- Value counts for a low-cardinality column ---");
    for (value, count) in readings.column("sensor")?.value_counts()? {
        println!("  {value}: {count}");
    }

    // An ad-hoc query misses once, then hits
    println!("\n--- Ad-hoc query ---");
    let sql = "SELECT sensor, AVG(celsius) FROM readings GROUP BY sensor";
    session.execute(sql)?;
    session.execute(sql)?;

    let stats = session.cache_stats();
    println!("\n--- Cache statistics ---");
    println!("entries:    {}", stats.entry_count());
    println!("memory:     {} bytes", stats.memory_bytes());
    println!("hits:       {}", stats.hits());
    println!("misses:     {}", stats.misses());
    println!("rejections: {}", stats.rejections());
    println!("hit rate:   {:.1}%", stats.hit_rate() * 100.0);

    session.close();
    println!("\n=== Done ===");
    Ok(())
}

fn open_seeded(config: SessionConfig) -> Result<Session> {
    let path = std::env::temp_dir().join("rowview_cache_demo.sql");
    std::fs::write(&path, SEED)?;
    let session = Session::open(&path, config)?;
    std::fs::remove_file(&path)?;
    Ok(session)
}
