use anyhow::{Context, Result};

use harvester::config::Config;
use harvester::crawler::Harvester;

pub fn stats(config: Config) -> Result<()> {
    let shallow_path = &config.storage.shallow_path;
    let detail_path = &config.storage.detail_path;

    if !shallow_path.exists() && !detail_path.exists() {
        println!("No journals found at {}", shallow_path.display());
        println!("Run a harvest first to create them.");
        return Ok(());
    }

    let harvester = Harvester::open(&config).context("Failed to open journals")?;
    let summary = harvester.summary();

    println!("Journal Stats");
    println!("=============");
    println!("Shallow journal: {}", shallow_path.display());
    println!("  Days: {}", summary.days);
    println!("  Articles: {}", summary.articles);
    println!("  Distinct URLs: {}", summary.distinct_urls);
    println!("Detail journal: {}", detail_path.display());
    println!("  Details: {}", summary.details);
    println!("  Empty: {}", summary.empty_details);
    println!("Pending URLs: {}", summary.pending);

    if summary.distinct_urls > 0 {
        let done = summary.distinct_urls - summary.pending;
        println!(
            "Detail coverage: {:.1}%",
            done as f64 / summary.distinct_urls as f64 * 100.0
        );
    }

    Ok(())
}
