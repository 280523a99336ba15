use anyhow::{Context, Result};

use harvester::config::{parse_date, Config};
use harvester::crawler::Harvester;
use harvester::utils::truncate_text;
use harvester::HarvestDay;

pub async fn day(config: Config, date: &str, limit: usize) -> Result<()> {
    let day = HarvestDay::new(parse_date(date)?);

    let harvester = Harvester::from_config(&config).context("Failed to create harvester")?;
    let summaries = harvester
        .harvest_day(day)
        .await
        .with_context(|| format!("Failed to fetch archive for {day}"))?;

    println!("{day}: {} articles", summaries.len());
    for summary in summaries.iter().take(limit) {
        println!(
            "  {} — {}",
            truncate_text(summary.headline.as_deref().unwrap_or("(no headline)"), 80),
            summary.url.as_deref().unwrap_or("(no url)")
        );
    }
    if summaries.len() > limit {
        println!("  ... and {} more", summaries.len() - limit);
    }

    Ok(())
}
