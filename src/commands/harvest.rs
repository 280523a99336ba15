use anyhow::{Context, Result};

use harvester::config::{parse_date, Config};
use harvester::crawler::Harvester;
use harvester::error::{Error, HarvestError, HarvesterErrorTrait};

/// Parameters for the harvest command
#[derive(Debug, Default)]
pub struct HarvestParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub max_urls: Option<usize>,
    pub shallow_only: bool,
    pub detail_only: bool,
}

pub async fn harvest(mut config: Config, params: HarvestParams) -> Result<()> {
    if let Some(start) = params.start.as_deref() {
        config.archive.start_date = parse_date(start)?;
    }
    if let Some(end) = params.end.as_deref() {
        config.archive.end_date = Some(parse_date(end)?);
    }
    config.validate()?;

    let start = config.archive.start_date;
    let end = config.end_date();

    println!("Starting Archive Harvest");
    println!("========================");
    println!("Range: {start} .. {end}");
    println!("Shallow journal: {}", config.storage.shallow_path.display());
    println!("Detail journal: {}", config.storage.detail_path.display());

    let mut harvester = Harvester::open(&config).context("Failed to open journals")?;

    // Print what we have so far even when a sweep aborts
    let outcome = run_sweeps(&mut harvester, &params, start, end).await;
    print_summary(&harvester);
    outcome
}

async fn run_sweeps(
    harvester: &mut Harvester,
    params: &HarvestParams,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> Result<()> {
    if !params.detail_only {
        println!("\nShallow sweep");
        harvester
            .shallow_sweep(start, end)
            .await
            .map_err(|e| aborted("Shallow", e))?;
    }

    if !params.shallow_only {
        println!("\nDetail sweep");
        harvester
            .detail_sweep(params.max_urls)
            .await
            .map_err(|e| aborted("Detail", e))?;
    }

    Ok(())
}

fn aborted(sweep: &str, error: HarvestError) -> anyhow::Error {
    let error = Error::from(error);

    println!("\n{sweep} sweep stopped ({} error)", error.category().as_str());
    if error.is_recoverable() {
        println!("The failure looks transient; rerun the same command to resume.");
    }

    anyhow::Error::new(error).context(format!("{sweep} sweep aborted"))
}

fn print_summary(harvester: &Harvester) {
    let stats = harvester.stats();

    println!("\nHarvest Summary");
    println!("===============");
    println!("Days fetched: {}", stats.days_fetched);
    println!("Days already present: {}", stats.days_present);
    println!("Articles extracted: {}", stats.articles_extracted);
    println!("URLs fetched: {}", stats.urls_fetched);
    println!("URLs already present: {}", stats.urls_present);
    println!("Empty details: {}", stats.empty_details);

    let failures = harvester.failures();
    println!("Tolerated failures: {}", failures.len());
    if !failures.is_empty() {
        println!("\nFailed Fetches");
        println!("--------------");
        for failure in &failures {
            println!("{failure}");
        }
    }
}
