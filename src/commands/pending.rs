use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use harvester::config::Config;
use harvester::crawler::Harvester;

pub fn pending(config: Config, output: Option<PathBuf>) -> Result<()> {
    let harvester = Harvester::open(&config).context("Failed to open journals")?;

    let urls = harvester.pending_urls();

    match output {
        Some(path) => {
            let mut body = urls.join("\n");
            if !body.is_empty() {
                body.push('\n');
            }
            std::fs::write(&path, body)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} pending URLs to {}", urls.len(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for url in &urls {
                writeln!(out, "{url}")?;
            }
        }
    }

    Ok(())
}
