use anyhow::Result;
use rpull::{documents_from_outputs, init_tracing_once, RunDriver, ScrapeConfig};

const DEFAULT_CONFIG: &str = "config.json";

fn main() -> Result<()> {
    init_tracing_once();
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = ScrapeConfig::load(&config_path)?;

    let report = RunDriver::new(&cfg).run()?;
    for k in &report.keywords {
        let state = if k.skipped { "already complete" } else { "written" };
        println!("{:<24} {:>8} records  {}  ({state})", k.keyword, k.records, k.path.display());
    }

    let docs = documents_from_outputs(&report.output_files(), cfg.file_format)?;
    println!("Collected {} documents for topic modeling", docs.len());

    Ok(())
}
