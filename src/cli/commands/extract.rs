//! Extract command.

use std::path::Path;

use console::style;

use crate::config::Settings;
use crate::models::DocType;
use crate::pipeline::Pipeline;
use crate::report::EnrichmentOutcome;

/// Run the pipeline over one file and print JSON to stdout.
pub async fn cmd_extract(
    settings: Settings,
    path: &Path,
    doc_type: DocType,
    report: bool,
) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("{} does not exist", path.display());
    }

    let pipeline = Pipeline::new(settings);
    let outcome = pipeline.run(path, doc_type).await;

    for d in outcome.diagnostics.iter() {
        let page = d.page.map(|p| format!(" page {}", p)).unwrap_or_default();
        eprintln!(
            "{} {:?}{}: {}",
            style("!").yellow(),
            d.stage,
            page,
            d.reason
        );
    }
    if let EnrichmentOutcome::Merged = outcome.enrichment {
        eprintln!("{} Enriched with {}", style("✓").green(), pipeline.settings().enrichment.model);
    }

    let json = if report {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string_pretty(&outcome.result)?
    };
    println!("{}", json);
    Ok(())
}
