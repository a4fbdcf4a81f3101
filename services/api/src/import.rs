use crate::infra::InMemoryBusinessRepository;
use approval_desk::config::AppConfig;
use approval_desk::error::AppError;
use approval_desk::offers::{
    BusinessRecord, ImportSummary, OfferDeskService, OfferServiceError, RowStatus,
};
use clap::Args;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Lender decision export (CSV with a header row)
    pub(crate) csv: PathBuf,
    /// JSON array of existing business records to merge into
    #[arg(long)]
    pub(crate) records: Option<PathBuf>,
    /// Write the reconciled records, in canonical form, to this path
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Print the row summary as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let ImportArgs {
        csv,
        records,
        output,
        json,
    } = args;

    let config = AppConfig::load()?;
    let existing = match records {
        Some(path) => load_records(&path)?,
        None => Vec::new(),
    };
    let repository = Arc::new(
        InMemoryBusinessRepository::seeded(existing).map_err(OfferServiceError::from)?,
    );
    let service = OfferDeskService::new(repository.clone(), config.offers);

    let summary = service.import_csv(BufReader::new(File::open(&csv)?))?;

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{text}"),
            Err(err) => println!("Unable to render import summary as JSON: {err}"),
        }
    } else {
        render_summary(&summary);
    }

    if let Some(path) = output {
        let reconciled = repository.snapshot().map_err(OfferServiceError::from)?;
        let text = serde_json::to_string_pretty(&reconciled)?;
        fs::write(&path, text)?;
        if !json {
            println!(
                "\nWrote {} records to {}",
                reconciled.len(),
                path.display()
            );
        }
    }

    Ok(())
}

fn load_records(path: &Path) -> Result<Vec<BusinessRecord>, AppError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn render_summary(summary: &ImportSummary) {
    println!(
        "Bulk import: {} rows imported, {} rows with errors",
        summary.imported, summary.errors
    );
    for result in &summary.results {
        let name = if result.business_name.is_empty() {
            "(no business name)"
        } else {
            result.business_name.as_str()
        };
        match result.status {
            RowStatus::Imported => {
                let business_id = result
                    .business_id
                    .as_ref()
                    .map(|id| id.as_str())
                    .unwrap_or("-");
                println!(
                    "- row {}: {} -> {} (+{} offers)",
                    result.row, name, business_id, result.offers_added
                );
            }
            RowStatus::Error => {
                println!(
                    "- row {}: {} rejected: {}",
                    result.row,
                    name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }
}
