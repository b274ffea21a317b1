//! Inspect command - summarize a cache directory without building

use crate::cache::TritonCacheParser;
use crate::cli::args::{InspectArgs, OutputFormat};
use crate::error::{CachepackError, CachepackResult};
use crate::fsutil;
use crate::image::{collect_entries, ImageSummary};
use console::style;

/// Execute the inspect command
pub async fn execute(args: InspectArgs) -> CachepackResult<()> {
    if !args.dir.is_dir() {
        return Err(CachepackError::CacheDirNotFound(args.dir));
    }

    let dir = args.dir.clone();
    let (collection, total_bytes) = tokio::task::spawn_blocking(move || {
        let collection = collect_entries(&TritonCacheParser, &dir)?;
        let total_bytes = fsutil::dir_size(&dir)
            .map_err(|e| CachepackError::io(format!("measuring {}", dir.display()), e))?;
        Ok::<_, CachepackError>((collection, total_bytes))
    })
    .await
    .map_err(|e| CachepackError::Internal(format!("inspect task failed: {}", e)))??;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&collection.entries)?);
        }
        OutputFormat::Table => {
            let summary = ImageSummary::build(&collection.entries, total_bytes);
            print_summary(&summary);
            if !collection.issues.is_empty() {
                println!(
                    "{} {} descriptor(s) without cache data skipped",
                    style("Note:").dim(),
                    collection.issues.len()
                );
            }
        }
    }

    Ok(())
}

/// Print a summary as a breakdown table
pub(crate) fn print_summary(summary: &ImageSummary) {
    println!(
        "{} entries, {} bytes",
        style(summary.total_count).bold(),
        style(summary.total_bytes).bold()
    );

    if summary.breakdown.is_empty() {
        return;
    }

    println!();
    println!(
        "{:<12} {:<12} {:>8}",
        style("BACKEND").bold(),
        style("ARCH").bold(),
        style("COUNT").bold()
    );
    for row in &summary.breakdown {
        println!("{:<12} {:<12} {:>8}", row.backend, row.arch, row.count);
    }
}
