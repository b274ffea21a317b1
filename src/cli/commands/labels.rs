//! Labels command - decode the cache labels of a built image

use crate::cli::args::{LabelsArgs, OutputFormat};
use crate::cli::commands::inspect::print_summary;
use crate::config::Config;
use crate::error::CachepackResult;
use crate::image::ImageSummary;
use crate::orchestration::{create_engine, BuildEngine};
use crate::ui::{TaskSpinner, UiContext};
use tracing::debug;

/// Execute the labels command
pub async fn execute(args: LabelsArgs, config: &Config) -> CachepackResult<()> {
    let engine = create_engine(config, args.engine);

    let summary = match args.format {
        // JSON goes to stdout untouched, so no spinner lines
        OutputFormat::Json => read_summary(engine.as_ref(), &args.image).await?,
        OutputFormat::Table => {
            let mut spinner = TaskSpinner::new(&UiContext::detect());
            spinner.start(&format!("Reading labels of {}...", args.image));
            match read_summary(engine.as_ref(), &args.image).await {
                Ok(summary) => {
                    spinner.stop(&format!("Read labels of {}", args.image));
                    summary
                }
                Err(e) => {
                    spinner.stop_error(&format!("Could not read labels of {}", args.image));
                    return Err(e);
                }
            }
        }
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Table => print_summary(&summary),
    }

    Ok(())
}

async fn read_summary(
    engine: &dyn BuildEngine,
    image: &str,
) -> CachepackResult<ImageSummary> {
    engine.ensure_ready().await?;
    let set = engine.image_labels(image).await?;
    debug!("{} carries {} labels", image, set.len());
    ImageSummary::from_labels(image, &set)
}
