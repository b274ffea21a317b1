//! Build command - package a cache directory into an image

use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::CachepackResult;
use crate::image::ImageBuilder;
use crate::orchestration::create_engine;
use crate::ui::{self, UiContext};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> CachepackResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("Building {}", args.image));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping build");
            on_signal.cancel();
        }
    });

    let staging_root = config.staging.root_dir();
    debug!("Staging root: {}", staging_root.display());

    let builder = ImageBuilder::new(create_engine(config, args.engine), staging_root);
    let line_ctx = ctx.clone();
    let on_output = move |line: String| ui::build_line(&line_ctx, &line);

    let outcome = builder
        .build(&args.dir, &args.image, &cancel, &on_output)
        .await?;

    if outcome.sanitize_warnings > 0 {
        ui::step_warn_hint(
            &ctx,
            &format!(
                "{} group file(s) left unsanitized",
                outcome.sanitize_warnings
            ),
            "Run with -v to see which files",
        );
    }

    ui::key_value(&ctx, "entries", &outcome.summary.total_count.to_string());
    ui::key_value(&ctx, "bytes", &outcome.summary.total_bytes.to_string());
    for reference in &outcome.references {
        ui::step_ok(&ctx, &format!("Tagged {}", reference));
    }
    ui::outro_success(&ctx, &format!("Cache image {} built", args.image));

    Ok(())
}
